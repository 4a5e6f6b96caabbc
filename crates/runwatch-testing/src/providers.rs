//! In-memory provider for driving sessions from tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use runwatch_runtime::{Error, ListenerId, Provider, Publisher, Result, Scope};
use runwatch_types::{
    Event, InstanceId, OutputLine, PhaseFilter, RawOutputLine, RunCriteria, Snapshot,
};

/// Provider call, recorded in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    GetInstances,
    Snap(InstanceId),
    GetRun(InstanceId),
    ReadHistory,
    Subscribe(Scope),
    Unsubscribe(ListenerId),
    Stop(InstanceId),
    FetchOutputTail(InstanceId),
}

#[derive(Default)]
struct State {
    live: BTreeMap<InstanceId, Snapshot>,
    history: Vec<Snapshot>,
    output: HashMap<InstanceId, Vec<OutputLine>>,
    listeners: Vec<(ListenerId, Scope, Publisher)>,
    /// Every publisher ever handed out, including released ones
    issued: Vec<Publisher>,
    next_listener: u64,
    calls: Vec<Call>,
    snap_failures: u32,
    tail_failures: u32,
    stop_rejection: Option<String>,
    refuse_subscribe: bool,
}

/// Scripted stand-in for the job engine.
///
/// Events are only produced when the test calls [`ScriptedProvider::emit`],
/// which publishes from the calling thread.
#[derive(Default)]
pub struct ScriptedProvider {
    state: Mutex<State>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn with_live(self, snapshot: Snapshot) -> Self {
        self.lock().live.insert(snapshot.instance_id.clone(), snapshot);
        self
    }

    pub fn with_history(self, snapshot: Snapshot) -> Self {
        self.lock().history.push(snapshot);
        self
    }

    pub fn with_output(self, instance_id: &InstanceId, lines: Vec<OutputLine>) -> Self {
        self.lock()
            .output
            .entry(instance_id.clone())
            .or_default()
            .extend(lines);
        self
    }

    /// Make the next `times` calls to `snap` fail.
    pub fn fail_snap(&self, times: u32) {
        self.lock().snap_failures = times;
    }

    /// Make the next `times` calls to `fetch_output_tail` fail.
    pub fn fail_tail(&self, times: u32) {
        self.lock().tail_failures = times;
    }

    pub fn reject_stop(&self, reason: &str) {
        self.lock().stop_rejection = Some(reason.to_string());
    }

    pub fn refuse_subscribe(&self) {
        self.lock().refuse_subscribe = true;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    /// Publishers handed out so far, including unsubscribed ones.
    pub fn issued_publishers(&self) -> Vec<Publisher> {
        self.lock().issued.clone()
    }

    /// Update the provider's own state and publish to matching listeners.
    ///
    /// Publishing happens outside the state lock.
    pub fn emit(&self, event: Event) {
        let targets = {
            let mut state = self.lock();
            match &event {
                Event::PhaseUpdated { snapshot } => {
                    state
                        .live
                        .insert(snapshot.instance_id.clone(), snapshot.clone());
                }
                Event::LifecycleEnded { snapshot } => {
                    state.live.remove(&snapshot.instance_id);
                    state.history.push(snapshot.clone());
                }
                Event::OutputAppended { instance_id, line } => {
                    state
                        .output
                        .entry(instance_id.clone())
                        .or_default()
                        .push(line.clone());
                }
            }
            Self::targets(&state, event.instance_id())
        };

        for publisher in targets {
            let _ = publisher.publish(event.clone());
        }
    }

    /// Change an instance's state without notifying anyone.
    pub fn set_quietly(&self, snapshot: Snapshot) {
        let mut state = self.lock();
        if snapshot.is_ended() {
            state.live.remove(&snapshot.instance_id);
            state.history.push(snapshot);
        } else {
            state.live.insert(snapshot.instance_id.clone(), snapshot);
        }
    }

    /// Publish an unvalidated output line to matching listeners.
    pub fn emit_raw_output(&self, instance_id: &InstanceId, raw: RawOutputLine) {
        let targets = Self::targets(&self.lock(), instance_id);
        for publisher in targets {
            let _ = publisher.publish_output(instance_id.clone(), raw.clone());
        }
    }

    /// Signal loss of delivery to every listener.
    pub fn disconnect_all(&self, reason: &str) {
        let publishers: Vec<Publisher> = self
            .lock()
            .listeners
            .iter()
            .map(|(_, _, p)| p.clone())
            .collect();
        for publisher in publishers {
            publisher.disconnect(reason);
        }
    }

    fn targets(state: &State, instance_id: &InstanceId) -> Vec<Publisher> {
        state
            .listeners
            .iter()
            .filter(|(_, scope, _)| match scope {
                Scope::Environment => true,
                Scope::Instance(id) => id == instance_id,
            })
            .map(|(_, _, p)| p.clone())
            .collect()
    }

    fn find_run(state: &State, instance_id: &InstanceId) -> Option<Snapshot> {
        state
            .history
            .iter()
            .rev()
            .find(|s| &s.instance_id == instance_id)
            .cloned()
    }
}

impl Provider for ScriptedProvider {
    fn get_instances(&self, criteria: &RunCriteria) -> Result<Vec<InstanceId>> {
        let mut state = self.lock();
        state.calls.push(Call::GetInstances);
        Ok(state
            .live
            .keys()
            .filter(|id| criteria.matches_id(id))
            .cloned()
            .collect())
    }

    fn snap(&self, instance_id: &InstanceId) -> Result<Snapshot> {
        let mut state = self.lock();
        state.calls.push(Call::Snap(instance_id.clone()));
        if state.snap_failures > 0 {
            state.snap_failures -= 1;
            return Err(Error::TransientFetch {
                instance: instance_id.clone(),
                reason: "snapshot unavailable".to_string(),
            });
        }
        state
            .live
            .get(instance_id)
            .cloned()
            .or_else(|| Self::find_run(&state, instance_id))
            .ok_or_else(|| Error::NotFound(instance_id.to_string()))
    }

    fn get_run(&self, instance_id: &InstanceId) -> Result<Snapshot> {
        let mut state = self.lock();
        state.calls.push(Call::GetRun(instance_id.clone()));
        Self::find_run(&state, instance_id).ok_or_else(|| Error::NotFound(instance_id.to_string()))
    }

    fn read_history(&self, criteria: &RunCriteria, limit: usize) -> Result<Vec<Snapshot>> {
        let mut state = self.lock();
        state.calls.push(Call::ReadHistory);
        let mut runs: Vec<Snapshot> = state
            .history
            .iter()
            .filter(|s| criteria.matches(s))
            .cloned()
            .collect();
        runs.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        runs.truncate(limit);
        Ok(runs)
    }

    fn subscribe(&self, scope: &Scope, publisher: Publisher) -> Result<ListenerId> {
        let mut state = self.lock();
        state.calls.push(Call::Subscribe(scope.clone()));
        if state.refuse_subscribe {
            return Err(Error::Provider("subscriptions refused".to_string()));
        }
        state.next_listener += 1;
        let listener = ListenerId(state.next_listener);
        state.issued.push(publisher.clone());
        state.listeners.push((listener, scope.clone(), publisher));
        Ok(listener)
    }

    fn unsubscribe(&self, listener: ListenerId) {
        let mut state = self.lock();
        state.calls.push(Call::Unsubscribe(listener));
        state.listeners.retain(|(id, _, _)| *id != listener);
    }

    fn stop(&self, instance_id: &InstanceId) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(Call::Stop(instance_id.clone()));
        match &state.stop_rejection {
            Some(reason) => Err(Error::ControlRequest {
                instance: instance_id.clone(),
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }

    fn fetch_output_tail(
        &self,
        instance_id: &InstanceId,
        filter: Option<&PhaseFilter>,
    ) -> Result<Vec<OutputLine>> {
        let mut state = self.lock();
        state.calls.push(Call::FetchOutputTail(instance_id.clone()));
        if state.tail_failures > 0 {
            state.tail_failures -= 1;
            return Err(Error::TransientFetch {
                instance: instance_id.clone(),
                reason: "output tail unavailable".to_string(),
            });
        }
        Ok(state
            .output
            .get(instance_id)
            .map(|lines| {
                lines
                    .iter()
                    .filter(|l| filter.is_none_or(|f| f.accepts(l.phase_id.as_deref())))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

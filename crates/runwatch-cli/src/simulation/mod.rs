//! In-process job environment standing in for the real engine.
//!
//! One driver thread per job walks a run through its phases, then starts the
//! next run of the same job. Each instance's events are published only by its
//! own driver, outside the state lock, so per-instance order holds.

mod plan;
mod run;

pub use run::{Fate, SimRun};

use std::collections::{BTreeMap, HashMap};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use runwatch_runtime::{Error, ListenerId, Provider, Publisher, Result, Scope, SimulationConfig};
use runwatch_types::{Event, InstanceId, OutputLine, PhaseFilter, RunCriteria, Snapshot};
use uuid::Uuid;

/// Ended runs kept in memory; older ones are forgotten with their output.
const HISTORY_CAP: usize = 200;

struct Listener {
    id: ListenerId,
    scope: Scope,
    publisher: Publisher,
}

#[derive(Default)]
struct SimState {
    live: BTreeMap<InstanceId, SimRun>,
    history: Vec<Snapshot>,
    output: HashMap<InstanceId, Vec<OutputLine>>,
    listeners: Vec<Listener>,
    next_listener: u64,
}

impl SimState {
    fn targets(&self, instance_id: &InstanceId) -> Vec<Publisher> {
        self.listeners
            .iter()
            .filter(|l| match &l.scope {
                Scope::Environment => true,
                Scope::Instance(id) => id == instance_id,
            })
            .map(|l| l.publisher.clone())
            .collect()
    }

    fn record_output(&mut self, instance_id: &InstanceId, lines: &[OutputLine]) {
        if lines.is_empty() {
            return;
        }
        self.output
            .entry(instance_id.clone())
            .or_default()
            .extend_from_slice(lines);
    }

    fn archive(&mut self, snapshot: Snapshot) {
        self.history.push(snapshot);
        if self.history.len() > HISTORY_CAP {
            let evicted = self.history.remove(0);
            self.output.remove(&evicted.instance_id);
        }
    }

    fn find_run(&self, instance_id: &InstanceId) -> Option<&Snapshot> {
        self.history.iter().rev().find(|s| &s.instance_id == instance_id)
    }
}

struct Shared {
    config: SimulationConfig,
    state: Mutex<SimState>,
    shutdown: AtomicBool,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    fn step_delay(&self) -> StdDuration {
        StdDuration::from_millis(self.config.step_delay_ms)
    }

    fn fate(&self) -> Fate {
        Fate {
            fail_at: roll(self.config.fail_ratio_pct)
                .then(|| plan::LEAVES[pick(plan::LEAVES.len())]),
            slow: roll(15),
        }
    }

    /// Register a new run of `job` and return its id.
    fn launch(&self, job: &str) -> InstanceId {
        let instance_id = InstanceId::new(job, new_run_id());
        let run = SimRun::new(instance_id.clone(), Utc::now(), self.fate());
        let snapshot = run.snapshot().clone();

        let targets = {
            let mut state = self.lock();
            state.live.insert(instance_id.clone(), run);
            state.targets(&instance_id)
        };
        tracing::debug!(instance = %instance_id, "simulated run created");
        publish(&targets, &[Event::PhaseUpdated { snapshot }]);
        instance_id
    }

    /// Apply one step to a live run and publish what changed.
    ///
    /// Returns `false` once the run has ended.
    fn step(&self, instance_id: &InstanceId, first: bool) -> bool {
        let now = Utc::now();
        let (events, targets, ended) = {
            let mut state = self.lock();
            let Some(run) = state.live.get_mut(instance_id) else {
                return false;
            };
            let before = run.snapshot().clone();
            let lines = if first { run.begin(now) } else { run.advance(now) };
            let snapshot = run.snapshot().clone();
            let ended = snapshot.is_ended();

            let mut events = Vec::new();
            if snapshot != before && !ended {
                events.push(Event::PhaseUpdated {
                    snapshot: snapshot.clone(),
                });
            }
            events.extend(lines.iter().map(|line| Event::OutputAppended {
                instance_id: instance_id.clone(),
                line: line.clone(),
            }));
            state.record_output(instance_id, &lines);

            if ended {
                state.live.remove(instance_id);
                state.archive(snapshot.clone());
                events.push(Event::LifecycleEnded { snapshot });
            }
            (events, state.targets(instance_id), ended)
        };

        publish(&targets, &events);
        if ended {
            tracing::debug!(instance = %instance_id, "simulated run ended");
        }
        !ended
    }

    /// Step `instance_id` to its end, then keep launching new runs of `job`
    /// until shutdown.
    fn drive(&self, job: &str, mut instance_id: InstanceId) {
        loop {
            let mut first = true;
            loop {
                thread::sleep(self.step_delay());
                if self.is_shutdown() || !self.step(&instance_id, first) {
                    break;
                }
                first = false;
            }
            if self.is_shutdown() {
                return;
            }
            thread::sleep(self.step_delay());
            instance_id = self.launch(job);
        }
    }

    fn disconnect_all(&self, reason: &str) {
        let publishers: Vec<Publisher> = self
            .lock()
            .listeners
            .iter()
            .map(|l| l.publisher.clone())
            .collect();
        for publisher in publishers {
            publisher.disconnect(reason);
        }
    }
}

fn publish(targets: &[Publisher], events: &[Event]) {
    for publisher in targets {
        for event in events {
            if publisher.publish(event.clone()).is_err() {
                break;
            }
        }
    }
}

fn roll(percent: u8) -> bool {
    Uuid::new_v4().as_u128() % 100 < u128::from(percent)
}

fn pick(len: usize) -> usize {
    (Uuid::new_v4().as_u128() % len as u128) as usize
}

fn new_run_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

/// Simulated engine with `config.jobs` concurrently running jobs.
pub struct SimulatedEnvironment {
    shared: Arc<Shared>,
}

impl SimulatedEnvironment {
    /// Seed history and start one driver thread per job.
    ///
    /// The first run of every job is registered before this returns, so an
    /// immediate `get_instances` sees all of them.
    pub fn start(config: SimulationConfig) -> Self {
        let env = Self::idle(config);
        env.seed_history();

        for index in 0..env.shared.config.jobs {
            let job = plan::job_name(index);
            let first = env.shared.launch(&job);
            let shared = Arc::clone(&env.shared);
            thread::spawn(move || {
                let outcome = catch_unwind(AssertUnwindSafe(|| shared.drive(&job, first)));
                if outcome.is_err() {
                    tracing::warn!(job = %job, "simulation driver panicked");
                    shared.disconnect_all("simulation driver failed");
                }
            });
        }
        env
    }

    /// Environment without drivers or history.
    pub fn idle(config: SimulationConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                state: Mutex::new(SimState::default()),
                shutdown: AtomicBool::new(false),
            }),
        }
    }

    fn seed_history(&self) {
        let step = Duration::seconds(4);
        let now = Utc::now();
        let mut state = self.shared.lock();
        for index in 0..self.shared.config.seed_history {
            let job = plan::job_name(index % self.shared.config.jobs.max(1));
            let created = now - Duration::minutes(10 * (index as i64 + 1));
            let (snapshot, output) = SimRun::replay(
                InstanceId::new(job, new_run_id()),
                created,
                step,
                self.shared.fate(),
            );
            state.output.insert(snapshot.instance_id.clone(), output);
            state.archive(snapshot);
        }
    }

    /// Signal every live listener that delivery stopped.
    pub fn disconnect_all(&self, reason: &str) {
        self.shared.disconnect_all(reason);
    }

    pub fn shutdown(&self) {
        if !self.shared.shutdown.swap(true, Ordering::SeqCst) {
            tracing::debug!("simulation shutting down");
        }
    }
}

impl Drop for SimulatedEnvironment {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Provider for SimulatedEnvironment {
    fn get_instances(&self, criteria: &RunCriteria) -> Result<Vec<InstanceId>> {
        Ok(self
            .shared
            .lock()
            .live
            .keys()
            .filter(|id| criteria.matches_id(id))
            .cloned()
            .collect())
    }

    fn snap(&self, instance_id: &InstanceId) -> Result<Snapshot> {
        let state = self.shared.lock();
        state
            .live
            .get(instance_id)
            .map(|run| run.snapshot().clone())
            .or_else(|| state.find_run(instance_id).cloned())
            .ok_or_else(|| Error::NotFound(instance_id.to_string()))
    }

    fn get_run(&self, instance_id: &InstanceId) -> Result<Snapshot> {
        self.shared
            .lock()
            .find_run(instance_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(instance_id.to_string()))
    }

    fn read_history(&self, criteria: &RunCriteria, limit: usize) -> Result<Vec<Snapshot>> {
        let state = self.shared.lock();
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
        if self.shared.is_shutdown() {
            return Err(Error::Provider("environment is shutting down".to_string()));
        }
        let mut state = self.shared.lock();
        state.next_listener += 1;
        let id = ListenerId(state.next_listener);
        state.listeners.push(Listener {
            id,
            scope: scope.clone(),
            publisher,
        });
        tracing::debug!(listener = id.0, %scope, "listener registered");
        Ok(id)
    }

    fn unsubscribe(&self, listener: ListenerId) {
        self.shared.lock().listeners.retain(|l| l.id != listener);
        tracing::debug!(listener = listener.0, "listener removed");
    }

    fn stop(&self, instance_id: &InstanceId) -> Result<()> {
        let mut state = self.shared.lock();
        match state.live.get_mut(instance_id).map(SimRun::request_stop) {
            Some(true) => {
                tracing::info!(instance = %instance_id, "stop requested");
                Ok(())
            }
            _ => Err(Error::ControlRequest {
                instance: instance_id.clone(),
                reason: "instance is not active".to_string(),
            }),
        }
    }

    fn fetch_output_tail(
        &self,
        instance_id: &InstanceId,
        filter: Option<&PhaseFilter>,
    ) -> Result<Vec<OutputLine>> {
        let state = self.shared.lock();
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

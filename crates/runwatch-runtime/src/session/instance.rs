use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use runwatch_types::{Event, InstanceId, OutputLine, Phase, PhaseFilter, Snapshot};

use crate::bridge::{Delivery, EventBridge};
use crate::output::OutputBuffer;
use crate::provider::{InstanceTarget, Provider, Scope};
use crate::reconcile::{PhaseViewState, reconcile};
use crate::subscription::Subscription;
use crate::{Error, Result};

/// Ticks a control failure message stays visible.
const NOTICE_TICKS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenState {
    /// Subscribed, waiting for the first snapshot
    Attaching,
    Live,
    /// Terminal event received; frozen
    Ending,
    Detached,
    /// Ended run shown statically; never changes
    Historical,
    /// Provider stopped delivering; last known snapshot stays visible
    Disconnected { reason: String },
}

impl ScreenState {
    pub fn is_frozen(&self) -> bool {
        !matches!(self, ScreenState::Attaching | ScreenState::Live)
    }
}

/// Retryable failure of the initial fetch, shown inline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub message: String,
    pub retryable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    ticks_left: u32,
}

/// Controller of one instance screen.
///
/// Owns the subscription, snapshot, output buffer and phase view state for
/// the screen's lifetime. All mutation happens on the render thread through
/// [`InstanceSession::pump`] and the interaction methods.
pub struct InstanceSession {
    provider: Arc<dyn Provider>,
    instance_id: InstanceId,
    state: ScreenState,
    snapshot: Option<Snapshot>,
    output: OutputBuffer,
    view: PhaseViewState,
    bridge: EventBridge,
    subscription: Option<Subscription>,
    banner: Option<Banner>,
    notice: Option<Notice>,
    frozen_at: Option<DateTime<Utc>>,
    dirty: bool,
}

impl InstanceSession {
    pub fn open(
        provider: Arc<dyn Provider>,
        target: InstanceTarget,
        bridge_capacity: usize,
    ) -> Result<Self> {
        match target {
            InstanceTarget::Live(id) => Self::attach(provider, id, bridge_capacity),
            InstanceTarget::Historical(snapshot) => Ok(Self::historical(provider, snapshot)),
        }
    }

    /// Attach to a live instance: subscribe first, then fetch the snapshot
    /// and output tail, so the tail can only overlap the live stream.
    pub fn attach(
        provider: Arc<dyn Provider>,
        instance_id: InstanceId,
        bridge_capacity: usize,
    ) -> Result<Self> {
        let bridge = EventBridge::new(bridge_capacity);
        let subscription = Subscription::open(
            Arc::clone(&provider),
            Scope::Instance(instance_id.clone()),
            &bridge,
        )
        .map_err(|e| Error::SubscriptionLost {
            scope: instance_id.to_string(),
            reason: e.to_string(),
        })?;
        tracing::info!(instance = %instance_id, "attaching");

        let mut session = Self {
            provider,
            instance_id,
            state: ScreenState::Attaching,
            snapshot: None,
            output: OutputBuffer::new(),
            view: PhaseViewState::default(),
            bridge,
            subscription: Some(subscription),
            banner: None,
            notice: None,
            frozen_at: None,
            dirty: true,
        };
        session.load();
        Ok(session)
    }

    /// Static screen for an ended run. The output tail is fetched once.
    pub fn historical(provider: Arc<dyn Provider>, snapshot: Snapshot) -> Self {
        let instance_id = snapshot.instance_id.clone();
        let mut output = OutputBuffer::new();
        let mut banner = None;
        match provider.fetch_output_tail(&instance_id, None) {
            Ok(lines) => {
                output.extend(lines);
            }
            Err(e) => {
                tracing::warn!(instance = %instance_id, error = %e, "output fetch failed");
                banner = Some(Banner {
                    message: format!("Output unavailable: {}", e),
                    retryable: false,
                });
            }
        }

        Self {
            provider,
            instance_id,
            state: ScreenState::Historical,
            view: PhaseViewState::new(&snapshot),
            snapshot: Some(snapshot),
            output,
            bridge: EventBridge::new(1),
            subscription: None,
            banner,
            notice: None,
            frozen_at: None,
            dirty: true,
        }
    }

    fn load(&mut self) {
        self.banner = None;

        if self.snapshot.is_none() {
            match self.provider.snap(&self.instance_id) {
                Ok(snapshot) => self.swap_snapshot(snapshot),
                Err(e) => {
                    self.fetch_failed(e);
                    return;
                }
            }
        }

        match self.provider.fetch_output_tail(&self.instance_id, None) {
            Ok(lines) => {
                let added = self.output.extend(lines);
                tracing::debug!(instance = %self.instance_id, added, "output tail merged");
            }
            Err(e) => self.fetch_failed(e),
        }
        self.dirty = true;
    }

    fn fetch_failed(&mut self, e: Error) {
        let e = match e {
            e @ Error::TransientFetch { .. } => e,
            other => Error::TransientFetch {
                instance: self.instance_id.clone(),
                reason: other.to_string(),
            },
        };
        tracing::warn!(error = %e, "initial fetch failed");
        self.banner = Some(Banner {
            message: e.to_string(),
            retryable: e.is_retryable(),
        });
        self.dirty = true;
    }

    /// Repeat a failed initial fetch. Returns `false` when there is nothing to retry.
    pub fn retry(&mut self) -> bool {
        if self.state.is_frozen() || !self.banner.as_ref().is_some_and(|b| b.retryable) {
            return false;
        }
        self.load();
        true
    }

    /// Apply everything drained from the bridge.
    pub fn pump(&mut self) -> bool {
        let mut changed = false;
        for delivery in self.bridge.drain() {
            changed |= self.apply(delivery);
        }
        changed
    }

    pub fn apply(&mut self, delivery: Delivery) -> bool {
        if self.state.is_frozen() {
            return false;
        }
        match delivery {
            Delivery::Event(event) => self.apply_event(event),
            Delivery::Lost { reason } => {
                tracing::warn!(instance = %self.instance_id, %reason, "subscription lost");
                self.release();
                self.frozen_at.get_or_insert_with(Utc::now);
                self.state = ScreenState::Disconnected { reason };
                self.dirty = true;
                true
            }
        }
    }

    fn apply_event(&mut self, event: Event) -> bool {
        if event.instance_id() != &self.instance_id {
            tracing::debug!(instance = %event.instance_id(), "ignoring event of other instance");
            return false;
        }
        match event {
            Event::PhaseUpdated { snapshot } => self.swap_snapshot(snapshot),
            Event::LifecycleEnded { snapshot } => {
                self.swap_snapshot(snapshot);
                self.end();
            }
            Event::OutputAppended { line, .. } => {
                if !self.output.insert(line) {
                    return false;
                }
            }
        }
        self.dirty = true;
        true
    }

    fn swap_snapshot(&mut self, snapshot: Snapshot) {
        self.view = match &self.snapshot {
            Some(_) => reconcile(&self.view, &snapshot),
            None => PhaseViewState::new(&snapshot),
        };
        let ended = snapshot.is_ended();
        self.snapshot = Some(snapshot);
        if self.state == ScreenState::Attaching {
            self.state = ScreenState::Live;
            tracing::info!(instance = %self.instance_id, "live");
        }
        if ended && self.state == ScreenState::Live {
            self.end();
        }
        self.dirty = true;
    }

    fn end(&mut self) {
        if self.state == ScreenState::Ending {
            return;
        }
        self.release();
        self.frozen_at.get_or_insert_with(Utc::now);
        self.state = ScreenState::Ending;
        tracing::info!(instance = %self.instance_id, "instance ended");
    }

    fn release(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.cancel();
        }
    }

    /// Leave the screen. Releases the subscription on every path.
    pub fn detach(&mut self) {
        self.release();
        if self.state != ScreenState::Detached {
            tracing::debug!(instance = %self.instance_id, "detached");
        }
        self.state = ScreenState::Detached;
    }

    /// Visual tick. Returns whether anything time-dependent must be redrawn.
    pub fn tick(&mut self) -> bool {
        let mut redraw = self.state == ScreenState::Live;
        if let Some(notice) = &mut self.notice {
            notice.ticks_left = notice.ticks_left.saturating_sub(1);
            if notice.ticks_left == 0 {
                self.notice = None;
                redraw = true;
            }
        }
        redraw
    }

    /// Forward a stop request. Failures become a transient notice; the
    /// displayed lifecycle only changes through a later event.
    pub fn stop(&mut self) {
        let result = if self.state == ScreenState::Live {
            self.provider.stop(&self.instance_id)
        } else {
            Err(Error::ControlRequest {
                instance: self.instance_id.clone(),
                reason: "instance is not live".to_string(),
            })
        };

        let message = match result {
            Ok(()) => {
                tracing::info!(instance = %self.instance_id, "stop requested");
                "Stop requested".to_string()
            }
            Err(e) => {
                tracing::warn!(instance = %self.instance_id, error = %e, "stop request failed");
                e.to_string()
            }
        };
        self.notice = Some(Notice {
            message,
            ticks_left: NOTICE_TICKS,
        });
        self.dirty = true;
    }

    pub fn select_next(&mut self) {
        self.dirty |= self.view.select_next();
    }

    pub fn select_prev(&mut self) {
        self.dirty |= self.view.select_prev();
    }

    pub fn toggle_expanded(&mut self) {
        self.dirty |= self.view.toggle_expanded();
    }

    pub fn select(&mut self, phase_id: &str) -> bool {
        let selected = self.view.select(phase_id);
        self.dirty |= selected;
        selected
    }

    pub fn instance_id(&self) -> &InstanceId {
        &self.instance_id
    }

    pub fn state(&self) -> &ScreenState {
        &self.state
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    pub fn view(&self) -> &PhaseViewState {
        &self.view
    }

    pub fn selected_phase(&self) -> Option<&Phase> {
        let snapshot = self.snapshot.as_ref()?;
        snapshot.find_phase(self.view.selected()?)
    }

    pub fn banner(&self) -> Option<&Banner> {
        self.banner.as_ref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_ref().map(|n| n.message.as_str())
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.as_ref().is_some_and(Subscription::is_active)
    }

    /// Time the screen is shown at. Stops advancing once the screen freezes.
    pub fn clock(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.frozen_at.unwrap_or(now)
    }

    /// Elapsed time for the header.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Option<Duration> {
        let snapshot = self.snapshot.as_ref()?;
        snapshot.elapsed(self.clock(now))
    }

    /// `None` while the root is selected, otherwise the selected subtree.
    pub fn output_filter(&self) -> Option<PhaseFilter> {
        if self.view.is_root_selected() {
            return None;
        }
        self.selected_phase().map(Phase::subtree_ids)
    }

    pub fn output_lines(&self) -> Vec<&OutputLine> {
        let filter = self.output_filter();
        self.output.snapshot(filter.as_ref())
    }

    pub fn output(&self) -> &OutputBuffer {
        &self.output
    }

    /// Whether anything changed since the last call.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}

impl Drop for InstanceSession {
    fn drop(&mut self) {
        self.release();
    }
}

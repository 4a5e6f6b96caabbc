use std::sync::Arc;

use chrono::{DateTime, Utc};
use runwatch_types::{Event, RunCriteria, Snapshot};

use crate::bridge::{Delivery, EventBridge};
use crate::provider::{Provider, Scope};
use crate::session::tables::RunTables;
use crate::subscription::Subscription;
use crate::Result;

/// What happens to a tracked run when it ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndedPolicy {
    MigrateToHistory,
    Remove,
}

#[derive(Debug, Clone, Copy)]
pub struct BoardOptions {
    pub history_limit: usize,
    pub bridge_capacity: usize,
    pub policy: EndedPolicy,
}

impl Default for BoardOptions {
    fn default() -> Self {
        Self {
            history_limit: 50,
            bridge_capacity: 1024,
            policy: EndedPolicy::MigrateToHistory,
        }
    }
}

/// Environment-wide run tables kept current by events.
///
/// Shared by the dashboard and the selectors. The environment subscription
/// is opened before the initial listing so no run can start unseen.
pub struct RunBoard {
    provider: Arc<dyn Provider>,
    criteria: RunCriteria,
    bridge: EventBridge,
    subscription: Option<Subscription>,
    tables: RunTables,
    policy: EndedPolicy,
    lost: Option<String>,
    lost_at: Option<DateTime<Utc>>,
}

impl RunBoard {
    pub fn open(
        provider: Arc<dyn Provider>,
        criteria: RunCriteria,
        options: BoardOptions,
    ) -> Result<Self> {
        let bridge = EventBridge::new(options.bridge_capacity);
        let subscription = Subscription::open(Arc::clone(&provider), Scope::Environment, &bridge)?;

        let mut active = Vec::new();
        let mut ended = Vec::new();
        for id in provider.get_instances(&criteria)? {
            match provider.snap(&id) {
                Ok(snapshot) if snapshot.is_ended() => ended.push(snapshot),
                Ok(snapshot) => active.push(snapshot),
                // Instance finished between listing and snapping
                Err(e) => tracing::debug!(instance = %id, error = %e, "skipping vanished instance"),
            }
        }

        let history = match options.policy {
            EndedPolicy::MigrateToHistory => {
                provider.read_history(&criteria, options.history_limit)?
            }
            EndedPolicy::Remove => Vec::new(),
        };

        let mut tables = RunTables::new(options.history_limit);
        tables.load(active, history);
        if options.policy == EndedPolicy::MigrateToHistory {
            for snapshot in ended {
                tables.migrate_to_history(snapshot);
            }
        }
        tracing::info!(
            active = tables.active().len(),
            history = tables.history().len(),
            "run board opened"
        );

        Ok(Self {
            provider,
            criteria,
            bridge,
            subscription: Some(subscription),
            tables,
            policy: options.policy,
            lost: None,
            lost_at: None,
        })
    }

    pub fn tables(&self) -> &RunTables {
        &self.tables
    }

    pub fn tables_mut(&mut self) -> &mut RunTables {
        &mut self.tables
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    pub fn criteria(&self) -> &RunCriteria {
        &self.criteria
    }

    /// Reason the environment subscription was lost, if it was.
    pub fn lost(&self) -> Option<&str> {
        self.lost.as_deref()
    }

    /// Time the rows are shown at. Stops at the moment the subscription
    /// was lost.
    pub fn clock(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.lost_at.unwrap_or(now)
    }

    /// Whether elapsed columns still advance.
    pub fn is_ticking(&self) -> bool {
        self.lost.is_none() && !self.tables.active().is_empty()
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.as_ref().is_some_and(Subscription::is_active)
    }

    /// Drain the bridge and apply everything in order. Returns whether any
    /// row changed.
    pub fn pump(&mut self) -> bool {
        let mut changed = false;
        for delivery in self.bridge.drain() {
            changed |= self.apply(delivery);
        }
        changed
    }

    pub fn apply(&mut self, delivery: Delivery) -> bool {
        match delivery {
            Delivery::Event(event) => self.apply_event(event),
            Delivery::Lost { reason } => {
                tracing::warn!(%reason, "environment subscription lost");
                self.lost = Some(reason);
                self.lost_at.get_or_insert_with(Utc::now);
                self.release();
                true
            }
        }
    }

    fn apply_event(&mut self, event: Event) -> bool {
        let ended_event = matches!(event, Event::LifecycleEnded { .. });
        let snapshot = match event {
            Event::PhaseUpdated { snapshot } | Event::LifecycleEnded { snapshot } => snapshot,
            Event::OutputAppended { .. } => return false,
        };
        if !self.criteria.matches(&snapshot) {
            return false;
        }

        if ended_event {
            self.on_ended(snapshot);
            return true;
        }
        if snapshot.is_ended() {
            return false;
        }
        self.tables.upsert_active(snapshot);
        true
    }

    fn on_ended(&mut self, snapshot: Snapshot) {
        match self.policy {
            EndedPolicy::MigrateToHistory => self.tables.migrate_to_history(snapshot),
            EndedPolicy::Remove => {
                self.tables.remove_active(&snapshot.instance_id);
            }
        }
    }

    /// Re-snap every active run and move the ones that ended meanwhile.
    pub fn resync(&mut self) {
        let ids: Vec<_> = self
            .tables
            .active()
            .iter()
            .map(|s| s.instance_id.clone())
            .collect();
        for id in ids {
            match self.provider.snap(&id) {
                Ok(snapshot) if snapshot.is_ended() => self.on_ended(snapshot),
                Ok(snapshot) => {
                    self.tables.upsert_active(snapshot);
                }
                Err(e) => tracing::debug!(instance = %id, error = %e, "resync snap failed"),
            }
        }
    }

    /// Release the environment subscription. Idempotent.
    pub fn release(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.cancel();
        }
    }
}

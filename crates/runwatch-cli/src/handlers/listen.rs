use std::collections::HashMap;
use std::thread;

use anyhow::Result;
use chrono::Utc;
use runwatch_runtime::{Delivery, EventBridge, Scope, Subscription};
use runwatch_types::{Event, InstanceId, RunCriteria, Snapshot, Stage};

use super::active_snapshots;
use crate::context::ExecutionContext;
use crate::presentation::presenters::{build_lifecycle, build_run_row};

/// Last root stage printed per instance.
#[derive(Default)]
struct StageTracker {
    stages: HashMap<InstanceId, Stage>,
}

impl StageTracker {
    /// Whether `snapshot` shows a root stage not printed yet.
    fn observe(&mut self, snapshot: &Snapshot, ended: bool) -> bool {
        let stage = if ended { Stage::Ended } else { snapshot.stage() };
        let previous = if stage == Stage::Ended {
            self.stages.remove(&snapshot.instance_id)
        } else {
            self.stages.insert(snapshot.instance_id.clone(), stage)
        };
        previous != Some(stage)
    }
}

pub fn handle(ctx: &ExecutionContext, patterns: &[String], limit: Option<usize>) -> Result<()> {
    let criteria = RunCriteria::parse_all(patterns)?;
    let provider = ctx.provider();
    let renderer = ctx.renderer();
    let config = ctx.config();

    // Subscribe before listing so no change between the two is missed
    let bridge = EventBridge::new(config.bridge_capacity);
    let mut subscription = Subscription::open(provider.clone(), Scope::Environment, &bridge)?;

    let mut tracker = StageTracker::default();
    let active = active_snapshots(provider.as_ref(), &criteria)?;
    for snapshot in &active {
        tracker.observe(snapshot, false);
    }
    let now = Utc::now();
    renderer.render_instances(active.iter().map(|s| build_run_row(s, now)).collect())?;
    renderer.render_note("Listening for events... (Ctrl+C to stop)");

    let mut printed = 0;
    while limit.is_none_or(|limit| printed < limit) {
        thread::sleep(config.drain_interval());

        for delivery in bridge.drain() {
            let (snapshot, ended) = match &delivery {
                Delivery::Event(Event::PhaseUpdated { snapshot }) => (snapshot, false),
                Delivery::Event(Event::LifecycleEnded { snapshot }) => (snapshot, true),
                Delivery::Event(Event::OutputAppended { .. }) => continue,
                Delivery::Lost { reason } => {
                    subscription.cancel();
                    anyhow::bail!("Event stream lost: {}", reason);
                }
            };
            if !criteria.matches(snapshot) || !tracker.observe(snapshot, ended) {
                continue;
            }

            renderer.render_lifecycle(build_lifecycle(snapshot))?;
            printed += 1;
            if limit.is_some_and(|limit| printed >= limit) {
                break;
            }
        }
    }

    subscription.cancel();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use runwatch_testing::SnapshotBuilder;
    use runwatch_types::TerminationStatus;

    #[test]
    fn test_tracker_reports_each_stage_once() {
        let mut tracker = StageTracker::default();
        let created = SnapshotBuilder::new("etl", "r1").created(0).build();
        let running = SnapshotBuilder::new("etl", "r1").created(0).running(1).build();
        let ended = SnapshotBuilder::new("etl", "r1")
            .created(0)
            .ended(TerminationStatus::Completed, 5)
            .build();

        assert!(tracker.observe(&created, false));
        assert!(tracker.observe(&running, false));
        assert!(!tracker.observe(&running, false));
        assert!(tracker.observe(&ended, true));
        assert!(tracker.stages.is_empty());
    }
}

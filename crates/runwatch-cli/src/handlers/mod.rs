pub mod dash;
pub mod history;
pub mod instance;
pub mod listen;
pub mod ps;
pub mod select;
pub mod stop;
pub mod tail;

use anyhow::Result;
use runwatch_runtime::Provider;
use runwatch_types::{RunCriteria, Snapshot};

/// Current snapshots of the active instances matching `criteria`, newest first.
///
/// Instances that end between listing and snapping are skipped.
pub(crate) fn active_snapshots(
    provider: &dyn Provider,
    criteria: &RunCriteria,
) -> Result<Vec<Snapshot>> {
    let mut snapshots = Vec::new();
    for id in provider.get_instances(criteria)? {
        match provider.snap(&id) {
            Ok(snapshot) if !snapshot.is_ended() => snapshots.push(snapshot),
            Ok(_) => {}
            Err(e) => tracing::debug!(instance = %id, error = %e, "skipping instance"),
        }
    }
    snapshots.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
    Ok(snapshots)
}

pub(crate) fn describe(patterns: &[String]) -> String {
    if patterns.is_empty() {
        "*".to_string()
    } else {
        patterns.join(" ")
    }
}

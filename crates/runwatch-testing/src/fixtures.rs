//! Builders for snapshots, phase trees and output lines.
//!
//! All timestamps are offsets in seconds from a fixed base so tests stay
//! deterministic.

use chrono::{DateTime, TimeZone, Utc};
use runwatch_types::{Fault, InstanceId, OutputLine, Phase, Snapshot, TerminationStatus};

const BASE_SECS: i64 = 1_700_000_000;

/// Fixed test timestamp `secs` seconds after the base.
pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(BASE_SECS + secs, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

pub fn line(ordinal: u64, phase_id: Option<&str>) -> OutputLine {
    OutputLine::new(ordinal, at(ordinal as i64), phase_id, format!("line {}", ordinal))
}

pub fn lines(ordinals: impl IntoIterator<Item = u64>, phase_id: Option<&str>) -> Vec<OutputLine> {
    ordinals.into_iter().map(|o| line(o, phase_id)).collect()
}

#[derive(Debug, Clone)]
pub struct PhaseBuilder {
    phase: Phase,
}

impl PhaseBuilder {
    pub fn new(phase_id: &str) -> Self {
        Self {
            phase: Phase::new(phase_id, at(0)),
        }
    }

    pub fn typed(mut self, phase_type: &str) -> Self {
        self.phase.phase_type = Some(phase_type.to_string());
        self
    }

    pub fn created(mut self, secs: i64) -> Self {
        self.phase.lifecycle.created_at = at(secs);
        self
    }

    pub fn running(mut self, secs: i64) -> Self {
        self.phase.lifecycle.start(at(secs));
        self
    }

    pub fn ended(mut self, status: TerminationStatus, secs: i64) -> Self {
        if self.phase.lifecycle.started_at.is_none() {
            self.phase.lifecycle.start(self.phase.lifecycle.created_at);
        }
        self.phase.lifecycle.terminate(status, at(secs));
        self
    }

    pub fn idle(mut self) -> Self {
        self.phase.idle = true;
        self
    }

    pub fn attr(mut self, key: &str, value: &str) -> Self {
        self.phase.attributes.insert(key.to_string(), value.to_string());
        self
    }

    pub fn var(mut self, key: &str, value: &str) -> Self {
        self.phase.variables.insert(key.to_string(), value.to_string());
        self
    }

    pub fn child(mut self, child: PhaseBuilder) -> Self {
        self.phase.children.push(child.build());
        self
    }

    pub fn build(self) -> Phase {
        self.phase
    }
}

/// Snapshot builder. The root phase is named `root` unless replaced.
#[derive(Debug, Clone)]
pub struct SnapshotBuilder {
    instance_id: InstanceId,
    root: PhaseBuilder,
    status: Option<String>,
    warnings: Vec<String>,
    faults: Vec<Fault>,
}

impl SnapshotBuilder {
    pub fn new(job_id: &str, run_id: &str) -> Self {
        Self {
            instance_id: InstanceId::new(job_id, run_id),
            root: PhaseBuilder::new("root"),
            status: None,
            warnings: Vec::new(),
            faults: Vec::new(),
        }
    }

    /// `fetch`, then `parse` with `transform` and `validate`, all running.
    pub fn pipeline(job_id: &str, run_id: &str) -> Self {
        Self::new(job_id, run_id).root(
            PhaseBuilder::new("root")
                .running(0)
                .child(PhaseBuilder::new("fetch").typed("io").running(1))
                .child(
                    PhaseBuilder::new("parse")
                        .running(2)
                        .child(PhaseBuilder::new("transform").running(3))
                        .child(PhaseBuilder::new("validate")),
                ),
        )
    }

    pub fn root(mut self, root: PhaseBuilder) -> Self {
        self.root = root;
        self
    }

    pub fn created(mut self, secs: i64) -> Self {
        self.root = self.root.created(secs);
        self
    }

    pub fn running(mut self, secs: i64) -> Self {
        self.root = self.root.running(secs);
        self
    }

    pub fn ended(mut self, status: TerminationStatus, secs: i64) -> Self {
        self.root = self.root.ended(status, secs);
        self
    }

    pub fn status(mut self, status: &str) -> Self {
        self.status = Some(status.to_string());
        self
    }

    pub fn warning(mut self, warning: &str) -> Self {
        self.warnings.push(warning.to_string());
        self
    }

    pub fn fault(mut self, category: &str, reason: &str) -> Self {
        self.faults.push(Fault {
            category: category.to_string(),
            reason: reason.to_string(),
            stack_trace: None,
        });
        self
    }

    pub fn build(self) -> Snapshot {
        let mut snapshot = Snapshot::new(self.instance_id, self.root.build());
        snapshot.status = self.status;
        snapshot.warnings = self.warnings;
        snapshot.faults = self.faults;
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_shape() {
        let snapshot = SnapshotBuilder::pipeline("etl", "r1").build();
        let ids: Vec<&str> = snapshot.root.walk().map(|p| p.phase_id.as_str()).collect();
        assert_eq!(ids, vec!["root", "fetch", "parse", "transform", "validate"]);
        assert!(!snapshot.is_ended());
    }

    #[test]
    fn test_ended_without_start_still_has_elapsed() {
        let snapshot = SnapshotBuilder::new("etl", "r1")
            .created(5)
            .ended(TerminationStatus::Failed, 65)
            .build();
        assert!(snapshot.is_ended());
        assert_eq!(snapshot.elapsed(at(1000)).map(|d| d.num_seconds()), Some(60));
    }
}

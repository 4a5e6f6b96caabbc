use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::instance::InstanceId;
use super::lifecycle::{Lifecycle, Outcome, Stage};
use super::phase::Phase;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fault {
    pub category: String,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
}

/// Immutable point-in-time state of an instance and its phase tree.
///
/// A new snapshot always replaces the previous one wholesale; consumers
/// never patch a displayed snapshot in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub instance_id: InstanceId,
    pub root: Phase,
    /// Free-form status line reported by the job (progress, current operation)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub faults: Vec<Fault>,
}

impl Snapshot {
    pub fn new(instance_id: InstanceId, root: Phase) -> Self {
        Self {
            instance_id,
            root,
            status: None,
            warnings: Vec::new(),
            faults: Vec::new(),
        }
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.root.lifecycle
    }

    pub fn stage(&self) -> Stage {
        self.root.lifecycle.stage
    }

    /// Terminal flag: the root phase has ended.
    pub fn is_ended(&self) -> bool {
        self.root.lifecycle.is_ended()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.root.lifecycle.created_at
    }

    pub fn elapsed(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.root.lifecycle.elapsed(now)
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.root.termination_status().map(|s| s.outcome())
    }

    pub fn find_phase(&self, phase_id: &str) -> Option<&Phase> {
        self.root.find(phase_id)
    }

    pub fn phase_parents(&self) -> HashMap<String, Option<String>> {
        self.root.parent_map()
    }

    pub fn phase_count(&self) -> usize {
        self.root.walk().count()
    }

    /// Ids of phases currently running below the root, in tree order.
    pub fn running_phases(&self) -> Vec<&str> {
        self.root
            .walk()
            .skip(1)
            .filter(|p| p.is_running())
            .map(|p| p.phase_id.as_str())
            .collect()
    }
}

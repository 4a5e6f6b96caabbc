use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

use super::lifecycle::{Lifecycle, Stage, TerminationStatus};

/// A named unit of work within an instance, nested in a tree.
///
/// `phase_id` is stable across snapshots of the same instance, which is what
/// lets the view diff trees by id instead of rebuilding them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    pub phase_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase_type: Option<String>,
    pub lifecycle: Lifecycle,
    /// Waiting on something external (approval, lock, queue)
    #[serde(default)]
    pub idle: bool,
    #[serde(default)]
    pub stop_requested: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
    #[serde(default)]
    pub children: Vec<Phase>,
}

impl Phase {
    pub fn new(phase_id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            phase_id: phase_id.into(),
            phase_type: None,
            lifecycle: Lifecycle::created(created_at),
            idle: false,
            stop_requested: false,
            stop_reason: None,
            attributes: BTreeMap::new(),
            variables: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn with_type(mut self, phase_type: impl Into<String>) -> Self {
        self.phase_type = Some(phase_type.into());
        self
    }

    pub fn with_child(mut self, child: Phase) -> Self {
        self.children.push(child);
        self
    }

    /// Depth-first search including `self`.
    pub fn find(&self, phase_id: &str) -> Option<&Phase> {
        if self.phase_id == phase_id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(phase_id))
    }

    pub fn find_mut(&mut self, phase_id: &str) -> Option<&mut Phase> {
        if self.phase_id == phase_id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(phase_id))
    }

    /// Pre-order iterator over this phase and all descendants.
    pub fn walk(&self) -> PhaseWalk<'_> {
        PhaseWalk { stack: vec![self] }
    }

    /// All phase ids in this subtree, including this phase.
    pub fn subtree_ids(&self) -> PhaseFilter {
        PhaseFilter(self.walk().map(|p| p.phase_id.clone()).collect())
    }

    /// Parent id of every phase in this subtree (`None` for `self`).
    pub fn parent_map(&self) -> HashMap<String, Option<String>> {
        let mut parents = HashMap::new();
        parents.insert(self.phase_id.clone(), None);
        collect_parents(self, &mut parents);
        parents
    }

    /// Display text for the current stage: termination status when ended,
    /// `WAITING` while idle, the stage name otherwise.
    pub fn stage_text(&self) -> &'static str {
        if let Some(termination) = &self.lifecycle.termination
            && self.lifecycle.is_ended()
        {
            return termination.status.as_str();
        }
        if self.idle {
            return "WAITING";
        }
        self.lifecycle.stage.as_str()
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle.stage == Stage::Running
    }

    pub fn termination_status(&self) -> Option<TerminationStatus> {
        self.lifecycle.termination.as_ref().map(|t| t.status)
    }

    /// Field-wise equality ignoring children.
    pub fn same_content(&self, other: &Phase) -> bool {
        self.phase_id == other.phase_id
            && self.phase_type == other.phase_type
            && self.lifecycle == other.lifecycle
            && self.idle == other.idle
            && self.stop_requested == other.stop_requested
            && self.stop_reason == other.stop_reason
            && self.attributes == other.attributes
            && self.variables == other.variables
    }
}

fn collect_parents(phase: &Phase, parents: &mut HashMap<String, Option<String>>) {
    for child in &phase.children {
        parents.insert(child.phase_id.clone(), Some(phase.phase_id.clone()));
        collect_parents(child, parents);
    }
}

pub struct PhaseWalk<'a> {
    stack: Vec<&'a Phase>,
}

impl<'a> Iterator for PhaseWalk<'a> {
    type Item = &'a Phase;

    fn next(&mut self) -> Option<Self::Item> {
        let phase = self.stack.pop()?;
        self.stack.extend(phase.children.iter().rev());
        Some(phase)
    }
}

/// Set of phase ids an output view is restricted to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhaseFilter(HashSet<String>);

impl PhaseFilter {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(ids.into_iter().map(Into::into).collect())
    }

    /// Instance-level lines (no phase) never match a phase filter.
    pub fn accepts(&self, phase_id: Option<&str>) -> bool {
        phase_id.is_some_and(|id| self.0.contains(id))
    }

    pub fn contains(&self, phase_id: &str) -> bool {
        self.0.contains(phase_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn tree() -> Phase {
        let t = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        Phase::new("root", t)
            .with_child(Phase::new("fetch", t))
            .with_child(
                Phase::new("parse", t)
                    .with_child(Phase::new("transform", t))
                    .with_child(Phase::new("validate", t)),
            )
    }

    #[test]
    fn test_walk_is_preorder() {
        let root = tree();
        let ids: Vec<&str> = root.walk().map(|p| p.phase_id.as_str()).collect();
        assert_eq!(ids, vec!["root", "fetch", "parse", "transform", "validate"]);
    }

    #[test]
    fn test_find_nested() {
        let root = tree();
        assert_eq!(root.find("validate").map(|p| p.phase_id.as_str()), Some("validate"));
        assert!(root.find("upload").is_none());
    }

    #[test]
    fn test_subtree_filter() {
        let root = tree();
        let filter = root.find("parse").unwrap().subtree_ids();
        assert_eq!(filter.len(), 3);
        assert!(filter.accepts(Some("transform")));
        assert!(!filter.accepts(Some("fetch")));
        assert!(!filter.accepts(None));
    }

    #[test]
    fn test_parent_map() {
        let parents = tree().parent_map();
        assert_eq!(parents["root"], None);
        assert_eq!(parents["transform"].as_deref(), Some("parse"));
        assert_eq!(parents["fetch"].as_deref(), Some("root"));
    }

    #[test]
    fn test_stage_text() {
        let t = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let mut phase = Phase::new("p", t);
        assert_eq!(phase.stage_text(), "CREATED");
        phase.idle = true;
        assert_eq!(phase.stage_text(), "WAITING");
        phase.lifecycle.terminate(TerminationStatus::Failed, t);
        assert_eq!(phase.stage_text(), "FAILED");
    }
}

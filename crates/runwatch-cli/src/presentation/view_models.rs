use chrono::{DateTime, Utc};
use runwatch_types::{Outcome, Stage};
use serde::Serialize;

use super::theme::Tone;

/// One row of a run table (`ps`, dashboard, selector).
#[derive(Debug, Clone, Serialize)]
pub struct RunRowViewModel {
    pub instance_id: String,
    pub job_id: String,
    pub run_id: String,
    pub created_at: DateTime<Utc>,
    pub elapsed_secs: Option<i64>,
    pub stage: Stage,
    /// Display text: termination status, WAITING or stage name
    pub stage_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    pub phase_count: usize,
    pub running_phases: Vec<String>,
    pub warnings: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip)]
    pub tone: Tone,
}

/// A root stage change observed by `listen`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LifecycleViewModel {
    pub instance_id: String,
    pub stage: Stage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub termination: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(skip)]
    pub tone: Tone,
}

/// One output line printed by `tail`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputLineViewModel {
    pub instance_id: String,
    pub ordinal: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub text: String,
}

/// Line of JSON output of the non-interactive commands.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamLineViewModel {
    Instance(RunRowViewModel),
    /// Ended run listed by `history`
    Run(RunRowViewModel),
    Lifecycle(LifecycleViewModel),
    Output(OutputLineViewModel),
}

#[derive(Debug, Clone, Serialize)]
pub struct StopResultViewModel {
    pub instance_id: String,
    pub requested: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BannerViewModel {
    pub message: String,
    pub retryable: bool,
}

/// Header of the instance screen.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderViewModel {
    pub job_id: String,
    pub run_id: String,
    pub stage_text: String,
    pub tone: Tone,
    pub elapsed_secs: Option<i64>,
    pub status: Option<String>,
    pub warnings: Vec<String>,
    pub historical: bool,
    pub ended: bool,
    /// Reason delivery stopped, when disconnected
    pub disconnected: Option<String>,
    pub banner: Option<BannerViewModel>,
    pub notice: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhaseRowViewModel {
    pub phase_id: String,
    pub depth: usize,
    pub has_children: bool,
    pub expanded: bool,
    pub stage_text: String,
    pub tone: Tone,
    pub selected: bool,
    pub changed: bool,
}

/// Everything shown about the selected phase.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseDetailViewModel {
    pub phase_id: String,
    pub phase_type: Option<String>,
    pub stage_text: String,
    pub tone: Tone,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub terminated_at: Option<DateTime<Utc>>,
    pub elapsed_secs: Option<i64>,
    pub stop_reason: Option<String>,
    pub message: Option<String>,
    pub attributes: Vec<(String, String)>,
    pub variables: Vec<(String, String)>,
    /// Instance-level faults; only listed for the root phase
    pub faults: Vec<String>,
    pub child_count: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SummaryViewModel {
    pub active: usize,
    pub completed: usize,
    pub failed: usize,
}

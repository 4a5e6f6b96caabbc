use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Coarse execution stage of an instance or phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Created,
    Running,
    Ended,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Created => "CREATED",
            Stage::Running => "RUNNING",
            Stage::Ended => "ENDED",
        }
    }
}

/// How an ended phase finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TerminationStatus {
    Completed,
    Skipped,
    Stopped,
    Interrupted,
    Cancelled,
    Timeout,
    Failed,
    Error,
}

/// Coarse classification of a termination status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Rejected,
    Aborted,
    Fault,
}

impl TerminationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminationStatus::Completed => "COMPLETED",
            TerminationStatus::Skipped => "SKIPPED",
            TerminationStatus::Stopped => "STOPPED",
            TerminationStatus::Interrupted => "INTERRUPTED",
            TerminationStatus::Cancelled => "CANCELLED",
            TerminationStatus::Timeout => "TIMEOUT",
            TerminationStatus::Failed => "FAILED",
            TerminationStatus::Error => "ERROR",
        }
    }

    pub fn outcome(&self) -> Outcome {
        match self {
            TerminationStatus::Completed => Outcome::Success,
            TerminationStatus::Skipped => Outcome::Rejected,
            TerminationStatus::Stopped
            | TerminationStatus::Interrupted
            | TerminationStatus::Cancelled => Outcome::Aborted,
            TerminationStatus::Timeout | TerminationStatus::Failed | TerminationStatus::Error => {
                Outcome::Fault
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Termination {
    pub status: TerminationStatus,
    pub terminated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
}

/// Timestamps and stage of one phase.
///
/// `started_at` stays `None` for phases that never left `Created`.
/// An ended lifecycle always carries a termination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifecycle {
    pub stage: Stage,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub termination: Option<Termination>,
}

impl Lifecycle {
    pub fn created(at: DateTime<Utc>) -> Self {
        Self {
            stage: Stage::Created,
            created_at: at,
            started_at: None,
            termination: None,
        }
    }

    pub fn is_ended(&self) -> bool {
        self.stage == Stage::Ended
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.termination.as_ref().map(|t| t.terminated_at)
    }

    /// Run time so far. Frozen at termination once ended, `None` before start.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Option<Duration> {
        let started = self.started_at?;
        let until = self.ended_at().unwrap_or(now);
        Some((until - started).max(Duration::zero()))
    }

    pub fn start(&mut self, at: DateTime<Utc>) {
        self.stage = Stage::Running;
        self.started_at.get_or_insert(at);
    }

    pub fn terminate(&mut self, status: TerminationStatus, at: DateTime<Utc>) {
        self.stage = Stage::Ended;
        self.termination = Some(Termination {
            status,
            terminated_at: at,
            message: None,
            stack_trace: None,
        });
    }
}

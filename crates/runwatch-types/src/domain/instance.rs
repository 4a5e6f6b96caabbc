use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of one job execution.
///
/// Displayed and keyed as `job_id@run_id`, which is also the row key used
/// by the dashboard tables.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId {
    pub job_id: String,
    pub run_id: String,
}

impl InstanceId {
    pub fn new(job_id: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            run_id: run_id.into(),
        }
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.job_id, self.run_id)
    }
}

/// Whether an instance is still executing or only available as a frozen run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceMode {
    Live,
    Historical,
}

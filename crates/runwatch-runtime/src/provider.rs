use std::fmt;

use runwatch_types::{InstanceId, OutputLine, PhaseFilter, RunCriteria, Snapshot};

use crate::Result;
use crate::bridge::Publisher;

/// What a subscription listens to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Events of one live instance
    Instance(InstanceId),
    /// Events of every instance in the environment
    Environment,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Instance(id) => write!(f, "{}", id),
            Scope::Environment => write!(f, "environment"),
        }
    }
}

/// Provider-side handle of one registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// What a screen opens: a live instance or a frozen run.
#[derive(Debug, Clone, PartialEq)]
pub enum InstanceTarget {
    Live(InstanceId),
    Historical(Snapshot),
}

impl InstanceTarget {
    pub fn instance_id(&self) -> &InstanceId {
        match self {
            InstanceTarget::Live(id) => id,
            InstanceTarget::Historical(snapshot) => &snapshot.instance_id,
        }
    }
}

/// Access to the job engine and run history.
///
/// Implementations push events from their own threads through the
/// [`Publisher`] handed to [`Provider::subscribe`]. They must stop using a
/// publisher once [`Provider::unsubscribe`] returns; the bridge discards
/// anything that slips through regardless.
pub trait Provider: Send + Sync {
    /// Live instances matching the criteria
    fn get_instances(&self, criteria: &RunCriteria) -> Result<Vec<InstanceId>>;

    /// Current state of a live instance
    fn snap(&self, instance_id: &InstanceId) -> Result<Snapshot>;

    /// One-shot fetch of an ended run
    fn get_run(&self, instance_id: &InstanceId) -> Result<Snapshot>;

    /// Ended runs, most recently created first
    fn read_history(&self, criteria: &RunCriteria, limit: usize) -> Result<Vec<Snapshot>>;

    fn subscribe(&self, scope: &Scope, publisher: Publisher) -> Result<ListenerId>;

    fn unsubscribe(&self, listener: ListenerId);

    /// Best-effort stop request; the outcome arrives as a lifecycle event.
    fn stop(&self, instance_id: &InstanceId) -> Result<()>;

    /// Output accumulated so far, in ordinal order.
    fn fetch_output_tail(
        &self,
        instance_id: &InstanceId,
        filter: Option<&PhaseFilter>,
    ) -> Result<Vec<OutputLine>>;
}

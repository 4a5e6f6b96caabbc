use serde::{Deserialize, Serialize};

use super::output::OutputLine;
use crate::domain::{InstanceId, Snapshot};

/// Asynchronous notification pushed by a background producer.
///
/// Events are self-contained values; they never reference shared mutable state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Some phase changed; carries the full new snapshot
    PhaseUpdated { snapshot: Snapshot },
    /// The instance reached its terminal state
    LifecycleEnded { snapshot: Snapshot },
    OutputAppended {
        instance_id: InstanceId,
        line: OutputLine,
    },
}

impl Event {
    pub fn instance_id(&self) -> &InstanceId {
        match self {
            Event::PhaseUpdated { snapshot } | Event::LifecycleEnded { snapshot } => {
                &snapshot.instance_id
            }
            Event::OutputAppended { instance_id, .. } => instance_id,
        }
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        match self {
            Event::PhaseUpdated { snapshot } | Event::LifecycleEnded { snapshot } => Some(snapshot),
            Event::OutputAppended { .. } => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Event::PhaseUpdated { .. } => "phase_updated",
            Event::LifecycleEnded { .. } => "lifecycle_ended",
            Event::OutputAppended { .. } => "output_appended",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_output_event_routes_by_instance() {
        let t = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let event = Event::OutputAppended {
            instance_id: InstanceId::new("job", "run"),
            line: OutputLine::new(1, t, None, "hello"),
        };

        assert_eq!(event.instance_id().to_string(), "job@run");
        assert!(event.snapshot().is_none());
        assert_eq!(event.kind(), "output_appended");
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let t = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let event = Event::OutputAppended {
            instance_id: InstanceId::new("job", "run"),
            line: OutputLine::new(7, t, Some("fetch"), "x"),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "output_appended");
        assert_eq!(json["line"]["ordinal"], 7);
    }
}

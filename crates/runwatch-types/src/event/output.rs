use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// One line of job output.
///
/// `ordinal` is producer-assigned, strictly increasing per instance, and the
/// only key used for ordering and deduplication. `timestamp` is informational.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLine {
    pub ordinal: u64,
    pub timestamp: DateTime<Utc>,
    /// `None` for instance-level output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase_id: Option<String>,
    pub text: String,
}

impl OutputLine {
    pub fn new(
        ordinal: u64,
        timestamp: DateTime<Utc>,
        phase_id: Option<&str>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            ordinal,
            timestamp,
            phase_id: phase_id.map(str::to_string),
            text: text.into(),
        }
    }
}

/// Output line as received from a producer, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawOutputLine {
    #[serde(default)]
    pub ordinal: Option<u64>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub phase_id: Option<String>,
    pub text: String,
}

impl TryFrom<RawOutputLine> for OutputLine {
    type Error = Error;

    fn try_from(raw: RawOutputLine) -> Result<Self, Self::Error> {
        let Some(ordinal) = raw.ordinal else {
            return Err(Error::MissingOrdinal {
                preview: raw.text.chars().take(40).collect(),
            });
        };
        Ok(OutputLine {
            ordinal,
            timestamp: raw.timestamp,
            phase_id: raw.phase_id,
            text: raw.text,
        })
    }
}

impl From<OutputLine> for RawOutputLine {
    fn from(line: OutputLine) -> Self {
        Self {
            ordinal: Some(line.ordinal),
            timestamp: line.timestamp,
            phase_id: line.phase_id,
            text: line.text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_line_without_ordinal_is_rejected() {
        let raw = RawOutputLine {
            ordinal: None,
            timestamp: Utc::now(),
            phase_id: Some("fetch".to_string()),
            text: "downloading".to_string(),
        };

        let err = OutputLine::try_from(raw).unwrap_err();
        assert!(matches!(err, Error::MissingOrdinal { .. }));
    }

    #[test]
    fn test_raw_line_deserializes_without_ordinal_field() {
        let raw: RawOutputLine =
            serde_json::from_str(r#"{"timestamp":"2025-01-01T00:00:00Z","text":"hi"}"#).unwrap();
        assert_eq!(raw.ordinal, None);
        assert_eq!(raw.phase_id, None);
    }
}

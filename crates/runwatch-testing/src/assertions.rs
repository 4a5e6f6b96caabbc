//! Assertions over drained deliveries and CLI JSON output.

use anyhow::{Context, Result};
use runwatch_runtime::Delivery;
use runwatch_types::{Event, InstanceId};
use serde_json::Value;

/// Ordinals of output events for one instance, in delivery order.
pub fn output_ordinals(deliveries: &[Delivery], instance_id: &InstanceId) -> Vec<u64> {
    deliveries
        .iter()
        .filter_map(|d| match d {
            Delivery::Event(Event::OutputAppended { instance_id: id, line }) if id == instance_id => {
                Some(line.ordinal)
            }
            _ => None,
        })
        .collect()
}

/// Assert that the ordinals are strictly increasing.
pub fn assert_strictly_increasing(ordinals: &[u64]) -> Result<()> {
    if let Some(pair) = ordinals.windows(2).find(|w| w[0] >= w[1]) {
        anyhow::bail!("Ordinals out of order: {} before {}", pair[0], pair[1]);
    }
    Ok(())
}

/// Assert that every JSON line has the expected `type` tag.
pub fn assert_event_types(lines: &[Value], allowed: &[&str]) -> Result<()> {
    for (i, line) in lines.iter().enumerate() {
        let kind = line["type"]
            .as_str()
            .with_context(|| format!("Line {} missing 'type'", i))?;
        if !allowed.contains(&kind) {
            anyhow::bail!("Line {} has unexpected type {}", i, kind);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_assert_strictly_increasing() {
        assert!(assert_strictly_increasing(&[1, 2, 5]).is_ok());
        assert!(assert_strictly_increasing(&[1, 3, 3]).is_err());
        assert!(assert_strictly_increasing(&[]).is_ok());
    }

    #[test]
    fn test_assert_event_types() {
        let lines = vec![json!({"type": "instance"}), json!({"type": "lifecycle_ended"})];
        assert!(assert_event_types(&lines, &["instance", "lifecycle_ended"]).is_ok());
        assert!(assert_event_types(&lines, &["instance"]).is_err());
    }
}

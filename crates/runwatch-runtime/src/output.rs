use runwatch_types::{OutputLine, PhaseFilter, RawOutputLine};

use crate::Result;

/// Ordered, deduplicated accumulator of output lines for one instance.
///
/// Lines are kept sorted by ordinal. Inserting an ordinal that is already
/// present is a no-op, so overlapping deliveries from the live stream and
/// the initial tail fetch collapse to one copy each regardless of arrival order.
#[derive(Debug, Default)]
pub struct OutputBuffer {
    lines: Vec<OutputLine>,
    rejected: usize,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a line at its ordinal position. Returns `false` for duplicates.
    pub fn insert(&mut self, line: OutputLine) -> bool {
        // Common case: live lines arrive in order
        if self.lines.last().is_none_or(|last| last.ordinal < line.ordinal) {
            self.lines.push(line);
            return true;
        }

        match self
            .lines
            .binary_search_by_key(&line.ordinal, |l| l.ordinal)
        {
            Ok(_) => false,
            Err(pos) => {
                self.lines.insert(pos, line);
                true
            }
        }
    }

    /// Validate and insert a producer line. Lines without an ordinal are
    /// counted and rejected.
    pub fn try_insert(&mut self, raw: RawOutputLine) -> Result<bool> {
        match OutputLine::try_from(raw) {
            Ok(line) => Ok(self.insert(line)),
            Err(e) => {
                self.rejected += 1;
                tracing::warn!(error = %e, "rejected output line");
                Err(e.into())
            }
        }
    }

    /// Insert many lines; returns how many were new.
    pub fn extend<I>(&mut self, lines: I) -> usize
    where
        I: IntoIterator<Item = OutputLine>,
    {
        lines
            .into_iter()
            .map(|l| self.insert(l))
            .filter(|&new| new)
            .count()
    }

    /// All accumulated lines in ascending ordinal order, optionally restricted
    /// to a phase subtree.
    pub fn snapshot(&self, filter: Option<&PhaseFilter>) -> Vec<&OutputLine> {
        match filter {
            None => self.lines.iter().collect(),
            Some(filter) => self
                .lines
                .iter()
                .filter(|l| filter.accepts(l.phase_id.as_deref()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn last_ordinal(&self) -> Option<u64> {
        self.lines.last().map(|l| l.ordinal)
    }

    pub fn rejected(&self) -> usize {
        self.rejected
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.rejected = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn line(ordinal: u64, phase: Option<&str>) -> OutputLine {
        let t = Utc.timestamp_opt(1_700_000_000 + ordinal as i64, 0).unwrap();
        OutputLine::new(ordinal, t, phase, format!("line {}", ordinal))
    }

    fn ordinals(buffer: &OutputBuffer) -> Vec<u64> {
        buffer.snapshot(None).iter().map(|l| l.ordinal).collect()
    }

    #[test]
    fn test_duplicate_ordinals_collapse() {
        let mut buffer = OutputBuffer::new();
        for ordinal in [3, 1, 2, 2, 1] {
            buffer.insert(line(ordinal, None));
        }
        assert_eq!(ordinals(&buffer), vec![1, 2, 3]);
    }

    #[test]
    fn test_inserting_same_line_n_times_equals_once() {
        let mut once = OutputBuffer::new();
        once.insert(line(4, None));

        let mut many = OutputBuffer::new();
        assert!(many.insert(line(4, None)));
        for _ in 0..5 {
            assert!(!many.insert(line(4, None)));
        }

        assert_eq!(once.snapshot(None), many.snapshot(None));
    }

    #[test]
    fn test_late_tail_fetch_overlapping_live_stream() {
        let mut buffer = OutputBuffer::new();
        for ordinal in [5, 6, 7] {
            buffer.insert(line(ordinal, None));
        }
        let inserted = buffer.extend((1..=6).map(|o| line(o, None)));

        assert_eq!(inserted, 4);
        assert_eq!(ordinals(&buffer), vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_phase_filter_excludes_instance_level_lines() {
        let mut buffer = OutputBuffer::new();
        buffer.insert(line(1, None));
        buffer.insert(line(2, Some("parse")));
        buffer.insert(line(3, Some("transform")));
        buffer.insert(line(4, Some("upload")));

        let filter = PhaseFilter::new(["parse", "transform"]);
        let filtered: Vec<u64> = buffer
            .snapshot(Some(&filter))
            .iter()
            .map(|l| l.ordinal)
            .collect();
        assert_eq!(filtered, vec![2, 3]);
    }

    #[test]
    fn test_missing_ordinal_is_rejected_and_counted() {
        let mut buffer = OutputBuffer::new();
        let raw = RawOutputLine {
            ordinal: None,
            timestamp: Utc::now(),
            phase_id: None,
            text: "no ordinal".to_string(),
        };

        assert!(buffer.try_insert(raw).is_err());
        assert!(buffer.is_empty());
        assert_eq!(buffer.rejected(), 1);
    }
}

use regex::Regex;

use crate::domain::{InstanceId, Snapshot};
use crate::error::{Error, Result};

/// Matches a single id component: wildcard patterns are anchored,
/// plain text matches as a substring.
#[derive(Debug, Clone)]
enum IdMatcher {
    Partial(String),
    Wildcard(Regex),
}

impl IdMatcher {
    fn parse(pattern: &str) -> Result<Self> {
        if !pattern.contains(['*', '?']) {
            return Ok(IdMatcher::Partial(pattern.to_string()));
        }

        let mut expr = String::from("^");
        for ch in pattern.chars() {
            match ch {
                '*' => expr.push_str(".*"),
                '?' => expr.push('.'),
                other => expr.push_str(&regex::escape(&other.to_string())),
            }
        }
        expr.push('$');

        Regex::new(&expr)
            .map(IdMatcher::Wildcard)
            .map_err(|e| Error::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })
    }

    fn matches(&self, value: &str) -> bool {
        match self {
            IdMatcher::Partial(text) => value.contains(text.as_str()),
            IdMatcher::Wildcard(re) => re.is_match(value),
        }
    }
}

#[derive(Debug, Clone)]
enum IdPattern {
    /// `job@run`: both components must match
    Qualified { job: IdMatcher, run: IdMatcher },
    /// bare text: either component may match
    Either(IdMatcher),
}

impl IdPattern {
    fn matches(&self, id: &InstanceId) -> bool {
        match self {
            IdPattern::Qualified { job, run } => job.matches(&id.job_id) && run.matches(&id.run_id),
            IdPattern::Either(m) => m.matches(&id.job_id) || m.matches(&id.run_id),
        }
    }
}

/// Instance filter built from `job_id`, `run_id` or `job_id@run_id` patterns.
///
/// An empty criteria matches every instance. Several patterns match when any
/// one of them does.
#[derive(Debug, Clone, Default)]
pub struct RunCriteria {
    patterns: Vec<IdPattern>,
}

impl RunCriteria {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn parse(pattern: &str) -> Result<Self> {
        Self::parse_all([pattern])
    }

    pub fn parse_all<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parsed = Vec::new();
        for pattern in patterns {
            let pattern = pattern.as_ref().trim();
            if pattern.is_empty() {
                continue;
            }
            let id_pattern = match pattern.split_once('@') {
                Some((job, run)) => IdPattern::Qualified {
                    job: IdMatcher::parse(job)?,
                    run: IdMatcher::parse(run)?,
                },
                None => IdPattern::Either(IdMatcher::parse(pattern)?),
            };
            parsed.push(id_pattern);
        }
        Ok(Self { patterns: parsed })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn matches_id(&self, id: &InstanceId) -> bool {
        self.patterns.is_empty() || self.patterns.iter().any(|p| p.matches(id))
    }

    pub fn matches(&self, snapshot: &Snapshot) -> bool {
        self.matches_id(&snapshot.instance_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(job: &str, run: &str) -> InstanceId {
        InstanceId::new(job, run)
    }

    #[test]
    fn test_empty_matches_everything() {
        let criteria = RunCriteria::all();
        assert!(criteria.matches_id(&id("anything", "1")));
        assert!(RunCriteria::parse("  ").unwrap().is_empty());
    }

    #[test]
    fn test_bare_pattern_is_partial_on_either_component() {
        let criteria = RunCriteria::parse("back").unwrap();
        assert!(criteria.matches_id(&id("backup", "1")));
        assert!(criteria.matches_id(&id("sync", "rollback-3")));
        assert!(!criteria.matches_id(&id("sync", "1")));
    }

    #[test]
    fn test_wildcard_is_anchored() {
        let criteria = RunCriteria::parse("backup*").unwrap();
        assert!(criteria.matches_id(&id("backup-db", "1")));
        assert!(!criteria.matches_id(&id("db-backup", "1")));
    }

    #[test]
    fn test_qualified_pattern_requires_both() {
        let criteria = RunCriteria::parse("etl@batch-4?").unwrap();
        assert!(criteria.matches_id(&id("etl", "batch-42")));
        assert!(!criteria.matches_id(&id("etl", "batch-5")));
        assert!(!criteria.matches_id(&id("load", "batch-42")));
    }

    #[test]
    fn test_any_of_several_patterns() {
        let criteria = RunCriteria::parse_all(["alpha", "beta@*"]).unwrap();
        assert!(criteria.matches_id(&id("alpha", "x")));
        assert!(criteria.matches_id(&id("beta", "y")));
        assert!(!criteria.matches_id(&id("gamma", "z")));
    }
}

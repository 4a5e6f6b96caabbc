//! Shape of a simulated run: the phase tree and the order phases execute in.

use chrono::{DateTime, Utc};
use runwatch_types::Phase;

pub const ROOT: &str = "run";

/// Job names handed out to simulated drivers, in order.
pub const JOBS: &[&str] = &["backup", "etl", "report", "reindex", "sync", "archive"];

/// Name of the n-th simulated job. Wraps with a numeric suffix.
pub fn job_name(index: usize) -> String {
    let base = JOBS[index % JOBS.len()];
    match index / JOBS.len() {
        0 => base.to_string(),
        round => format!("{}-{}", base, round + 1),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Start(&'static str),
    Emit(&'static str, &'static str),
    Finish(&'static str),
}

/// Fresh phase tree with every phase in CREATED.
pub fn phase_tree(job: &str, at: DateTime<Utc>) -> Phase {
    let mut root = Phase::new(ROOT, at).with_type("job");
    root.attributes.insert("job".to_string(), job.to_string());

    let mut fetch = Phase::new("fetch", at).with_type("io");
    fetch
        .attributes
        .insert("source".to_string(), format!("s3://{}/incoming", job));

    let parse = Phase::new("parse", at)
        .with_type("group")
        .with_child(Phase::new("transform", at).with_type("cpu"))
        .with_child(Phase::new("validate", at).with_type("cpu"));

    let mut upload = Phase::new("upload", at).with_type("io");
    upload.idle = true;

    root.with_child(fetch).with_child(parse).with_child(upload)
}

/// Leaf phases, the only ones a simulated failure is injected into.
pub const LEAVES: &[&str] = &["fetch", "transform", "validate", "upload"];

pub const SCRIPT: &[Step] = &[
    Step::Start("fetch"),
    Step::Emit("fetch", "connecting to source"),
    Step::Emit("fetch", "downloading batch 1/2"),
    Step::Emit("fetch", "downloading batch 2/2"),
    Step::Finish("fetch"),
    Step::Start("parse"),
    Step::Start("transform"),
    Step::Emit("transform", "normalizing records"),
    Step::Emit("transform", "deduplicating keys"),
    Step::Finish("transform"),
    Step::Start("validate"),
    Step::Emit("validate", "checking schema"),
    Step::Emit("validate", "all constraints satisfied"),
    Step::Finish("validate"),
    Step::Finish("parse"),
    Step::Start("upload"),
    Step::Emit("upload", "writing output"),
    Step::Emit("upload", "upload complete"),
    Step::Finish("upload"),
];

use chrono::{DateTime, Duration, Utc};
use runwatch_types::{Fault, InstanceId, OutputLine, Phase, Snapshot, TerminationStatus};

use super::plan::{self, SCRIPT, Step};

/// Decided up front so a run is reproducible from its inputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Fate {
    /// Leaf phase whose completion fails the run
    pub fail_at: Option<&'static str>,
    /// Adds a warning while fetching
    pub slow: bool,
}

/// One simulated run advancing through [`SCRIPT`].
#[derive(Debug, Clone)]
pub struct SimRun {
    snapshot: Snapshot,
    fate: Fate,
    next_ordinal: u64,
    cursor: usize,
    stop_requested: bool,
}

impl SimRun {
    pub fn new(instance_id: InstanceId, created_at: DateTime<Utc>, fate: Fate) -> Self {
        let root = plan::phase_tree(&instance_id.job_id, created_at);
        Self {
            snapshot: Snapshot::new(instance_id, root),
            fate,
            next_ordinal: 1,
            cursor: 0,
            stop_requested: false,
        }
    }

    /// Run the whole script instantly, one `step` apart, and return the
    /// ended snapshot with its output.
    pub fn replay(
        instance_id: InstanceId,
        created_at: DateTime<Utc>,
        step: Duration,
        fate: Fate,
    ) -> (Snapshot, Vec<OutputLine>) {
        let mut run = Self::new(instance_id, created_at, fate);
        let mut at = created_at + step;
        let mut output = run.begin(at);
        while !run.is_ended() {
            at += step;
            output.extend(run.advance(at));
        }
        (run.snapshot, output)
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn is_ended(&self) -> bool {
        self.snapshot.is_ended()
    }

    /// Mark the run for stopping at its next step. Returns `false` when it
    /// already ended.
    pub fn request_stop(&mut self) -> bool {
        if self.is_ended() {
            return false;
        }
        self.stop_requested = true;
        true
    }

    pub fn begin(&mut self, at: DateTime<Utc>) -> Vec<OutputLine> {
        self.snapshot.root.lifecycle.start(at);
        self.snapshot.status = Some("starting".to_string());
        vec![self.line(None, "run started", at)]
    }

    /// Execute the next step of the script.
    pub fn advance(&mut self, at: DateTime<Utc>) -> Vec<OutputLine> {
        if self.is_ended() {
            return Vec::new();
        }

        if self.stop_requested {
            self.snapshot.root.stop_requested = true;
            self.snapshot.root.stop_reason = Some("stop requested".to_string());
            self.finish_run(TerminationStatus::Stopped, at);
            return vec![self.line(None, "stopped on request", at)];
        }

        let Some(step) = SCRIPT.get(self.cursor).copied() else {
            self.finish_run(TerminationStatus::Completed, at);
            return vec![self.line(None, "run completed", at)];
        };
        self.cursor += 1;

        match step {
            Step::Start(phase_id) => {
                if let Some(phase) = self.snapshot.root.find_mut(phase_id) {
                    phase.idle = false;
                    phase.lifecycle.start(at);
                }
                self.snapshot.status = Some(format!("{} started", phase_id));
                Vec::new()
            }
            Step::Emit(phase_id, text) => {
                if self.fate.slow && phase_id == "fetch" && self.snapshot.warnings.is_empty() {
                    self.snapshot.warnings.push("source is responding slowly".to_string());
                }
                self.snapshot.status = Some(text.to_string());
                vec![self.line(Some(phase_id), text, at)]
            }
            Step::Finish(phase_id) if self.fate.fail_at == Some(phase_id) => {
                let reason = format!("{} exited with code 2", phase_id);
                if let Some(phase) = self.snapshot.root.find_mut(phase_id) {
                    phase.lifecycle.terminate(TerminationStatus::Failed, at);
                    if let Some(termination) = phase.lifecycle.termination.as_mut() {
                        termination.message = Some(reason.clone());
                    }
                }
                self.snapshot.faults.push(Fault {
                    category: "exit_code".to_string(),
                    reason: reason.clone(),
                    stack_trace: None,
                });
                self.finish_run(TerminationStatus::Failed, at);
                vec![self.line(Some(phase_id), &reason, at)]
            }
            Step::Finish(phase_id) => {
                if let Some(phase) = self.snapshot.root.find_mut(phase_id) {
                    phase.lifecycle.terminate(TerminationStatus::Completed, at);
                }
                Vec::new()
            }
        }
    }

    fn line(&mut self, phase_id: Option<&str>, text: &str, at: DateTime<Utc>) -> OutputLine {
        let line = OutputLine::new(self.next_ordinal, at, phase_id, text);
        self.next_ordinal += 1;
        line
    }

    fn finish_run(&mut self, status: TerminationStatus, at: DateTime<Utc>) {
        close_open_phases(&mut self.snapshot.root, status, at);
        self.snapshot.status = Some(status.as_str().to_lowercase());
    }
}

/// End every phase still open: started ones with `status`, the rest as skipped.
fn close_open_phases(phase: &mut Phase, status: TerminationStatus, at: DateTime<Utc>) {
    for child in &mut phase.children {
        close_open_phases(child, status, at);
    }
    if phase.lifecycle.is_ended() {
        return;
    }
    phase.idle = false;
    if phase.lifecycle.started_at.is_some() {
        phase.lifecycle.terminate(status, at);
    } else {
        phase.lifecycle.terminate(TerminationStatus::Skipped, at);
    }
}

//! Session state to view models.

use chrono::{DateTime, Utc};
use runwatch_runtime::{DashboardSummary, InstanceSession, PhaseViewState, ScreenState};
use runwatch_types::{InstanceId, OutputLine, Phase, Snapshot, Stage};

use super::theme::Tone;
use super::view_models::{
    BannerViewModel, HeaderViewModel, LifecycleViewModel, OutputLineViewModel,
    PhaseDetailViewModel, PhaseRowViewModel, RunRowViewModel, SummaryViewModel,
};

fn phase_tone(phase: &Phase) -> Tone {
    Tone::of(
        phase.lifecycle.stage,
        phase.idle,
        phase.termination_status().map(|s| s.outcome()),
    )
}

pub fn build_run_row(snapshot: &Snapshot, now: DateTime<Utc>) -> RunRowViewModel {
    RunRowViewModel {
        instance_id: snapshot.instance_id.to_string(),
        job_id: snapshot.instance_id.job_id.clone(),
        run_id: snapshot.instance_id.run_id.clone(),
        created_at: snapshot.created_at(),
        elapsed_secs: snapshot.elapsed(now).map(|d| d.num_seconds()),
        stage: snapshot.stage(),
        stage_text: snapshot.root.stage_text().to_string(),
        outcome: snapshot.outcome(),
        phase_count: snapshot.phase_count(),
        running_phases: snapshot
            .running_phases()
            .into_iter()
            .map(str::to_string)
            .collect(),
        warnings: snapshot.warnings.len(),
        status: snapshot.status.clone(),
        tone: phase_tone(&snapshot.root),
    }
}

pub fn build_header(session: &InstanceSession, now: DateTime<Utc>) -> HeaderViewModel {
    let id = session.instance_id();
    let snapshot = session.snapshot();
    let stage_text = snapshot
        .map(|s| s.root.stage_text().to_string())
        .unwrap_or_else(|| "ATTACHING".to_string());

    HeaderViewModel {
        job_id: id.job_id.clone(),
        run_id: id.run_id.clone(),
        stage_text,
        tone: snapshot.map_or(Tone::Subtle, |s| phase_tone(&s.root)),
        elapsed_secs: session.elapsed(now).map(|d| d.num_seconds()),
        status: snapshot.and_then(|s| s.status.clone()),
        warnings: snapshot.map(|s| s.warnings.clone()).unwrap_or_default(),
        historical: *session.state() == ScreenState::Historical,
        ended: snapshot.is_some_and(Snapshot::is_ended),
        disconnected: match session.state() {
            ScreenState::Disconnected { reason } => Some(reason.clone()),
            _ => None,
        },
        banner: session.banner().map(|b| BannerViewModel {
            message: b.message.clone(),
            retryable: b.retryable,
        }),
        notice: session.notice().map(str::to_string),
    }
}

pub fn build_phase_rows(view: &PhaseViewState, snapshot: &Snapshot) -> Vec<PhaseRowViewModel> {
    let selected = view.selected();
    view.rows()
        .iter()
        .map(|row| PhaseRowViewModel {
            phase_id: row.phase_id.clone(),
            depth: row.depth,
            has_children: row.has_children,
            expanded: row.expanded,
            stage_text: row.stage_text.to_string(),
            tone: snapshot
                .find_phase(&row.phase_id)
                .map_or(Tone::Neutral, phase_tone),
            selected: selected == Some(row.phase_id.as_str()),
            changed: row.changed,
        })
        .collect()
}

pub fn build_phase_detail(
    phase: &Phase,
    snapshot: &Snapshot,
    now: DateTime<Utc>,
) -> PhaseDetailViewModel {
    let termination = phase.lifecycle.termination.as_ref();
    let is_root = phase.phase_id == snapshot.root.phase_id;

    PhaseDetailViewModel {
        phase_id: phase.phase_id.clone(),
        phase_type: phase.phase_type.clone(),
        stage_text: phase.stage_text().to_string(),
        tone: phase_tone(phase),
        created_at: phase.lifecycle.created_at,
        started_at: phase.lifecycle.started_at,
        terminated_at: termination.map(|t| t.terminated_at),
        elapsed_secs: phase.lifecycle.elapsed(now).map(|d| d.num_seconds()),
        stop_reason: phase.stop_reason.clone(),
        message: termination.and_then(|t| t.message.clone()),
        attributes: phase
            .attributes
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        variables: phase
            .variables
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        faults: if is_root {
            snapshot
                .faults
                .iter()
                .map(|f| format!("{}: {}", f.category, f.reason))
                .collect()
        } else {
            Vec::new()
        },
        child_count: phase.children.len(),
    }
}

/// Lifecycle line for the root stage of `snapshot`.
pub fn build_lifecycle(snapshot: &Snapshot) -> LifecycleViewModel {
    let lifecycle = snapshot.lifecycle();
    let timestamp = match lifecycle.stage {
        Stage::Created => lifecycle.created_at,
        Stage::Running => lifecycle.started_at.unwrap_or(lifecycle.created_at),
        Stage::Ended => lifecycle.ended_at().unwrap_or(lifecycle.created_at),
    };
    LifecycleViewModel {
        instance_id: snapshot.instance_id.to_string(),
        stage: lifecycle.stage,
        termination: snapshot.root.termination_status().map(|s| s.as_str().to_string()),
        timestamp,
        tone: phase_tone(&snapshot.root),
    }
}

pub fn build_output_line(instance_id: &InstanceId, line: OutputLine) -> OutputLineViewModel {
    OutputLineViewModel {
        instance_id: instance_id.to_string(),
        ordinal: line.ordinal,
        phase_id: line.phase_id,
        timestamp: line.timestamp,
        text: line.text,
    }
}

pub fn build_summary(summary: DashboardSummary) -> SummaryViewModel {
    SummaryViewModel {
        active: summary.active,
        completed: summary.completed,
        failed: summary.failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presentation::view_models::StreamLineViewModel;
    use runwatch_runtime::{Provider, ScreenState};
    use runwatch_testing::fixtures::at;
    use runwatch_testing::{ScriptedProvider, SnapshotBuilder};
    use runwatch_types::TerminationStatus;
    use std::sync::Arc;

    #[test]
    fn test_run_row_of_running_instance() {
        let snapshot = SnapshotBuilder::pipeline("etl", "r1")
            .created(0)
            .status("parsing")
            .warning("slow")
            .build();

        let row = build_run_row(&snapshot, at(100));
        assert_eq!(row.instance_id, "etl@r1");
        assert_eq!(row.elapsed_secs, Some(100));
        assert_eq!(row.stage_text, "RUNNING");
        assert_eq!(row.tone, Tone::Active);
        assert_eq!(row.warnings, 1);
        assert_eq!(row.status.as_deref(), Some("parsing"));
        assert_eq!(row.phase_count, 5);
    }

    #[test]
    fn test_lifecycle_uses_stage_timestamp() {
        let snapshot = SnapshotBuilder::new("etl", "r1")
            .created(0)
            .ended(TerminationStatus::Failed, 42)
            .build();

        let line = build_lifecycle(&snapshot);
        assert_eq!(line.stage, Stage::Ended);
        assert_eq!(line.termination.as_deref(), Some("FAILED"));
        assert_eq!(line.timestamp, at(42));
        assert_eq!(line.tone, Tone::Failure);

        let json = serde_json::to_string(&StreamLineViewModel::Lifecycle(line)).unwrap();
        insta::assert_snapshot!(json, @r#"{"type":"lifecycle","instance_id":"etl@r1","stage":"ENDED","termination":"FAILED","timestamp":"2023-11-14T22:14:02Z"}"#);
    }

    #[test]
    fn test_header_of_disconnected_session() {
        let id = InstanceId::new("etl", "r1");
        let provider = Arc::new(
            ScriptedProvider::new()
                .with_live(SnapshotBuilder::pipeline("etl", "r1").build()),
        );
        let dyn_provider: Arc<dyn Provider> = provider.clone();
        let mut session = InstanceSession::attach(dyn_provider, id, 16).unwrap();

        let header = build_header(&session, at(30));
        assert_eq!(header.elapsed_secs, Some(30));
        assert!(header.disconnected.is_none());
        assert!(!header.historical);

        provider.disconnect_all("engine restarted");
        session.pump();
        assert!(matches!(session.state(), ScreenState::Disconnected { .. }));

        let header = build_header(&session, Utc::now());
        assert_eq!(header.disconnected.as_deref(), Some("engine restarted"));
        assert_eq!(header.job_id, "etl");
    }

    #[test]
    fn test_disconnected_screen_stops_all_clocks() {
        let id = InstanceId::new("etl", "r1");
        let provider = Arc::new(
            ScriptedProvider::new()
                .with_live(SnapshotBuilder::pipeline("etl", "r1").build()),
        );
        let dyn_provider: Arc<dyn Provider> = provider.clone();
        let mut session = InstanceSession::attach(dyn_provider, id, 16).unwrap();
        provider.disconnect_all("engine restarted");
        session.pump();

        let now = Utc::now();
        let later = now + chrono::Duration::seconds(60);
        let snapshot = session.snapshot().unwrap();
        let root = session.selected_phase().unwrap();

        let detail_now = build_phase_detail(root, snapshot, session.clock(now));
        let detail_later = build_phase_detail(root, snapshot, session.clock(later));
        assert!(detail_now.elapsed_secs.is_some());
        assert_eq!(detail_now.elapsed_secs, detail_later.elapsed_secs);
        assert_eq!(
            build_header(&session, now).elapsed_secs,
            build_header(&session, later).elapsed_secs
        );
        assert_eq!(
            build_header(&session, now).elapsed_secs,
            detail_now.elapsed_secs
        );
    }

    #[test]
    fn test_phase_detail_lists_faults_only_for_root() {
        let snapshot = SnapshotBuilder::pipeline("etl", "r1")
            .fault("exit_code", "transform exited with code 2")
            .build();

        let root = build_phase_detail(&snapshot.root, &snapshot, at(5));
        assert_eq!(root.faults, vec!["exit_code: transform exited with code 2"]);
        assert_eq!(root.child_count, 2);

        let parse = snapshot.find_phase("parse").unwrap();
        let detail = build_phase_detail(parse, &snapshot, at(5));
        assert!(detail.faults.is_empty());
        assert_eq!(detail.child_count, 2);
    }

    #[test]
    fn test_phase_rows_mark_selection() {
        let snapshot = SnapshotBuilder::pipeline("etl", "r1").build();
        let mut view = PhaseViewState::new(&snapshot);
        view.select("validate");

        let rows = build_phase_rows(&view, &snapshot);
        let selected: Vec<&str> = rows
            .iter()
            .filter(|r| r.selected)
            .map(|r| r.phase_id.as_str())
            .collect();
        assert_eq!(selected, vec!["validate"]);
        assert_eq!(rows[0].depth, 0);
        assert_eq!(rows[0].stage_text, "RUNNING");
    }
}

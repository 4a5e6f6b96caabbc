use chrono::{DateTime, Utc};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::Paragraph,
};
use runwatch_runtime::{DashboardSession, InstanceSession, RunTables, SelectorMode, SelectorSession, TableId};

use super::app::{App, Screen};
use super::components::{
    Component, FooterComponent, HeaderComponent, OutputComponent, PhaseDetailComponent,
    PhaseTreeComponent, RunTableComponent, SummaryComponent,
};
use crate::presentation::presenters::{
    build_header, build_phase_detail, build_phase_rows, build_run_row, build_summary,
};
use crate::presentation::theme::Theme;
use crate::presentation::view_models::RunRowViewModel;

const TABLE_HINTS: &[(&str, &str)] = &[("j/k", "move"), ("enter", "open"), ("q", "quit")];
const SELECTOR_HINTS: &[(&str, &str)] = &[("j/k", "move"), ("enter", "select"), ("q", "cancel")];
const INSTANCE_HINTS: &[(&str, &str)] = &[
    ("j/k", "phase"),
    ("space", "expand"),
    ("s", "stop"),
    ("r", "retry"),
    ("q", "back"),
];

pub(crate) fn draw(f: &mut Frame, app: &App, theme: &Theme, now: DateTime<Utc>) {
    match app.top() {
        Some(Screen::Dashboard(session)) => draw_dashboard(f, session, app.message(), theme, now),
        Some(Screen::Selector { session, .. }) => {
            draw_selector(f, session, app.message(), theme, now)
        }
        Some(Screen::Instance(session)) => draw_instance(f, session, app.message(), theme, now),
        None => {}
    }
}

fn rows(tables: &RunTables, table: TableId, now: DateTime<Utc>) -> Vec<RunRowViewModel> {
    tables
        .rows(table)
        .iter()
        .map(|snapshot| build_run_row(snapshot, now))
        .collect()
}

fn cursor_in(tables: &RunTables, table: TableId) -> Option<usize> {
    let cursor = tables.cursor();
    (tables.selected().is_some() && cursor.table == table).then_some(cursor.row)
}

fn render_tables(
    f: &mut Frame,
    areas: (Rect, Option<Rect>),
    tables: &RunTables,
    theme: &Theme,
    now: DateTime<Utc>,
) {
    let active = rows(tables, TableId::Active, now);
    RunTableComponent {
        title: "Active",
        rows: &active,
        selected: cursor_in(tables, TableId::Active),
    }
    .render(f, areas.0, theme);

    if let Some(area) = areas.1 {
        let history = rows(tables, TableId::History, now);
        RunTableComponent {
            title: "History",
            rows: &history,
            selected: cursor_in(tables, TableId::History),
        }
        .render(f, area, theme);
    }
}

fn draw_dashboard(
    f: &mut Frame,
    session: &DashboardSession,
    message: Option<&str>,
    theme: &Theme,
    now: DateTime<Utc>,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Percentage(45),
            Constraint::Min(5),
            Constraint::Length(2),
        ])
        .split(f.area());

    SummaryComponent {
        vm: build_summary(session.summary()),
        lost: session.lost(),
    }
    .render(f, chunks[0], theme);

    let now = session.clock(now);
    render_tables(f, (chunks[1], Some(chunks[2])), session.tables(), theme, now);

    FooterComponent {
        hints: TABLE_HINTS,
        message,
    }
    .render(f, chunks[3], theme);
}

fn draw_selector(
    f: &mut Frame,
    session: &SelectorSession,
    message: Option<&str>,
    theme: &Theme,
    now: DateTime<Utc>,
) {
    let (title, with_active, with_history) = match session.mode() {
        Some(SelectorMode::LiveOnly) => ("Select an active instance", true, false),
        Some(SelectorMode::Combined) => ("Select an instance or run", true, true),
        None => ("Select an ended run", false, true),
    };

    let now = session.clock(now);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(5), Constraint::Length(2)])
        .split(f.area());

    let mut heading = vec![Span::styled(title, theme.title)];
    if let Some(reason) = session.lost() {
        heading.push(Span::styled(
            format!("  disconnected: {}", reason),
            theme.disconnected,
        ));
    }
    f.render_widget(Paragraph::new(Line::from(heading)), chunks[0]);

    let tables = session.tables();
    match (with_active, with_history) {
        (true, true) => {
            let body = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                .split(chunks[1]);
            render_tables(f, (body[0], Some(body[1])), tables, theme, now);
        }
        (true, false) => render_tables(f, (chunks[1], None), tables, theme, now),
        _ => {
            let history = rows(tables, TableId::History, now);
            RunTableComponent {
                title: "History",
                rows: &history,
                selected: cursor_in(tables, TableId::History),
            }
            .render(f, chunks[1], theme);
        }
    }

    FooterComponent {
        hints: SELECTOR_HINTS,
        message,
    }
    .render(f, chunks[2], theme);
}

fn draw_instance(
    f: &mut Frame,
    session: &InstanceSession,
    message: Option<&str>,
    theme: &Theme,
    now: DateTime<Utc>,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Min(6),
            Constraint::Length(2),
        ])
        .split(f.area());

    let header = build_header(session, now);
    HeaderComponent { vm: &header }.render(f, chunks[0], theme);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Min(20)])
        .split(chunks[1]);
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(12), Constraint::Min(3)])
        .split(body[1]);

    let phase_rows = session
        .snapshot()
        .map(|snapshot| build_phase_rows(session.view(), snapshot))
        .unwrap_or_default();
    PhaseTreeComponent { rows: &phase_rows }.render(f, body[0], theme);

    let detail = session
        .snapshot()
        .zip(session.selected_phase())
        .map(|(snapshot, phase)| {
            build_phase_detail(phase, snapshot, session.clock(now))
        });
    PhaseDetailComponent { vm: detail.as_ref() }.render(f, right[0], theme);

    let lines = session.output_lines();
    let scope = match session.output_filter() {
        Some(_) => session.view().selected().unwrap_or("all"),
        None => "all",
    };
    OutputComponent {
        lines: &lines,
        scope,
    }
    .render(f, right[1], theme);

    FooterComponent {
        hints: INSTANCE_HINTS,
        message,
    }
    .render(f, chunks[2], theme);
}

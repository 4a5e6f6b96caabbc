use ratatui::{
    Frame,
    layout::{Constraint, Rect},
    text::Span,
    widgets::{Block, Borders, Cell, Row, Table, TableState},
};
use runwatch_types::{format_elapsed, format_local};

use super::Component;
use crate::presentation::theme::Theme;
use crate::presentation::view_models::RunRowViewModel;

pub(crate) struct RunTableComponent<'a> {
    pub title: &'a str,
    pub rows: &'a [RunRowViewModel],
    /// Cursor row, only when the cursor is in this table
    pub selected: Option<usize>,
}

impl Component for RunTableComponent<'_> {
    fn render(&self, f: &mut Frame, area: Rect, theme: &Theme) {
        let header = Row::new(["JOB", "RUN", "CREATED", "TIME", "STAGE", "WARN", "STATUS"])
            .style(theme.subtle);

        let rows: Vec<Row> = self
            .rows
            .iter()
            .map(|row| {
                Row::new(vec![
                    Cell::from(row.job_id.clone()),
                    Cell::from(row.run_id.clone()),
                    Cell::from(format_local(Some(row.created_at), "-")),
                    Cell::from(format_elapsed(
                        row.elapsed_secs.map(chrono::Duration::seconds),
                        "--:--:--",
                    )),
                    Cell::from(Span::styled(row.stage_text.clone(), theme.tone(row.tone))),
                    Cell::from(row.warnings.to_string()),
                    Cell::from(row.status.clone().unwrap_or_default()),
                ])
            })
            .collect();

        let widths = [
            Constraint::Length(18),
            Constraint::Length(10),
            Constraint::Length(19),
            Constraint::Length(9),
            Constraint::Length(12),
            Constraint::Length(5),
            Constraint::Min(10),
        ];

        let border = if self.selected.is_some() {
            theme.title
        } else {
            theme.border
        };
        let table = Table::new(rows, widths)
            .header(header)
            .block(
                Block::default()
                    .title(format!(" {} ({}) ", self.title, self.rows.len()))
                    .borders(Borders::ALL)
                    .border_style(border),
            )
            .row_highlight_style(theme.highlight);

        let mut state = TableState::default().with_selected(self.selected);
        f.render_stateful_widget(table, area, &mut state);
    }
}

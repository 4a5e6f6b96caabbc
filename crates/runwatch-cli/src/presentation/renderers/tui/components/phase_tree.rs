use ratatui::{
    Frame,
    layout::Rect,
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
};

use super::Component;
use crate::presentation::theme::Theme;
use crate::presentation::view_models::PhaseRowViewModel;

pub(crate) struct PhaseTreeComponent<'a> {
    pub rows: &'a [PhaseRowViewModel],
}

impl Component for PhaseTreeComponent<'_> {
    fn render(&self, f: &mut Frame, area: Rect, theme: &Theme) {
        let items: Vec<ListItem> = self
            .rows
            .iter()
            .map(|row| {
                let marker = match (row.has_children, row.expanded) {
                    (false, _) => "  ",
                    (true, true) => "▾ ",
                    (true, false) => "▸ ",
                };
                let mut name = Span::raw(row.phase_id.clone());
                if row.changed {
                    name = name.style(theme.changed);
                }
                ListItem::new(Line::from(vec![
                    Span::raw("  ".repeat(row.depth)),
                    Span::styled(marker, theme.subtle),
                    name,
                    Span::raw(" "),
                    Span::styled(row.stage_text.clone(), theme.tone(row.tone)),
                ]))
            })
            .collect();

        let list = List::new(items)
            .block(
                Block::default()
                    .title(" Phases ")
                    .borders(Borders::ALL)
                    .border_style(theme.border),
            )
            .highlight_style(theme.highlight.add_modifier(Modifier::BOLD));

        let mut state = ListState::default().with_selected(self.rows.iter().position(|r| r.selected));
        f.render_stateful_widget(list, area, &mut state);
    }
}

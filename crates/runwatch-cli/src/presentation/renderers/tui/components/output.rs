use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph},
};
use runwatch_types::OutputLine;

use super::Component;
use crate::presentation::theme::Theme;

/// Output tail for the selected phase subtree; always follows the newest line.
pub(crate) struct OutputComponent<'a> {
    pub lines: &'a [&'a OutputLine],
    pub scope: &'a str,
}

impl Component for OutputComponent<'_> {
    fn render(&self, f: &mut Frame, area: Rect, theme: &Theme) {
        let visible = area.height.saturating_sub(2) as usize;
        let start = self.lines.len().saturating_sub(visible);

        let text: Vec<Line> = self.lines[start..]
            .iter()
            .map(|line| {
                let time = line
                    .timestamp
                    .with_timezone(&chrono::Local)
                    .format("%H:%M:%S")
                    .to_string();
                Line::from(vec![
                    Span::styled(time, theme.subtle),
                    Span::raw(" "),
                    Span::styled(
                        format!("{:<10}", line.phase_id.as_deref().unwrap_or("-")),
                        theme.subtle,
                    ),
                    Span::raw(line.text.clone()),
                ])
            })
            .collect();

        let output = Paragraph::new(Text::from(text)).block(
            Block::default()
                .title(format!(" Output: {} ({}) ", self.scope, self.lines.len()))
                .borders(Borders::ALL)
                .border_style(theme.border),
        );
        f.render_widget(output, area);
    }
}

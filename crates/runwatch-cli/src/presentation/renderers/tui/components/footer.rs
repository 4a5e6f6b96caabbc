use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use super::Component;
use crate::presentation::theme::Theme;

pub(crate) struct FooterComponent<'a> {
    pub hints: &'a [(&'a str, &'a str)],
    pub message: Option<&'a str>,
}

impl Component for FooterComponent<'_> {
    fn render(&self, f: &mut Frame, area: Rect, theme: &Theme) {
        let mut spans = Vec::new();
        for (key, action) in self.hints {
            spans.push(Span::styled(format!(" {} ", key), theme.title));
            spans.push(Span::styled(format!("{}  ", action), theme.subtle));
        }
        if let Some(message) = self.message {
            spans.push(Span::styled(message.to_string(), theme.notice));
        }

        let footer = Paragraph::new(Line::from(spans)).block(
            Block::default()
                .borders(Borders::TOP)
                .border_style(theme.border),
        );
        f.render_widget(footer, area);
    }
}

use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
};

use super::Component;
use crate::presentation::theme::{Theme, Tone};
use crate::presentation::view_models::SummaryViewModel;

pub(crate) struct SummaryComponent<'a> {
    pub vm: SummaryViewModel,
    pub lost: Option<&'a str>,
}

impl Component for SummaryComponent<'_> {
    fn render(&self, f: &mut Frame, area: Rect, theme: &Theme) {
        let mut spans = vec![
            Span::styled("Runwatch", theme.title),
            Span::raw("  active "),
            Span::styled(self.vm.active.to_string(), theme.tone(Tone::Active)),
            Span::raw("  completed "),
            Span::styled(self.vm.completed.to_string(), theme.tone(Tone::Success)),
            Span::raw("  failed "),
            Span::styled(self.vm.failed.to_string(), theme.tone(Tone::Failure)),
        ];
        if let Some(reason) = self.lost {
            spans.push(Span::styled(format!("  DISCONNECTED: {}", reason), theme.disconnected));
        }
        f.render_widget(Paragraph::new(Line::from(spans)), area);
    }
}

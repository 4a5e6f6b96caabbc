use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph},
};
use runwatch_types::format_elapsed;

use super::Component;
use crate::presentation::theme::Theme;
use crate::presentation::view_models::HeaderViewModel;

pub(crate) struct HeaderComponent<'a> {
    pub vm: &'a HeaderViewModel,
}

impl Component for HeaderComponent<'_> {
    fn render(&self, f: &mut Frame, area: Rect, theme: &Theme) {
        let vm = self.vm;
        let elapsed = format_elapsed(vm.elapsed_secs.map(chrono::Duration::seconds), "--:--:--");

        let mut title = vec![
            Span::styled(vm.job_id.clone(), theme.title),
            Span::styled(" @ ", theme.subtle),
            Span::raw(vm.run_id.clone()),
            Span::raw("  "),
            Span::styled(vm.stage_text.clone(), theme.tone(vm.tone)),
            Span::raw("  "),
            Span::raw(elapsed),
        ];
        if vm.historical {
            title.push(Span::styled("  [history]", theme.subtle));
        }
        if let Some(reason) = &vm.disconnected {
            title.push(Span::styled(format!("  DISCONNECTED: {}", reason), theme.disconnected));
        }

        let mut lines = vec![Line::from(title)];
        lines.push(Line::from(Span::styled(
            vm.status.clone().unwrap_or_default(),
            theme.subtle,
        )));

        if let Some(banner) = &vm.banner {
            let hint = if banner.retryable { "  (r to retry)" } else { "" };
            lines.push(Line::from(Span::styled(
                format!(" {}{} ", banner.message, hint),
                theme.banner,
            )));
        } else if let Some(notice) = &vm.notice {
            lines.push(Line::from(Span::styled(notice.clone(), theme.notice)));
        } else if !vm.warnings.is_empty() {
            lines.push(Line::from(Span::styled(
                format!("warnings: {}", vm.warnings.join("; ")),
                theme.notice,
            )));
        }

        let header = Paragraph::new(Text::from(lines)).block(
            Block::default()
                .borders(Borders::BOTTOM)
                .border_style(theme.border),
        );
        f.render_widget(header, area);
    }
}

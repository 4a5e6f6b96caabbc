use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use runwatch_types::{format_elapsed, format_local};

use super::Component;
use crate::presentation::theme::Theme;
use crate::presentation::view_models::PhaseDetailViewModel;

pub(crate) struct PhaseDetailComponent<'a> {
    pub vm: Option<&'a PhaseDetailViewModel>,
}

fn field<'a>(name: &'a str, value: String, theme: &Theme) -> Line<'a> {
    Line::from(vec![
        Span::styled(format!("{:<11}", name), theme.subtle),
        Span::raw(value),
    ])
}

impl Component for PhaseDetailComponent<'_> {
    fn render(&self, f: &mut Frame, area: Rect, theme: &Theme) {
        let block = Block::default()
            .title(" Detail ")
            .borders(Borders::ALL)
            .border_style(theme.border);

        let Some(vm) = self.vm else {
            f.render_widget(Paragraph::new("No phase selected").block(block), area);
            return;
        };

        let mut lines = vec![
            Line::from(vec![
                Span::styled(vm.phase_id.clone(), theme.title),
                Span::raw("  "),
                Span::styled(vm.stage_text.clone(), theme.tone(vm.tone)),
            ]),
            field("type", vm.phase_type.clone().unwrap_or_else(|| "-".to_string()), theme),
            field("created", format_local(Some(vm.created_at), "-"), theme),
            field("started", format_local(vm.started_at, "-"), theme),
            field("ended", format_local(vm.terminated_at, "-"), theme),
            field(
                "elapsed",
                format_elapsed(vm.elapsed_secs.map(chrono::Duration::seconds), "--:--:--"),
                theme,
            ),
        ];
        if vm.child_count > 0 {
            lines.push(field("children", vm.child_count.to_string(), theme));
        }
        if let Some(reason) = &vm.stop_reason {
            lines.push(field("stop", reason.clone(), theme));
        }
        if let Some(message) = &vm.message {
            lines.push(field("message", message.clone(), theme));
        }
        for (key, value) in &vm.attributes {
            lines.push(field("attr", format!("{} = {}", key, value), theme));
        }
        for (key, value) in &vm.variables {
            lines.push(field("var", format!("{} = {}", key, value), theme));
        }
        for fault in &vm.faults {
            lines.push(Line::from(Span::styled(
                format!("fault      {}", fault),
                theme.tone(crate::presentation::theme::Tone::Failure),
            )));
        }

        let detail = Paragraph::new(Text::from(lines))
            .block(block)
            .wrap(Wrap { trim: false });
        f.render_widget(detail, area);
    }
}

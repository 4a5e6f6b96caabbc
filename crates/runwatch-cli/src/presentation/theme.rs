use ratatui::style::{Color, Modifier, Style};
use runwatch_types::{Outcome, Stage};

/// Semantic color class of a stage or outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Neutral,
    Subtle,
    Active,
    Success,
    Warning,
    Failure,
}

impl Tone {
    /// Tone of a lifecycle. The outcome wins once the run or phase ended.
    pub fn of(stage: Stage, idle: bool, outcome: Option<Outcome>) -> Self {
        match outcome {
            Some(Outcome::Success) => Tone::Success,
            Some(Outcome::Fault) => Tone::Failure,
            Some(Outcome::Aborted) => Tone::Warning,
            Some(Outcome::Rejected) => Tone::Subtle,
            None if idle => Tone::Subtle,
            None => match stage {
                Stage::Created => Tone::Neutral,
                Stage::Running => Tone::Active,
                Stage::Ended => Tone::Neutral,
            },
        }
    }
}

/// Styles for the TUI. Passed explicitly into every component.
#[derive(Debug, Clone)]
pub struct Theme {
    pub title: Style,
    pub subtle: Style,
    pub highlight: Style,
    pub changed: Style,
    pub border: Style,
    pub banner: Style,
    pub notice: Style,
    pub disconnected: Style,
    neutral: Color,
    active: Color,
    success: Color,
    warning: Color,
    failure: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            title: Style::default()
                .fg(Color::LightCyan)
                .add_modifier(Modifier::BOLD),
            subtle: Style::default().fg(Color::DarkGray),
            highlight: Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
            changed: Style::default().add_modifier(Modifier::BOLD),
            border: Style::default().fg(Color::DarkGray),
            banner: Style::default().fg(Color::White).bg(Color::Red),
            notice: Style::default().fg(Color::Yellow),
            disconnected: Style::default()
                .fg(Color::LightRed)
                .add_modifier(Modifier::BOLD),
            neutral: Color::Reset,
            active: Color::Blue,
            success: Color::Green,
            warning: Color::Yellow,
            failure: Color::LightRed,
        }
    }
}

impl Theme {
    pub fn tone(&self, tone: Tone) -> Style {
        let color = match tone {
            Tone::Neutral => self.neutral,
            Tone::Subtle => return self.subtle,
            Tone::Active => self.active,
            Tone::Success => self.success,
            Tone::Warning => self.warning,
            Tone::Failure => self.failure,
        };
        Style::default().fg(color)
    }
}

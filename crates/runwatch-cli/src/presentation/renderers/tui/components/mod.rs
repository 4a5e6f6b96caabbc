use ratatui::{Frame, layout::Rect};

use crate::presentation::theme::Theme;

pub(crate) trait Component {
    fn render(&self, f: &mut Frame, area: Rect, theme: &Theme);
}

pub(crate) mod footer;
pub(crate) mod header;
pub(crate) mod output;
pub(crate) mod phase_detail;
pub(crate) mod phase_tree;
pub(crate) mod run_table;
pub(crate) mod summary;

pub(crate) use footer::FooterComponent;
pub(crate) use header::HeaderComponent;
pub(crate) use output::OutputComponent;
pub(crate) use phase_detail::PhaseDetailComponent;
pub(crate) use phase_tree::PhaseTreeComponent;
pub(crate) use run_table::RunTableComponent;
pub(crate) use summary::SummaryComponent;

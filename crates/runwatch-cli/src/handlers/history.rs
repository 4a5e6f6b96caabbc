use anyhow::Result;
use chrono::Utc;
use runwatch_types::RunCriteria;

use crate::context::ExecutionContext;
use crate::presentation::presenters::build_run_row;

pub fn handle(ctx: &ExecutionContext, patterns: &[String], lines: Option<usize>) -> Result<()> {
    let criteria = RunCriteria::parse_all(patterns)?;
    let limit = lines.unwrap_or(ctx.config().history_limit);
    let now = Utc::now();

    let rows = ctx
        .provider()
        .read_history(&criteria, limit)?
        .iter()
        .map(|snapshot| build_run_row(snapshot, now))
        .collect();

    ctx.renderer().render_history(rows)
}

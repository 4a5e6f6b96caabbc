use anyhow::Result;
use chrono::Utc;
use runwatch_types::RunCriteria;

use super::active_snapshots;
use crate::context::ExecutionContext;
use crate::presentation::presenters::build_run_row;

pub fn handle(ctx: &ExecutionContext, patterns: &[String]) -> Result<()> {
    let criteria = RunCriteria::parse_all(patterns)?;
    let provider = ctx.provider();
    let now = Utc::now();

    let rows = active_snapshots(provider.as_ref(), &criteria)?
        .iter()
        .map(|snapshot| build_run_row(snapshot, now))
        .collect();

    ctx.renderer().render_instances(rows)
}

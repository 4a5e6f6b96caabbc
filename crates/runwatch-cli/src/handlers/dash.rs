use anyhow::Result;
use runwatch_runtime::DashboardSession;
use runwatch_types::RunCriteria;

use crate::context::ExecutionContext;
use crate::presentation::renderers::tui::{self, Screen};

pub fn handle(ctx: &ExecutionContext, pattern: Option<String>, history: Option<usize>) -> Result<()> {
    ctx.require_terminal("dash")?;
    let criteria = match pattern {
        Some(pattern) => RunCriteria::parse(&pattern)?,
        None => RunCriteria::all(),
    };
    let config = ctx.config();

    let session = DashboardSession::open(
        ctx.provider(),
        criteria,
        history.unwrap_or(config.history_limit),
        config.bridge_capacity,
    )?;

    tui::run(ctx.provider(), config, Screen::Dashboard(session))?;
    Ok(())
}

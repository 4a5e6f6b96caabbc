use anyhow::Result;
use runwatch_runtime::{SelectorMode, SelectorSession};
use runwatch_types::RunCriteria;

use crate::context::ExecutionContext;
use crate::presentation::renderers::tui::{self, Screen};

/// Combined selector; prints the chosen `job@run` after the screen closes.
pub fn handle(ctx: &ExecutionContext, pattern: Option<String>) -> Result<()> {
    ctx.require_terminal("select")?;
    let criteria = match pattern {
        Some(pattern) => RunCriteria::parse(&pattern)?,
        None => RunCriteria::all(),
    };
    let config = ctx.config();

    let session = SelectorSession::open(
        ctx.provider(),
        criteria,
        SelectorMode::Combined,
        config.history_limit,
        config.bridge_capacity,
    )?;
    let screen = Screen::Selector {
        session,
        open_on_confirm: false,
    };

    if let Some(target) = tui::run(ctx.provider(), config, screen)? {
        println!("{}", target.instance_id());
    }
    Ok(())
}

use anyhow::Result;
use runwatch_runtime::{InstanceSession, InstanceTarget, SelectorMode, SelectorSession};
use runwatch_types::RunCriteria;

use super::active_snapshots;
use crate::context::ExecutionContext;
use crate::presentation::renderers::tui::{self, Screen};

/// Ended runs offered when no active instance matches.
const HISTORY_FALLBACK: usize = 10;

pub fn handle(ctx: &ExecutionContext, pattern: &str) -> Result<()> {
    let criteria = RunCriteria::parse(pattern)?;
    let screen = resolve(ctx, criteria, pattern)?;

    ctx.require_terminal("instance")?;
    tui::run(ctx.provider(), ctx.config(), screen)?;
    Ok(())
}

/// Pick the first screen for `pattern`: a live screen for a single active
/// match, a selector for several, ended runs when nothing is active.
fn resolve(ctx: &ExecutionContext, criteria: RunCriteria, pattern: &str) -> Result<Screen> {
    let provider = ctx.provider();
    let config = ctx.config();

    let active = active_snapshots(provider.as_ref(), &criteria)?;
    match active.len() {
        0 => {}
        1 => {
            let target = InstanceTarget::Live(active[0].instance_id.clone());
            let session = InstanceSession::open(provider, target, config.bridge_capacity)?;
            return Ok(Screen::Instance(session));
        }
        _ => {
            let session = SelectorSession::open(
                provider,
                criteria,
                SelectorMode::LiveOnly,
                config.history_limit,
                config.bridge_capacity,
            )?;
            return Ok(Screen::Selector {
                session,
                open_on_confirm: true,
            });
        }
    }

    let mut runs = provider.read_history(&criteria, HISTORY_FALLBACK)?;
    tracing::debug!(pattern, runs = runs.len(), "no active match, using history");
    match runs.len() {
        0 => anyhow::bail!("No instances or runs matching '{}'", pattern),
        1 => {
            let snapshot = runs.remove(0);
            Ok(Screen::Instance(InstanceSession::historical(provider, snapshot)))
        }
        _ => Ok(Screen::Selector {
            session: SelectorSession::historical(runs),
            open_on_confirm: true,
        }),
    }
}

use std::io::{self, BufRead, Write};

use anyhow::Result;
use chrono::Utc;
use runwatch_types::RunCriteria;

use super::{active_snapshots, describe};
use crate::context::ExecutionContext;
use crate::presentation::presenters::build_run_row;
use crate::presentation::renderers::console::format_run_table;
use crate::presentation::view_models::StopResultViewModel;

pub fn handle(ctx: &ExecutionContext, patterns: &[String], force: bool) -> Result<()> {
    let criteria = RunCriteria::parse_all(patterns)?;
    let provider = ctx.provider();
    let renderer = ctx.renderer();

    let targets = active_snapshots(provider.as_ref(), &criteria)?;
    if targets.is_empty() {
        renderer.render_note(&format!("No instances to stop: {}", describe(patterns)));
        return Ok(());
    }

    if !force {
        let now = Utc::now();
        let rows: Vec<_> = targets.iter().map(|s| build_run_row(s, now)).collect();
        println!("Instances to stop:");
        print!("{}", format_run_table(&rows, false));
        if !confirm("Do you want to continue? [Y/n] ")? {
            renderer.render_note("Aborted");
            return Ok(());
        }
    }

    let results: Vec<StopResultViewModel> = targets
        .iter()
        .map(|snapshot| {
            let id = &snapshot.instance_id;
            let outcome = provider.stop(id);
            if let Err(e) = &outcome {
                tracing::warn!(instance = %id, error = %e, "stop request failed");
            }
            StopResultViewModel {
                instance_id: id.to_string(),
                requested: outcome.is_ok(),
                error: outcome.err().map(|e| e.to_string()),
            }
        })
        .collect();

    renderer.render_stop_results(&results)
}

/// Empty answer or end of input counts as yes.
fn confirm(prompt: &str) -> Result<bool> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "" | "y" | "yes")
}

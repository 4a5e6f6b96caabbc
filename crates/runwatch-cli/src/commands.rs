use anyhow::Result;
use runwatch_runtime::{Config, resolve_data_dir};

use super::args::{Cli, Commands};
use super::context::ExecutionContext;
use super::handlers;
use super::logging;

pub fn run(cli: Cli) -> Result<()> {
    let data_dir = resolve_data_dir(cli.data_dir.as_deref())?;
    let config = Config::load_from(&Config::path_in(&data_dir))?;
    let log_path = logging::init(&data_dir, &config, cli.log_level)?;
    tracing::debug!(log = %log_path.display(), "logging initialized");

    let ctx = ExecutionContext::new(data_dir, config, cli.format);

    match cli.command {
        Commands::Dash { pattern, history } => handlers::dash::handle(&ctx, pattern, history),

        Commands::Instance { pattern } => handlers::instance::handle(&ctx, &pattern),

        Commands::Select { pattern } => handlers::select::handle(&ctx, pattern),

        Commands::Ps { patterns } => handlers::ps::handle(&ctx, &patterns),

        Commands::Listen { patterns, limit } => handlers::listen::handle(&ctx, &patterns, limit),

        Commands::Tail { patterns, follow } => handlers::tail::handle(&ctx, &patterns, follow),

        Commands::History { patterns, lines } => {
            handlers::history::handle(&ctx, &patterns, lines)
        }

        Commands::Stop { patterns, force } => handlers::stop::handle(&ctx, &patterns, force),
    }
}

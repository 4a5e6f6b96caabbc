use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use is_terminal::IsTerminal;
use runwatch_runtime::{Config, Provider};

use crate::presentation::renderers::ConsoleRenderer;
use crate::simulation::SimulatedEnvironment;
use crate::types::OutputFormat;

/// Everything a handler needs: resolved config, the job environment and the
/// console renderer.
pub struct ExecutionContext {
    config: Config,
    environment: Arc<SimulatedEnvironment>,
    renderer: ConsoleRenderer,
}

impl ExecutionContext {
    pub fn new(data_dir: PathBuf, config: Config, format: OutputFormat) -> Self {
        let environment = Arc::new(SimulatedEnvironment::start(config.simulation.clone()));
        tracing::info!(
            data_dir = %data_dir.display(),
            jobs = config.simulation.jobs,
            "environment started"
        );
        Self {
            config,
            environment,
            renderer: ConsoleRenderer::new(format),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn provider(&self) -> Arc<dyn Provider> {
        self.environment.clone()
    }

    pub fn renderer(&self) -> &ConsoleRenderer {
        &self.renderer
    }

    /// Fail early when the interactive screens cannot be shown.
    pub fn require_terminal(&self, command: &str) -> Result<()> {
        if !std::io::stdout().is_terminal() {
            anyhow::bail!("'runwatch {}' requires an interactive terminal", command);
        }
        Ok(())
    }
}

//! Isolated environment for CLI integration tests.

use anyhow::Result;
use assert_cmd::Command;
use std::collections::HashMap;
use std::path::Path;
use tempfile::TempDir;

/// Temp data directory with a config tuned for fast, small simulations.
///
/// # Example
/// ```no_run
/// use runwatch_testing::TestWorld;
///
/// let world = TestWorld::new().with_jobs(2);
/// let result = world.run(&["ps"]).unwrap();
/// assert!(result.success());
/// ```
pub struct TestWorld {
    temp_dir: TempDir,
    jobs: usize,
    seed_history: usize,
    env_vars: HashMap<String, String>,
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorld {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let world = Self {
            temp_dir,
            jobs: 2,
            seed_history: 3,
            env_vars: HashMap::new(),
        };
        world.write_config().expect("Failed to write config");
        world
    }

    pub fn data_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self.write_config().expect("Failed to write config");
        self
    }

    pub fn with_seed_history(mut self, runs: usize) -> Self {
        self.seed_history = runs;
        self.write_config().expect("Failed to write config");
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(key.into(), value.into());
        self
    }

    fn write_config(&self) -> Result<()> {
        let content = format!(
            "tick_interval_ms = 200\n\
             drain_interval_ms = 20\n\
             \n\
             [simulation]\n\
             jobs = {}\n\
             step_delay_ms = 30\n\
             fail_ratio_pct = 0\n\
             seed_history = {}\n",
            self.jobs, self.seed_history
        );
        std::fs::write(self.data_dir().join("config.toml"), content)?;
        Ok(())
    }

    /// Configure a CLI command with this world's data directory and env vars.
    pub fn configure_command<'a>(&self, cmd: &'a mut Command) -> &'a mut Command {
        cmd.arg("--data-dir").arg(self.data_dir());
        cmd.env_remove("RUNWATCH_PATH");
        for (key, value) in &self.env_vars {
            cmd.env(key, value);
        }
        cmd
    }

    /// Run the `runwatch` binary with the given arguments.
    #[allow(deprecated)]
    pub fn run(&self, args: &[&str]) -> Result<CliResult> {
        let mut cmd = Command::cargo_bin("runwatch")
            .map_err(|e| anyhow::anyhow!("Failed to find runwatch binary: {}", e))?;
        self.configure_command(&mut cmd);
        cmd.args(args);

        let output = cmd.output()?;
        Ok(CliResult {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

#[derive(Debug)]
pub struct CliResult {
    pub status: std::process::ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CliResult {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Parse every non-empty stdout line as JSON.
    pub fn json_lines(&self) -> Result<Vec<serde_json::Value>> {
        self.stdout
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| Ok(serde_json::from_str(l)?))
            .collect()
    }
}

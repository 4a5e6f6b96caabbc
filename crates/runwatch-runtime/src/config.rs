use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Resolve the data directory path based on priority:
/// 1. Explicit path (with tilde expansion)
/// 2. RUNWATCH_PATH environment variable (with tilde expansion)
/// 3. XDG data directory (recommended default)
/// 4. ~/.runwatch (fallback for systems without XDG)
pub fn resolve_data_dir(explicit_path: Option<&str>) -> Result<PathBuf> {
    if let Some(path) = explicit_path {
        return Ok(expand_tilde(path));
    }

    if let Ok(env_path) = std::env::var("RUNWATCH_PATH") {
        return Ok(expand_tilde(&env_path));
    }

    if let Some(data_dir) = dirs::data_dir() {
        return Ok(data_dir.join("runwatch"));
    }

    if let Some(home) = std::env::var_os("HOME") {
        return Ok(PathBuf::from(home).join(".runwatch"));
    }

    Err(Error::Config(
        "Could not determine data directory: no HOME directory or XDG data directory found"
            .to_string(),
    ))
}

/// Expand tilde (~) in paths to the user's home directory
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/")
        && let Some(home) = std::env::var_os("HOME")
    {
        return PathBuf::from(home).join(stripped);
    }
    PathBuf::from(path)
}

/// Parameters of the built-in simulated job environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Jobs running concurrently at any time
    pub jobs: usize,
    pub step_delay_ms: u64,
    /// Percentage of runs that end in a failure
    pub fail_ratio_pct: u8,
    /// Ended runs generated at startup so history is not empty
    pub seed_history: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            jobs: 3,
            step_delay_ms: 700,
            fail_ratio_pct: 20,
            seed_history: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Interval of the visual elapsed-time tick
    pub tick_interval_ms: u64,
    /// How often the render loop drains the event bridge
    pub drain_interval_ms: u64,
    pub history_limit: usize,
    /// Bounded queue size; producers block when it is full
    pub bridge_capacity: usize,
    /// Log file name, relative to the data directory
    pub log_file: String,
    pub simulation: SimulationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            drain_interval_ms: 100,
            history_limit: 50,
            bridge_capacity: 1024,
            log_file: "runwatch.log".to_string(),
            simulation: SimulationConfig::default(),
        }
    }
}

impl Config {
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn path_in(data_dir: &Path) -> PathBuf {
        data_dir.join("config.toml")
    }

    pub fn validate(&self) -> Result<()> {
        if self.bridge_capacity == 0 {
            return Err(Error::Config("bridge_capacity must be at least 1".to_string()));
        }
        if self.tick_interval_ms == 0 || self.drain_interval_ms == 0 {
            return Err(Error::Config("intervals must be non-zero".to_string()));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn drain_interval(&self) -> Duration {
        Duration::from_millis(self.drain_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
        assert_eq!(config.history_limit, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_save_and_load() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = Config::path_in(temp_dir.path());

        let config = Config {
            history_limit: 10,
            simulation: SimulationConfig {
                jobs: 5,
                ..SimulationConfig::default()
            },
            ..Config::default()
        };

        config.save_to(&config_path)?;
        assert!(config_path.exists());

        let loaded = Config::load_from(&config_path)?;
        assert_eq!(loaded, config);

        Ok(())
    }

    #[test]
    fn test_partial_file_fills_defaults() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = Config::path_in(temp_dir.path());
        std::fs::write(&config_path, "history_limit = 7\n[simulation]\njobs = 1\n")?;

        let loaded = Config::load_from(&config_path)?;
        assert_eq!(loaded.history_limit, 7);
        assert_eq!(loaded.simulation.jobs, 1);
        assert_eq!(loaded.bridge_capacity, 1024);

        Ok(())
    }

    #[test]
    fn test_zero_capacity_is_rejected() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = Config::path_in(temp_dir.path());
        std::fs::write(&config_path, "bridge_capacity = 0\n")?;

        let err = Config::load_from(&config_path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        Ok(())
    }

    #[test]
    fn test_load_nonexistent_returns_default() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config = Config::load_from(&temp_dir.path().join("nonexistent.toml"))?;
        assert_eq!(config, Config::default());
        Ok(())
    }

    #[test]
    fn test_explicit_data_dir_wins() -> Result<()> {
        let dir = resolve_data_dir(Some("/tmp/runwatch-explicit"))?;
        assert_eq!(dir, PathBuf::from("/tmp/runwatch-explicit"));
        Ok(())
    }
}

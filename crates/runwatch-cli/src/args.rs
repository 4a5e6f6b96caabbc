use crate::types::{LogLevel, OutputFormat};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "runwatch")]
#[command(about = "Watch hierarchical job runs live and browse ended ones", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Data directory (default: $RUNWATCH_PATH, then the XDG data dir)
    #[arg(long, global = true)]
    pub data_dir: Option<String>,

    #[arg(long, default_value = "plain", global = true)]
    pub format: OutputFormat,

    /// Log level written to the log file; RUNWATCH_LOG overrides it
    #[arg(long, default_value = "warn", global = true)]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Dashboard of active instances and recent history
    Dash {
        /// Instance ID pattern (job, run or job@run; `*` and `?` allowed)
        #[arg(value_name = "PATTERN")]
        pattern: Option<String>,

        /// Number of history runs shown (default: history_limit from config)
        #[arg(short = 'n', long = "history")]
        history: Option<usize>,
    },

    /// Detail screen of a single instance
    ///
    /// Opens the live screen when exactly one active instance matches and a
    /// selector when several do. With no active match the most recent ended
    /// runs are offered instead.
    Instance {
        #[arg(value_name = "PATTERN")]
        pattern: String,
    },

    /// Pick an instance interactively and print its ID
    Select {
        #[arg(value_name = "PATTERN")]
        pattern: Option<String>,
    },

    /// Show active instances
    Ps {
        #[arg(value_name = "PATTERN")]
        patterns: Vec<String>,
    },

    /// Print active instances, then stream lifecycle changes
    Listen {
        #[arg(value_name = "PATTERN")]
        patterns: Vec<String>,

        /// Exit after this many lifecycle changes
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Print the latest output of active instances
    Tail {
        #[arg(value_name = "PATTERN")]
        patterns: Vec<String>,

        /// Keep printing new output as it arrives
        #[arg(short, long)]
        follow: bool,
    },

    /// Show ended runs, most recent first
    History {
        #[arg(value_name = "PATTERN")]
        patterns: Vec<String>,

        /// Number of runs shown (default: history_limit from config)
        #[arg(short = 'n', long = "lines")]
        lines: Option<usize>,
    },

    /// Request active instances to stop
    Stop {
        #[arg(value_name = "PATTERN", required = true)]
        patterns: Vec<String>,

        /// Do not ask for confirmation
        #[arg(short, long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["runwatch", "ps", "etl", "--format", "json"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.log_level, LogLevel::Warn);
        match cli.command {
            Commands::Ps { patterns } => assert_eq!(patterns, vec!["etl"]),
            _ => panic!("expected ps"),
        }
    }

    #[test]
    fn test_tail_and_history_flags() {
        let cli = Cli::try_parse_from(["runwatch", "tail", "-f", "etl"]).unwrap();
        match cli.command {
            Commands::Tail { patterns, follow } => {
                assert_eq!(patterns, vec!["etl"]);
                assert!(follow);
            }
            _ => panic!("expected tail"),
        }

        let cli = Cli::try_parse_from(["runwatch", "history", "-n", "5"]).unwrap();
        assert!(matches!(cli.command, Commands::History { lines: Some(5), .. }));
    }

    #[test]
    fn test_stop_requires_pattern() {
        assert!(Cli::try_parse_from(["runwatch", "stop"]).is_err());
        let cli = Cli::try_parse_from(["runwatch", "stop", "-f", "backup*"]).unwrap();
        assert!(matches!(cli.command, Commands::Stop { force: true, .. }));
    }
}

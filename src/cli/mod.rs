//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for railpos using clap.

pub mod commands;

use crate::config::{load_config_with_secrets, RailposConfig};
use crate::domain::Result;
use clap::{Parser, Subcommand};

/// Exit code for a clean run or shutdown
pub const EXIT_OK: i32 = 0;

/// Exit code for missing or invalid configuration
pub const EXIT_CONFIG: i32 = 2;

/// Exit code when a remote service cannot be reached at startup
pub const EXIT_CONNECTION: i32 = 4;

/// Exit code for any other fatal error
pub const EXIT_FATAL: i32 = 5;

/// railpos - GTFS-realtime vehicle positions to Elasticsearch
#[derive(Parser, Debug)]
#[command(name = "railpos")]
#[command(version, about, long_about = None)]
#[command(author = "Railpos Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "railpos.toml", env = "RAILPOS_CONFIG")]
    pub config: String,

    /// Path to a secrets file merged over the configuration file
    #[arg(short, long, env = "RAILPOS_SECRETS_FILE")]
    pub secrets: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "RAILPOS_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Loads the configuration named by `--config` and `--secrets`
    pub fn load_config(&self) -> Result<RailposConfig> {
        load_config_with_secrets(&self.config, self.secrets.as_deref())
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Poll the feed and index vehicle positions until stopped
    Run(commands::run::RunArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Create an APM deployment annotation in Kibana
    Annotate(commands::annotate::AnnotateArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_run() {
        let cli = Cli::parse_from(["railpos", "run"]);
        assert_eq!(cli.config, "railpos.toml");
        assert!(cli.secrets.is_none());
        match cli.command {
            Commands::Run(args) => {
                assert!(!args.once);
                assert!(args.max_iterations.is_none());
            }
            other => panic!("Expected run, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_run_once() {
        let cli = Cli::parse_from(["railpos", "run", "--once"]);
        assert!(matches!(cli.command, Commands::Run(ref args) if args.once));
    }

    #[test]
    fn test_cli_parse_run_max_iterations() {
        let cli = Cli::parse_from(["railpos", "run", "--max-iterations", "3"]);
        assert!(matches!(cli.command, Commands::Run(ref args) if args.max_iterations == Some(3)));
    }

    #[test]
    fn test_cli_once_conflicts_with_max_iterations() {
        let result = Cli::try_parse_from(["railpos", "run", "--once", "--max-iterations", "3"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parse_with_config_and_secrets() {
        let cli = Cli::parse_from([
            "railpos",
            "--config",
            "custom.toml",
            "--secrets",
            ".secrets.toml",
            "validate-config",
        ]);
        assert_eq!(cli.config, "custom.toml");
        assert_eq!(cli.secrets.as_deref(), Some(".secrets.toml"));
        assert!(matches!(cli.command, Commands::ValidateConfig(_)));
    }

    #[test]
    fn test_cli_parse_with_log_level() {
        let cli = Cli::parse_from(["railpos", "--log-level", "debug", "run"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_cli_parse_annotate() {
        let cli = Cli::parse_from(["railpos", "annotate", "-m", "hotfix", "-v", "1.2.1"]);
        match cli.command {
            Commands::Annotate(args) => {
                assert_eq!(args.message.as_deref(), Some("hotfix"));
                assert_eq!(args.version.as_deref(), Some("1.2.1"));
            }
            other => panic!("Expected annotate, got {other:?}"),
        }
    }
}

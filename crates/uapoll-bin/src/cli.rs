// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI argument parsing and command definitions.
//!
//! - `run`: Poll the configured nodes (default)
//! - `validate`: Validate the configuration file and print the read plan
//! - `version`: Show version information

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use uapoll_config::{LogFormat, LogLevel};

// =============================================================================
// Main CLI Structure
// =============================================================================

/// uapoll - OPC UA polling collector
///
/// Reads a fixed set of OPC UA nodes on every tick and emits one metric
/// record per metric name.
#[derive(Parser, Debug)]
#[command(
    name = "uapoll",
    author = "Sylvex <contact@sylvex.io>",
    version = uapoll_opcua::VERSION,
    about = "OPC UA polling collector",
    long_about = None,
    propagate_version = true
)]
pub struct Cli {
    /// Configuration file path
    #[arg(
        short,
        long,
        default_value = "uapoll.toml",
        env = "UAPOLL_CONFIG",
        global = true
    )]
    pub config: PathBuf,

    /// Log level (trace, debug, info, warn, error). Overrides `[logging]`.
    #[arg(
        short,
        long,
        env = "UAPOLL_LOG_LEVEL",
        global = true,
        value_parser = parse_log_level
    )]
    pub log_level: Option<LogLevel>,

    /// Log format (text, compact, json). Overrides `[logging]`.
    #[arg(
        long,
        env = "UAPOLL_LOG_FORMAT",
        global = true,
        value_parser = parse_log_format
    )]
    pub log_format: Option<LogFormat>,

    /// Enable quiet mode (warnings and errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

// =============================================================================
// Subcommands
// =============================================================================

/// Available subcommands for the uapoll CLI.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start polling
    ///
    /// This is the default command when no subcommand is specified.
    /// Records are written as JSON lines until SIGINT or SIGTERM.
    Run(RunArgs),

    /// Validate the configuration file
    ///
    /// Parses the configuration and builds the read plan without
    /// contacting the server.
    Validate(ValidateArgs),

    /// Show detailed version information
    Version,
}

// =============================================================================
// Command Arguments
// =============================================================================

/// Arguments for the `run` command.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Run a single tick, write its records and exit
    #[arg(long)]
    pub once: bool,

    /// Output file path. Use '-' for stdout.
    #[arg(short, long, default_value = "-")]
    pub output: PathBuf,
}

/// Arguments for the `validate` command.
#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    /// Print every node of the read plan
    #[arg(short, long)]
    pub show_plan: bool,

    /// Output format for validation results
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// Strict mode: treat warnings as errors
    #[arg(long)]
    pub strict: bool,
}

// =============================================================================
// Enums
// =============================================================================

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for programmatic parsing
    Json,
}

fn parse_log_level(value: &str) -> Result<LogLevel, String> {
    LogLevel::parse(value).ok_or_else(|| format!("unknown log level '{}'", value))
}

fn parse_log_format(value: &str) -> Result<LogFormat, String> {
    LogFormat::parse(value).ok_or_else(|| format!("unknown log format '{}'", value))
}

// =============================================================================
// Helper Methods
// =============================================================================

impl Cli {
    /// Parse CLI arguments from the command line.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the effective command, defaulting to `Run` if none specified.
    pub fn effective_command(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or_else(|| Commands::Run(RunArgs::default()))
    }

    /// Resolves the log level from flags, falling back to `configured`.
    pub fn effective_log_level(&self, configured: LogLevel) -> LogLevel {
        if self.quiet {
            LogLevel::Warn
        } else if self.verbose {
            LogLevel::Debug
        } else {
            self.log_level.unwrap_or(configured)
        }
    }

    /// Resolves the log format, falling back to `configured`.
    pub fn effective_log_format(&self, configured: LogFormat) -> LogFormat {
        self.log_format.unwrap_or(configured)
    }
}

impl RunArgs {
    /// Returns `true` if records go to stdout.
    pub fn writes_to_stdout(&self) -> bool {
        self.output.as_os_str() == "-"
    }
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            once: false,
            output: PathBuf::from("-"),
        }
    }
}

impl Default for ValidateArgs {
    fn default() -> Self {
        Self {
            show_plan: false,
            format: OutputFormat::Text,
            strict: false,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command() {
        let cli = Cli::parse_from(["uapoll"]);
        assert!(cli.command.is_none());
        match cli.effective_command() {
            Commands::Run(args) => {
                assert!(!args.once);
                assert!(args.writes_to_stdout());
            }
            other => panic!("Expected Run command, got {:?}", other),
        }
    }

    #[test]
    fn test_run_command() {
        let cli = Cli::parse_from(["uapoll", "run", "--once", "-o", "/tmp/out.jsonl"]);
        if let Some(Commands::Run(args)) = cli.command {
            assert!(args.once);
            assert!(!args.writes_to_stdout());
            assert_eq!(args.output, PathBuf::from("/tmp/out.jsonl"));
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn test_validate_command() {
        let cli = Cli::parse_from(["uapoll", "validate", "--show-plan", "-f", "json", "--strict"]);
        if let Some(Commands::Validate(args)) = cli.command {
            assert!(args.show_plan);
            assert!(args.strict);
            assert_eq!(args.format, OutputFormat::Json);
        } else {
            panic!("Expected Validate command");
        }
    }

    #[test]
    fn test_config_path() {
        let cli = Cli::parse_from(["uapoll", "-c", "/etc/uapoll/uapoll.yaml", "version"]);
        assert_eq!(cli.config, PathBuf::from("/etc/uapoll/uapoll.yaml"));
        assert!(matches!(cli.command, Some(Commands::Version)));
    }

    #[test]
    fn test_log_flags_override_config() {
        let cli = Cli::parse_from(["uapoll", "-l", "DEBUG", "--log-format", "json"]);
        assert_eq!(cli.effective_log_level(LogLevel::Error), LogLevel::Debug);
        assert_eq!(cli.effective_log_format(LogFormat::Text), LogFormat::Json);
    }

    #[test]
    fn test_config_log_settings_used_without_flags() {
        let cli = Cli::parse_from(["uapoll"]);
        if cli.log_level.is_none() {
            assert_eq!(cli.effective_log_level(LogLevel::Error), LogLevel::Error);
        }
        if cli.log_format.is_none() {
            assert_eq!(cli.effective_log_format(LogFormat::Compact), LogFormat::Compact);
        }
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        assert!(Cli::try_parse_from(["uapoll", "-l", "loud"]).is_err());
    }

    #[test]
    fn test_quiet_and_verbose() {
        let cli = Cli::parse_from(["uapoll", "-q"]);
        assert_eq!(cli.effective_log_level(LogLevel::Trace), LogLevel::Warn);

        let cli = Cli::parse_from(["uapoll", "-v"]);
        assert_eq!(cli.effective_log_level(LogLevel::Info), LogLevel::Debug);
    }
}

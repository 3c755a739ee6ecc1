//! Command-line interface for frbvault.
//!
//! This module provides the CLI structure for the `frbctl` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    actions_label, ConfigCommand, ListCommand, OutputFormat, RecordCommand, ShowCommand,
    StatsCommand, StatusArg, StatusCommand, SubmitCommand,
};

use crate::logging::Verbosity;

/// frbctl - Submit and track fast radio burst observations
///
/// Records live in a key-value contract and move through
/// raw, processed and analyzed.
#[derive(Debug, Parser)]
#[command(name = "frbctl")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Act as this account instead of the configured ones
    #[arg(long, global = true, value_name = "ADDR")]
    pub account: Option<String>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List records and the actions available on them
    List(ListCommand),

    /// Show one record with its decoded payload
    Show(ShowCommand),

    /// Submit a new observation
    Submit(SubmitCommand),

    /// Move a raw record to processed
    Process(RecordCommand),

    /// Move a processed record to analyzed
    Analyze(RecordCommand),

    /// Show per-status record counts
    Stats(StatsCommand),

    /// Show contract and wallet status
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_name() {
        assert_eq!(Cli::command().get_name(), "frbctl");
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_flags() {
        assert_eq!(parse(&["frbctl", "-q", "stats"]).verbosity(), Verbosity::Quiet);
        assert_eq!(parse(&["frbctl", "stats"]).verbosity(), Verbosity::Normal);
        assert_eq!(parse(&["frbctl", "-v", "stats"]).verbosity(), Verbosity::Verbose);
        assert_eq!(parse(&["frbctl", "-vv", "stats"]).verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_parse_list() {
        let cli = parse(&["frbctl", "list", "--status", "processed", "-f", "json"]);
        match cli.command {
            Command::List(list) => {
                assert_eq!(list.status, Some(StatusArg::Processed));
                assert_eq!(list.format, OutputFormat::Json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_submit() {
        let cli = parse(&[
            "frbctl",
            "submit",
            "--observatory",
            "CHIME",
            "--frequency",
            "1400",
            "--signal-strength",
            "-3",
        ]);
        match cli.command {
            Command::Submit(submit) => {
                assert_eq!(submit.observatory, "CHIME");
                assert_eq!(submit.signal_strength, "-3");
                assert_eq!(submit.location, "");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_submit_requires_frequency() {
        let result = Cli::try_parse_from([
            "frbctl",
            "submit",
            "--observatory",
            "CHIME",
            "--signal-strength",
            "3",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_process_and_analyze() {
        assert!(matches!(
            parse(&["frbctl", "process", "17-abc"]).command,
            Command::Process(RecordCommand { ref id }) if id == "17-abc"
        ));
        assert!(matches!(
            parse(&["frbctl", "analyze", "17-abc"]).command,
            Command::Analyze(_)
        ));
    }

    #[test]
    fn test_parse_global_account() {
        let cli = parse(&["frbctl", "status", "--account", "CHIME"]);
        assert_eq!(cli.account.as_deref(), Some("CHIME"));
    }

    #[test]
    fn test_parse_with_config() {
        let cli = parse(&["frbctl", "-c", "/custom/config.toml", "stats"]);
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }

    #[test]
    fn test_parse_config_validate() {
        let cli = parse(&["frbctl", "config", "validate", "--file", "x.toml"]);
        assert!(matches!(
            cli.command,
            Command::Config(ConfigCommand::Validate { file: Some(_) })
        ));
    }
}

//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::record::{Draft, Status};
use crate::state::Action;

/// List command arguments.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Only show records with this status
    #[arg(short, long, value_enum)]
    pub status: Option<StatusArg>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Show command arguments.
#[derive(Debug, Args)]
pub struct ShowCommand {
    /// Record id
    pub id: String,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Submit command arguments.
#[derive(Debug, Args)]
pub struct SubmitCommand {
    /// Observatory that made the observation
    #[arg(short, long)]
    pub observatory: String,

    /// Frequency in MHz
    #[arg(short, long)]
    pub frequency: String,

    /// Signal strength (integer)
    #[arg(short, long, allow_hyphen_values = true)]
    pub signal_strength: String,

    /// Sky location, free text
    #[arg(short, long, default_value = "")]
    pub location: String,
}

impl SubmitCommand {
    /// Turn the arguments into an unvalidated draft.
    #[must_use]
    pub fn into_draft(self) -> Draft {
        Draft {
            observatory: self.observatory,
            frequency: self.frequency,
            signal_strength: self.signal_strength,
            location: self.location,
        }
    }
}

/// Arguments for commands acting on one record.
#[derive(Debug, Args)]
pub struct RecordCommand {
    /// Record id
    pub id: String,
}

/// Stats command arguments.
#[derive(Debug, Args)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Status argument for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    /// Awaiting processing
    Raw,
    /// Awaiting analysis
    Processed,
    /// Finished
    Analyzed,
}

impl From<StatusArg> for Status {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Raw => Self::Raw,
            StatusArg::Processed => Self::Processed,
            StatusArg::Analyzed => Self::Analyzed,
        }
    }
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// One line per record
    Plain,
    /// Aligned columns with a header
    #[default]
    Table,
    /// JSON output
    Json,
}

/// Render actions as a short comma-separated label.
#[must_use]
pub fn actions_label(actions: &[Action]) -> String {
    if actions.is_empty() {
        return "-".to_string();
    }
    actions
        .iter()
        .map(|a| match a {
            Action::Process => "process",
            Action::Analyze => "analyze",
        })
        .collect::<Vec<_>>()
        .join(",")
}

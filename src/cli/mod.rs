//! CLI definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::model::VisibilityFilter;

pub mod commands;

/// Rusunawa issue workflow inspector
#[derive(Parser, Debug)]
#[command(name = "rusunawa", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Collaborator API base URL [env: RUSUNAWA_API_URL] (default: http://localhost:8080/api)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inspect issues on the collaborator backend
    Issue {
        #[command(subcommand)]
        command: IssueCommands,
    },

    /// Status workflow and attachment classification rules
    Workflow {
        #[command(subcommand)]
        command: WorkflowCommands,
    },

    /// Configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Print version information
    Version,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

// ============================================================================
// Issue Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum IssueCommands {
    /// Show an issue with its workflow position and evidence summary
    Show {
        /// Issue ID
        id: i64,
    },

    /// List an issue's photos grouped by phase
    Evidence {
        /// Issue ID
        id: i64,

        /// Only this phase (report, progress, completion, feedback)
        #[arg(long)]
        phase: Option<String>,

        /// Fetch attachment content to report availability and size
        #[arg(long)]
        content: bool,
    },

    /// Show an issue's comment threads
    Comments {
        /// Issue ID
        id: i64,

        /// Which comments to include
        #[arg(long, value_enum, default_value_t)]
        visibility: VisibilityArg,
    },

    /// Show an issue's status history
    History {
        /// Issue ID
        id: i64,
    },
}

/// Comment visibility selector.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VisibilityArg {
    #[default]
    All,
    Public,
    Internal,
}

impl From<VisibilityArg> for VisibilityFilter {
    fn from(arg: VisibilityArg) -> Self {
        match arg {
            VisibilityArg::All => Self::All,
            VisibilityArg::Public => Self::Public,
            VisibilityArg::Internal => Self::Internal,
        }
    }
}

// ============================================================================
// Workflow Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum WorkflowCommands {
    /// Show the next status and whether moving there needs a photo
    Next {
        /// Current status (synonyms like "wip" or "done" are accepted)
        status: String,
    },

    /// Classify an attachment into a workflow phase
    Classify {
        /// Explicit phase set by the uploader
        #[arg(long)]
        phase: Option<String>,

        /// Legacy attachment type tag
        #[arg(long)]
        tag: Option<String>,
    },

    /// Validate a status update and its photos without sending it
    Check {
        /// Current status
        from: String,

        /// Requested status
        to: String,

        /// Photo to attach (repeatable)
        #[arg(long = "photo")]
        photos: Vec<PathBuf>,

        /// Photo to attach as the primary one (repeatable; more than one is rejected)
        #[arg(long = "primary")]
        primary: Vec<PathBuf>,

        /// Note recorded with the status change
        #[arg(long)]
        note: Option<String>,
    },
}

// ============================================================================
// Config Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective configuration and where each value came from
    Show,
}

//! CLI command definitions for the `tq` runner

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

/// tq - drive a plan of keyed, timed operations through a schedule
#[derive(Parser, Debug)]
#[command(name = "tq", author, version, about = "Run a plan of keyed timed operations through a schedule", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run every operation in a plan until the schedule drains
    Run {
        /// Plan file (YAML)
        #[arg(short, long, required = true)]
        plan: PathBuf,

        /// Use a virtual clock that jumps straight to each deadline
        #[arg(short, long)]
        simulate: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Validate a plan file and show when each operation would first fire
    Check {
        /// Plan file (YAML)
        #[arg(required = true)]
        plan: PathBuf,
    },
}

/// Output format for fired operations
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

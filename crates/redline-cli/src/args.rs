use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    name = "redline",
    version,
    about = "Screen text for sensitive data before it reaches an AI service"
)]
pub struct Args {
    /// Input files, one fragment each, evaluated in order within one
    /// session. Reads stdin when none are given or for `-`.
    pub inputs: Vec<PathBuf>,

    /// Session id shared by all inputs of this run
    #[arg(long, default_value = "cli")]
    pub session: String,

    /// Policy file (JSON, one policy or an array); repeatable
    #[arg(long = "policy", value_name = "FILE")]
    pub policies: Vec<PathBuf>,

    /// Start from an empty catalog instead of the built-in rules
    #[arg(long)]
    pub no_builtin: bool,

    /// Engine configuration file (JSON)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "json")]
    pub format: OutputFormat,

    /// Write output to a file instead of stdout
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Print the effective rule catalog and exit
    #[arg(long)]
    pub list_rules: bool,

    /// Log filter for stderr, e.g. `debug` or `redline_core=trace`.
    /// Overrides RUST_LOG.
    #[arg(long, value_name = "FILTER")]
    pub log_level: Option<String>,

    /// Optional git commit hash for tool metadata
    #[arg(long)]
    pub commit: Option<String>,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}

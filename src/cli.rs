use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Only show failures
    Quiet,
    /// Show standard information
    #[default]
    Normal,
    /// Show every error and the matched operation
    Verbose,
}

/// How results are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

/// Validate HTTP requests against a compiled API description
#[derive(Parser, Debug, Clone)]
#[command(name = "validate-api")]
#[command(about = "Compile API description documents and validate requests against them")]
#[command(version)]
pub struct Cli {
    /// Description documents (JSON or YAML), later ones win on collision
    #[arg(short = 's', long = "schema", action = clap::ArgAction::Append)]
    pub schemas: Vec<PathBuf>,

    /// Configuration file (TOML or JSON)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", help = "Enable verbose output")]
    pub verbose: bool,

    /// Enable quiet mode (failures only)
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Quiet mode",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,

    /// Output format
    #[arg(long = "format", value_enum)]
    pub output_format: Option<OutputFormat>,

    /// Log filter, e.g. `debug` or `validate_api=trace`
    #[arg(long = "log-level")]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long = "log-json")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Validate a single request
    Check(CheckArgs),
    /// List compiled operations in match order
    Routes,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct CheckArgs {
    /// HTTP method
    #[arg(short = 'X', long = "method", default_value = "GET")]
    pub method: String,

    /// Request target, path plus optional query (`/api/pets?limit=10`)
    pub target: String,

    /// Inline JSON body
    #[arg(short = 'd', long = "body", conflicts_with = "body_file")]
    pub body: Option<String>,

    /// Read the JSON body from a file
    #[arg(long = "body-file")]
    pub body_file: Option<PathBuf>,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

//! CLI Argument Structures
//!
//! Command structures and argument enums used by the qualgate binary.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Quality gate evaluation and search indexing
#[derive(Parser)]
#[command(name = "qualgate")]
#[command(version = VERSION)]
#[command(about = "Qualgate - quality gate evaluation and incremental search indexing")]
#[command(long_about = "
Evaluate projects against their quality gate and keep the active rule and
source line indexes in step with the store.

Common Usage:

  # Create the store schema
  qualgate init-store

  # Evaluate a project, failing with exit code 1 when the gate fails
  qualgate evaluate --project 0b5f3c1e

  # Rebuild empty indexes, then catch up with later changes
  qualgate index all
  qualgate index active-rules --mode incremental
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (YAML); defaults apply when omitted
    #[arg(short, long, global = true, env = "QUALGATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create or upgrade the store schema and index tables
    #[command(name = "init-store")]
    InitStore,

    /// Evaluate the effective quality gate of a project
    Evaluate(EvaluateArgs),

    /// Run an indexing pass
    Index(IndexArgs),

    /// Print default configuration in YAML format
    #[command(name = "print-default-config")]
    PrintDefaultConfig,

    /// Validate a qualgate configuration file
    #[command(name = "validate-config")]
    ValidateConfig(ValidateConfigArgs),
}

#[derive(Args)]
pub struct EvaluateArgs {
    /// Project uuid
    #[arg(short, long)]
    pub project: String,

    /// Print the verdict as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct IndexArgs {
    /// Index to feed
    #[arg(value_enum)]
    pub target: IndexTarget,

    /// Indexing pass to run
    #[arg(long, value_enum, default_value = "startup")]
    pub mode: IndexMode,

    /// Rebuild at startup even when the index already holds documents
    #[arg(long)]
    pub force: bool,

    /// Scope keys (profiles or projects) skipped by startup indexing
    #[arg(long = "exclude", value_name = "SCOPE")]
    pub excluded_scopes: Vec<String>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum IndexTarget {
    /// Active rules of quality profiles
    ActiveRules,
    /// Source lines of files
    SourceLines,
    /// Every index
    All,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum IndexMode {
    /// Full rebuild of empty indexes
    Startup,
    /// Rows changed since the last pass
    Incremental,
}

#[derive(Args)]
pub struct ValidateConfigArgs {
    /// Configuration file to validate
    pub file: PathBuf,
}

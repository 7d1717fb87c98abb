//! CLI argument parsing using clap derive macros.
//!
//! This module defines the command-line interface for the dfq CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// dfq - compile and run dynamic filter requests
#[derive(Parser, Debug)]
#[command(name = "dfq")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable colors in output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compile a query string into a filter expression
    #[command(alias = "c")]
    Compile {
        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        deleted: DeletedArgs,

        /// Query string, e.g. "name=coffee&price_min=10&ordering=-price"
        query: String,
    },

    /// List the filterable fields of a model
    Fields {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Run a query over rows from a JSON file
    Run {
        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        deleted: DeletedArgs,

        /// JSON file holding an array of row objects
        #[arg(short, long)]
        data: PathBuf,

        /// Query string
        query: String,
    },

    /// View and manage configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Which schema and model a command works on.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Schema file (TOML, or JSON with a .json extension)
    #[arg(short, long, env = "DFQ_SCHEMA")]
    pub schema: PathBuf,

    /// Model name within the schema
    #[arg(short, long)]
    pub model: String,

    /// Restrict filtering to these fields
    #[arg(long, value_delimiter = ',')]
    pub fields: Option<Vec<String>>,

    /// Extra fields to search with the `search` parameter
    #[arg(long, value_delimiter = ',')]
    pub search_fields: Vec<String>,

    /// Fields that may never be filtered or searched
    #[arg(long, value_delimiter = ',')]
    pub exclude: Vec<String>,
}

/// Soft-delete scope flags.
#[derive(Args, Debug, Clone, Default)]
pub struct DeletedArgs {
    /// Include soft-deleted rows
    #[arg(long, conflicts_with = "only_deleted")]
    pub with_deleted: bool,

    /// Only soft-deleted rows
    #[arg(long)]
    pub only_deleted: bool,

    /// Field marking a row as deleted (default from config, then is_deleted)
    #[arg(long)]
    pub deleted_flag: Option<String>,
}

/// Shell types for completions
#[derive(ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    Powershell,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Write a commented default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print config file path
    Path,
}

//! Command implementations for the dfq CLI.
//!
//! This module contains the actual command handlers that are invoked by the CLI.

pub mod compile;
pub mod completions;
pub mod config;
pub mod fields;
pub mod run;

use std::sync::Arc;

use dynfilter::engine::DEFAULT_DELETED_FLAG;
use dynfilter::prelude::*;
use dynfilter_schema::prelude::{Catalog, SchemaError};

use crate::cli::{Cli, DeletedArgs, TargetArgs};
use config::Config;

/// Error type for command execution.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Schema file could not be loaded.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Request or descriptor error.
    #[error("{0}")]
    Filter(#[from] FilterError),

    /// Row data could not be loaded.
    #[error("data error: {0}")]
    Data(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ValidationError> for CommandError {
    fn from(err: ValidationError) -> Self {
        CommandError::Filter(err.into())
    }
}

impl From<EngineError> for CommandError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Filter(err) => CommandError::Filter(err),
            EngineError::InvalidRows(message) => CommandError::Data(message),
        }
    }
}

/// Result type for command execution.
pub type Result<T> = std::result::Result<T, CommandError>;

/// Context for command execution, containing common dependencies.
pub struct CommandContext {
    /// Whether to output JSON.
    pub json_output: bool,
    /// Whether to use colors.
    pub use_colors: bool,
    /// Whether to be quiet (errors only).
    pub quiet: bool,
    /// Loaded configuration file.
    pub config: Config,
}

impl CommandContext {
    /// Creates a new command context from CLI arguments and the config file.
    pub fn new(cli: &Cli, config: Config) -> Self {
        let color_enabled = config.output.color.unwrap_or(true);
        Self {
            json_output: cli.json,
            use_colors: !cli.no_color && color_enabled && std::env::var_os("NO_COLOR").is_none(),
            quiet: cli.quiet,
            config,
        }
    }

    /// Filter options from the config file.
    pub fn options(&self) -> FilterOptions {
        self.config.filter.clone()
    }
}

/// Loads the catalog and describes the target model.
pub(crate) fn describe(ctx: &CommandContext, target: &TargetArgs) -> Result<Arc<Descriptors>> {
    let catalog = Catalog::load(&target.schema)?;
    let registry =
        Registry::new(catalog).with_unknown_type_policy(ctx.config.filter.unknown_type_policy);
    let descriptors = registry.describe(&target.model)?;
    tracing::debug!(
        schema = %target.schema.display(),
        model = %target.model,
        fields = descriptors.len(),
        "described model"
    );
    Ok(descriptors)
}

/// The request-level field configuration from the command line.
pub(crate) fn filter_config(target: &TargetArgs) -> FilterConfig {
    let mut config = FilterConfig::default()
        .search_fields(target.search_fields.iter())
        .exclude_fields(target.exclude.iter());
    if let Some(fields) = &target.fields {
        config = config.filter_fields(fields.iter());
    }
    config
}

/// The soft-delete base expression, or `Always` when the model has no
/// deleted flag.
pub(crate) fn deleted_scope(
    ctx: &CommandContext,
    descriptors: &Descriptors,
    args: &DeletedArgs,
) -> Expr {
    let flag = args
        .deleted_flag
        .as_deref()
        .or(ctx.config.soft_delete.flag.as_deref())
        .unwrap_or(DEFAULT_DELETED_FLAG);

    if !descriptors.contains(flag) {
        return Expr::Always;
    }

    let scope = if args.with_deleted {
        DeletedScope::WithDeleted
    } else if args.only_deleted {
        DeletedScope::OnlyDeleted
    } else {
        DeletedScope::Active
    };
    scope.expression(flag)
}

/// Compiles `query` for the target model.
pub(crate) fn compile_plan(
    ctx: &CommandContext,
    descriptors: &Descriptors,
    target: &TargetArgs,
    deleted: &DeletedArgs,
    query: &str,
) -> Result<FilterPlan> {
    let params = RequestParams::parse(query)?;
    let base = deleted_scope(ctx, descriptors, deleted);
    let plan = FilterSet::new(descriptors)
        .with_config(filter_config(target))
        .with_options(ctx.options())
        .apply_with_base(base, &params)?;
    Ok(plan)
}

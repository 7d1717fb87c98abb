use std::env;
use std::process::ExitCode;

use clap::Parser;
use dynfilter_schema::prelude::SchemaError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;
mod commands;

use cli::{Cli, Commands, ConfigCommands};
use commands::compile::CompileOptions;
use commands::config::load_config;
use commands::run::RunOptions;
use commands::{CommandContext, CommandError};

/// Log filter variable, checked before `RUST_LOG`.
const LOG_ENV: &str = "DFQ_LOG";

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.json {
                let error_json = serde_json::json!({
                    "error": {
                        "code": error_code(&e),
                        "message": e.to_string(),
                    }
                });
                eprintln!(
                    "{}",
                    serde_json::to_string_pretty(&error_json).unwrap_or_else(|_| error_json.to_string())
                );
            } else {
                eprintln!("Error: {e}");
            }
            error_exit_code(&e)
        }
    }
}

fn init_logging(cli: &Cli) {
    let default_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    let filter = env::var(LOG_ENV)
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn run(cli: &Cli) -> commands::Result<()> {
    // These work without a readable config file.
    match &cli.command {
        Commands::Completions { shell } => return Ok(commands::completions::execute(shell)?),
        Commands::Config {
            command: Some(ConfigCommands::Path),
        } => {
            let ctx = CommandContext::new(cli, Default::default());
            return commands::config::execute_path(&ctx);
        }
        Commands::Config {
            command: Some(ConfigCommands::Init { force }),
        } => {
            let ctx = CommandContext::new(cli, Default::default());
            return commands::config::execute_init(&ctx, *force);
        }
        _ => {}
    }

    let ctx = CommandContext::new(cli, load_config()?);

    match &cli.command {
        Commands::Compile {
            target,
            deleted,
            query,
        } => commands::compile::execute(
            &ctx,
            &CompileOptions {
                target,
                deleted,
                query,
            },
        ),
        Commands::Fields { target } => commands::fields::execute(&ctx, target),
        Commands::Run {
            target,
            deleted,
            data,
            query,
        } => commands::run::execute(
            &ctx,
            &RunOptions {
                target,
                deleted,
                data,
                query,
            },
        ),
        Commands::Config { command: None }
        | Commands::Config {
            command: Some(ConfigCommands::Show),
        } => commands::config::execute_show(&ctx),
        Commands::Config { .. } | Commands::Completions { .. } => Ok(()),
    }
}

/// Returns the error code string for JSON output.
fn error_code(e: &CommandError) -> &'static str {
    match e {
        CommandError::Schema(_) => "SCHEMA_ERROR",
        CommandError::Filter(err) if err.is_validation() => "VALIDATION_ERROR",
        CommandError::Filter(_) => "FILTER_ERROR",
        CommandError::Data(_) => "DATA_ERROR",
        CommandError::Config(_) => "CONFIG_ERROR",
        CommandError::Io(_) => "IO_ERROR",
        CommandError::Json(_) => "JSON_ERROR",
    }
}

/// Returns the exit code for an error: 2 for bad requests, schemas, data or
/// config, 1 for unreadable files and output failures.
fn error_exit_code(e: &CommandError) -> ExitCode {
    match e {
        CommandError::Schema(SchemaError::Io { .. }) => ExitCode::from(1),
        CommandError::Schema(_)
        | CommandError::Filter(_)
        | CommandError::Data(_)
        | CommandError::Config(_) => ExitCode::from(2),
        CommandError::Io(_) | CommandError::Json(_) => ExitCode::from(1),
    }
}

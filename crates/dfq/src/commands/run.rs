//! Run command implementation.
//!
//! Compiles a query and evaluates it over rows loaded from a JSON file.

use std::fs;
use std::io;
use std::path::PathBuf;

use dynfilter::engine::{MemoryEngine, QueryEngine};
use owo_colors::OwoColorize;

use super::{compile_plan, describe, CommandContext, CommandError, Result};
use crate::cli::{DeletedArgs, TargetArgs};

/// Options for the run command.
pub struct RunOptions<'a> {
    pub target: &'a TargetArgs,
    pub deleted: &'a DeletedArgs,
    pub data: &'a PathBuf,
    pub query: &'a str,
}

/// Executes the run command.
pub fn execute(ctx: &CommandContext, opts: &RunOptions<'_>) -> Result<()> {
    let descriptors = describe(ctx, opts.target)?;
    let plan = compile_plan(ctx, &descriptors, opts.target, opts.deleted, opts.query)?;

    let source = fs::read_to_string(opts.data).map_err(|e| {
        CommandError::Io(io::Error::new(
            e.kind(),
            format!("failed to read {}: {}", opts.data.display(), e),
        ))
    })?;
    let engine = MemoryEngine::from_json_str(&source)?;
    let rows = engine.execute(&plan.expression, &plan.ordering)?;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    for row in &rows {
        println!("{}", serde_json::to_string(row)?);
    }
    if !ctx.quiet {
        let summary = format!("{} of {} rows matched", rows.len(), engine.len());
        if ctx.use_colors {
            eprintln!("{}", summary.dimmed());
        } else {
            eprintln!("{}", summary);
        }
    }

    Ok(())
}

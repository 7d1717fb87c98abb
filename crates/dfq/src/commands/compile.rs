//! Compile command implementation.
//!
//! Prints the filter expression and ordering a query string compiles to.

use owo_colors::OwoColorize;

use super::{compile_plan, describe, CommandContext, Result};
use crate::cli::{DeletedArgs, TargetArgs};

/// Options for the compile command.
pub struct CompileOptions<'a> {
    pub target: &'a TargetArgs,
    pub deleted: &'a DeletedArgs,
    pub query: &'a str,
}

/// Executes the compile command.
pub fn execute(ctx: &CommandContext, opts: &CompileOptions<'_>) -> Result<()> {
    let descriptors = describe(ctx, opts.target)?;
    let plan = compile_plan(ctx, &descriptors, opts.target, opts.deleted, opts.query)?;

    if ctx.json_output {
        let output = serde_json::json!({
            "model": opts.target.model,
            "expression": plan.expression,
            "display": plan.expression.to_string(),
            "ordering": plan.ordering,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{}", plan.expression);
    if !plan.ordering.is_empty() && !ctx.quiet {
        let keys: Vec<String> = plan.ordering.iter().map(ToString::to_string).collect();
        let label = "order by:";
        if ctx.use_colors {
            println!("{} {}", label.dimmed(), keys.join(", "));
        } else {
            println!("{} {}", label, keys.join(", "));
        }
    }

    Ok(())
}

//! Fields command implementation.
//!
//! Lists the filterable fields of a model with their lookups.

use dynfilter::registry::FieldMetadata;
use owo_colors::OwoColorize;

use super::{describe, CommandContext, Result};
use crate::cli::TargetArgs;

/// Executes the fields command.
pub fn execute(ctx: &CommandContext, target: &TargetArgs) -> Result<()> {
    let descriptors = describe(ctx, target)?;
    let fields = descriptors.filterable_fields();

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&fields)?);
        return Ok(());
    }

    if fields.is_empty() {
        if !ctx.quiet {
            println!("No filterable fields on '{}'.", target.model);
        }
        return Ok(());
    }

    let name_width = fields.iter().map(|f| f.name.len()).max().unwrap_or(0);
    for field in &fields {
        println!("{}", format_row(field, name_width, ctx.use_colors));
    }

    Ok(())
}

/// Formats one field as `name  type  lookups`, marking the default lookup
/// with `*`.
fn format_row(field: &FieldMetadata, name_width: usize, use_colors: bool) -> String {
    let lookups: Vec<String> = field
        .lookups
        .iter()
        .map(|lookup| {
            if *lookup == field.default_lookup {
                format!("{}*", lookup.as_str())
            } else {
                lookup.as_str().to_string()
            }
        })
        .collect();

    let mut flags = Vec::new();
    if field.searchable {
        flags.push("search");
    }
    if field.range_filter {
        flags.push("range");
    }

    let name = format!("{:width$}", field.name, width = name_width);
    let semantic_type = format!("{:9}", field.semantic_type.as_str());
    let mut row = if use_colors {
        format!("{}  {}  {}", name.bold(), semantic_type.cyan(), lookups.join(" "))
    } else {
        format!("{}  {}  {}", name, semantic_type, lookups.join(" "))
    };
    if !flags.is_empty() {
        row.push_str(&format!("  [{}]", flags.join(", ")));
    }
    row
}

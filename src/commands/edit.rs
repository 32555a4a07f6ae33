use anyhow::Result;
use tracing::{info, warn};

use crate::cli::EditArgs;
use crate::commands::extract::parse_field_update;
use crate::util::{read_json, write_json_pretty};
use crate::variation::{
    LevelAddition, VariationSet, add_levels, split_bracketed_code, update_field_values,
};

pub fn run(args: EditArgs) -> Result<()> {
    let set: VariationSet = read_json(&args.input)?;
    let output = args.output.clone().unwrap_or_else(|| args.input.clone());

    let mut updates = Vec::new();
    for raw in &args.updates {
        match parse_field_update(raw) {
            Some(update) => updates.push(update),
            None => warn!(edit = %raw, "invalid update format, expected \"Variable:ID=New Value\""),
        }
    }

    let mut additions = Vec::new();
    for raw in &args.additions {
        match parse_level_addition(raw) {
            Some(addition) => additions.push(addition),
            None => warn!(edit = %raw, "invalid add format, expected \"Variable=Value [CODE]\""),
        }
    }

    let (set, update_warnings) = update_field_values(set, &updates);
    let (set, add_warnings) = add_levels(set, &additions);

    write_json_pretty(&output, &set)?;
    info!(
        output = %output.display(),
        updates = updates.len(),
        additions = additions.len(),
        warnings = update_warnings.len() + add_warnings.len(),
        combinations = set.combination_count(),
        "wrote edited variation set"
    );
    Ok(())
}

/// Parses `"Variable=Value"` or `"Variable=Value [CODE]"`.
fn parse_level_addition(raw: &str) -> Option<LevelAddition> {
    let (variable, rest) = raw.split_once('=')?;
    let variable = variable.trim();
    let (value, data) = split_bracketed_code(rest);
    if variable.is_empty() || value.is_empty() {
        return None;
    }

    Some(LevelAddition {
        variable: variable.to_string(),
        value,
        data,
    })
}

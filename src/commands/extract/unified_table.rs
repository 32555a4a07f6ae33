use super::*;

/// Reads every variable row of a unified table into `set`. Returns the
/// variables that gained at least one level.
pub fn extract_unified(
    table: &RawTable,
    layout: &UnifiedLayout,
    profile: &ExtractionProfile,
    set: &mut VariationSet,
) -> Vec<String> {
    let mut gained = Vec::<String>::new();
    for (variable, cells) in variable_rows(table, layout, profile) {
        let mut added = 0_usize;
        for (column, entry) in cells {
            match set.insert_level(&variable, entry) {
                Ok(()) => added += 1,
                Err(conflict) => {
                    debug!(variable = %variable, column, ?conflict, "skipped repeated unified cell")
                }
            }
        }

        if added > 0 && !gained.contains(&variable) {
            gained.push(variable);
        }
    }

    gained
}

/// Levels a unified table holds for one variable, in column order.
pub fn unified_levels_for(
    table: &RawTable,
    layout: &UnifiedLayout,
    profile: &ExtractionProfile,
    variable: &str,
) -> Vec<LevelEntry> {
    variable_rows(table, layout, profile)
        .into_iter()
        .filter(|(name, _)| name == variable)
        .flat_map(|(_, cells)| cells.into_iter().map(|(_, entry)| entry))
        .collect()
}

/// Canonical variable name and parsed level cells for each variable row.
fn variable_rows(
    table: &RawTable,
    layout: &UnifiedLayout,
    profile: &ExtractionProfile,
) -> Vec<(String, Vec<(usize, LevelEntry)>)> {
    let transposed;
    let (rows, layout) = match layout.orientation {
        Orientation::Rows => (table, layout.clone()),
        Orientation::Columns => {
            transposed = transpose(table);
            let width = table_width(&transposed);
            (
                &transposed,
                UnifiedLayout {
                    orientation: Orientation::Rows,
                    variable_column: 0,
                    level_columns: (1..width).collect(),
                    header_rows: 0,
                },
            )
        }
    };

    rows.iter()
        .skip(layout.header_rows)
        .filter_map(|row| {
            let name_cell = cell_text(row, layout.variable_column);
            if !name_cell.chars().any(char::is_alphabetic)
                || profile.is_structural_keyword(name_cell)
            {
                return None;
            }
            let variable = profile.canonical_name(name_cell);
            let cells = layout
                .level_columns
                .iter()
                .filter_map(|column| {
                    let raw = cell_text(row, *column);
                    (!raw.is_empty())
                        .then(|| (*column, unified_cell_entry(raw, *column, &variable, profile)))
                })
                .collect();
            Some((variable, cells))
        })
        .collect()
}

fn unified_cell_entry(
    raw: &str,
    column: usize,
    variable: &str,
    profile: &ExtractionProfile,
) -> LevelEntry {
    let (value, code) = split_bracketed_code(raw);
    let is_default = value.eq_ignore_ascii_case(DEFAULT_CODE)
        || code
            .as_deref()
            .is_some_and(|code| code.eq_ignore_ascii_case(DEFAULT_CODE));

    if is_default {
        let value = if value.is_empty() || value.eq_ignore_ascii_case(DEFAULT_CODE) {
            profile.default_label_for(variable).to_string()
        } else {
            value
        };
        return LevelEntry::sentinel(value);
    }

    LevelEntry::coded(value, code.unwrap_or_else(|| column.to_string()))
}

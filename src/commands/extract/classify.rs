use super::*;

/// Rows inspected when deciding whether a table is relevant.
const PROBE_ROWS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRoles {
    pub identifier: Option<usize>,
    pub value: usize,
    pub code: Option<usize>,
    pub header_rows: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// One variable per row.
    Rows,
    /// One variable per column, named in the header row.
    Columns,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnifiedLayout {
    pub orientation: Orientation,
    pub variable_column: usize,
    pub level_columns: Vec<usize>,
    pub header_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableClass {
    Unified(UnifiedLayout),
    SingleVariable { variable: String, roles: ColumnRoles },
    NotRelevant,
}

pub fn classify_table(
    table: &RawTable,
    profile: &ExtractionProfile,
    positional_columns: bool,
) -> TableClass {
    let width = table_width(table);
    if width == 0 || table.iter().all(|row| row_is_blank(row)) {
        return TableClass::NotRelevant;
    }

    let header = lowered_cells(&table[0]);

    if let Some(variable_column) = header
        .iter()
        .position(|cell| contains_any(cell, &profile.unified_keywords))
    {
        let mut level_columns = header
            .iter()
            .enumerate()
            .filter(|(index, cell)| {
                *index != variable_column && contains_any(cell, &profile.level_column_keywords)
            })
            .map(|(index, _)| index)
            .collect::<Vec<usize>>();
        if level_columns.is_empty() {
            level_columns = (0..width).filter(|index| *index != variable_column).collect();
        }
        return TableClass::Unified(UnifiedLayout {
            orientation: Orientation::Rows,
            variable_column,
            level_columns,
            header_rows: 1,
        });
    }

    if distinct_baseline_names(table[0].iter().map(|cell| cell.as_deref().unwrap_or("")), profile)
        >= 2
    {
        return TableClass::Unified(UnifiedLayout {
            orientation: Orientation::Columns,
            variable_column: 0,
            level_columns: (1..table.len()).collect(),
            header_rows: 0,
        });
    }

    if distinct_baseline_names(table.iter().map(|row| cell_text(row, 0)), profile) >= 2 {
        let titled = profile.canonical_variable(cell_text(&table[0], 0)).is_none();
        let header_rows = usize::from(titled);
        return TableClass::Unified(UnifiedLayout {
            orientation: Orientation::Rows,
            variable_column: 0,
            level_columns: (1..width).collect(),
            header_rows,
        });
    }

    let coded_rows = table
        .iter()
        .map(|row| is_coded_variable_row(row, profile))
        .collect::<Vec<bool>>();
    let filled_rows = table.iter().filter(|row| !row_is_blank(row)).count();
    let coded_count = coded_rows.iter().filter(|coded| **coded).count();
    if coded_count > 0 && coded_count * 2 > filled_rows {
        return TableClass::Unified(UnifiedLayout {
            orientation: Orientation::Rows,
            variable_column: 0,
            level_columns: (1..width).collect(),
            header_rows: usize::from(!coded_rows[0]),
        });
    }

    if let Some((variable, header_index)) = single_variable_match(table, profile) {
        let roles = if positional_columns {
            positional_roles(table, header_index, profile)
        } else {
            assign_column_roles(&table[header_index], variable, profile, width, header_index)
        };
        return TableClass::SingleVariable {
            variable: variable.name.clone(),
            roles,
        };
    }

    if header
        .iter()
        .any(|cell| contains_any(cell, &profile.structural_keywords))
    {
        return TableClass::Unified(UnifiedLayout {
            orientation: Orientation::Rows,
            variable_column: 0,
            level_columns: (1..width).collect(),
            header_rows: 1,
        });
    }

    TableClass::NotRelevant
}

/// Picks the baseline variable with the most keyword hits in the probe rows,
/// along with the row that carries them.
fn single_variable_match<'a>(
    table: &RawTable,
    profile: &'a ExtractionProfile,
) -> Option<(&'a VariableProfile, usize)> {
    let mut best: Option<(&VariableProfile, usize, usize)> = None;

    for variable in &profile.baseline {
        for (row_index, row) in table.iter().take(PROBE_ROWS).enumerate() {
            let hits = row
                .iter()
                .filter(|cell| cell.as_deref().map(|text| variable.matches(text)).unwrap_or(false))
                .count();
            if hits == 0 {
                continue;
            }
            if best.map(|(_, _, best_hits)| hits > best_hits).unwrap_or(true) {
                best = Some((variable, row_index, hits));
            }
            break;
        }
    }

    best.map(|(variable, row_index, _)| (variable, row_index))
}

/// Header keywords first; positional fallback (identifier 0, value 1) for
/// whatever the header leaves unassigned. A header naming the variable wins
/// the value column over a generic "level"/"value" header.
pub fn assign_column_roles(
    header_row: &[Option<String>],
    variable: &VariableProfile,
    profile: &ExtractionProfile,
    width: usize,
    header_index: usize,
) -> ColumnRoles {
    let header = lowered_cells(header_row);

    let identifier = header
        .iter()
        .position(|cell| has_keyword_token(cell, &profile.identifier_keywords));
    let value_headers = |predicate: &dyn Fn(&str) -> bool| {
        header
            .iter()
            .enumerate()
            .filter(|(index, cell)| {
                Some(*index) != identifier
                    && !contains_any(cell, &profile.code_keywords)
                    && predicate(cell.as_str())
            })
            .map(|(index, _)| index)
            .collect::<Vec<usize>>()
    };
    let value = value_headers(&|cell| variable.matches(cell))
        .first()
        .copied()
        .or_else(|| {
            value_headers(&|cell| contains_any(cell, &profile.level_column_keywords))
                .last()
                .copied()
        })
        .or_else(|| {
            header
                .iter()
                .enumerate()
                .find(|(index, cell)| {
                    Some(*index) != identifier && is_value_header(cell, variable, profile)
                })
                .map(|(index, _)| index)
        });
    let code = header
        .iter()
        .enumerate()
        .find(|(index, cell)| {
            Some(*index) != identifier
                && Some(*index) != value
                && contains_any(cell, &profile.code_keywords)
        })
        .map(|(index, _)| index);

    let (identifier, value) = match (identifier, value) {
        (Some(identifier), Some(value)) => (Some(identifier), value),
        (None, Some(value)) => {
            let identifier = (0..width).find(|index| *index != value && Some(*index) != code);
            (identifier.filter(|index| *index < value), value)
        }
        (Some(identifier), None) => {
            let value = (0..width)
                .find(|index| *index != identifier && Some(*index) != code)
                .unwrap_or(identifier);
            (Some(identifier), value)
        }
        (None, None) if width >= 2 => (Some(0), 1),
        (None, None) => (None, 0),
    };

    ColumnRoles {
        identifier: identifier.filter(|index| *index != value),
        value,
        code: code.filter(|index| *index != value),
        header_rows: header_index + 1,
    }
}

fn positional_roles(
    table: &RawTable,
    header_index: usize,
    profile: &ExtractionProfile,
) -> ColumnRoles {
    let width = table_width(table);
    let header = lowered_cells(&table[header_index]);
    let code = header
        .iter()
        .enumerate()
        .skip(2)
        .find(|(_, cell)| contains_any(cell, &profile.code_keywords))
        .map(|(index, _)| index);

    if width >= 2 {
        ColumnRoles {
            identifier: Some(0),
            value: 1,
            code,
            header_rows: header_index + 1,
        }
    } else {
        ColumnRoles {
            identifier: None,
            value: 0,
            code: None,
            header_rows: header_index + 1,
        }
    }
}

/// A row naming a variable in column 0 with at least one "text [CODE]" cell
/// after it. Identifier and default rows of per-variable tables do not count.
fn is_coded_variable_row(row: &[Option<String>], profile: &ExtractionProfile) -> bool {
    let name = cell_text(row, 0).to_lowercase();
    if !name.chars().any(char::is_alphabetic)
        || name == DEFAULT_CODE.to_lowercase()
        || contains_any(&name, &profile.structural_keywords)
        || has_keyword_token(&name, &profile.identifier_keywords)
    {
        return false;
    }

    row.iter()
        .skip(1)
        .filter_map(|cell| cell.as_deref())
        .any(|cell| split_bracketed_code(cell).1.is_some())
}

fn is_value_header(cell: &str, variable: &VariableProfile, profile: &ExtractionProfile) -> bool {
    variable.matches(cell) || contains_any(cell, &profile.level_column_keywords)
}

fn has_keyword_token(cell: &str, keywords: &[String]) -> bool {
    cell.split_whitespace()
        .map(|token| token.trim_matches([',', ':', ';', '(', ')']))
        .any(|token| {
            keywords
                .iter()
                .any(|keyword| token == keyword || (keyword == "#" && token.starts_with('#')))
        })
}

fn distinct_baseline_names<'a>(
    cells: impl Iterator<Item = &'a str>,
    profile: &ExtractionProfile,
) -> usize {
    cells
        .filter_map(|cell| profile.canonical_variable(cell))
        .map(|variable| variable.name.as_str())
        .collect::<HashSet<&str>>()
        .len()
}

fn lowered_cells(row: &[Option<String>]) -> Vec<String> {
    row.iter()
        .map(|cell| cell.as_deref().unwrap_or("").trim().to_lowercase())
        .collect()
}

use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelSource {
    Table,
    Text,
    CategoryScan,
    Defaults,
}

impl LevelSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Text => "text",
            Self::CategoryScan => "category_scan",
            Self::Defaults => "defaults",
        }
    }
}

/// What one per-variable extractor contributed, and from where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableExtraction {
    pub variable: String,
    pub sources: Vec<LevelSource>,
    pub added: usize,
}

impl VariableExtraction {
    pub fn new(variable: &str) -> Self {
        Self {
            variable: variable.to_string(),
            sources: Vec::new(),
            added: 0,
        }
    }

    pub fn record(&mut self, source: LevelSource, added: usize) {
        if added == 0 {
            return;
        }
        self.sources.push(source);
        self.added += added;
    }

    pub fn used_defaults(&self) -> bool {
        self.sources.contains(&LevelSource::Defaults)
    }

    pub fn describe(&self) -> String {
        if self.sources.is_empty() {
            return "none".to_string();
        }
        self.sources
            .iter()
            .map(|source| source.as_str())
            .collect::<Vec<&str>>()
            .join("+")
    }
}

/// Table search, then the text fallback, then built-in levels.
pub fn extract_range_variable(
    ctx: &ExtractionContext<'_>,
    set: &mut VariationSet,
    variable: &VariableProfile,
) -> VariableExtraction {
    let mut extraction = VariableExtraction::new(&variable.name);

    extraction.record(LevelSource::Table, levels_from_tables(ctx, set, variable));
    if set.real_level_count(&variable.name) == 0 {
        extraction.record(LevelSource::Text, levels_from_text(ctx, set, variable));
    }
    if set.real_level_count(&variable.name) == 0 {
        extraction.record(LevelSource::Defaults, apply_fallback_levels(set, variable));
    }

    debug!(
        variable = %extraction.variable,
        added = extraction.added,
        sources = %extraction.describe(),
        "range extractor finished"
    );
    extraction
}

/// Reads every table classified for `variable`, plus this variable's rows of
/// any unified table. A headerless table of the same width directly after a
/// per-variable table is read as its continuation.
pub fn levels_from_tables(
    ctx: &ExtractionContext<'_>,
    set: &mut VariationSet,
    variable: &VariableProfile,
) -> usize {
    let mut added = 0;
    let mut continuation: Option<(ColumnRoles, usize)> = None;

    for classified in &ctx.tables {
        match &classified.class {
            TableClass::SingleVariable { variable: name, roles } if *name == variable.name => {
                added += rows_into_set(ctx, set, classified.table, roles, variable);
                continuation = Some((
                    ColumnRoles {
                        header_rows: 0,
                        ..roles.clone()
                    },
                    table_width(classified.table),
                ));
            }
            TableClass::NotRelevant => {
                if let Some((roles, width)) = &continuation
                    && table_width(classified.table) == *width
                {
                    added += rows_into_set(ctx, set, classified.table, roles, variable);
                    continue;
                }
                continuation = None;
            }
            TableClass::Unified(layout) => {
                let entries =
                    unified_levels_for(classified.table, layout, ctx.profile, &variable.name);
                for entry in entries {
                    if set.insert_level(&variable.name, entry).is_ok() {
                        added += 1;
                    }
                }
                continuation = None;
            }
            TableClass::SingleVariable { .. } => continuation = None,
        }
    }

    added
}

fn rows_into_set(
    ctx: &ExtractionContext<'_>,
    set: &mut VariationSet,
    table: &RawTable,
    roles: &ColumnRoles,
    variable: &VariableProfile,
) -> usize {
    let header = roles
        .header_rows
        .checked_sub(1)
        .and_then(|index| table.get(index));

    let mut added = 0;
    for row in table.iter().skip(roles.header_rows) {
        if row_is_blank(row) || header.is_some_and(|header| header == row) {
            continue;
        }

        let identifier = roles.identifier.map(|index| cell_text(row, index)).unwrap_or("");
        let code = roles.code.map(|index| cell_text(row, index)).unwrap_or("");
        let Some(entry) = level_from_row(
            ctx,
            set,
            &variable.name,
            identifier,
            cell_text(row, roles.value),
            code,
        ) else {
            continue;
        };

        if set.insert_level(&variable.name, entry).is_ok() {
            added += 1;
        }
    }

    added
}

/// Builds a level from one row's identifier, value and code cells.
///
/// A `default` anywhere in the row yields the sentinel, labelled with the
/// row's own value unless that value is empty or itself `default`. The code
/// is taken from the code cell, then a bracketed suffix on the value, then
/// the identifier, then the next free number.
pub fn level_from_row(
    ctx: &ExtractionContext<'_>,
    set: &VariationSet,
    variable: &str,
    identifier: &str,
    raw_value: &str,
    code_cell: &str,
) -> Option<LevelEntry> {
    let (value, bracket_code) = split_bracketed_code(raw_value);
    let identifier = if identifier.is_empty() {
        String::new()
    } else {
        ctx.patterns.normalize_identifier(identifier)
    };

    let is_default = [identifier.as_str(), value.as_str(), code_cell]
        .iter()
        .chain(bracket_code.as_deref().iter())
        .any(|text| text.eq_ignore_ascii_case(DEFAULT_CODE));
    if is_default {
        let label = if value.is_empty() || value.eq_ignore_ascii_case(DEFAULT_CODE) {
            ctx.profile.default_label_for(variable).to_string()
        } else {
            value
        };
        return Some(LevelEntry::sentinel(label));
    }

    if value.is_empty() || ctx.profile.is_structural_keyword(&value) {
        return None;
    }

    let data = [Some(code_cell), bracket_code.as_deref(), Some(identifier.as_str())]
        .into_iter()
        .flatten()
        .find(|candidate| !candidate.is_empty())
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| set.next_numeric_code(variable).to_string());

    Some(LevelEntry::coded(value, data))
}

/// Anchored `Level N: value` pairs, then flat declarations naming this variable.
pub fn levels_from_text(
    ctx: &ExtractionContext<'_>,
    set: &mut VariationSet,
    variable: &VariableProfile,
) -> usize {
    let mut added = 0;

    if let Some(segment) = find_segment(&ctx.text, &variable.anchors) {
        for pair in ctx.patterns.level_pairs(&segment) {
            let entry =
                level_from_row(ctx, set, &variable.name, &pair.identifier, &pair.value, "");
            if let Some(entry) = entry
                && set.insert_level(&variable.name, entry).is_ok()
            {
                added += 1;
            }
        }
    }

    for declaration in ctx.patterns.declarations(&ctx.text, ctx.profile) {
        let names_variable = ctx
            .profile
            .canonical_variable(&declaration.name)
            .is_some_and(|profile| profile.name == variable.name);
        if !names_variable {
            continue;
        }
        for value in &declaration.values {
            if let Some(entry) = level_from_row(ctx, set, &variable.name, "", value, "")
                && set.insert_level(&variable.name, entry).is_ok()
            {
                added += 1;
            }
        }
    }

    added
}

pub fn apply_fallback_levels(set: &mut VariationSet, variable: &VariableProfile) -> usize {
    warn!(variable = %variable.name, "no levels found in document, using built-in levels");
    variable
        .fallback_levels()
        .into_iter()
        .filter(|entry| set.insert_level(&variable.name, entry.clone()).is_ok())
        .count()
}

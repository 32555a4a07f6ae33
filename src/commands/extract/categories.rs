use super::*;

/// Stray tables with more rows than this are not scanned for categories.
const MAX_SCAN_TABLE_ROWS: usize = 3;
const MIN_CANDIDATE_CHARS: usize = 4;
const MAX_CANDIDATE_CHARS: usize = 80;
const MIN_SHARED_WORD_CHARS: usize = 4;

/// Same chain as the range extractor, with a category scan between the text
/// fallback and the built-in list. Built-in levels are only used when nothing
/// at all was found.
pub fn extract_categorical_variable(
    ctx: &ExtractionContext<'_>,
    set: &mut VariationSet,
    variable: &VariableProfile,
) -> VariableExtraction {
    let mut extraction = VariableExtraction::new(&variable.name);
    let enough = ctx.profile.min_category_levels;

    extraction.record(LevelSource::Table, levels_from_tables(ctx, set, variable));
    if set.real_level_count(&variable.name) < enough {
        extraction.record(LevelSource::Text, levels_from_text(ctx, set, variable));
    }
    if set.real_level_count(&variable.name) < enough {
        extraction.record(
            LevelSource::CategoryScan,
            levels_from_category_scan(ctx, set, variable),
        );
    }
    if set.real_level_count(&variable.name) == 0 {
        extraction.record(LevelSource::Defaults, apply_fallback_levels(set, variable));
    }

    debug!(
        variable = %extraction.variable,
        added = extraction.added,
        sources = %extraction.describe(),
        "categorical extractor finished"
    );
    extraction
}

fn levels_from_category_scan(
    ctx: &ExtractionContext<'_>,
    set: &mut VariationSet,
    variable: &VariableProfile,
) -> usize {
    let mut added = 0;

    for candidate in category_candidates(ctx) {
        let Some(category) = best_category_match(&candidate, &ctx.profile.canonical_categories)
        else {
            continue;
        };
        if set
            .levels_for(&variable.name)
            .iter()
            .any(|level| names_similar(&level.value, category))
        {
            continue;
        }

        let data = set.next_numeric_code(&variable.name).to_string();
        if set
            .insert_level(&variable.name, LevelEntry::coded(category.clone(), data))
            .is_ok()
        {
            debug!(
                variable = %variable.name,
                candidate = %candidate,
                category = %category,
                "matched category"
            );
            added += 1;
        }
    }

    added
}

/// Cells of small unclassified tables, then short text lines.
fn category_candidates(ctx: &ExtractionContext<'_>) -> Vec<String> {
    let table_cells = ctx
        .tables
        .iter()
        .filter(|classified| {
            classified.class == TableClass::NotRelevant
                && classified.table.len() <= MAX_SCAN_TABLE_ROWS
        })
        .flat_map(|classified| classified.table.iter().flatten())
        .flatten()
        .map(|cell| collapse_whitespace(cell));
    let text_lines = ctx.text.lines().map(collapse_whitespace);

    table_cells
        .chain(text_lines)
        .filter(|candidate| {
            let length = candidate.chars().count();
            (MIN_CANDIDATE_CHARS..=MAX_CANDIDATE_CHARS).contains(&length)
        })
        .collect()
}

/// Exact match first, then the longest category the candidate contains,
/// then any similar category.
pub fn best_category_match<'a>(candidate: &str, categories: &'a [String]) -> Option<&'a String> {
    let lowered = candidate.to_lowercase();

    categories
        .iter()
        .find(|category| category.to_lowercase() == lowered)
        .or_else(|| {
            categories
                .iter()
                .filter(|category| lowered.contains(&category.to_lowercase()))
                .max_by_key(|category| category.len())
        })
        .or_else(|| categories.iter().find(|category| names_similar(candidate, category)))
}

/// Two names are similar when one contains the other, ignoring case, or when
/// they share at least two words longer than three characters.
pub fn names_similar(left: &str, right: &str) -> bool {
    let left = left.trim().to_lowercase();
    let right = right.trim().to_lowercase();
    if left.is_empty() || right.is_empty() {
        return false;
    }
    if left.contains(&right) || right.contains(&left) {
        return true;
    }

    let long_words = |text: &str| {
        text.split(|ch: char| !ch.is_alphanumeric())
            .filter(|word| word.chars().count() >= MIN_SHARED_WORD_CHARS)
            .map(ToOwned::to_owned)
            .collect::<HashSet<String>>()
    };
    long_words(&left).intersection(&long_words(&right)).count() >= 2
}

use super::*;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionSummary {
    pub injected_variables: Vec<String>,
    pub injected_defaults: Vec<String>,
    pub removed_duplicates: usize,
    pub combination_count: u64,
}

/// Brings a set into its final shape: `levels` keyed by exactly the
/// variables, no repeated values or codes, every baseline variable present
/// and every variable carrying one `Default` entry. Idempotent.
pub fn complete_variation_set(
    set: &mut VariationSet,
    profile: &ExtractionProfile,
) -> CompletionSummary {
    let mut summary = CompletionSummary::default();

    reconcile_keys(set);
    summary.removed_duplicates = remove_duplicate_levels(set);

    for variable in &profile.baseline {
        if set.real_level_count(&variable.name) > 0 {
            continue;
        }
        warn!(
            variable = %variable.name,
            "baseline variable has no levels, injecting built-in levels"
        );
        set.ensure_variable(&variable.name);
        for entry in variable.fallback_levels() {
            if set.has_default(&variable.name) && entry.is_default() {
                continue;
            }
            if let Err(conflict) = set.insert_level(&variable.name, entry) {
                debug!(variable = %variable.name, ?conflict, "skipped built-in level");
            }
        }
        summary.injected_variables.push(variable.name.clone());
    }

    let names = set.variables.clone();
    for name in &names {
        if set.has_default(name) {
            continue;
        }
        let label = sentinel_label(set, name, profile.default_label_for(name));
        if let Some(levels) = set.levels.get_mut(name) {
            levels.push(LevelEntry::sentinel(label));
        }
        debug!(variable = %name, "added default level");
        summary.injected_defaults.push(name.clone());
    }

    summary.combination_count = set.combination_count();
    if summary.removed_duplicates > 0 {
        debug!(removed = summary.removed_duplicates, "removed duplicate levels");
    }
    summary
}

fn reconcile_keys(set: &mut VariationSet) {
    let mut seen = HashSet::<String>::new();
    set.variables.retain(|name| seen.insert(name.clone()));

    let orphans = set
        .levels
        .keys()
        .filter(|name| !seen.contains(*name))
        .cloned()
        .collect::<Vec<String>>();
    for name in orphans {
        debug!(variable = %name, "registering variable found only in levels");
        set.variables.push(name);
    }

    for name in &set.variables {
        set.levels.entry(name.clone()).or_default();
    }
}

/// Keeps the first entry for each value and each code. A second sentinel is
/// dropped even when its label differs.
fn remove_duplicate_levels(set: &mut VariationSet) -> usize {
    let mut removed = 0;
    for levels in set.levels.values_mut() {
        let mut values = HashSet::<String>::new();
        let mut codes = HashSet::<String>::new();
        let before = levels.len();
        levels.retain(|level| {
            let repeated = values.contains(&level.value)
                || level.data.as_ref().is_some_and(|data| codes.contains(data));
            if repeated {
                return false;
            }
            values.insert(level.value.clone());
            if let Some(data) = &level.data {
                codes.insert(data.clone());
            }
            true
        });
        removed += before - levels.len();
    }
    removed
}

/// The variable's default label, unless a real level already uses it.
fn sentinel_label(set: &VariationSet, variable: &str, label: &str) -> String {
    let taken = |candidate: &str| {
        set.levels_for(variable)
            .iter()
            .any(|level| level.value == candidate)
    };

    if !taken(label) {
        return label.to_string();
    }
    if !taken(DEFAULT_CODE) {
        return DEFAULT_CODE.to_string();
    }
    format!("{label} ({DEFAULT_CODE})")
}

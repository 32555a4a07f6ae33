use super::*;

/// Layout assumptions selected by the `--format` hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatProfile {
    pub run_unified: bool,
    pub positional_columns: bool,
}

impl FormatProfile {
    pub fn for_hint(hint: FormatHint) -> Self {
        match hint {
            FormatHint::Standard => Self {
                run_unified: true,
                positional_columns: false,
            },
            // One table per variable, identifier then value.
            FormatHint::SouthCarolina => Self {
                run_unified: false,
                positional_columns: true,
            },
        }
    }
}

pub struct ClassifiedTable<'a> {
    pub table: &'a RawTable,
    pub class: TableClass,
}

/// Read-only inputs shared by every strategy.
pub struct ExtractionContext<'a> {
    pub text: String,
    pub profile: &'a ExtractionProfile,
    pub patterns: &'a ExtractionPatterns,
    pub format: FormatProfile,
    pub tables: Vec<ClassifiedTable<'a>>,
}

impl<'a> ExtractionContext<'a> {
    pub fn new(
        document: &'a Document,
        profile: &'a ExtractionProfile,
        patterns: &'a ExtractionPatterns,
        format: FormatProfile,
    ) -> Self {
        let tables = document
            .tables()
            .map(|table| ClassifiedTable {
                table,
                class: classify_table(table, profile, format.positional_columns),
            })
            .collect::<Vec<ClassifiedTable<'a>>>();

        Self {
            text: document.full_text(),
            profile,
            patterns,
            format,
            tables,
        }
    }

    pub fn has_relevant_tables(&self) -> bool {
        self.tables
            .iter()
            .any(|classified| classified.class != TableClass::NotRelevant)
    }
}

/// Variables a strategy filled from document evidence, plus where each came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StrategyOutcome {
    pub covered: Vec<String>,
    pub provenance: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Coverage {
    Complete { covered: Vec<String> },
    Partial { covered: Vec<String>, missing: Vec<String> },
    Empty { missing: Vec<String> },
}

impl Coverage {
    fn assess(covered: &[String], baseline: &[String]) -> Self {
        let missing = baseline
            .iter()
            .filter(|name| !covered.contains(name))
            .cloned()
            .collect::<Vec<String>>();

        if covered.is_empty() {
            Self::Empty { missing }
        } else if missing.is_empty() {
            Self::Complete {
                covered: covered.to_vec(),
            }
        } else {
            Self::Partial {
                covered: covered.to_vec(),
                missing,
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Complete { .. } => "complete",
            Self::Partial { .. } => "partial",
            Self::Empty { .. } => "empty",
        }
    }
}

pub type Strategy = fn(&ExtractionContext<'_>, &mut VariationSet) -> StrategyOutcome;

const PIPELINE: &[(&str, Strategy)] = &[
    ("unified_table", unified_table_strategy),
    ("specialized", specialized_strategy),
    ("text_declarations", text_declaration_strategy),
];

pub struct Extraction {
    pub set: VariationSet,
    pub records: Vec<StrategyRecord>,
    pub variables: Vec<VariableSummary>,
    pub completion: CompletionSummary,
}

/// Runs the strategy pipeline and completes the result. Never fails: gaps
/// are filled from the profile defaults.
pub fn extract_variation_set(
    document: &Document,
    profile: &ExtractionProfile,
    patterns: &ExtractionPatterns,
    format: FormatProfile,
) -> Extraction {
    let ctx = ExtractionContext::new(document, profile, patterns, format);
    let baseline = profile
        .baseline
        .iter()
        .map(|variable| variable.name.clone())
        .collect::<Vec<String>>();

    let mut set = VariationSet::default();
    let mut covered = Vec::<String>::new();
    let mut provenance = Vec::<(String, String)>::new();
    let mut records = Vec::<StrategyRecord>::new();

    for (name, strategy) in PIPELINE {
        if *name == "unified_table" && !ctx.format.run_unified {
            debug!(strategy = name, "skipped by format profile");
            continue;
        }

        let outcome = strategy(&ctx, &mut set);
        for variable in outcome.covered {
            if !covered.contains(&variable) {
                covered.push(variable);
            }
        }
        for (variable, source) in outcome.provenance {
            if !provenance.iter().any(|(existing, _)| *existing == variable) {
                provenance.push((variable, source));
            }
        }

        let coverage = Coverage::assess(&covered, &baseline);
        info!(
            strategy = name,
            outcome = coverage.label(),
            variables = set.variables.len(),
            "strategy finished"
        );
        records.push(strategy_record(name, &coverage));

        if matches!(coverage, Coverage::Complete { .. }) {
            break;
        }
    }

    let completion = complete_variation_set(&mut set, profile);
    let variables = set
        .variables
        .iter()
        .map(|name| VariableSummary {
            name: name.clone(),
            level_count: set.level_count(name),
            source: provenance
                .iter()
                .find(|(variable, _)| variable == name)
                .map(|(_, source)| source.clone())
                .unwrap_or_else(|| "completion".to_string()),
        })
        .collect();

    Extraction {
        set,
        records,
        variables,
        completion,
    }
}

fn strategy_record(name: &str, coverage: &Coverage) -> StrategyRecord {
    let (covered, missing) = match coverage {
        Coverage::Complete { covered } => (covered.clone(), Vec::new()),
        Coverage::Partial { covered, missing } => (covered.clone(), missing.clone()),
        Coverage::Empty { missing } => (Vec::new(), missing.clone()),
    };
    StrategyRecord {
        strategy: name.to_string(),
        outcome: coverage.label().to_string(),
        covered,
        missing,
    }
}

fn unified_table_strategy(ctx: &ExtractionContext<'_>, set: &mut VariationSet) -> StrategyOutcome {
    let mut outcome = StrategyOutcome::default();

    for classified in &ctx.tables {
        let TableClass::Unified(layout) = &classified.class else {
            continue;
        };
        for variable in extract_unified(classified.table, layout, ctx.profile, set) {
            if !outcome.covered.contains(&variable) {
                outcome.provenance.push((variable.clone(), "unified_table".to_string()));
                outcome.covered.push(variable);
            }
        }
    }

    outcome
}

/// Runs the per-variable extractor for each baseline variable the earlier
/// strategies left without levels. Variables that ended up on built-in
/// levels are not reported as covered.
fn specialized_strategy(ctx: &ExtractionContext<'_>, set: &mut VariationSet) -> StrategyOutcome {
    let mut outcome = StrategyOutcome::default();

    for variable in &ctx.profile.baseline {
        if set.real_level_count(&variable.name) > 0 {
            continue;
        }

        let extraction = match variable.kind {
            ExtractorKind::Range => extract_range_variable(ctx, set, variable),
            ExtractorKind::Categorical => extract_categorical_variable(ctx, set, variable),
        };

        outcome
            .provenance
            .push((variable.name.clone(), extraction.describe()));
        if extraction.added > 0 && !extraction.used_defaults() {
            outcome.covered.push(variable.name.clone());
        }
    }

    outcome
}

/// Generic "Name: a, b, c" declarations. Only consulted when no table in the
/// document was relevant, and only adds variables not seen so far.
fn text_declaration_strategy(
    ctx: &ExtractionContext<'_>,
    set: &mut VariationSet,
) -> StrategyOutcome {
    let mut outcome = StrategyOutcome::default();
    if ctx.has_relevant_tables() {
        return outcome;
    }

    for declaration in ctx.patterns.declarations(&ctx.text, ctx.profile) {
        let name = ctx.profile.canonical_name(&declaration.name);
        if set.contains_variable(&name) || ctx.profile.baseline_for(&name).is_some() {
            continue;
        }

        for value in &declaration.values {
            let data = set.next_numeric_code(&name).to_string();
            if let Err(conflict) = set.insert_level(&name, LevelEntry::coded(value.clone(), data)) {
                debug!(variable = %name, value = %value, ?conflict, "skipped declared level");
            }
        }
        outcome
            .provenance
            .push((name.clone(), "text_declarations".to_string()));
        outcome.covered.push(name);
    }

    outcome
}

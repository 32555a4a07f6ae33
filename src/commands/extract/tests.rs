use std::collections::BTreeMap;

use super::acquire::{check_download_size, remote_extension};
use super::*;

fn table(rows: &[&[&str]]) -> RawTable {
    rows.iter()
        .map(|row| {
            row.iter()
                .map(|cell| (!cell.is_empty()).then(|| cell.to_string()))
                .collect()
        })
        .collect()
}

fn table_document(tables: Vec<RawTable>, text: &str) -> Document {
    Document {
        pages: vec![Page {
            tables,
            text: text.to_string(),
        }],
    }
}

fn patterns() -> ExtractionPatterns {
    ExtractionPatterns::new().expect("patterns compile")
}

fn standard() -> FormatProfile {
    FormatProfile::for_hint(FormatHint::Standard)
}

fn default_entries(set: &VariationSet, variable: &str) -> usize {
    set.levels_for(variable)
        .iter()
        .filter(|level| level.is_default())
        .count()
}

#[test]
fn unified_row_with_bracketed_codes() {
    let profile = ExtractionProfile::builtin();
    let raw = table(&[
        &["Variable", "Level 1", "Level 2"],
        &["GPA", "3.5+ [1]", "3.0-3.49 [2]"],
    ]);

    let TableClass::Unified(layout) = classify_table(&raw, &profile, false) else {
        panic!("expected a unified table");
    };
    assert_eq!(layout.level_columns, vec![1, 2]);

    let mut set = VariationSet::default();
    let gained = extract_unified(&raw, &layout, &profile, &mut set);

    assert_eq!(gained, vec!["GPA Range".to_string()]);
    assert_eq!(
        set.levels_for("GPA Range"),
        &[
            LevelEntry::coded("3.5+", "1"),
            LevelEntry::coded("3.0-3.49", "2"),
        ]
    );
}

#[test]
fn unified_table_with_variables_as_columns() {
    let profile = ExtractionProfile::builtin();
    let raw = table(&[
        &["GPA Range", "Distance"],
        &["3.5+", "0-50 miles"],
        &["3.0-3.49", "51-150 miles"],
    ]);

    let class = classify_table(&raw, &profile, false);
    let TableClass::Unified(layout) = &class else {
        panic!("expected a unified table, got {class:?}");
    };
    assert_eq!(layout.orientation, Orientation::Columns);

    let mut set = VariationSet::default();
    let gained = extract_unified(&raw, layout, &profile, &mut set);

    assert_eq!(gained, vec!["GPA Range".to_string(), "Distance".to_string()]);
    assert_eq!(
        set.levels_for("Distance"),
        &[
            LevelEntry::coded("0-50 miles", "1"),
            LevelEntry::coded("51-150 miles", "2"),
        ]
    );
}

#[test]
fn headerless_unified_rows_normalize_default_cells() {
    let profile = ExtractionProfile::builtin();
    let raw = table(&[
        &["GPA", "3.5+", "3.0-3.49"],
        &["Distance", "0-50 miles", "default"],
    ]);

    let TableClass::Unified(layout) = classify_table(&raw, &profile, false) else {
        panic!("expected a unified table");
    };
    assert_eq!(layout.header_rows, 0);

    let mut set = VariationSet::default();
    extract_unified(&raw, &layout, &profile, &mut set);

    assert_eq!(
        set.levels_for("Distance"),
        &[
            LevelEntry::coded("0-50 miles", "1"),
            LevelEntry::sentinel("Unknown"),
        ]
    );
}

#[test]
fn single_variable_table_roles_come_from_header_keywords() {
    let profile = ExtractionProfile::builtin();
    let raw = table(&[
        &["Level", "Distance"],
        &["1", "0-25 miles"],
        &["2", "26-100 miles"],
    ]);

    let class = classify_table(&raw, &profile, false);
    assert_eq!(
        class,
        TableClass::SingleVariable {
            variable: "Distance".to_string(),
            roles: ColumnRoles {
                identifier: Some(0),
                value: 1,
                code: None,
                header_rows: 1,
            },
        }
    );
}

#[test]
fn code_column_is_not_taken_as_value() {
    let profile = ExtractionProfile::builtin();
    let academic = profile
        .baseline_for("Academic Field of Interest")
        .expect("baseline variable exists");
    let header = table(&[&["CIP Code", "Academic Field"]]).remove(0);

    let roles = assign_column_roles(&header, academic, &profile, 2, 0);

    assert_eq!(
        roles,
        ColumnRoles {
            identifier: None,
            value: 1,
            code: Some(0),
            header_rows: 1,
        }
    );
}

#[test]
fn unlabelled_header_falls_back_to_positional_roles() {
    let profile = ExtractionProfile::builtin();
    let gpa = profile.baseline_for("GPA Range").expect("baseline variable exists");
    let header = table(&[&["Band", "Range"]]).remove(0);

    let roles = assign_column_roles(&header, gpa, &profile, 2, 0);
    assert_eq!(roles.identifier, Some(0));
    assert_eq!(roles.value, 1);

    let raw = table(&[&["GPA Range", "Level"], &["A", "3.5+"]]);
    let TableClass::SingleVariable { roles, .. } = classify_table(&raw, &profile, false) else {
        panic!("expected a single variable table");
    };
    assert_eq!((roles.identifier, roles.value), (None, 0));

    let TableClass::SingleVariable { roles, .. } = classify_table(&raw, &profile, true) else {
        panic!("expected a single variable table");
    };
    assert_eq!((roles.identifier, roles.value), (Some(0), 1));
}

#[test]
fn unrelated_table_is_not_relevant() {
    let profile = ExtractionProfile::builtin();
    let raw = table(&[&["Contact", "Phone"], &["Admissions", "555-0100"]]);
    assert_eq!(classify_table(&raw, &profile, false), TableClass::NotRelevant);
    assert_eq!(classify_table(&Vec::new(), &profile, false), TableClass::NotRelevant);
}

#[test]
fn contact_table_is_not_taken_for_academic_fields() {
    let profile = ExtractionProfile::builtin();
    let raw = table(&[
        &["Principal Contact", "Phone"],
        &["Jane Doe", "555-0100"],
        &["John Roe", "555-0101"],
    ]);
    assert_eq!(classify_table(&raw, &profile, false), TableClass::NotRelevant);

    let document = table_document(vec![raw], "");
    let extraction = extract_variation_set(&document, &profile, &patterns(), standard());
    let academic = extraction.set.levels_for("Academic Field of Interest");
    assert_eq!(academic.len(), 31);
    assert!(!academic.iter().any(|level| level.value == "Jane Doe"));
}

#[test]
fn headerless_coded_rows_are_unified_with_one_baseline_name() {
    let profile = ExtractionProfile::builtin();
    let raw = table(&[
        &["GPA", "3.7+ [A]", "3.2-3.69 [B]"],
        &["Region", "North [1]", "South [2]"],
    ]);

    let TableClass::Unified(layout) = classify_table(&raw, &profile, false) else {
        panic!("expected a unified table");
    };
    assert_eq!(layout.header_rows, 0);

    let mut set = VariationSet::default();
    let gained = extract_unified(&raw, &layout, &profile, &mut set);

    assert_eq!(gained, vec!["GPA Range".to_string(), "Region".to_string()]);
    assert_eq!(
        set.levels_for("GPA Range"),
        &[
            LevelEntry::coded("3.7+", "A"),
            LevelEntry::coded("3.2-3.69", "B"),
        ]
    );
    assert_eq!(
        set.levels_for("Region"),
        &[LevelEntry::coded("North", "1"), LevelEntry::coded("South", "2")]
    );

    let per_variable = table(&[
        &["Variation #", "GPA Range"],
        &["1", "3.5+ [1]"],
        &["Default", "Unknown [Default]"],
    ]);
    assert!(matches!(
        classify_table(&per_variable, &profile, false),
        TableClass::SingleVariable { .. }
    ));
}

#[test]
fn find_segment_stops_at_blank_line_after_two_lines() {
    let text = "Intro text\n\nGPA Range\nLevel 1: 3.5+\nLevel 2: 3.0-3.49\n\nDistance\nLevel 1: near\n";
    let anchors = vec!["gpa".to_string()];

    assert_eq!(
        find_segment(text, &anchors).as_deref(),
        Some("GPA Range\nLevel 1: 3.5+\nLevel 2: 3.0-3.49")
    );
    assert_eq!(find_segment(text, &["radius".to_string()]), None);
}

#[test]
fn level_pairs_split_on_each_token() {
    let segment = "Variation 1: 3.5 and above Variation 2 - 3.0 to 3.49\nDefault) Unknown";

    let pairs = patterns().level_pairs(segment);

    assert_eq!(
        pairs,
        vec![
            LevelPair {
                identifier: "1".to_string(),
                value: "3.5 and above".to_string(),
            },
            LevelPair {
                identifier: "2".to_string(),
                value: "3.0 to 3.49".to_string(),
            },
            LevelPair {
                identifier: "Default".to_string(),
                value: "Unknown".to_string(),
            },
        ]
    );
}

#[test]
fn normalize_identifier_strips_prefixes() {
    let patterns = patterns();
    assert_eq!(patterns.normalize_identifier("Variation 3"), "3");
    assert_eq!(patterns.normalize_identifier("#4"), "4");
    assert_eq!(patterns.normalize_identifier("No. 12"), "12");
    assert_eq!(patterns.normalize_identifier("5."), "5");
    assert_eq!(patterns.normalize_identifier("default"), DEFAULT_CODE);
}

#[test]
fn declarations_skip_structural_names_and_pair_headings() {
    let profile = ExtractionProfile::builtin();
    let text = "Levels: 1, 2, 3\nRegion: North, South, West\nDeadline: March 1\nVariable: Home State\nLevels: In-state, Out-of-state\n";

    let declarations = patterns().declarations(text, &profile);

    assert_eq!(
        declarations,
        vec![
            Declaration {
                name: "Region".to_string(),
                values: vec!["North".to_string(), "South".to_string(), "West".to_string()],
            },
            Declaration {
                name: "Home State".to_string(),
                values: vec!["In-state".to_string(), "Out-of-state".to_string()],
            },
        ]
    );
}

#[test]
fn derive_tables_merges_wrapped_cells_and_drops_titles() {
    let text = "GPA Range Levels\nVariation #    GPA Range\n1              3.5 and\n               above\n2              3.0-3.49\n\nPage 2 of 3\n";

    let tables = derive_tables(text, patterns().cell_split());

    assert_eq!(
        tables,
        vec![table(&[
            &["Variation #", "GPA Range"],
            &["1", "3.5 and above"],
            &["2", "3.0-3.49"],
        ])]
    );
}

#[test]
fn derive_tables_keeps_numeric_rows() {
    let text = "Variation #    Distance (miles)\n1  25\n2  50\n3  150\n\n- 4 -\n";

    let tables = derive_tables(text, patterns().cell_split());

    assert_eq!(
        tables,
        vec![table(&[
            &["Variation #", "Distance (miles)"],
            &["1", "25"],
            &["2", "50"],
            &["3", "150"],
        ])]
    );
}

#[test]
fn names_similar_uses_substring_or_shared_words() {
    assert!(names_similar("Engineering", "engineering technologies"));
    assert!(names_similar(
        "Biological Sciences Research",
        "Biological and Biomedical Sciences"
    ));
    assert!(!names_similar("Computer Science", "Computer and Information Sciences"));
    assert!(!names_similar("Art", "History"));
    assert!(!names_similar("", "History"));
}

#[test]
fn range_extractor_falls_back_to_text_segment() {
    let profile = ExtractionProfile::builtin();
    let patterns = patterns();
    let document = table_document(
        Vec::new(),
        "GPA Requirements\nLevel 1: 3.5 or higher\nLevel 2: 3.0 to 3.49\nLevel Default: Unknown\n",
    );
    let ctx = ExtractionContext::new(&document, &profile, &patterns, standard());
    let gpa = profile.baseline_for("GPA Range").expect("baseline variable exists");

    let mut set = VariationSet::default();
    let extraction = extract_range_variable(&ctx, &mut set, gpa);

    assert_eq!(extraction.sources, vec![LevelSource::Text]);
    assert_eq!(
        set.levels_for("GPA Range"),
        &[
            LevelEntry::coded("3.5 or higher", "1"),
            LevelEntry::coded("3.0 to 3.49", "2"),
            LevelEntry::sentinel("Unknown"),
        ]
    );
}

#[test]
fn category_scan_matches_canonical_categories() {
    let profile = ExtractionProfile::builtin();
    let patterns = patterns();
    let document = table_document(
        Vec::new(),
        "Academic Field of Interest\n\nStudents may choose:\nEngineering\nPsychology\nHistory of the Americas\n",
    );
    let ctx = ExtractionContext::new(&document, &profile, &patterns, standard());
    let academic = profile
        .baseline_for("Academic Field of Interest")
        .expect("baseline variable exists");

    let mut set = VariationSet::default();
    let extraction = extract_categorical_variable(&ctx, &mut set, academic);

    assert_eq!(extraction.sources, vec![LevelSource::CategoryScan]);
    assert_eq!(
        set.levels_for("Academic Field of Interest"),
        &[
            LevelEntry::coded("Engineering", "1"),
            LevelEntry::coded("Psychology", "2"),
            LevelEntry::coded("History", "3"),
        ]
    );
}

#[test]
fn empty_document_yields_full_baseline_defaults() {
    let profile = ExtractionProfile::builtin();
    let extraction =
        extract_variation_set(&Document::default(), &profile, &patterns(), standard());

    assert_eq!(
        extraction.set.variables,
        vec!["GPA Range", "Distance", "Academic Field of Interest"]
    );
    assert_eq!(extraction.completion.combination_count, 775);
    for name in &extraction.set.variables {
        assert_eq!(default_entries(&extraction.set, name), 1, "{name}");
    }
    assert_eq!(extraction.set.level_count("Academic Field of Interest"), 31);
    assert_eq!(
        extraction.set.levels_for("Academic Field of Interest").last(),
        Some(&LevelEntry::sentinel("Undecided"))
    );
}

#[test]
fn per_variable_tables_and_text_cover_every_baseline_variable() {
    let profile = ExtractionProfile::builtin();
    let gpa = table(&[
        &["Variation #", "GPA Range"],
        &["1", "3.5+"],
        &["2", "3.0-3.49"],
        &["Default", "Unknown"],
    ]);
    let distance = table(&[
        &["Level", "Distance"],
        &["1", "0-25 miles"],
        &["2", "26-100 miles"],
        &["3", "100+ miles"],
    ]);
    let text = "Academic Field of Interest\nVariation 1: Engineering\nVariation 2: Business and Management\nVariation 3: Health Professions\nVariation 4: Education\n";
    let document = table_document(vec![gpa, distance], text);

    let extraction = extract_variation_set(&document, &profile, &patterns(), standard());

    let strategies = extraction
        .records
        .iter()
        .map(|record| (record.strategy.as_str(), record.outcome.as_str()))
        .collect::<Vec<(&str, &str)>>();
    assert_eq!(
        strategies,
        vec![("unified_table", "empty"), ("specialized", "complete")]
    );

    let set = &extraction.set;
    assert_eq!(
        set.levels_for("GPA Range"),
        &[
            LevelEntry::coded("3.5+", "1"),
            LevelEntry::coded("3.0-3.49", "2"),
            LevelEntry::sentinel("Unknown"),
        ]
    );
    assert_eq!(set.level_count("Distance"), 4);
    assert_eq!(
        set.levels_for("Academic Field of Interest").first(),
        Some(&LevelEntry::coded("Engineering", "1"))
    );
    assert_eq!(
        set.levels_for("Academic Field of Interest").last(),
        Some(&LevelEntry::sentinel("Undecided"))
    );
    assert_eq!(extraction.completion.combination_count, 3 * 4 * 5);
    assert_eq!(
        extraction.completion.injected_defaults,
        vec!["Distance", "Academic Field of Interest"]
    );
}

#[test]
fn south_carolina_profile_reads_unified_rows_per_variable() {
    let profile = ExtractionProfile::builtin();
    let raw = table(&[
        &["Variable", "Level 1", "Level 2"],
        &["GPA", "3.9+ [1]", "3.1-3.89 [2]"],
    ]);
    let document = table_document(vec![raw], "");

    let standard_run = extract_variation_set(&document, &profile, &patterns(), standard());
    assert_eq!(standard_run.records[0].strategy, "unified_table");
    assert_eq!(standard_run.set.level_count("GPA Range"), 3);

    let south_carolina = FormatProfile::for_hint(FormatHint::SouthCarolina);
    let positional_run = extract_variation_set(&document, &profile, &patterns(), south_carolina);
    assert_eq!(positional_run.records[0].strategy, "specialized");
    assert_eq!(
        positional_run.set.levels_for("GPA Range"),
        &[
            LevelEntry::coded("3.9+", "1"),
            LevelEntry::coded("3.1-3.89", "2"),
            LevelEntry::sentinel("Unknown"),
        ]
    );
    let gpa_source = positional_run
        .variables
        .iter()
        .find(|summary| summary.name == "GPA Range")
        .map(|summary| summary.source.as_str());
    assert_eq!(gpa_source, Some("table"));
}

#[test]
fn text_declarations_run_only_without_relevant_tables() {
    let profile = ExtractionProfile::builtin();
    let text = "Region: North, South, West\nVariable: Home State\nLevels: In-state, Out-of-state\n";

    let document = table_document(Vec::new(), text);
    let text_only = extract_variation_set(&document, &profile, &patterns(), standard());
    assert_eq!(
        text_only.set.variables,
        vec![
            "GPA Range",
            "Distance",
            "Academic Field of Interest",
            "Region",
            "Home State",
        ]
    );
    assert_eq!(
        text_only.set.levels_for("Region"),
        &[
            LevelEntry::coded("North", "1"),
            LevelEntry::coded("South", "2"),
            LevelEntry::coded("West", "3"),
            LevelEntry::sentinel("Unknown"),
        ]
    );
    assert_eq!(text_only.completion.combination_count, 5 * 5 * 31 * 4 * 3);

    let gpa = table(&[&["Variation #", "GPA Range"], &["1", "3.5+"]]);
    let document = table_document(vec![gpa], text);
    let with_table = extract_variation_set(&document, &profile, &patterns(), standard());
    assert!(!with_table.set.contains_variable("Region"));
}

#[test]
fn completion_is_idempotent_and_removes_duplicates() {
    let profile = ExtractionProfile::builtin();
    let mut levels = BTreeMap::new();
    levels.insert(
        "Region".to_string(),
        vec![
            LevelEntry::coded("North", "1"),
            LevelEntry::coded("North", "2"),
            LevelEntry::coded("South", "1"),
        ],
    );
    levels.insert("Orphan".to_string(), Vec::new());
    let mut set = VariationSet {
        variables: vec!["Region".to_string(), "Region".to_string()],
        levels,
    };

    let first = complete_variation_set(&mut set, &profile);

    assert_eq!(first.removed_duplicates, 2);
    assert_eq!(
        set.variables,
        vec![
            "Region",
            "Orphan",
            "GPA Range",
            "Distance",
            "Academic Field of Interest",
        ]
    );
    assert_eq!(
        set.levels_for("Region"),
        &[LevelEntry::coded("North", "1"), LevelEntry::sentinel("Unknown")]
    );
    assert_eq!(set.levels_for("Orphan"), &[LevelEntry::sentinel("Unknown")]);
    assert_eq!(first.combination_count, 2 * 5 * 5 * 31);
    assert_eq!(set.levels.len(), set.variables.len());

    let snapshot = set.clone();
    let second = complete_variation_set(&mut set, &profile);
    assert_eq!(set, snapshot);
    assert!(second.injected_variables.is_empty());
    assert!(second.injected_defaults.is_empty());
    assert_eq!(second.removed_duplicates, 0);
    assert_eq!(second.combination_count, first.combination_count);
}

#[test]
fn sentinel_label_avoids_taken_values() {
    let profile = ExtractionProfile::builtin();
    let mut set = VariationSet::default();
    set.insert_level("Region", LevelEntry::coded("Unknown", "1"))
        .expect("new variable accepts level");

    complete_variation_set(&mut set, &profile);

    assert_eq!(
        set.levels_for("Region"),
        &[
            LevelEntry::coded("Unknown", "1"),
            LevelEntry::sentinel(DEFAULT_CODE),
        ]
    );
}

#[test]
fn field_update_parsing() {
    assert_eq!(
        parse_field_update("GPA Range:2=3.0 - 3.49"),
        Some(FieldUpdate {
            variable: "GPA Range".to_string(),
            data: "2".to_string(),
            value: "3.0 - 3.49".to_string(),
        })
    );
    assert_eq!(parse_field_update("GPA Range=3.0"), None);
    assert_eq!(parse_field_update("A:B:C=x"), None);
    assert_eq!(parse_field_update(":2=x"), None);
}

#[test]
fn document_source_and_remote_extension() {
    assert_eq!(
        DocumentSource::parse("https://example.org/files/list.pdf"),
        DocumentSource::Remote("https://example.org/files/list.pdf".to_string())
    );
    assert_eq!(
        DocumentSource::parse("docs/list.pdf"),
        DocumentSource::Local(PathBuf::from("docs/list.pdf"))
    );
    assert_eq!(remote_extension("https://example.org/files/List.PDF?dl=1"), "pdf");
    assert_eq!(remote_extension("https://example.org/data/layout.json"), "json");
    assert_eq!(remote_extension("https://example.org/"), "pdf");
    assert_eq!(remote_extension("https://example.org"), "pdf");
}

#[test]
fn text_source_is_acquired_with_derived_tables() {
    let path = std::env::temp_dir().join(format!(
        "variation-extract-test-{}.txt",
        std::process::id()
    ));
    let content = "Variation List\n\nVariation #    GPA Range\n1              3.5+\n2              3.0-3.49\nDefault        Unknown\n\nVariation #    Distance\n1              0-50 miles\n2              51+ miles\n";
    fs::write(&path, content).expect("write fixture");

    let patterns = patterns();
    let acquired = acquire_document(&DocumentSource::Local(path.clone()), &patterns);
    fs::remove_file(&path).expect("remove fixture");
    let acquired = acquired.expect("text source loads");

    assert_eq!(acquired.source.kind, "text");
    assert_eq!(acquired.source.page_count, 1);
    assert_eq!(acquired.source.table_count, 2);
    assert_eq!(acquired.source.sha256.len(), 64);

    let profile = ExtractionProfile::builtin();
    let extraction = extract_variation_set(&acquired.document, &profile, &patterns, standard());
    assert_eq!(extraction.set.level_count("GPA Range"), 3);
    assert_eq!(extraction.set.level_count("Distance"), 3);
    assert_eq!(extraction.completion.combination_count, 3 * 3 * 31);
}

#[test]
fn layout_json_source_is_acquired_as_is() {
    let path = std::env::temp_dir().join(format!(
        "variation-extract-layout-{}.json",
        std::process::id()
    ));
    let layout = r#"{
  "pages": [
    {
      "text": "Variation List",
      "tables": [
        [["Variable", "Level 1", "Level 2"], ["Distance", "0-50 miles [1]", null]]
      ]
    },
    { "text": "" }
  ]
}"#;
    fs::write(&path, layout).expect("write fixture");

    let patterns = patterns();
    let acquired = acquire_document(&DocumentSource::Local(path.clone()), &patterns);
    fs::remove_file(&path).expect("remove fixture");
    let acquired = acquired.expect("layout json loads");

    assert_eq!(acquired.source.kind, "layout_json");
    assert_eq!(acquired.source.page_count, 2);
    assert_eq!(acquired.source.table_count, 1);
    assert_eq!(
        acquired.document.pages[0].tables[0][1],
        vec![
            Some("Distance".to_string()),
            Some("0-50 miles [1]".to_string()),
            None,
        ]
    );

    let profile = ExtractionProfile::builtin();
    let extraction = extract_variation_set(&acquired.document, &profile, &patterns, standard());
    assert_eq!(
        extraction.set.levels_for("Distance"),
        &[LevelEntry::coded("0-50 miles", "1"), LevelEntry::sentinel("Unknown")]
    );
}

#[test]
fn oversized_download_is_rejected() {
    let limit = 64 * 1024 * 1024;
    assert!(check_download_size("https://example.org/list.pdf", limit).is_ok());
    let err = check_download_size("https://example.org/list.pdf", limit + 1)
        .err()
        .expect("oversized body fails");
    assert!(err.to_string().contains("exceeds"));
}

#[test]
fn missing_local_source_is_an_error() {
    let source = DocumentSource::Local(PathBuf::from("/nonexistent/variation-list.pdf"));
    let err = acquire_document(&source, &patterns())
        .err()
        .expect("missing file fails");
    assert!(err.to_string().contains("not found"));
}

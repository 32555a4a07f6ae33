use std::path::Path;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::util::read_json;
use crate::variation::LevelEntry;

pub const GPA_RANGE: &str = "GPA Range";
pub const DISTANCE: &str = "Distance";
pub const ACADEMIC_FIELD: &str = "Academic Field of Interest";

const UNKNOWN_LABEL: &str = "Unknown";
const UNDECIDED_LABEL: &str = "Undecided";

const GPA_KEYWORDS: &[&str] = &["gpa", "grade point"];
const DISTANCE_KEYWORDS: &[&str] = &["distance", "miles", "proximity", "radius"];
const ACADEMIC_FIELD_KEYWORDS: &[&str] = &[
    "academic field",
    "field of interest",
    "field of study",
    "area of study",
    "major",
    "cip",
];

const GPA_LEVELS: &[(&str, &str)] = &[
    ("3.5+", "1"),
    ("3.0-3.49", "2"),
    ("2.5-2.99", "3"),
    ("Below 2.5", "4"),
];

const DISTANCE_LEVELS: &[(&str, &str)] = &[
    ("0-50 miles", "1"),
    ("51-150 miles", "2"),
    ("151-500 miles", "3"),
    ("500+ miles", "4"),
];

/// CIP two-digit families used when a document lists no fields of its own.
const ACADEMIC_FIELD_LEVELS: &[(&str, &str)] = &[
    ("Agriculture", "01"),
    ("Natural Resources and Conservation", "03"),
    ("Architecture", "04"),
    ("Area, Ethnic, Cultural and Gender Studies", "05"),
    ("Communication and Journalism", "09"),
    ("Computer and Information Sciences", "11"),
    ("Culinary Arts", "12"),
    ("Education", "13"),
    ("Engineering", "14"),
    ("Engineering Technologies", "15"),
    ("Foreign Languages and Literatures", "16"),
    ("Family and Consumer Sciences", "19"),
    ("Legal Studies", "22"),
    ("English Language and Literature", "23"),
    ("Liberal Arts and Humanities", "24"),
    ("Biological and Biomedical Sciences", "26"),
    ("Mathematics and Statistics", "27"),
    ("Interdisciplinary Studies", "30"),
    ("Parks, Recreation and Fitness", "31"),
    ("Philosophy and Religious Studies", "38"),
    ("Physical Sciences", "40"),
    ("Psychology", "42"),
    ("Criminal Justice and Public Safety", "43"),
    ("Public Administration and Social Services", "44"),
    ("Social Sciences", "45"),
    ("Construction Trades", "46"),
    ("Visual and Performing Arts", "50"),
    ("Health Professions", "51"),
    ("Business and Management", "52"),
    ("History", "54"),
];

const UNIFIED_KEYWORDS: &[&str] = &["variable"];
const LEVEL_COLUMN_KEYWORDS: &[&str] = &["level", "value"];
const IDENTIFIER_KEYWORDS: &[&str] = &["variation", "#", "id", "no.", "number"];
const CODE_KEYWORDS: &[&str] = &["cip", "code"];
const STRUCTURAL_KEYWORDS: &[&str] = &["variable", "variables", "level", "levels"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractorKind {
    Range,
    Categorical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableProfile {
    pub name: String,
    pub kind: ExtractorKind,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub anchors: Vec<String>,
    #[serde(default = "default_label")]
    pub default_label: String,
    #[serde(default)]
    pub default_levels: Vec<LevelEntry>,
}

fn default_label() -> String {
    UNKNOWN_LABEL.to_string()
}

impl VariableProfile {
    pub fn matches(&self, text: &str) -> bool {
        contains_any(&text.to_lowercase(), &self.keywords)
    }

    /// Built-in level list, always ending with the sentinel.
    pub fn fallback_levels(&self) -> Vec<LevelEntry> {
        let mut levels = self.default_levels.clone();
        if !levels.iter().any(LevelEntry::is_default) {
            levels.push(LevelEntry::sentinel(self.default_label.clone()));
        }
        levels
    }
}

/// Vocabulary and defaults that drive extraction for one document family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionProfile {
    pub baseline: Vec<VariableProfile>,
    pub canonical_categories: Vec<String>,
    pub min_category_levels: usize,
    pub unified_keywords: Vec<String>,
    pub level_column_keywords: Vec<String>,
    pub identifier_keywords: Vec<String>,
    pub code_keywords: Vec<String>,
    pub structural_keywords: Vec<String>,
}

impl Default for ExtractionProfile {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ExtractionProfile {
    pub fn builtin() -> Self {
        Self {
            baseline: vec![
                range_profile(GPA_RANGE, GPA_KEYWORDS, GPA_LEVELS),
                range_profile(DISTANCE, DISTANCE_KEYWORDS, DISTANCE_LEVELS),
                VariableProfile {
                    name: ACADEMIC_FIELD.to_string(),
                    kind: ExtractorKind::Categorical,
                    keywords: strings(ACADEMIC_FIELD_KEYWORDS),
                    anchors: strings(ACADEMIC_FIELD_KEYWORDS),
                    default_label: UNDECIDED_LABEL.to_string(),
                    default_levels: with_sentinel(ACADEMIC_FIELD_LEVELS, UNDECIDED_LABEL),
                },
            ],
            canonical_categories: ACADEMIC_FIELD_LEVELS
                .iter()
                .map(|(name, _)| name.to_string())
                .collect(),
            min_category_levels: 4,
            unified_keywords: strings(UNIFIED_KEYWORDS),
            level_column_keywords: strings(LEVEL_COLUMN_KEYWORDS),
            identifier_keywords: strings(IDENTIFIER_KEYWORDS),
            code_keywords: strings(CODE_KEYWORDS),
            structural_keywords: strings(STRUCTURAL_KEYWORDS),
        }
    }

    pub fn baseline_for(&self, name: &str) -> Option<&VariableProfile> {
        self.baseline.iter().find(|profile| profile.name == name)
    }

    /// Maps a spelling variant onto its baseline variable name.
    pub fn canonical_variable(&self, cell: &str) -> Option<&VariableProfile> {
        self.baseline.iter().find(|profile| profile.matches(cell))
    }

    pub fn canonical_name(&self, cell: &str) -> String {
        self.canonical_variable(cell)
            .map(|profile| profile.name.clone())
            .unwrap_or_else(|| collapse_whitespace(cell))
    }

    pub fn default_label_for(&self, variable: &str) -> &str {
        self.baseline_for(variable)
            .map(|profile| profile.default_label.as_str())
            .unwrap_or(UNKNOWN_LABEL)
    }

    pub fn is_structural_keyword(&self, text: &str) -> bool {
        let lowered = text.trim().to_lowercase();
        self.structural_keywords
            .iter()
            .any(|keyword| *keyword == lowered)
    }

    fn check(&self) -> Result<()> {
        if self.baseline.is_empty() {
            bail!("extraction profile defines no baseline variables");
        }
        for profile in &self.baseline {
            if profile.name.trim().is_empty() {
                bail!("extraction profile contains a baseline variable without a name");
            }
            if profile.keywords.is_empty() {
                bail!("baseline variable '{}' has no keywords", profile.name);
            }
        }
        Ok(())
    }
}

pub fn load_profile(path: Option<&Path>) -> Result<ExtractionProfile> {
    let Some(path) = path else {
        return Ok(ExtractionProfile::builtin());
    };

    let mut profile: ExtractionProfile = read_json(path)?;
    for variable in &mut profile.baseline {
        for keyword in &mut variable.keywords {
            *keyword = keyword.to_lowercase();
        }
        if variable.anchors.is_empty() {
            variable.anchors = variable.keywords.clone();
        }
    }
    profile.check()?;

    info!(
        path = %path.display(),
        baseline = profile.baseline.len(),
        categories = profile.canonical_categories.len(),
        "loaded extraction profile"
    );
    Ok(profile)
}

/// Whole-word keyword search. A plural `s` after the keyword still counts,
/// so "levels" matches `level` but "majority" does not match `major`.
pub fn contains_any(lowered: &str, keywords: &[String]) -> bool {
    keywords
        .iter()
        .any(|keyword| contains_keyword(lowered, keyword))
}

fn contains_keyword(lowered: &str, keyword: &str) -> bool {
    let (Some(first), Some(last)) = (keyword.chars().next(), keyword.chars().next_back()) else {
        return false;
    };

    lowered.match_indices(keyword).any(|(start, _)| {
        let before = lowered[..start].chars().next_back();
        let rest = &lowered[start + keyword.len()..];
        let rest = rest.strip_prefix('s').unwrap_or(rest);
        let after = rest.chars().next();

        let open = !first.is_alphanumeric() || !before.is_some_and(char::is_alphanumeric);
        let closed = !last.is_alphanumeric() || !after.is_some_and(char::is_alphanumeric);
        open && closed
    })
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<&str>>().join(" ")
}

fn range_profile(name: &str, keywords: &[&str], levels: &[(&str, &str)]) -> VariableProfile {
    VariableProfile {
        name: name.to_string(),
        kind: ExtractorKind::Range,
        keywords: strings(keywords),
        anchors: strings(keywords),
        default_label: UNKNOWN_LABEL.to_string(),
        default_levels: with_sentinel(levels, UNKNOWN_LABEL),
    }
}

fn with_sentinel(levels: &[(&str, &str)], label: &str) -> Vec<LevelEntry> {
    levels
        .iter()
        .map(|(value, data)| LevelEntry::coded(*value, *data))
        .chain(std::iter::once(LevelEntry::sentinel(label)))
        .collect()
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const DEFAULT_CODE: &str = "Default";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelEntry {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl LevelEntry {
    pub fn new(value: impl Into<String>, data: Option<String>) -> Self {
        Self {
            value: value.into(),
            data,
        }
    }

    pub fn coded(value: impl Into<String>, data: impl Into<String>) -> Self {
        Self::new(value, Some(data.into()))
    }

    pub fn sentinel(value: impl Into<String>) -> Self {
        Self::coded(value, DEFAULT_CODE)
    }

    pub fn is_default(&self) -> bool {
        self.data.as_deref() == Some(DEFAULT_CODE)
    }

    fn numeric_code(&self) -> Option<u64> {
        self.data
            .as_deref()
            .filter(|data| *data != DEFAULT_CODE)
            .and_then(|data| data.trim().parse::<u64>().ok())
    }
}

/// The extracted variables and their levels, keyed by variable name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariationSet {
    #[serde(default)]
    pub variables: Vec<String>,
    #[serde(default)]
    pub levels: BTreeMap<String, Vec<LevelEntry>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelConflict {
    DuplicateValue,
    DuplicateCode,
}

impl VariationSet {
    pub fn contains_variable(&self, name: &str) -> bool {
        self.variables.iter().any(|variable| variable == name)
    }

    /// Registers `name` if it is new. Returns true when it was added.
    pub fn ensure_variable(&mut self, name: &str) -> bool {
        self.levels.entry(name.to_string()).or_default();
        if self.contains_variable(name) {
            return false;
        }
        self.variables.push(name.to_string());
        true
    }

    pub fn levels_for(&self, name: &str) -> &[LevelEntry] {
        self.levels
            .get(name)
            .map(|levels| levels.as_slice())
            .unwrap_or_default()
    }

    pub fn level_count(&self, name: &str) -> usize {
        self.levels_for(name).len()
    }

    /// Levels other than the sentinel.
    pub fn real_level_count(&self, name: &str) -> usize {
        self.levels_for(name)
            .iter()
            .filter(|level| !level.is_default())
            .count()
    }

    pub fn has_default(&self, name: &str) -> bool {
        self.levels_for(name).iter().any(LevelEntry::is_default)
    }

    pub fn conflict_for(&self, variable: &str, entry: &LevelEntry) -> Option<LevelConflict> {
        let levels = self.levels_for(variable);
        if let Some(data) = entry.data.as_deref()
            && levels.iter().any(|level| level.data.as_deref() == Some(data))
        {
            return Some(LevelConflict::DuplicateCode);
        }
        if levels.iter().any(|level| level.value == entry.value) {
            return Some(LevelConflict::DuplicateValue);
        }
        None
    }

    /// Appends a level, registering the variable if needed. Entries that
    /// repeat an existing value or code are rejected.
    pub fn insert_level(&mut self, variable: &str, entry: LevelEntry) -> Result<(), LevelConflict> {
        if let Some(conflict) = self.conflict_for(variable, &entry) {
            return Err(conflict);
        }
        self.ensure_variable(variable);
        self.levels
            .entry(variable.to_string())
            .or_default()
            .push(entry);
        Ok(())
    }

    /// Next integer code above the highest numeric code of `variable`. When
    /// the highest code is `u64::MAX`, the lowest unused positive code instead.
    pub fn next_numeric_code(&self, variable: &str) -> u64 {
        let used = self
            .levels_for(variable)
            .iter()
            .filter_map(LevelEntry::numeric_code)
            .collect::<BTreeSet<u64>>();
        match used.last() {
            None => 1,
            Some(max) => max
                .checked_add(1)
                .unwrap_or_else(|| (1..).find(|code| !used.contains(code)).unwrap_or(0)),
        }
    }

    /// Product of the level-list lengths across all variables.
    pub fn combination_count(&self) -> u64 {
        if self.variables.is_empty() {
            return 0;
        }
        self.variables
            .iter()
            .map(|variable| self.level_count(variable) as u64)
            .fold(1_u64, |total, count| total.saturating_mul(count))
    }

    pub fn update_level(&mut self, update: &FieldUpdate) -> Result<(), EditWarning> {
        let known = self.contains_variable(&update.variable);
        let Some(levels) = self.levels.get_mut(&update.variable).filter(|_| known) else {
            return Err(EditWarning::UnknownVariable {
                variable: update.variable.clone(),
            });
        };

        let Some(entry) = levels
            .iter_mut()
            .find(|level| level.data.as_deref() == Some(update.data.as_str()))
        else {
            return Err(EditWarning::UnknownCode {
                variable: update.variable.clone(),
                data: update.data.clone(),
            });
        };

        entry.value = update.value.clone();
        Ok(())
    }

    /// Adds a level, returning the code it was stored under.
    pub fn add_level(&mut self, addition: &LevelAddition) -> Result<String, EditWarning> {
        if !self.contains_variable(&addition.variable) {
            return Err(EditWarning::UnknownVariable {
                variable: addition.variable.clone(),
            });
        }

        let data = addition
            .data
            .clone()
            .unwrap_or_else(|| self.next_numeric_code(&addition.variable).to_string());
        let entry = LevelEntry::coded(addition.value.clone(), data.clone());

        match self.insert_level(&addition.variable, entry) {
            Ok(()) => Ok(data),
            Err(LevelConflict::DuplicateCode) => Err(EditWarning::DuplicateCode {
                variable: addition.variable.clone(),
                data,
            }),
            Err(LevelConflict::DuplicateValue) => Err(EditWarning::DuplicateValue {
                variable: addition.variable.clone(),
                value: addition.value.clone(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldUpdate {
    pub variable: String,
    pub data: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelAddition {
    pub variable: String,
    pub value: String,
    pub data: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditWarning {
    UnknownVariable { variable: String },
    UnknownCode { variable: String, data: String },
    DuplicateCode { variable: String, data: String },
    DuplicateValue { variable: String, value: String },
}

impl fmt::Display for EditWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownVariable { variable } => write!(f, "variable '{variable}' not found"),
            Self::UnknownCode { variable, data } => {
                write!(f, "no level with data '{data}' in variable '{variable}'")
            }
            Self::DuplicateCode { variable, data } => {
                write!(f, "data '{data}' already exists in variable '{variable}'")
            }
            Self::DuplicateValue { variable, value } => {
                write!(f, "level '{value}' already exists in variable '{variable}'")
            }
        }
    }
}

pub fn update_field_values(
    mut set: VariationSet,
    updates: &[FieldUpdate],
) -> (VariationSet, Vec<EditWarning>) {
    let mut warnings = Vec::new();

    for update in updates {
        match set.update_level(update) {
            Ok(()) => info!(
                variable = %update.variable,
                data = %update.data,
                value = %update.value,
                "updated level value"
            ),
            Err(warning) => {
                warn!(warning = %warning, "level update skipped");
                warnings.push(warning);
            }
        }
    }

    (set, warnings)
}

pub fn add_levels(
    mut set: VariationSet,
    additions: &[LevelAddition],
) -> (VariationSet, Vec<EditWarning>) {
    let mut warnings = Vec::new();

    for addition in additions {
        match set.add_level(addition) {
            Ok(data) => info!(
                variable = %addition.variable,
                data = %data,
                value = %addition.value,
                "added level"
            ),
            Err(warning) => {
                warn!(warning = %warning, "level addition skipped");
                warnings.push(warning);
            }
        }
    }

    (set, warnings)
}

/// Splits `"text [CODE]"` into its value and code parts.
pub fn split_bracketed_code(cell: &str) -> (String, Option<String>) {
    let trimmed = cell.trim();
    if trimmed.ends_with(']')
        && let Some(open) = trimmed.find('[')
    {
        let value = trimmed[..open].trim().to_string();
        let code = trimmed[open + 1..trimmed.len() - 1].trim();
        let code = (!code.is_empty()).then(|| code.to_string());
        return (value, code);
    }

    (trimmed.to_string(), None)
}

use super::*;

/// Compiled patterns shared by the table and text extractors.
pub struct ExtractionPatterns {
    level_token: Regex,
    identifier: Regex,
    variable_heading: Regex,
    levels_heading: Regex,
    declaration: Regex,
    cell_split: Regex,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelPair {
    pub identifier: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub values: Vec<String>,
}

impl ExtractionPatterns {
    pub fn new() -> Result<Self> {
        Ok(Self {
            level_token: Regex::new(
                r"(?im)(?:^[ \t]*(?:(?:variation|level)[ \t]*#?[ \t]*)?|\b(?:variation|level)[ \t]*#?[ \t]*)(\d{1,3}|default)(?:[ \t]*[:)][ \t]*|[ \t]*[.\-–][ \t]+|[ \t]+)",
            )
            .context("failed to compile level token regex")?,
            identifier: Regex::new(
                r"(?i)^(?:variation|level|option)?\s*(?:#|no\.|no\b)?\s*(.+?)[.:)]?$",
            )
            .context("failed to compile identifier regex")?,
            variable_heading: Regex::new(r"(?i)^\s*variables?\s*:\s*(.+?)\s*$")
                .context("failed to compile variable heading regex")?,
            levels_heading: Regex::new(r"(?i)^\s*levels?\s*:\s*(.+?)\s*$")
                .context("failed to compile levels heading regex")?,
            declaration: Regex::new(r"^\s*([^:]+?)\s*:\s+(.+?)\s*$")
                .context("failed to compile declaration regex")?,
            cell_split: Regex::new(r"\t+|\s{2,}").context("failed to compile cell split regex")?,
        })
    }

    pub fn cell_split(&self) -> &Regex {
        &self.cell_split
    }

    /// Reduces "Variation 3", "#3" or "3." to "3"; "default" becomes the sentinel code.
    pub fn normalize_identifier(&self, raw: &str) -> String {
        let trimmed = collapse_whitespace(raw);
        if trimmed.eq_ignore_ascii_case(DEFAULT_CODE) {
            return DEFAULT_CODE.to_string();
        }

        self.identifier
            .captures(&trimmed)
            .and_then(|captures| captures.get(1))
            .map(|value| value.as_str().trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or(trimmed)
    }

    /// Finds `(identifier, value)` pairs; each value runs until the next token.
    pub fn level_pairs(&self, segment: &str) -> Vec<LevelPair> {
        let tokens = self
            .level_token
            .captures_iter(segment)
            .filter_map(|captures| {
                let whole = captures.get(0)?;
                let identifier = captures.get(1)?;
                Some((whole.start(), whole.end(), identifier.as_str().to_string()))
            })
            .collect::<Vec<(usize, usize, String)>>();

        let mut pairs = Vec::new();
        for (index, (_, value_start, identifier)) in tokens.iter().enumerate() {
            let value_end = tokens
                .get(index + 1)
                .map(|(start, _, _)| *start)
                .unwrap_or(segment.len());
            let value = collapse_whitespace(&segment[*value_start..value_end]);
            let value = value.trim_matches([',', ';']).trim();
            if value.is_empty() {
                continue;
            }

            let identifier = if identifier.eq_ignore_ascii_case(DEFAULT_CODE) {
                DEFAULT_CODE.to_string()
            } else {
                identifier.clone()
            };
            pairs.push(LevelPair {
                identifier,
                value: value.to_string(),
            });
        }

        pairs
    }

    /// Flat declarations: "Name: a, b, c", and "Variable: Name" directly
    /// followed by "Levels: a, b".
    pub fn declarations(&self, text: &str, profile: &ExtractionProfile) -> Vec<Declaration> {
        let mut declarations = Vec::<Declaration>::new();
        let mut pending_variable: Option<String> = None;

        for line in text.lines() {
            if let Some(captures) = self.variable_heading.captures(line)
                && let Some(name) = captures.get(1)
            {
                let name = name.as_str().trim();
                if !name.is_empty() {
                    pending_variable = Some(collapse_whitespace(name));
                }
                continue;
            }

            if let Some(captures) = self.levels_heading.captures(line)
                && let Some(values) = captures.get(1)
            {
                if let Some(name) = pending_variable.take() {
                    push_declaration(&mut declarations, name, split_values(values.as_str()));
                }
                continue;
            }

            if !line.trim().is_empty() {
                pending_variable = None;
            }

            let Some(captures) = self.declaration.captures(line) else {
                continue;
            };
            let (Some(name), Some(values)) = (captures.get(1), captures.get(2)) else {
                continue;
            };

            let name = collapse_whitespace(name.as_str());
            if name.is_empty()
                || profile.is_structural_keyword(&name)
                || name.split_whitespace().count() > 6
                || !values.as_str().contains(',')
            {
                continue;
            }

            push_declaration(&mut declarations, name, split_values(values.as_str()));
        }

        declarations
    }
}

/// Returns the anchored block of non-empty lines, or `None` when no line
/// mentions any anchor.
pub fn find_segment(text: &str, anchors: &[String]) -> Option<String> {
    let lines = text.lines().collect::<Vec<&str>>();
    let start = lines
        .iter()
        .position(|line| contains_any(&line.to_lowercase(), anchors))?;

    let mut collected = Vec::<&str>::new();
    for line in &lines[start..] {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if collected.len() >= 2 {
                break;
            }
            continue;
        }
        collected.push(trimmed);
    }

    Some(collected.join("\n"))
}

fn split_values(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(collapse_whitespace)
        .filter(|value| !value.is_empty())
        .collect()
}

fn push_declaration(declarations: &mut Vec<Declaration>, name: String, values: Vec<String>) {
    if values.is_empty() {
        return;
    }

    match declarations.iter_mut().find(|existing| existing.name == name) {
        Some(existing) => {
            for value in values {
                if !existing.values.contains(&value) {
                    existing.values.push(value);
                }
            }
        }
        None => declarations.push(Declaration { name, values }),
    }
}

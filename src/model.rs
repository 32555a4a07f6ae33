use serde::{Deserialize, Serialize};

/// Rows of nullable cells, as handed over by the layout extractor.
pub type RawTable = Vec<Vec<Option<String>>>;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Page {
    #[serde(default)]
    pub tables: Vec<RawTable>,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub pages: Vec<Page>,
}

impl Document {
    pub fn tables(&self) -> impl Iterator<Item = &RawTable> {
        self.pages.iter().flat_map(|page| page.tables.iter())
    }

    pub fn full_text(&self) -> String {
        self.pages
            .iter()
            .map(|page| page.text.as_str())
            .collect::<Vec<&str>>()
            .join("\n\n")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AcquiredSource {
    pub reference: String,
    pub kind: String,
    pub sha256: String,
    pub page_count: usize,
    pub table_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StrategyRecord {
    pub strategy: String,
    pub outcome: String,
    pub covered: Vec<String>,
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VariableSummary {
    pub name: String,
    pub level_count: usize,
    pub source: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractionRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub started_at: String,
    pub updated_at: String,
    pub format_hint: String,
    pub output_path: String,
    pub source: AcquiredSource,
    pub strategies: Vec<StrategyRecord>,
    pub variables: Vec<VariableSummary>,
    pub injected_variables: Vec<String>,
    pub injected_defaults: Vec<String>,
    pub combination_count: u64,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableStructure {
    pub table_number: usize,
    pub rows: usize,
    pub columns: usize,
    pub header: Option<Vec<Option<String>>>,
    pub first_row: Option<Vec<Option<String>>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageStructure {
    pub page_number: usize,
    pub has_text: bool,
    pub text_sample: Option<String>,
    pub table_count: usize,
    pub tables: Vec<TableStructure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentStructure {
    pub manifest_version: u32,
    pub generated_at: String,
    pub source: AcquiredSource,
    pub page_count: usize,
    pub pages: Vec<PageStructure>,
}

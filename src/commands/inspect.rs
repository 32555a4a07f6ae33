use anyhow::Result;
use tracing::info;

use crate::cli::InspectArgs;
use crate::commands::extract::{DocumentSource, ExtractionPatterns, acquire_document};
use crate::model::{Document, DocumentStructure, PageStructure, RawTable, TableStructure};
use crate::util::{now_utc_string, write_json_pretty};

const STRUCTURE_MANIFEST_VERSION: u32 = 1;
const TEXT_SAMPLE_CHARS: usize = 200;

pub fn run(args: InspectArgs) -> Result<()> {
    let patterns = ExtractionPatterns::new()?;
    let source = DocumentSource::parse(&args.source);
    let acquired = acquire_document(&source, &patterns)?;

    let pages = page_structures(&acquired.document);
    for page in &pages {
        info!(
            page = page.page_number,
            has_text = page.has_text,
            tables = page.table_count,
            "inspected page"
        );
    }

    let structure = DocumentStructure {
        manifest_version: STRUCTURE_MANIFEST_VERSION,
        generated_at: now_utc_string(),
        page_count: pages.len(),
        source: acquired.source,
        pages,
    };
    write_json_pretty(&args.output, &structure)?;

    info!(
        output = %args.output.display(),
        pages = structure.page_count,
        "wrote document structure"
    );
    Ok(())
}

pub fn page_structures(document: &Document) -> Vec<PageStructure> {
    document
        .pages
        .iter()
        .enumerate()
        .map(|(index, page)| {
            let tables = page
                .tables
                .iter()
                .filter(|table| !table.is_empty())
                .enumerate()
                .map(|(table_index, table)| table_structure(table_index + 1, table))
                .collect::<Vec<TableStructure>>();
            let has_text = !page.text.trim().is_empty();

            PageStructure {
                page_number: index + 1,
                has_text,
                text_sample: has_text.then(|| text_sample(&page.text)),
                table_count: page.tables.len(),
                tables,
            }
        })
        .collect()
}

fn table_structure(table_number: usize, table: &RawTable) -> TableStructure {
    TableStructure {
        table_number,
        rows: table.len(),
        columns: table.first().map(Vec::len).unwrap_or(0),
        header: table.first().cloned(),
        first_row: table.get(1).cloned(),
    }
}

fn text_sample(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= TEXT_SAMPLE_CHARS {
        return trimmed.to_string();
    }
    let sample = trimmed.chars().take(TEXT_SAMPLE_CHARS).collect::<String>();
    format!("{sample}...")
}

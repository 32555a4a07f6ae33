use super::*;

/// Builds a page from a text layer, deriving tables from aligned columns.
pub fn page_from_text(text: &str, cell_split_regex: &Regex) -> Page {
    Page {
        tables: derive_tables(text, cell_split_regex),
        text: text.to_string(),
    }
}

pub fn derive_tables(text: &str, cell_split_regex: &Regex) -> Vec<RawTable> {
    let mut tables = Vec::<RawTable>::new();
    let mut block = Vec::<Vec<String>>::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            flush_block(&mut block, &mut tables);
            continue;
        }
        if line_is_noise(line) {
            continue;
        }

        let cells = split_table_cells(line, cell_split_regex);
        if cells.len() == 1
            && let Some(previous) = block.last_mut()
            && previous.len() > 1
            && let Some(last_cell) = previous.last_mut()
        {
            last_cell.push(' ');
            last_cell.push_str(&cells[0]);
            continue;
        }

        block.push(cells);
    }
    flush_block(&mut block, &mut tables);

    tables
}

fn flush_block(block: &mut Vec<Vec<String>>, tables: &mut Vec<RawTable>) {
    let leading_titles = block.iter().take_while(|row| row.len() <= 1).count();
    let rows = block.drain(..).skip(leading_titles).collect::<Vec<Vec<String>>>();

    if rows.len() < 2 || !rows.iter().any(|cells| cells.len() > 1) {
        return;
    }

    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    let table = rows
        .into_iter()
        .map(|row| {
            let mut cells = row.into_iter().map(Some).collect::<Vec<Option<String>>>();
            cells.resize(width, None);
            cells
        })
        .collect::<RawTable>();
    tables.push(table);
}

fn split_table_cells(line: &str, cell_split_regex: &Regex) -> Vec<String> {
    let mut cells = cell_split_regex
        .split(line)
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(ToOwned::to_owned)
        .collect::<Vec<String>>();

    if cells.len() <= 1 && line.contains('|') {
        cells = line
            .split('|')
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .map(ToOwned::to_owned)
            .collect();
    }

    if cells.is_empty() {
        vec![line.trim().to_string()]
    } else {
        cells
    }
}

/// Printed page labels ("Page 3", "3 of 7", "- 3 -") carry no table content.
/// Rows of several numbers are table data, not labels.
fn line_is_noise(line: &str) -> bool {
    let normalized = line
        .trim()
        .trim_matches(['-', '–', ' '])
        .to_ascii_lowercase();
    if normalized.is_empty() {
        return true;
    }

    let label = normalized
        .strip_prefix("page")
        .unwrap_or(&normalized)
        .split_whitespace()
        .collect::<Vec<&str>>();
    let is_number = |token: &str| !token.is_empty() && token.chars().all(|ch| ch.is_ascii_digit());
    match label.as_slice() {
        [page] => is_number(page),
        [page, "of", total] => is_number(page) && is_number(total),
        _ => false,
    }
}

pub fn cell_text(row: &[Option<String>], index: usize) -> &str {
    row.get(index)
        .and_then(|cell| cell.as_deref())
        .map(str::trim)
        .unwrap_or_default()
}

pub fn row_is_blank(row: &[Option<String>]) -> bool {
    row.iter()
        .all(|cell| cell.as_deref().map(str::trim).unwrap_or_default().is_empty())
}

pub fn table_width(table: &RawTable) -> usize {
    table.iter().map(Vec::len).max().unwrap_or(0)
}

pub fn transpose(table: &RawTable) -> RawTable {
    let width = table_width(table);
    (0..width)
        .map(|column| {
            table
                .iter()
                .map(|row| row.get(column).cloned().flatten())
                .collect::<Vec<Option<String>>>()
        })
        .collect()
}

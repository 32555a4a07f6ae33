use super::*;

use std::io::Read;
use std::time::Duration;

const HTTP_TIMEOUT_SECS: u64 = 60;
const MAX_REMOTE_BYTES: u64 = 64 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    Local(PathBuf),
    Remote(String),
}

impl DocumentSource {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let lowered = trimmed.to_ascii_lowercase();
        if lowered.starts_with("http://") || lowered.starts_with("https://") {
            Self::Remote(trimmed.to_string())
        } else {
            Self::Local(PathBuf::from(trimmed))
        }
    }
}

impl std::fmt::Display for DocumentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Remote(url) => f.write_str(url),
        }
    }
}

pub struct AcquiredDocument {
    pub document: Document,
    pub source: AcquiredSource,
}

pub fn acquire_document(
    source: &DocumentSource,
    patterns: &ExtractionPatterns,
) -> Result<AcquiredDocument> {
    match source {
        DocumentSource::Local(path) => load_local(path, &source.to_string(), patterns),
        DocumentSource::Remote(url) => {
            let download = download_to_temp(url)?;
            let loaded = load_local(&download, url, patterns);
            if let Err(err) = fs::remove_file(&download) {
                debug!(
                    path = %download.display(),
                    error = %err,
                    "failed to remove downloaded file"
                );
            }
            loaded
        }
    }
}

fn load_local(
    path: &Path,
    reference: &str,
    patterns: &ExtractionPatterns,
) -> Result<AcquiredDocument> {
    if !path.is_file() {
        bail!("source document not found: {}", path.display());
    }

    let extension = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
        .unwrap_or_default();

    let (document, kind) = match extension.as_str() {
        "json" => (read_json::<Document>(path)?, "layout_json"),
        "pdf" => {
            let pages = extract_pages_with_pdftotext(path)?;
            (pages_to_document(&pages, patterns), "pdf_text_layer")
        }
        _ => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read text source {}", path.display()))?;
            let pages = raw.split('\u{000C}').map(ToOwned::to_owned).collect::<Vec<String>>();
            (pages_to_document(&pages, patterns), "text")
        }
    };

    let source = AcquiredSource {
        reference: reference.to_string(),
        kind: kind.to_string(),
        sha256: sha256_file(path)?,
        page_count: document.pages.len(),
        table_count: document.tables().count(),
    };
    info!(
        source = %source.reference,
        kind = %source.kind,
        pages = source.page_count,
        tables = source.table_count,
        "acquired source document"
    );

    Ok(AcquiredDocument { document, source })
}

fn pages_to_document(pages: &[String], patterns: &ExtractionPatterns) -> Document {
    Document {
        pages: pages
            .iter()
            .map(|text| page_from_text(text, patterns.cell_split()))
            .collect(),
    }
}

fn extract_pages_with_pdftotext(pdf_path: &Path) -> Result<Vec<String>> {
    let output = Command::new("pdftotext")
        .arg("-layout")
        .arg("-enc")
        .arg("UTF-8")
        .arg(pdf_path)
        .arg("-")
        .output()
        .with_context(|| format!("failed to execute pdftotext for {}", pdf_path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "pdftotext returned non-zero exit status for {}: {}",
            pdf_path.display(),
            stderr.trim()
        );
    }

    let raw = String::from_utf8_lossy(&output.stdout);
    let mut pages = raw
        .split('\u{000C}')
        .map(|chunk| chunk.replace('\u{0000}', ""))
        .collect::<Vec<String>>();
    while pages.last().is_some_and(|page| page.trim().is_empty()) {
        pages.pop();
    }

    Ok(pages)
}

fn download_to_temp(url: &str) -> Result<PathBuf> {
    let agent = ureq::AgentBuilder::new()
        .timeout_connect(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .timeout_read(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build();

    let response = match agent.get(url).call() {
        Ok(response) => response,
        Err(ureq::Error::Status(code, _)) => {
            bail!("download of {url} failed with HTTP status {code}")
        }
        Err(err) => bail!("failed to download {url}: {err}"),
    };

    let mut bytes = Vec::new();
    response
        .into_reader()
        .take(MAX_REMOTE_BYTES + 1)
        .read_to_end(&mut bytes)
        .with_context(|| format!("failed to read response body from {url}"))?;
    check_download_size(url, bytes.len())?;

    let path = std::env::temp_dir().join(format!(
        "variation-extract-{}-{}.{}",
        std::process::id(),
        utc_compact_string(Utc::now()),
        remote_extension(url)
    ));
    fs::write(&path, &bytes)
        .with_context(|| format!("failed to write downloaded file {}", path.display()))?;

    debug!(url, path = %path.display(), bytes = bytes.len(), "downloaded remote source");
    Ok(path)
}

pub fn check_download_size(url: &str, length: usize) -> Result<()> {
    if length as u64 > MAX_REMOTE_BYTES {
        bail!("download of {url} exceeds the {MAX_REMOTE_BYTES} byte limit");
    }
    Ok(())
}

/// Extension from the last URL path segment, ignoring query and fragment.
pub fn remote_extension(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let after_scheme = without_query
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(without_query);
    after_scheme
        .split_once('/')
        .and_then(|(_, path)| path.rsplit('/').next())
        .and_then(|segment| segment.rsplit_once('.'))
        .map(|(_, extension)| extension.to_ascii_lowercase())
        .filter(|extension| {
            !extension.is_empty() && extension.chars().all(|ch| ch.is_ascii_alphanumeric())
        })
        .unwrap_or_else(|| "pdf".to_string())
}

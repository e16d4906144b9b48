//! Corpus discovery and text extraction.

use sage_core::{AppError, AppResult};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Content type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Pdf,
    Markdown,
    Html,
    PlainText,
    Unknown,
}

impl ContentType {
    /// Detect content type from file extension.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("pdf") => Self::Pdf,
            Some("md") | Some("markdown") => Self::Markdown,
            Some("html") | Some("htm") => Self::Html,
            Some("txt") | Some("text") => Self::PlainText,
            _ => Self::Unknown,
        }
    }

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Markdown => "markdown",
            Self::Html => "html",
            Self::PlainText => "text",
            Self::Unknown => "unknown",
        }
    }
}

/// Text extracted from one corpus file.
#[derive(Debug, Clone)]
pub struct Document {
    /// Source identifier: the file name
    pub source: String,

    pub path: PathBuf,
    pub content_type: ContentType,
    pub text: String,
}

/// A corpus file that could not be turned into text.
#[derive(Debug, Clone)]
pub struct SkippedDocument {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of loading a corpus directory.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub documents: Vec<Document>,
    pub skipped: Vec<SkippedDocument>,
}

/// List supported files under `dir`, sorted by file name for a stable build order.
pub fn discover_files(dir: &Path) -> AppResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(AppError::Config(format!(
            "Corpus directory not found: {}",
            dir.display()
        )));
    }

    let files = WalkDir::new(dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| ContentType::from_path(p) != ContentType::Unknown)
        .collect();

    Ok(files)
}

/// Load every supported document under `dir`.
///
/// A file that fails extraction is logged and recorded in the report; it
/// never aborts the load.
pub fn load_corpus(dir: &Path) -> AppResult<LoadReport> {
    load_corpus_with_progress(dir, |_, _, _| {})
}

/// Load a corpus, calling `on_file(done, total, path)` after each file.
pub fn load_corpus_with_progress<F>(dir: &Path, mut on_file: F) -> AppResult<LoadReport>
where
    F: FnMut(usize, usize, &Path),
{
    let files = discover_files(dir)?;
    tracing::info!("Discovered {} corpus files in {}", files.len(), dir.display());

    let total = files.len();
    let mut report = LoadReport::default();
    for (i, path) in files.into_iter().enumerate() {
        match load_document(dir, &path) {
            Ok(doc) => report.documents.push(doc),
            Err(e) => {
                tracing::warn!("Skipping {}: {}", path.display(), e);
                report.skipped.push(SkippedDocument {
                    path: path.clone(),
                    reason: e.to_string(),
                });
            }
        }
        on_file(i + 1, total, &path);
    }

    Ok(report)
}

/// Extract the text of a single file found under the corpus root `dir`.
pub fn load_document(dir: &Path, path: &Path) -> AppResult<Document> {
    let content_type = ContentType::from_path(path);
    let source = source_id(dir, path);

    let text = match content_type {
        ContentType::Pdf => extract_pdf(path)?,
        ContentType::Markdown => clean_markdown(&read_text(path)?),
        ContentType::Html => clean_html(&read_text(path)?),
        ContentType::PlainText => read_text(path)?,
        ContentType::Unknown => {
            return Err(AppError::Data(format!(
                "Unsupported file type: {}",
                path.display()
            )))
        }
    };

    tracing::debug!(
        source = %source,
        content_type = content_type.as_str(),
        chars = text.chars().count(),
        "Extracted document"
    );

    Ok(Document {
        source,
        path: path.to_path_buf(),
        content_type,
        text,
    })
}

/// Source identifier of a corpus file: its path relative to the corpus
/// root, `/`-separated. Files directly under the root are named by file name.
pub fn source_id(dir: &Path, path: &Path) -> String {
    match path.strip_prefix(dir) {
        Ok(relative) if relative.components().next().is_some() => relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"),
        _ => path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string()),
    }
}

fn read_text(path: &Path) -> AppResult<String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Data(format!("Failed to read {}: {}", path.display(), e)))?;

    if raw.contains('\0') {
        return Err(AppError::Data(format!(
            "Binary content in {}",
            path.display()
        )));
    }

    Ok(raw)
}

/// Text of every page in page order, pages joined by newlines.
fn extract_pdf(path: &Path) -> AppResult<String> {
    let doc = lopdf::Document::load(path)
        .map_err(|e| AppError::Data(format!("Failed to open PDF {}: {}", path.display(), e)))?;

    let mut pages = Vec::new();
    for page_number in doc.get_pages().keys() {
        match doc.extract_text(&[*page_number]) {
            Ok(text) => pages.push(text),
            Err(e) => {
                // A page without extractable text still lets the rest through.
                tracing::debug!(
                    "No text on page {} of {}: {}",
                    page_number,
                    path.display(),
                    e
                );
                pages.push(String::new());
            }
        }
    }

    let text = pages.join("\n");
    if text.trim().is_empty() {
        return Err(AppError::Data(format!(
            "No extractable text in {}",
            path.display()
        )));
    }

    Ok(text)
}

/// Clean markdown by removing excess formatting.
fn clean_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for line in text.lines() {
        let trimmed = line.trim_start_matches('#').trim();

        // Horizontal rules and code fences
        if trimmed.starts_with("---") || trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            continue;
        }

        if !trimmed.is_empty() {
            result.push_str(trimmed);
            result.push('\n');
        }
    }

    result.trim().to_string()
}

/// Clean HTML by stripping tags, scripts and styles.
fn clean_html(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut in_tag = false;
    let mut in_script = false;
    let mut in_style = false;

    for (i, ch) in text.char_indices() {
        if ch == '<' {
            in_tag = true;

            let rest: String = text[i..]
                .chars()
                .take(8)
                .map(|c| c.to_ascii_lowercase())
                .collect();
            if rest.starts_with("<script") {
                in_script = true;
            } else if rest.starts_with("</script") {
                in_script = false;
            } else if rest.starts_with("<style") {
                in_style = true;
            } else if rest.starts_with("</style") {
                in_style = false;
            }
        } else if ch == '>' {
            in_tag = false;
            // Keep words on either side of a tag apart
            result.push(' ');
        } else if !in_tag && !in_script && !in_style {
            result.push(ch);
        }
    }

    result.split_whitespace().collect::<Vec<_>>().join(" ")
}

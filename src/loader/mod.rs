//! Content loader. Turns an input file or directory into an ordered list of
//! pending documents, and loads each document's normalized text on demand.
//!
//! Two input shapes:
//! 1. A JSON array of `{id, body}` objects
//! 2. A directory of `basename.html` / `basename.txt` files, where files that
//!    share a basename are one document (HTML preferred)
//!
//! Text is loaded lazily so the orchestrator can skip duplicates before
//! touching the disk.

pub mod text;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::LoaderError;

pub use text::{html_to_text, normalize_text};

/// The files backing one document. At least one of them is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Representations {
    pub html: Option<PathBuf>,
    pub text: Option<PathBuf>,
}

/// Where a document's text comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentContent {
    /// Body supplied in the input file.
    Inline(String),
    /// Body stored on disk in one or more representations.
    Files(Representations),
}

/// A document whose text has not been loaded yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDocument {
    pub id: String,
    pub content: DocumentContent,
}

impl PendingDocument {
    pub fn inline(id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: DocumentContent::Inline(body.into()),
        }
    }
}

/// Load normalized text for a document. Unreadable content yields "".
pub async fn load_text(content: &DocumentContent) -> String {
    match content {
        DocumentContent::Inline(body) => normalize_text(body),
        DocumentContent::Files(reps) => {
            if let Some(path) = &reps.html {
                match fs::read_to_string(path).await {
                    Ok(html) => return normalize_text(&html_to_text(&html)),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Failed to read HTML representation");
                    }
                }
            }
            if let Some(path) = &reps.text {
                match fs::read_to_string(path).await {
                    Ok(text) => return normalize_text(&text),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Failed to read text representation");
                    }
                }
            }
            String::new()
        }
    }
}

// ── Input sources ───────────────────────────────────────────────────

/// Where the run's documents come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    JsonFile(PathBuf),
    Directory(PathBuf),
}

impl DocumentSource {
    /// Pick the source shape from what `path` is on disk.
    pub fn detect(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if path.is_dir() {
            Self::Directory(path)
        } else {
            Self::JsonFile(path)
        }
    }

    /// Whether documents from this source share identifiers across
    /// representations and need de-duplication.
    pub fn deduplicates(&self) -> bool {
        matches!(self, Self::Directory(_))
    }

    /// The ordered list of documents to process.
    pub async fn pending_documents(&self) -> Result<Vec<PendingDocument>, LoaderError> {
        match self {
            Self::JsonFile(path) => read_json_list(path).await,
            Self::Directory(path) => scan_directory(path).await,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawEmail {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    body: Option<Value>,
}

async fn read_json_list(path: &Path) -> Result<Vec<PendingDocument>, LoaderError> {
    let raw = fs::read_to_string(path)
        .await
        .map_err(|source| LoaderError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    let emails: Vec<RawEmail> =
        serde_json::from_str(&raw).map_err(|source| LoaderError::InvalidInput {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(emails
        .into_iter()
        .enumerate()
        .map(|(idx, email)| {
            let id = match email.id {
                Some(Value::String(s)) if !s.is_empty() => s,
                Some(Value::Number(n)) => n.to_string(),
                _ => format!("email_{idx}"),
            };
            let body = match email.body {
                Some(Value::String(s)) => s,
                _ => String::new(),
            };
            PendingDocument::inline(id, body)
        })
        .collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Representation {
    Html,
    Text,
}

fn classify_file(path: &Path) -> Option<(String, Representation)> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let kind = match ext.as_str() {
        "html" | "htm" => Representation::Html,
        "txt" => Representation::Text,
        _ => return None,
    };
    let stem = path.file_stem()?.to_str()?.to_string();
    Some((stem, kind))
}

/// One pending document per file, in file-name order. Files sharing a stem
/// produce repeated ids that all point at the same representations.
async fn scan_directory(dir: &Path) -> Result<Vec<PendingDocument>, LoaderError> {
    let read_err = |source| LoaderError::Read {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = fs::read_dir(dir).await.map_err(read_err)?;
    let mut files: Vec<PathBuf> = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(read_err)? {
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    let mut by_stem: HashMap<String, Representations> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    for path in &files {
        let Some((stem, kind)) = classify_file(path) else {
            debug!(path = %path.display(), "Skipping file with unsupported extension");
            continue;
        };
        let reps = by_stem.entry(stem.clone()).or_default();
        match kind {
            Representation::Html => reps.html = Some(path.clone()),
            Representation::Text => reps.text = Some(path.clone()),
        }
        order.push(stem);
    }

    Ok(order
        .into_iter()
        .map(|stem| {
            let reps = by_stem.get(&stem).cloned().unwrap_or_default();
            PendingDocument {
                id: stem,
                content: DocumentContent::Files(reps),
            }
        })
        .collect())
}

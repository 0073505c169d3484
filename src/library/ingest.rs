//! Turning an uploaded file into the fields of a new item.
//!
//! Policy, by MIME type (or extension):
//! - `application/pdf`: bytes kept as a `data:` URL, content is a placeholder
//! - text / `.md` / `.txt`: bytes decoded into the content, nothing else kept
//! - anything else: content describes the file, bytes are dropped

use std::path::Path;

use anyhow::Context;
use thiserror::Error;
use tokio::fs;
use tracing::debug;

use crate::domain::{to_data_url, FileAttachment};
use crate::library::tree::NewItem;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_OCTET_STREAM: &str = "application/octet-stream";

/// Errors while reading an upload from disk
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Not a file: {0}")]
    NotAFile(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// How an upload was classified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Pdf,
    Text,
    Unsupported,
}

/// A file prepared for saving as an item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestedFile {
    /// Default title: the file name without its extension
    pub title: String,

    /// Text content or placeholder
    pub content: String,

    pub kind: UploadKind,

    pub attachment: FileAttachment,
}

impl IngestedFile {
    /// Classify and convert raw upload bytes.
    ///
    /// `mime_type` is what the picker reported; when absent it is guessed
    /// from the file name.
    pub fn from_bytes(file_name: &str, mime_type: Option<&str>, bytes: &[u8]) -> Self {
        let mime_type = mime_type
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| guess_mime_type(file_name).to_string());

        let kind = classify(file_name, &mime_type);

        let (content, file_data) = match kind {
            UploadKind::Pdf => (
                format!("PDF file: {}", file_name),
                Some(to_data_url(&mime_type, bytes)),
            ),
            UploadKind::Text => (String::from_utf8_lossy(bytes).into_owned(), None),
            UploadKind::Unsupported => (
                format!(
                    "[Preview unavailable]\nName: {}\nSize: {:.2} KB\nType: {}",
                    file_name,
                    bytes.len() as f64 / 1024.0,
                    mime_type
                ),
                None,
            ),
        };

        Self {
            title: strip_extension(file_name).to_string(),
            content,
            kind,
            attachment: FileAttachment {
                file_name: file_name.to_string(),
                mime_type,
                file_data,
            },
        }
    }

    /// Read a file from disk and classify it
    pub async fn from_path(path: &Path) -> Result<Self, IngestError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| IngestError::NotAFile(path.display().to_string()))?;

        let bytes = fs::read(path).await?;
        let file = Self::from_bytes(file_name, None, &bytes);
        debug!(file = file_name, bytes = bytes.len(), kind = ?file.kind, "Read upload");
        Ok(file)
    }

    /// Override the default title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Convert into the input for [`Library::create_item`](crate::library::Library::create_item)
    pub fn into_new_item(self) -> NewItem {
        NewItem::new(self.title, self.content).with_attachment(self.attachment)
    }
}

/// Read an upload, adding the path to any error
pub async fn ingest_path(path: &Path) -> anyhow::Result<IngestedFile> {
    IngestedFile::from_path(path)
        .await
        .with_context(|| format!("Failed to read upload: {}", path.display()))
}

fn classify(file_name: &str, mime_type: &str) -> UploadKind {
    let lower = file_name.to_lowercase();

    if mime_type == MIME_PDF {
        UploadKind::Pdf
    } else if mime_type.contains("text") || lower.ends_with(".md") || lower.ends_with(".txt") {
        UploadKind::Text
    } else {
        UploadKind::Unsupported
    }
}

/// Drop the last extension: `notes.v2.md` → `notes.v2`
pub fn strip_extension(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(pos) if pos + 1 < file_name.len() => &file_name[..pos],
        _ => file_name,
    }
}

/// Best-effort MIME type from the file extension
pub fn guess_mime_type(file_name: &str) -> &'static str {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "pdf" => MIME_PDF,
        "txt" | "log" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "json" => "application/json",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "zip" => "application/zip",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => MIME_OCTET_STREAM,
    }
}

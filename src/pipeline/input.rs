//! Input resolution: validate a user-supplied path and sniff its format.
//!
//! We look at magic bytes rather than the extension so callers get a
//! meaningful error up front instead of a pdfium or decoder failure deep
//! inside the rasterizer.

use crate::error::TranslateError;
use crate::sink::OutputFormat;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Source document kind, determined from the file's first bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// Multi-page PDF, rasterised with pdfium.
    Pdf,
    /// A single PNG, JPEG or TIFF image, treated as a one-page document.
    Image,
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentKind::Pdf => f.write_str("pdf"),
            DocumentKind::Image => f.write_str("image"),
        }
    }
}

/// A validated source document. Read-only for the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub path: PathBuf,
    pub kind: DocumentKind,
}

/// Classify a file header. Returns `None` for anything unsupported.
pub fn sniff_kind(header: &[u8]) -> Option<DocumentKind> {
    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n";
    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF];
    const TIFF_LE: &[u8] = b"II*\0";
    const TIFF_BE: &[u8] = b"MM\0*";

    if header.starts_with(b"%PDF") {
        Some(DocumentKind::Pdf)
    } else if [PNG, JPEG, TIFF_LE, TIFF_BE]
        .iter()
        .any(|magic| header.starts_with(magic))
    {
        Some(DocumentKind::Image)
    } else {
        None
    }
}

/// Resolve a local path, checking existence, read permission and format.
pub fn resolve_document(path: impl AsRef<Path>) -> Result<Document, TranslateError> {
    let path = path.as_ref().to_path_buf();

    if !path.exists() {
        return Err(TranslateError::FileNotFound { path });
    }

    let mut header = Vec::with_capacity(8);
    match std::fs::File::open(&path) {
        Ok(f) => {
            f.take(8).read_to_end(&mut header).map_err(|e| {
                TranslateError::CorruptDocument {
                    path: path.clone(),
                    detail: e.to_string(),
                }
            })?;
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(TranslateError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(TranslateError::FileNotFound { path });
        }
    }

    let kind = sniff_kind(&header).ok_or_else(|| TranslateError::UnsupportedFormat {
        path: path.clone(),
        magic: header.iter().take(4).copied().collect(),
    })?;

    debug!("Resolved {} document: {}", kind, path.display());
    Ok(Document { path, kind })
}

/// `<dir>/<stem>_translated.<ext>` next to the source.
pub fn derive_output_path(source: &Path, format: OutputFormat) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    let name = format!("{stem}_translated.{}", format.extension());
    match source.parent() {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}

//! Values produced by a translation run.

use crate::error::PageError;
use crate::pipeline::input::DocumentKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What the pipeline hands to an [`crate::sink::OutputSink`] for one page.
///
/// `text` is the translated text, or the recognized text verbatim when
/// translation failed. `width`/`height` are the source page's pixel size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContent {
    /// 0-based page index.
    pub index: usize,
    pub text: String,
    pub width: u32,
    pub height: u32,
}

/// A recoverable per-page problem recorded during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageWarning {
    /// 0-based page index.
    pub page: usize,
    pub error: PageError,
}

impl PageWarning {
    pub fn new(error: PageError) -> Self {
        Self {
            page: error.page(),
            error,
        }
    }

    /// Human-readable description, e.g. `"translation failed: HTTP 503"`.
    pub fn message(&self) -> String {
        self.error.to_string()
    }
}

/// Terminal result of a run that was not aborted by a fatal error.
///
/// A cancelled run is still a successful result: `cancelled` is set and
/// `pages_processed` tells how far it got. The output file at `output_path`
/// contains exactly `pages_processed` units; when a run is cancelled before
/// its first page no file is written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub pages_processed: usize,
    pub total_pages: usize,
    pub cancelled: bool,
    /// Ordered by page index.
    pub warnings: Vec<PageWarning>,
    pub output_path: PathBuf,
    pub duration_ms: u64,
}

impl RunResult {
    /// `true` when every page was processed without a warning.
    pub fn is_clean(&self) -> bool {
        !self.cancelled && self.warnings.is_empty() && self.pages_processed == self.total_pages
    }
}

/// Cheap facts about a source document, available without OCR or translation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub path: PathBuf,
    pub kind: DocumentKind,
    pub page_count: usize,
}

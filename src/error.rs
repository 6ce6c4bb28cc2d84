//! Error types for the scan-translate library.
//!
//! Three error types reflect three distinct failure modes:
//!
//! * [`TranslateError`]: **Fatal**: the run cannot proceed or its output
//!   cannot be written (unreadable input, pdfium missing, disk full).
//!   Returned as `Err(TranslateError)` from the top-level entry points.
//!
//! * [`PageError`]: **Non-fatal**: one page could not be recognised or
//!   translated. The pipeline substitutes a fallback value (empty text or the
//!   untranslated text) and records the error as a
//!   [`crate::output::PageWarning`]; the run continues.
//!
//! * [`BackendError`]: what a collaborator (OCR engine, translation service)
//!   reports to the pipeline. The pipeline turns it into a [`PageError`].

use crate::sink::SinkError;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the scan-translate library.
///
/// Page-level failures use [`PageError`] and are stored in
/// [`crate::output::RunResult::warnings`] rather than propagated here.
#[derive(Debug, Error)]
pub enum TranslateError {
    // ── Setup errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Document not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file is neither a PDF nor a supported raster image.
    #[error("Unsupported document format: '{path}'\nFirst bytes: {magic:?}")]
    UnsupportedFormat { path: PathBuf, magic: Vec<u8> },

    /// The document could not be opened or rasterised at all.
    #[error("Document '{path}' could not be rasterised: {detail}")]
    CorruptDocument { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The document opened but contains no pages.
    #[error("Document '{path}' has no pages")]
    EmptyDocument { path: PathBuf },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Install pdfium system-wide, or set PDFIUM_LIB_PATH=/path/to/libpdfium\n\
to point at an existing copy.\n"
    )]
    PdfiumBindingFailed(String),

    /// No usable font for the layout renderer.
    #[error("No usable font for page rendering: {detail}\nProvide one with --font <PATH>.")]
    FontUnavailable { detail: String },

    /// The configured LLM provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Output errors ─────────────────────────────────────────────────────
    /// The output sink could not accept a page or write the final document.
    #[error("Failed to write output '{path}' after {pages_processed} pages: {source}")]
    SinkWrite {
        pages_processed: usize,
        path: PathBuf,
        #[source]
        source: SinkError,
    },

    /// Finalize was reached with zero accepted pages.
    #[error("Nothing to write to '{path}': no pages were processed")]
    EmptyOutput { path: PathBuf },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TranslateError {
    /// Whether this error aborted the run before any page was processed.
    pub fn is_setup(&self) -> bool {
        matches!(
            self,
            TranslateError::FileNotFound { .. }
                | TranslateError::PermissionDenied { .. }
                | TranslateError::UnsupportedFormat { .. }
                | TranslateError::CorruptDocument { .. }
                | TranslateError::PasswordRequired { .. }
                | TranslateError::WrongPassword { .. }
                | TranslateError::EmptyDocument { .. }
                | TranslateError::PdfiumBindingFailed(_)
                | TranslateError::FontUnavailable { .. }
                | TranslateError::ProviderNotConfigured { .. }
                | TranslateError::InvalidConfig(_)
        )
    }
}

/// Pipeline stage a [`PageError::Timeout`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Recognition,
    Translation,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Recognition => f.write_str("recognition"),
            Stage::Translation => f.write_str("translation"),
        }
    }
}

/// A non-fatal error for a single page.
///
/// Page indices are 0-based, matching [`crate::output::PageContent::index`].
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// The document opened but this page could not be rasterised.
    #[error("rasterisation failed: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// OCR failed; the page continues with empty text.
    #[error("recognition failed: {detail}")]
    RecognitionFailed { page: usize, detail: String },

    /// Translation failed; the page continues with the recognized text.
    #[error("translation failed: {detail}")]
    TranslationFailed { page: usize, detail: String },

    /// A collaborator call exceeded its timeout.
    #[error("{stage} timed out after {secs}s")]
    Timeout { page: usize, stage: Stage, secs: u64 },
}

impl PageError {
    /// 0-based index of the page this error belongs to.
    pub fn page(&self) -> usize {
        match self {
            PageError::RenderFailed { page, .. }
            | PageError::RecognitionFailed { page, .. }
            | PageError::TranslationFailed { page, .. }
            | PageError::Timeout { page, .. } => *page,
        }
    }
}

/// Failure reported by an OCR engine or translation service.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend binary or service cannot be reached at all.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// Transport-level failure (connection refused, TLS, reset).
    #[error("request failed: {0}")]
    Request(String),

    /// The service answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// A child process exited unsuccessfully.
    #[error("process exited with {status}: {stderr}")]
    Process { status: String, stderr: String },

    /// The response could not be interpreted.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The page image could not be encoded for the backend.
    #[error("image encoding failed: {0}")]
    Encode(String),
}

//! # scan-translate
//!
//! Translate scanned documents page by page: OCR each page, machine-translate
//! the text, and write either a PDF of re-rendered pages or a DOCX of
//! translated paragraphs.
//!
//! ## Why this crate?
//!
//! A scanned book has no text layer to translate. This crate rasterises each
//! page, recognises its text with tesseract (or a vision model), translates
//! it, and lays the translation out on a blank page of the original size.
//! A failure on one page never costs the rest of the document: that page
//! carries its untranslated text (or nothing) and the run goes on.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF / image
//!  │
//!  ├─ 1. Input      validate the path, sniff PDF vs. PNG/JPEG/TIFF
//!  ├─ 2. Rasterise  pdfium on a blocking thread, pages streamed in order
//!  ├─ 3. Recognise  tesseract -l eng+ukr+rus (or a vision LLM)
//!  ├─ 4. Translate  Google web endpoint (or a chat LLM), with a run-local cache
//!  └─ 5. Output     rendered-page PDF  |  paragraph DOCX
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scan_translate::{translate_document, TranslationConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = TranslationConfig::builder()
//!         .target_language("en")
//!         .build()?;
//!     let result = translate_document("scan.pdf", &config).await?;
//!     eprintln!(
//!         "{}/{} pages → {} ({} warnings)",
//!         result.pages_processed,
//!         result.total_pages,
//!         result.output_path.display(),
//!         result.warnings.len()
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## External requirements
//!
//! | Needed for | Requirement |
//! |------------|-------------|
//! | PDF input | pdfium shared library (system path or `PDFIUM_LIB_PATH`) |
//! | default recognizer | `tesseract` with the language packs for every hint |
//! | PDF output | a TrueType font with Cyrillic coverage (DejaVu Sans is found automatically) |
//! | `vision` / `llm` backends | an API key for an `edgequake-llm` provider |
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdftranslate` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod layout;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod sink;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    RecognizerBackend, TranslationConfig, TranslationConfigBuilder, TranslatorBackend,
};
pub use convert::{
    inspect, translate_bytes, translate_document, translate_document_sync,
    translate_document_with_state,
};
pub use error::{BackendError, PageError, Stage, TranslateError};
pub use layout::{LayoutConfig, LayoutRenderer, PageRenderer, RenderedPage};
pub use output::{DocumentInfo, PageContent, PageWarning, RunResult};
pub use pipeline::input::{Document, DocumentKind};
pub use pipeline::rasterize::{Page, Rasterizer};
pub use pipeline::recognize::Recognizer;
pub use pipeline::translate::Translator;
pub use pipeline::{PagePipeline, PipelineOptions};
pub use progress::{
    NoopProgressCallback, PageProgress, PipelineState, ProgressCallback,
    TranslationProgressCallback,
};
pub use sink::{FlowTextSink, OutputFormat, OutputSink, PaginatedImageSink, SinkError};
pub use stream::{spawn_translation, RunEvent, TranslationHandle};

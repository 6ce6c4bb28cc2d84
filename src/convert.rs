//! High-level entry points: resolve collaborators from a config and run the
//! page pipeline on one document.
//!
//! These functions wait for the whole run. Use
//! [`crate::stream::spawn_translation`] instead when a controlling surface
//! needs live events and a cancel button.

use crate::config::{RecognizerBackend, TranslationConfig, TranslatorBackend};
use crate::error::TranslateError;
use crate::layout::LayoutRenderer;
use crate::output::{DocumentInfo, RunResult};
use crate::pipeline::cache::TranslationCache;
use crate::pipeline::input::{self, Document, DocumentKind};
use crate::pipeline::rasterize::{ImageFileRasterizer, PdfiumRasterizer, Rasterizer};
use crate::pipeline::recognize::{Recognizer, TesseractRecognizer, VisionRecognizer};
use crate::pipeline::translate::{GoogleTranslator, LlmTranslator, Translator};
use crate::pipeline::{PagePipeline, PipelineOptions};
use crate::progress::PipelineState;
use crate::sink::{FlowTextSink, OutputFormat, OutputSink, PaginatedImageSink};
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Model used when a provider is named but no model is configured.
const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Translate a scanned document and write the output file.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `input`: path to a PDF, PNG, JPEG or TIFF file
/// * `config`: run configuration
///
/// # Returns
/// `Ok(RunResult)` when an output file was written, even if some pages only
/// carry fallback text (check `result.warnings`).
///
/// # Errors
/// Returns `Err(TranslateError)` only for fatal errors:
/// - file not found / unreadable / unsupported format
/// - pdfium, font or LLM provider unavailable
/// - the output file could not be written, or no page was processed
pub async fn translate_document(
    input: impl AsRef<Path>,
    config: &TranslationConfig,
) -> Result<RunResult, TranslateError> {
    translate_document_with_state(input, config, PipelineState::new()).await
}

/// Like [`translate_document`], with caller-owned run state so another task
/// can watch progress or call [`PipelineState::cancel`].
pub async fn translate_document_with_state(
    input: impl AsRef<Path>,
    config: &TranslationConfig,
    state: Arc<PipelineState>,
) -> Result<RunResult, TranslateError> {
    let document = input::resolve_document(input)?;
    let output_path = output_path_for(&document, config);
    info!("Starting translation: {}", document.path.display());

    // Everything that can fail at setup happens before the pipeline starts.
    let mut sink = build_sink(config)?;
    let recognizer = build_recognizer(config).await?;
    let translator = build_translator(config).await?;

    let pipeline = build_pipeline(&document, config, recognizer, translator);
    pipeline
        .run(&document, sink.as_mut(), &output_path, &state)
        .await
}

/// Synchronous wrapper around [`translate_document`].
///
/// Creates a temporary tokio runtime internally.
pub fn translate_document_sync(
    input: impl AsRef<Path>,
    config: &TranslationConfig,
) -> Result<RunResult, TranslateError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| TranslateError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(translate_document(input, config))
}

/// Translate a document held in memory.
///
/// The bytes are written to a managed [`tempfile`] that is removed on return.
/// Without an explicit `output_path` in `config`, the output is written to
/// `document_translated.<ext>` in the current directory.
pub async fn translate_bytes(
    bytes: &[u8],
    config: &TranslationConfig,
) -> Result<RunResult, TranslateError> {
    let mut tmp = tempfile::NamedTempFile::new()
        .map_err(|e| TranslateError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(bytes)
        .map_err(|e| TranslateError::Internal(format!("tempfile write: {e}")))?;

    let mut config = config.clone();
    if config.output_path.is_none() {
        config.output_path = Some(PathBuf::from(format!(
            "document_translated.{}",
            config.output_format.extension()
        )));
    }
    // `tmp` is dropped (and the file deleted) when the run returns
    translate_document(tmp.path(), &config).await
}

/// Report the document kind and page count without OCR or translation.
///
/// Does not require tesseract, a font or an LLM provider.
pub async fn inspect(input: impl AsRef<Path>) -> Result<DocumentInfo, TranslateError> {
    let config = TranslationConfig::default();
    let document = input::resolve_document(input)?;
    let rasterizer = build_rasterizer(&document, &config);
    let path = document.path.clone();
    let page_count = tokio::task::spawn_blocking(move || rasterizer.page_count(&path))
        .await
        .map_err(|e| TranslateError::Internal(format!("Page count task panicked: {e}")))??;

    Ok(DocumentInfo {
        path: document.path,
        kind: document.kind,
        page_count,
    })
}

/// Explicit `config.output_path`, else `<dir>/<stem>_translated.<ext>`.
pub fn output_path_for(document: &Document, config: &TranslationConfig) -> PathBuf {
    config
        .output_path
        .clone()
        .unwrap_or_else(|| input::derive_output_path(&document.path, config.output_format))
}

// ── Collaborator resolution ──────────────────────────────────────────────────

/// Assemble a [`PagePipeline`] for `document` from resolved collaborators.
pub fn build_pipeline(
    document: &Document,
    config: &TranslationConfig,
    recognizer: Arc<dyn Recognizer>,
    translator: Arc<dyn Translator>,
) -> PagePipeline {
    let mut pipeline = PagePipeline::new(
        build_rasterizer(document, config),
        recognizer,
        translator,
        PipelineOptions::from(config),
    );
    if config.cache_enabled {
        pipeline = pipeline.with_cache(TranslationCache::new(&config.cache_dir));
    }
    if let Some(ref cb) = config.progress_callback {
        pipeline = pipeline.with_progress(Arc::clone(cb));
    }
    pipeline
}

fn build_rasterizer(document: &Document, config: &TranslationConfig) -> Arc<dyn Rasterizer> {
    match document.kind {
        DocumentKind::Pdf => Arc::new(PdfiumRasterizer::new(
            config.dpi,
            config.max_rendered_pixels,
            config.password.clone(),
        )),
        DocumentKind::Image => Arc::new(ImageFileRasterizer::new(config.max_rendered_pixels)),
    }
}

/// Create the sink for the configured format. Loads the font for the
/// paginated sink, so a missing font fails before any page is processed.
pub fn build_sink(config: &TranslationConfig) -> Result<Box<dyn OutputSink>, TranslateError> {
    match config.output_format {
        OutputFormat::PaginatedImage => {
            let renderer = LayoutRenderer::new(config.layout.clone())?;
            Ok(Box::new(PaginatedImageSink::new(Box::new(renderer), config.dpi)))
        }
        OutputFormat::FlowText => Ok(Box::new(FlowTextSink::new())),
    }
}

async fn build_recognizer(
    config: &TranslationConfig,
) -> Result<Arc<dyn Recognizer>, TranslateError> {
    if let Some(ref recognizer) = config.recognizer {
        return Ok(Arc::clone(recognizer));
    }
    match config.recognizer_backend {
        RecognizerBackend::Tesseract => Ok(Arc::new(TesseractRecognizer::new(
            config.tesseract_cmd.clone(),
        ))),
        RecognizerBackend::Vision => {
            let provider = resolve_provider(config).await?;
            Ok(Arc::new(VisionRecognizer::new(
                provider,
                config.temperature,
                config.max_tokens,
            )))
        }
    }
}

async fn build_translator(
    config: &TranslationConfig,
) -> Result<Arc<dyn Translator>, TranslateError> {
    if let Some(ref translator) = config.translator {
        return Ok(Arc::clone(translator));
    }
    match config.translator_backend {
        TranslatorBackend::Google => {
            let google =
                GoogleTranslator::new().map_err(|e| TranslateError::ProviderNotConfigured {
                    provider: "google".to_string(),
                    hint: e.to_string(),
                })?;
            Ok(Arc::new(google))
        }
        TranslatorBackend::Llm => {
            let provider = resolve_provider(config).await?;
            Ok(Arc::new(LlmTranslator::new(
                provider,
                config.temperature,
                config.max_tokens,
            )))
        }
    }
}

/// Instantiate a named provider with the given model.
fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, TranslateError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        TranslateError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific:
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider + model** (`config.provider_name`); the factory reads
///    the matching API key from the environment.
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`).
/// 4. **OpenAI** when `OPENAI_API_KEY` is set.
/// 5. **Full auto-detection** (`ProviderFactory::from_env`).
async fn resolve_provider(
    config: &TranslationConfig,
) -> Result<Arc<dyn LLMProvider>, TranslateError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| TranslateError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    debug!("Auto-detected LLM provider from environment");
    Ok(llm_provider)
}

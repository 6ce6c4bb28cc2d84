//! The page pipeline: rasterise → recognize → translate → sink, page by page.
//!
//! Each submodule implements exactly one transformation step; this module
//! coordinates them.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ rasterize ──▶ recognize ──▶ postprocess ──▶ translate ──▶ sink
//! (path)    (pdfium)      (tesseract)   (cleanup)       (google)      (pdf/docx)
//! ```
//!
//! 1. [`input`]    : validate the path and sniff PDF vs. image
//! 2. [`rasterize`]: render pages on a blocking thread, streamed through a
//!    bounded channel
//! 3. [`recognize`]: OCR each page raster; [`encode`] prepares the PNG
//! 4. [`postprocess`]: deterministic cleanup of the copy sent to the translator
//! 5. [`translate`]: machine translation, consulting [`cache`] first
//!
//! ## Failure isolation
//!
//! Only document-level and output failures abort a run. A page whose
//! recognition fails continues with empty text; a page whose translation
//! fails continues with the recognized text. Either way the sink still gets
//! one unit per page and the problem is reported as a warning.

pub mod cache;
pub mod encode;
pub mod input;
pub mod postprocess;
pub mod rasterize;
pub mod recognize;
pub mod translate;

use crate::config::TranslationConfig;
use crate::error::{PageError, Stage, TranslateError};
use crate::output::{PageContent, PageWarning, RunResult};
use crate::progress::{NoopProgressCallback, PageProgress, PipelineState, ProgressCallback};
use crate::sink::{OutputSink, SinkError};
use cache::TranslationCache;
use futures::{future, StreamExt};
use input::Document;
use rasterize::{stream_pages, Page, Rasterizer, RasterizedPage};
use recognize::Recognizer;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};
use translate::Translator;

/// Per-run knobs the pipeline needs, independent of how collaborators are built.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub language_hints: Vec<String>,
    pub target_language: String,
    pub concurrency: usize,
    pub recognize_timeout: Duration,
    pub translate_timeout: Duration,
    /// Canvas size for pages that could not be rasterised.
    pub fallback_page_size: (u32, u32),
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from(&TranslationConfig::default())
    }
}

impl From<&TranslationConfig> for PipelineOptions {
    fn from(config: &TranslationConfig) -> Self {
        Self {
            language_hints: config.language_hints.clone(),
            target_language: config.target_language.clone(),
            concurrency: config.concurrency.max(1),
            recognize_timeout: Duration::from_secs(config.recognize_timeout_secs),
            translate_timeout: Duration::from_secs(config.translate_timeout_secs),
            fallback_page_size: config.fallback_page_size,
        }
    }
}

/// Everything one page contributes: the unit for the sink plus its warnings.
struct PageOutcome {
    content: PageContent,
    warnings: Vec<PageError>,
}

/// Drives one document through the collaborators into an [`OutputSink`].
pub struct PagePipeline {
    rasterizer: Arc<dyn Rasterizer>,
    recognizer: Arc<dyn Recognizer>,
    translator: Arc<dyn Translator>,
    cache: Option<TranslationCache>,
    options: PipelineOptions,
    progress: ProgressCallback,
}

impl PagePipeline {
    pub fn new(
        rasterizer: Arc<dyn Rasterizer>,
        recognizer: Arc<dyn Recognizer>,
        translator: Arc<dyn Translator>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            rasterizer,
            recognizer,
            translator,
            cache: None,
            options,
            progress: Arc::new(NoopProgressCallback),
        }
    }

    /// Use (and clear at the start of every run) a translation cache.
    pub fn with_cache(mut self, cache: TranslationCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = progress;
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn progress(&self) -> &ProgressCallback {
        &self.progress
    }

    /// Translate `document` page by page into `sink`, then write it to
    /// `output_path`.
    ///
    /// Pages reach the sink in index order whatever the concurrency.
    /// Cancellation through `state` is checked before each page starts;
    /// pages already in flight are finished and kept.
    ///
    /// # Errors
    /// Setup errors before page 0, [`TranslateError::SinkWrite`] if the sink
    /// fails, and [`TranslateError::EmptyOutput`] if the sink had nothing to
    /// write without a cancellation. A run cancelled before its first page
    /// returns `Ok` with `pages_processed == 0` and writes no file. Per-page
    /// problems are returned as warnings in the [`RunResult`].
    pub async fn run(
        &self,
        document: &Document,
        sink: &mut dyn OutputSink,
        output_path: &Path,
        state: &Arc<PipelineState>,
    ) -> Result<RunResult, TranslateError> {
        let started = Instant::now();

        if let Some(ref cache) = self.cache {
            cache.clear().await;
        }

        let total = self.count_pages(document).await?;
        if total == 0 {
            return Err(TranslateError::EmptyDocument {
                path: document.path.clone(),
            });
        }
        state.begin(total);
        self.progress.on_run_start(total);
        info!(
            "Translating {} ({} pages) → {}",
            document.path.display(),
            total,
            output_path.display()
        );

        let concurrency = self.options.concurrency.max(1);
        let (rx, rasterizer_task) =
            stream_pages(Arc::clone(&self.rasterizer), document.path.clone(), concurrency);

        let mut outcomes = ReceiverStream::new(rx)
            .take_while(|_| future::ready(!state.is_cancel_requested()))
            .map(|item| self.process_page(item, total))
            .buffered(concurrency);

        let mut warnings = Vec::new();
        while let Some(outcome) = outcomes.next().await {
            let page_index = outcome.content.index;

            for error in outcome.warnings {
                let warning = PageWarning::new(error);
                self.progress.on_page_warning(&warning);
                warnings.push(warning);
            }

            sink.accept_page(outcome.content)
                .map_err(|source| TranslateError::SinkWrite {
                    pages_processed: state.pages_completed(),
                    path: output_path.to_path_buf(),
                    source,
                })?;

            let completed = state.complete_page();
            let progress = PageProgress {
                page_index,
                pages_completed: completed,
                total_pages: total,
                eta: state.eta(),
            };
            debug!("Page {}/{} done, eta {:?}", page_index + 1, total, progress.eta);
            self.progress.on_page_complete(&progress);
        }
        // Dropping the stream releases the channel so the rasterizer stops.
        drop(outcomes);

        rasterizer_task
            .await
            .map_err(|e| TranslateError::Internal(format!("Rasterizer task panicked: {e}")))??;

        let pages_processed = sink.pages_accepted();
        let cancelled = state.is_cancel_requested() && pages_processed < total;
        if cancelled {
            info!("Cancelled after {}/{} pages", pages_processed, total);
        }

        if pages_processed == 0 {
            if cancelled {
                // Cancelled before page 0: no file is written.
                let result = RunResult {
                    pages_processed: 0,
                    total_pages: total,
                    cancelled: true,
                    warnings,
                    output_path: output_path.to_path_buf(),
                    duration_ms: started.elapsed().as_millis() as u64,
                };
                self.progress.on_run_complete(&result);
                return Ok(result);
            }
            return Err(TranslateError::EmptyOutput {
                path: output_path.to_path_buf(),
            });
        }

        sink.finalize(output_path).map_err(|source| match source {
            SinkError::EmptyOutput => TranslateError::EmptyOutput {
                path: output_path.to_path_buf(),
            },
            source => TranslateError::SinkWrite {
                pages_processed,
                path: output_path.to_path_buf(),
                source,
            },
        })?;

        let result = RunResult {
            pages_processed,
            total_pages: total,
            cancelled,
            warnings,
            output_path: output_path.to_path_buf(),
            duration_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            "Translation complete: {}/{} pages, {} warnings, {}ms",
            result.pages_processed,
            result.total_pages,
            result.warnings.len(),
            result.duration_ms
        );
        self.progress.on_run_complete(&result);
        Ok(result)
    }

    async fn count_pages(&self, document: &Document) -> Result<usize, TranslateError> {
        let rasterizer = Arc::clone(&self.rasterizer);
        let path = document.path.clone();
        tokio::task::spawn_blocking(move || rasterizer.page_count(&path))
            .await
            .map_err(|e| TranslateError::Internal(format!("Page count task panicked: {e}")))?
    }

    async fn process_page(&self, item: RasterizedPage, total: usize) -> PageOutcome {
        let mut warnings = Vec::new();

        let content = match item {
            Ok(page) => {
                self.progress.on_page_start(page.index, total);
                let (index, width, height) = (page.index, page.width(), page.height());
                let recognized = self.recognize(page, &mut warnings).await;
                let text = self.translate(index, recognized, &mut warnings).await;
                PageContent {
                    index,
                    text,
                    width,
                    height,
                }
            }
            Err(error) => {
                let index = error.page();
                self.progress.on_page_start(index, total);
                let (width, height) = self.options.fallback_page_size;
                warnings.push(error);
                PageContent {
                    index,
                    text: String::new(),
                    width,
                    height,
                }
            }
        };

        PageOutcome { content, warnings }
    }

    /// Recognize one page; empty text on failure. The recognizer's output is
    /// returned untouched. Consumes the page so the raster is released as
    /// soon as recognition is done.
    async fn recognize(&self, page: Page, warnings: &mut Vec<PageError>) -> String {
        let limit = self.options.recognize_timeout;
        let call = self
            .recognizer
            .recognize(&page.image, &self.options.language_hints);

        match timeout(limit, call).await {
            Ok(Ok(text)) => {
                debug!("Page {}: recognized {} chars", page.index + 1, text.len());
                text
            }
            Ok(Err(e)) => {
                warn!("Page {}: recognition failed: {}", page.index + 1, e);
                warnings.push(PageError::RecognitionFailed {
                    page: page.index,
                    detail: e.to_string(),
                });
                String::new()
            }
            Err(_) => {
                warn!("Page {}: recognition timed out", page.index + 1);
                warnings.push(PageError::Timeout {
                    page: page.index,
                    stage: Stage::Recognition,
                    secs: limit.as_secs(),
                });
                String::new()
            }
        }
    }

    /// Translate recognized text; the recognized text itself, verbatim, on
    /// failure. Only the copy sent to the translator is cleaned up.
    async fn translate(
        &self,
        index: usize,
        recognized: String,
        warnings: &mut Vec<PageError>,
    ) -> String {
        let source = postprocess::clean_recognized_text(&recognized);
        if source.is_empty() {
            debug!("Page {}: no text, skipping translation", index + 1);
            return recognized;
        }

        let target = self.options.target_language.as_str();
        if let Some(ref cache) = self.cache {
            if let Some(hit) = cache.get(&source, target).await {
                debug!("Page {}: translation cache hit", index + 1);
                return hit;
            }
        }

        let limit = self.options.translate_timeout;
        match timeout(limit, self.translator.translate(&source, target)).await {
            Ok(Ok(translated)) => {
                if let Some(ref cache) = self.cache {
                    cache.put(&source, target, &translated).await;
                }
                translated
            }
            Ok(Err(e)) => {
                warn!("Page {}: translation failed: {}", index + 1, e);
                warnings.push(PageError::TranslationFailed {
                    page: index,
                    detail: e.to_string(),
                });
                recognized
            }
            Err(_) => {
                warn!("Page {}: translation timed out", index + 1);
                warnings.push(PageError::Timeout {
                    page: index,
                    stage: Stage::Translation,
                    secs: limit.as_secs(),
                });
                recognized
            }
        }
    }
}

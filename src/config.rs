//! Configuration types for document translation.
//!
//! All run behaviour is controlled through [`TranslationConfig`], built via
//! its [`TranslationConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share configs across threads and to log exactly what a run was
//! asked to do.

use crate::error::TranslateError;
use crate::layout::LayoutConfig;
use crate::pipeline::recognize::Recognizer;
use crate::pipeline::translate::Translator;
use crate::progress::ProgressCallback;
use crate::sink::OutputFormat;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Tesseract language codes used when no hints are configured.
pub const DEFAULT_LANGUAGE_HINTS: [&str; 3] = ["eng", "ukr", "rus"];

/// Target language used when none is configured.
pub const DEFAULT_TARGET_LANGUAGE: &str = "ru";

/// Directory the translation cache lives in unless overridden.
pub const DEFAULT_CACHE_DIR: &str = "cache_translations";

/// Configuration for translating one document.
///
/// Built via [`TranslationConfig::builder()`] or using
/// [`TranslationConfig::default()`].
///
/// # Example
/// ```rust
/// use scan_translate::{OutputFormat, TranslationConfig};
///
/// let config = TranslationConfig::builder()
///     .language_hints(["eng", "deu"])
///     .target_language("uk")
///     .output_format(OutputFormat::FlowText)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct TranslationConfig {
    /// OCR language hints (tesseract codes, e.g. `eng`, `ukr`, `rus`). Never empty.
    pub language_hints: Vec<String>,

    /// Target language code for the translator (e.g. `ru`, `en`, `uk`).
    pub target_language: String,

    /// Which sink assembles the output. Default: [`OutputFormat::PaginatedImage`].
    pub output_format: OutputFormat,

    /// Explicit output path. If None, `<dir>/<stem>_translated.<ext>` next to the source.
    pub output_path: Option<PathBuf>,

    /// Rendering DPI when rasterising PDF pages. Range: 72–600. Default: 200.
    ///
    /// Tesseract is tuned for text around 300 DPI and degrades quickly below
    /// 150. 200 keeps page rasters at roughly 1 650 × 2 340 px for A4, which
    /// is readable for OCR and still cheap to hold in memory.
    pub dpi: u32,

    /// Maximum rendered image dimension (width or height) in pixels. Default: 4000.
    pub max_rendered_pixels: u32,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Pages processed concurrently. Default: 1 (strictly sequential).
    ///
    /// The sink always receives pages in order; this only bounds how many
    /// recognition/translation calls may be in flight.
    pub concurrency: usize,

    /// Per-page OCR call timeout in seconds. Default: 120.
    pub recognize_timeout_secs: u64,

    /// Per-page translation call timeout in seconds. Default: 60.
    pub translate_timeout_secs: u64,

    /// Which OCR backend to build when `recognizer` is None.
    pub recognizer_backend: RecognizerBackend,

    /// Tesseract executable. Default: `tesseract` (resolved through `PATH`).
    pub tesseract_cmd: PathBuf,

    /// Which translation backend to build when `translator` is None.
    pub translator_backend: TranslatorBackend,

    /// LLM provider name for the vision recognizer / LLM translator.
    pub provider_name: Option<String>,

    /// LLM model identifier. If None, uses the provider default.
    pub model: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for LLM backends. Default: 0.1.
    pub temperature: f32,

    /// Maximum tokens an LLM backend may generate per page. Default: 4096.
    pub max_tokens: usize,

    /// Pre-constructed recognizer. Takes precedence over `recognizer_backend`.
    pub recognizer: Option<Arc<dyn Recognizer>>,

    /// Pre-constructed translator. Takes precedence over `translator_backend`.
    pub translator: Option<Arc<dyn Translator>>,

    /// Font and spacing used by the paginated-image sink.
    pub layout: LayoutConfig,

    /// Translation cache directory. Cleared at the start of every run.
    pub cache_dir: PathBuf,

    /// Use the translation cache at all. Default: true.
    pub cache_enabled: bool,

    /// Canvas size for pages that fail to rasterise. Default: A4 at 200 DPI.
    pub fallback_page_size: (u32, u32),

    /// Receives per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            language_hints: DEFAULT_LANGUAGE_HINTS.iter().map(|s| s.to_string()).collect(),
            target_language: DEFAULT_TARGET_LANGUAGE.to_string(),
            output_format: OutputFormat::default(),
            output_path: None,
            dpi: 200,
            max_rendered_pixels: 4000,
            password: None,
            concurrency: 1,
            recognize_timeout_secs: 120,
            translate_timeout_secs: 60,
            recognizer_backend: RecognizerBackend::default(),
            tesseract_cmd: PathBuf::from("tesseract"),
            translator_backend: TranslatorBackend::default(),
            provider_name: None,
            model: None,
            provider: None,
            temperature: 0.1,
            max_tokens: 4096,
            recognizer: None,
            translator: None,
            layout: LayoutConfig::default(),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            cache_enabled: true,
            fallback_page_size: (1654, 2339),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for TranslationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslationConfig")
            .field("language_hints", &self.language_hints)
            .field("target_language", &self.target_language)
            .field("output_format", &self.output_format)
            .field("output_path", &self.output_path)
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("concurrency", &self.concurrency)
            .field("recognize_timeout_secs", &self.recognize_timeout_secs)
            .field("translate_timeout_secs", &self.translate_timeout_secs)
            .field("recognizer_backend", &self.recognizer_backend)
            .field("translator_backend", &self.translator_backend)
            .field("provider_name", &self.provider_name)
            .field("model", &self.model)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("recognizer", &self.recognizer.as_ref().map(|r| r.name().to_string()))
            .field("translator", &self.translator.as_ref().map(|t| t.name().to_string()))
            .field("layout", &self.layout)
            .field("cache_dir", &self.cache_dir)
            .field("cache_enabled", &self.cache_enabled)
            .finish()
    }
}

impl TranslationConfig {
    /// Create a new builder for `TranslationConfig`.
    pub fn builder() -> TranslationConfigBuilder {
        TranslationConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`TranslationConfig`].
#[derive(Debug)]
pub struct TranslationConfigBuilder {
    config: TranslationConfig,
}

impl TranslationConfigBuilder {
    pub fn language_hints<I, S>(mut self, hints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.language_hints = hints
            .into_iter()
            .map(Into::into)
            .map(|s: String| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        self
    }

    pub fn target_language(mut self, lang: impl Into<String>) -> Self {
        self.config.target_language = lang.into();
        self
    }

    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.config.output_format = format;
        self
    }

    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_path = Some(path.into());
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn recognize_timeout_secs(mut self, secs: u64) -> Self {
        self.config.recognize_timeout_secs = secs;
        self
    }

    pub fn translate_timeout_secs(mut self, secs: u64) -> Self {
        self.config.translate_timeout_secs = secs;
        self
    }

    pub fn recognizer_backend(mut self, backend: RecognizerBackend) -> Self {
        self.config.recognizer_backend = backend;
        self
    }

    pub fn tesseract_cmd(mut self, cmd: impl Into<PathBuf>) -> Self {
        self.config.tesseract_cmd = cmd.into();
        self
    }

    pub fn translator_backend(mut self, backend: TranslatorBackend) -> Self {
        self.config.translator_backend = backend;
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn recognizer(mut self, recognizer: Arc<dyn Recognizer>) -> Self {
        self.config.recognizer = Some(recognizer);
        self
    }

    pub fn translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.config.translator = Some(translator);
        self
    }

    pub fn layout(mut self, layout: LayoutConfig) -> Self {
        self.config.layout = layout;
        self
    }

    pub fn font_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.layout.font_path = Some(path.into());
        self
    }

    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.cache_dir = dir.into();
        self
    }

    pub fn cache_enabled(mut self, v: bool) -> Self {
        self.config.cache_enabled = v;
        self
    }

    pub fn fallback_page_size(mut self, width: u32, height: u32) -> Self {
        self.config.fallback_page_size = (width.max(1), height.max(1));
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<TranslationConfig, TranslateError> {
        let c = &self.config;
        if c.language_hints.is_empty() {
            return Err(TranslateError::InvalidConfig(
                "At least one language hint is required".into(),
            ));
        }
        if c.target_language.trim().is_empty() {
            return Err(TranslateError::InvalidConfig(
                "Target language must not be empty".into(),
            ));
        }
        if c.dpi < 72 || c.dpi > 600 {
            return Err(TranslateError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        if c.concurrency == 0 {
            return Err(TranslateError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if c.recognize_timeout_secs == 0 || c.translate_timeout_secs == 0 {
            return Err(TranslateError::InvalidConfig(
                "Timeouts must be at least one second".into(),
            ));
        }
        c.layout.validate()?;
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// OCR engine used when no recognizer is injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecognizerBackend {
    /// Local tesseract binary (default). Needs the language packs for every hint.
    #[default]
    Tesseract,
    /// Vision LLM transcription through `edgequake-llm`.
    Vision,
}

/// Translation service used when no translator is injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslatorBackend {
    /// Public Google web endpoint, source language auto-detected (default).
    #[default]
    Google,
    /// Chat LLM through `edgequake-llm`.
    Llm,
}

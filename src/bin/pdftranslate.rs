//! CLI binary for scan-translate.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `TranslationConfig`, runs the translation in the background and
//! renders its event stream.

use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use scan_translate::{
    inspect, spawn_translation, LayoutConfig, OutputFormat, RecognizerBackend, RunEvent, RunResult,
    TranslationConfig, TranslatorBackend,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── Progress view over the run's event stream ───────────────────────────────

/// Live progress bar fed by [`RunEvent`]s. The bar shows the pipeline's own
/// ETA rather than indicatif's, which knows nothing about skipped pages.
struct ProgressView {
    bar: ProgressBar,
}

impl ProgressView {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening document…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Self { bar }
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Translating");
        self.bar.set_message("ETA --:--");
    }

    fn handle(&self, event: &RunEvent) {
        match event {
            RunEvent::Started { total_pages } => {
                self.activate_bar(*total_pages);
                self.bar.println(format!(
                    "{} {}",
                    cyan("◆"),
                    bold(&format!("Translating {total_pages} pages…"))
                ));
            }
            RunEvent::PageStarted { .. } => {}
            RunEvent::PageWarning(warning) => {
                self.bar.println(format!(
                    "  {} Page {:>3}  {}",
                    yellow("⚠"),
                    warning.page + 1,
                    dim(&truncate(&warning.message(), 80)),
                ));
            }
            RunEvent::PageCompleted(progress) => {
                self.bar.set_position(progress.pages_completed as u64);
                let eta = match progress.eta_secs() {
                    Some(s) => format!("ETA {:02}:{:02}", s / 60, s % 60),
                    None => "ETA --:--".to_string(),
                };
                self.bar.set_message(eta);
            }
            RunEvent::Finished(_) | RunEvent::Failed { .. } => self.bar.finish_and_clear(),
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let head: String = s.chars().take(max - 1).collect();
        format!("{head}\u{2026}")
    } else {
        s.to_string()
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Translate a scanned PDF to Russian (writes scan_translated.pdf)
  pdftranslate scan.pdf

  # English target, paragraph DOCX instead of rendered pages
  pdftranslate --target en --format docx scan.pdf -o scan_en.docx

  # Only English and German text on the scans
  pdftranslate --lang eng,deu --target fr letter.png

  # Vision model for OCR, chat model for translation
  pdftranslate --recognizer vision --translator llm --provider openai --model gpt-4.1-mini scan.pdf

  # Page count only (no tesseract or network needed)
  pdftranslate --inspect-only scan.pdf

  # Machine-readable result
  pdftranslate --json scan.pdf > result.json

Press Ctrl-C once to stop after the pages in flight; the pages done so far
are still written.

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH         Path to libpdfium (otherwise the system library is used)
  OPENAI_API_KEY          OpenAI API key (vision / llm backends)
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  RUST_LOG                Override the log filter

REQUIREMENTS:
  tesseract with the language packs for every --lang hint (default eng,ukr,rus).
  A TrueType font with Cyrillic coverage for PDF output; DejaVu Sans and
  Liberation Sans are found automatically, otherwise pass --font.
"#;

/// Translate scanned PDFs and images page by page.
#[derive(Parser, Debug)]
#[command(
    name = "pdftranslate",
    version,
    about = "Translate scanned PDFs and images page by page",
    long_about = "Rasterise each page of a scanned document, recognise its text with tesseract \
(or a vision model), translate it, and write either a PDF of re-rendered pages or a DOCX of \
translated paragraphs. A failing page keeps its untranslated text and the run continues.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF, PNG, JPEG or TIFF file.
    input: PathBuf,

    /// Output file. Default: <input stem>_translated.<pdf|docx> next to the input.
    #[arg(short, long, env = "PDFTRANSLATE_OUTPUT")]
    output: Option<PathBuf>,

    /// Output format: pdf (rendered pages) or docx (paragraphs).
    #[arg(short, long, env = "PDFTRANSLATE_FORMAT", value_enum, default_value = "pdf")]
    format: FormatArg,

    /// OCR language hints, comma separated (tesseract codes).
    #[arg(
        short,
        long,
        env = "PDFTRANSLATE_LANG",
        value_delimiter = ',',
        default_value = "eng,ukr,rus"
    )]
    lang: Vec<String>,

    /// Target language code (e.g. ru, en, uk).
    #[arg(short, long, env = "PDFTRANSLATE_TARGET", default_value = "ru")]
    target: String,

    /// Rasterisation DPI (72–600).
    #[arg(long, env = "PDFTRANSLATE_DPI", default_value_t = 200,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDFTRANSLATE_PASSWORD")]
    password: Option<String>,

    /// Pages processed at once. Output order is unaffected.
    #[arg(short, long, env = "PDFTRANSLATE_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// Per-page OCR timeout in seconds.
    #[arg(long, env = "PDFTRANSLATE_RECOGNIZE_TIMEOUT", default_value_t = 120)]
    recognize_timeout: u64,

    /// Per-page translation timeout in seconds.
    #[arg(long, env = "PDFTRANSLATE_TRANSLATE_TIMEOUT", default_value_t = 60)]
    translate_timeout: u64,

    /// OCR engine.
    #[arg(long, env = "PDFTRANSLATE_RECOGNIZER", value_enum, default_value = "tesseract")]
    recognizer: RecognizerArg,

    /// tesseract executable.
    #[arg(long, env = "PDFTRANSLATE_TESSERACT", default_value = "tesseract")]
    tesseract: PathBuf,

    /// Translation service.
    #[arg(long, env = "PDFTRANSLATE_TRANSLATOR", value_enum, default_value = "google")]
    translator: TranslatorArg,

    /// LLM provider for the vision / llm backends.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// LLM model ID for the vision / llm backends.
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// TrueType font for PDF output.
    #[arg(long, env = "PDFTRANSLATE_FONT")]
    font: Option<PathBuf>,

    /// Font size in pixels for PDF output.
    #[arg(long, env = "PDFTRANSLATE_FONT_SIZE", default_value_t = 24.0)]
    font_size: f32,

    /// Directory for the per-run translation cache.
    #[arg(long, env = "PDFTRANSLATE_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Disable the translation cache.
    #[arg(long, env = "PDFTRANSLATE_NO_CACHE")]
    no_cache: bool,

    /// Print the RunResult as JSON on stdout.
    #[arg(long, env = "PDFTRANSLATE_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDFTRANSLATE_NO_PROGRESS")]
    no_progress: bool,

    /// Print document kind and page count only.
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDFTRANSLATE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDFTRANSLATE_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Pdf,
    Docx,
}

impl From<FormatArg> for OutputFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Pdf => OutputFormat::PaginatedImage,
            FormatArg::Docx => OutputFormat::FlowText,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum RecognizerArg {
    Tesseract,
    Vision,
}

impl From<RecognizerArg> for RecognizerBackend {
    fn from(v: RecognizerArg) -> Self {
        match v {
            RecognizerArg::Tesseract => RecognizerBackend::Tesseract,
            RecognizerArg::Vision => RecognizerBackend::Vision,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum TranslatorArg {
    Google,
    Llm,
}

impl From<TranslatorArg> for TranslatorBackend {
    fn from(v: TranslatorArg) -> Self {
        match v {
            TranslatorArg::Google => TranslatorBackend::Google,
            TranslatorArg::Llm => TranslatorBackend::Llm,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar carries per-page feedback, so library INFO logs are
    // suppressed while it is shown.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let info = inspect(&cli.input)
            .await
            .context("Failed to inspect document")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&info).context("Failed to serialize document info")?
            );
        } else {
            println!("File:    {}", info.path.display());
            println!("Format:  {}", info.kind);
            println!("Pages:   {}", info.page_count);
        }
        return Ok(());
    }

    let config = build_config(&cli)?;

    // ── Run translation ──────────────────────────────────────────────────
    let mut handle = spawn_translation(cli.input.clone(), config);

    let state = Arc::clone(handle.state());
    let quiet = cli.quiet;
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            if !quiet {
                eprintln!(
                    "\n{} finishing pages in flight, then writing output…",
                    yellow("Interrupted:")
                );
            }
            state.cancel();
        }
    });

    if let Some(mut events) = handle.events() {
        let view = show_progress.then(ProgressView::new);
        while let Some(event) = events.next().await {
            if let Some(ref view) = view {
                view.handle(&event);
            }
        }
    }

    let result = handle.join().await.context("Translation failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("Failed to serialise result")?
        );
    } else if !cli.quiet {
        print_summary(&result);
    }

    Ok(())
}

fn print_summary(result: &RunResult) {
    let mark = if result.is_clean() {
        green("✔")
    } else if result.pages_processed == 0 {
        red("✘")
    } else {
        cyan("⚠")
    };
    if result.pages_processed == 0 {
        eprintln!(
            "{}  0/{} pages  {}ms  →  nothing written",
            mark, result.total_pages, result.duration_ms,
        );
    } else {
        eprintln!(
            "{}  {}/{} pages  {}ms  →  {}",
            mark,
            result.pages_processed,
            result.total_pages,
            result.duration_ms,
            bold(&result.output_path.display().to_string()),
        );
    }
    if result.cancelled {
        eprintln!("   {}", yellow("cancelled before the last page"));
    }
    if !result.warnings.is_empty() {
        eprintln!("   {} page warnings:", result.warnings.len());
        for warning in &result.warnings {
            eprintln!("     {}", dim(&truncate(&warning.message(), 100)));
        }
    }
}

/// Map CLI args to `TranslationConfig`.
fn build_config(cli: &Cli) -> Result<TranslationConfig> {
    let mut builder = TranslationConfig::builder()
        .language_hints(cli.lang.iter().map(String::as_str))
        .target_language(cli.target.clone())
        .output_format(cli.format.into())
        .dpi(cli.dpi)
        .concurrency(cli.concurrency)
        .recognize_timeout_secs(cli.recognize_timeout)
        .translate_timeout_secs(cli.translate_timeout)
        .recognizer_backend(cli.recognizer.into())
        .tesseract_cmd(cli.tesseract.clone())
        .translator_backend(cli.translator.into())
        .cache_enabled(!cli.no_cache);

    if let Some(ref output) = cli.output {
        builder = builder.output_path(output.clone());
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref dir) = cli.cache_dir {
        builder = builder.cache_dir(dir.clone());
    }

    let layout = LayoutConfig {
        font_path: cli.font.clone(),
        font_size: cli.font_size,
        ..LayoutConfig::default()
    };
    builder = builder.layout(layout);

    builder.build().context("Invalid configuration")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_adds_ellipsis() {
        assert_eq!(truncate("abc", 10), "abc");
        assert_eq!(truncate("abcdef", 4), "abc\u{2026}");
    }

    #[test]
    fn flags_map_onto_config() {
        let cli = Cli::parse_from([
            "pdftranslate",
            "scan.pdf",
            "--format",
            "docx",
            "--lang",
            "eng,deu",
            "--target",
            "en",
            "--no-cache",
        ]);
        let config = build_config(&cli).unwrap();
        assert_eq!(config.output_format, OutputFormat::FlowText);
        assert_eq!(config.language_hints, vec!["eng", "deu"]);
        assert_eq!(config.target_language, "en");
        assert!(!config.cache_enabled);
    }
}

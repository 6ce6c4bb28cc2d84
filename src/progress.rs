//! Progress reporting and run state shared with a controlling surface.
//!
//! Two primitives connect a running pipeline to whatever drives it (a CLI
//! progress bar, a GUI, a web handler):
//!
//! * [`TranslationProgressCallback`]: events pushed by the pipeline. Calls
//!   are fire-and-forget: implementations must not block, and nothing they
//!   return is consumed.
//! * [`PipelineState`]: counters and the cancellation flag. The pipeline is
//!   the only writer of the counters; anyone holding the `Arc` may read them
//!   or call [`PipelineState::cancel`].
//!
//! # Example
//!
//! ```rust
//! use scan_translate::{PageProgress, TranslationProgressCallback};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl TranslationProgressCallback for CountingCallback {
//!     fn on_page_complete(&self, progress: &PageProgress) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!(
//!             "page {}/{} done, ~{:?}s left",
//!             progress.pages_completed,
//!             progress.total_pages,
//!             progress.eta_secs()
//!         );
//!     }
//! }
//! ```

use crate::output::{PageWarning, RunResult};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

/// Snapshot emitted after every completed page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageProgress {
    /// 0-based index of the page that just completed.
    pub page_index: usize,
    pub pages_completed: usize,
    pub total_pages: usize,
    /// `None` until the first page has completed.
    pub eta: Option<Duration>,
}

impl PageProgress {
    /// ETA rounded down to whole seconds.
    pub fn eta_secs(&self) -> Option<u64> {
        self.eta.map(|d| d.as_secs())
    }

    /// Completion ratio in `0.0..=1.0`.
    pub fn fraction(&self) -> f64 {
        if self.total_pages == 0 {
            return 0.0;
        }
        self.pages_completed as f64 / self.total_pages as f64
    }
}

/// Called by the pipeline as it processes each page.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. With `concurrency > 1`, `on_page_start` may be
/// called from several tasks at once; the other methods are always called in
/// page order from the task that drives the sink.
pub trait TranslationProgressCallback: Send + Sync {
    /// Called once, after the page count is known and before page 0.
    fn on_run_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called when work on a page begins.
    fn on_page_start(&self, page_index: usize, total_pages: usize) {
        let _ = (page_index, total_pages);
    }

    /// Called after a page has been accepted by the sink.
    fn on_page_complete(&self, progress: &PageProgress) {
        let _ = progress;
    }

    /// Called for each recoverable per-page problem, before the page's
    /// `on_page_complete`.
    fn on_page_warning(&self, warning: &PageWarning) {
        let _ = warning;
    }

    /// Called once when the output has been written.
    fn on_run_complete(&self, result: &RunResult) {
        let _ = result;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl TranslationProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::TranslationConfig`].
pub type ProgressCallback = Arc<dyn TranslationProgressCallback>;

/// Per-run state: progress counters, cancellation flag and start time.
///
/// Create one per run. The pipeline calls [`begin`](Self::begin) once the
/// page count is known and [`complete_page`](Self::complete_page) after each
/// page; everything else is read-only for observers.
#[derive(Debug, Default)]
pub struct PipelineState {
    pages_completed: AtomicUsize,
    total_pages: AtomicUsize,
    cancel_requested: AtomicBool,
    started: OnceLock<Instant>,
}

impl PipelineState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Request cancellation. Pages already in flight finish; no new page
    /// starts. Once set, the flag is never cleared.
    pub fn cancel(&self) {
        self.cancel_requested.store(true, Ordering::SeqCst);
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel_requested.load(Ordering::SeqCst)
    }

    pub fn pages_completed(&self) -> usize {
        self.pages_completed.load(Ordering::SeqCst)
    }

    pub fn total_pages(&self) -> usize {
        self.total_pages.load(Ordering::SeqCst)
    }

    /// Time since [`begin`](Self::begin), or zero before it.
    pub fn elapsed(&self) -> Duration {
        self.started
            .get()
            .map(|t| t.elapsed())
            .unwrap_or_default()
    }

    /// Record the page count and start the clock. Later calls only update
    /// the total.
    pub(crate) fn begin(&self, total_pages: usize) {
        self.total_pages.store(total_pages, Ordering::SeqCst);
        let _ = self.started.set(Instant::now());
    }

    /// Count one more finished page, saturating at the total.
    pub(crate) fn complete_page(&self) -> usize {
        let total = self.total_pages();
        let previous = self
            .pages_completed
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < total).then_some(n + 1)
            })
            .unwrap_or(total);
        (previous + 1).min(total)
    }

    /// Remaining-time estimate from the average time per completed page.
    ///
    /// `None` until the first page has completed.
    pub fn eta(&self) -> Option<Duration> {
        estimate_remaining(self.elapsed(), self.pages_completed(), self.total_pages())
    }
}

/// `elapsed / completed * (total - completed)`, or `None` when nothing has
/// completed yet. Saturates at `Duration::MAX`.
pub fn estimate_remaining(elapsed: Duration, completed: usize, total: usize) -> Option<Duration> {
    if completed == 0 {
        return None;
    }
    let remaining = total.saturating_sub(completed);
    let secs = elapsed.as_secs_f64() * (remaining as f64 / completed as f64);
    Some(Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX))
}

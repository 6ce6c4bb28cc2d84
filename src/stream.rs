//! Background runs: start a translation on the runtime and watch it as a
//! stream of events.
//!
//! ## Why a handle?
//!
//! A controlling surface (progress bar, GUI, web handler) needs three things
//! while a run is going: live progress, a way to cancel, and the final
//! result. [`spawn_translation`] returns a [`TranslationHandle`] that gives
//! exactly those: [`events`](TranslationHandle::events) as a `Stream`,
//! [`cancel`](TranslationHandle::cancel), and [`join`](TranslationHandle::join).
//!
//! Events are forwarded through an unbounded channel so the pipeline never
//! waits on a slow consumer. A progress callback already present in the
//! config still receives every event.

use crate::config::TranslationConfig;
use crate::convert::translate_document_with_state;
use crate::error::TranslateError;
use crate::output::{PageWarning, RunResult};
use crate::pipeline::input::Document;
use crate::pipeline::PagePipeline;
use crate::progress::{PageProgress, PipelineState, ProgressCallback, TranslationProgressCallback};
use crate::sink::OutputSink;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::debug;

/// Something that happened during a background run.
#[derive(Debug, Clone)]
pub enum RunEvent {
    Started { total_pages: usize },
    PageStarted { page_index: usize, total_pages: usize },
    PageWarning(PageWarning),
    PageCompleted(PageProgress),
    Finished(RunResult),
    /// The run stopped with a fatal error; [`TranslationHandle::join`] returns it.
    Failed { message: String },
}

/// Stream of [`RunEvent`]s, ending when the run does.
pub type EventStream = UnboundedReceiverStream<RunEvent>;

/// Forwards callback events into a channel, and to an optional inner callback.
struct ChannelCallback {
    tx: mpsc::UnboundedSender<RunEvent>,
    inner: Option<ProgressCallback>,
}

impl ChannelCallback {
    fn send(&self, event: RunEvent) {
        // A dropped receiver just means nobody is watching.
        let _ = self.tx.send(event);
    }
}

impl TranslationProgressCallback for ChannelCallback {
    fn on_run_start(&self, total_pages: usize) {
        self.send(RunEvent::Started { total_pages });
        if let Some(ref cb) = self.inner {
            cb.on_run_start(total_pages);
        }
    }

    fn on_page_start(&self, page_index: usize, total_pages: usize) {
        self.send(RunEvent::PageStarted {
            page_index,
            total_pages,
        });
        if let Some(ref cb) = self.inner {
            cb.on_page_start(page_index, total_pages);
        }
    }

    fn on_page_complete(&self, progress: &PageProgress) {
        self.send(RunEvent::PageCompleted(*progress));
        if let Some(ref cb) = self.inner {
            cb.on_page_complete(progress);
        }
    }

    fn on_page_warning(&self, warning: &PageWarning) {
        self.send(RunEvent::PageWarning(warning.clone()));
        if let Some(ref cb) = self.inner {
            cb.on_page_warning(warning);
        }
    }

    fn on_run_complete(&self, result: &RunResult) {
        self.send(RunEvent::Finished(result.clone()));
        if let Some(ref cb) = self.inner {
            cb.on_run_complete(result);
        }
    }
}

/// A translation running on the tokio runtime.
pub struct TranslationHandle {
    events: Option<mpsc::UnboundedReceiver<RunEvent>>,
    state: Arc<PipelineState>,
    task: JoinHandle<Result<RunResult, TranslateError>>,
}

impl TranslationHandle {
    /// Take the event stream. Returns `None` after the first call.
    pub fn events(&mut self) -> Option<EventStream> {
        self.events.take().map(UnboundedReceiverStream::new)
    }

    /// Request cancellation. The run finishes the pages in flight, writes
    /// what it has, and reports `cancelled: true`.
    pub fn cancel(&self) {
        self.state.cancel();
    }

    /// Live counters for the run.
    pub fn state(&self) -> &Arc<PipelineState> {
        &self.state
    }

    /// Wait for the run to finish.
    pub async fn join(self) -> Result<RunResult, TranslateError> {
        self.task
            .await
            .map_err(|e| TranslateError::Internal(format!("Translation task failed: {e}")))?
    }
}

fn spawn_with<F>(
    state: Arc<PipelineState>,
    tx: mpsc::UnboundedSender<RunEvent>,
    rx: mpsc::UnboundedReceiver<RunEvent>,
    run: F,
) -> TranslationHandle
where
    F: std::future::Future<Output = Result<RunResult, TranslateError>> + Send + 'static,
{
    let task = tokio::spawn(async move {
        let result = run.await;
        if let Err(ref e) = result {
            debug!("Background run failed: {}", e);
            let _ = tx.send(RunEvent::Failed {
                message: e.to_string(),
            });
        }
        result
    });
    TranslationHandle {
        events: Some(rx),
        state,
        task,
    }
}

/// Start translating `input` in the background.
///
/// Must be called from within a tokio runtime.
///
/// # Example
/// ```rust,no_run
/// use futures::StreamExt;
/// use scan_translate::stream::{spawn_translation, RunEvent};
/// use scan_translate::TranslationConfig;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut handle = spawn_translation("scan.pdf", TranslationConfig::default());
/// if let Some(mut events) = handle.events() {
///     while let Some(event) = events.next().await {
///         if let RunEvent::PageCompleted(p) = event {
///             eprintln!("{}/{} pages", p.pages_completed, p.total_pages);
///         }
///     }
/// }
/// let result = handle.join().await?;
/// println!("wrote {}", result.output_path.display());
/// # Ok(())
/// # }
/// ```
pub fn spawn_translation(
    input: impl Into<PathBuf>,
    mut config: TranslationConfig,
) -> TranslationHandle {
    let input = input.into();
    let (tx, rx) = mpsc::unbounded_channel();
    let state = PipelineState::new();

    let inner = config.progress_callback.take();
    config.progress_callback = Some(Arc::new(ChannelCallback {
        tx: tx.clone(),
        inner,
    }));

    let run_state = Arc::clone(&state);
    spawn_with(state, tx, rx, async move {
        translate_document_with_state(input, &config, run_state).await
    })
}

/// Run an already-assembled pipeline in the background.
///
/// Lower-level than [`spawn_translation`]: the caller supplies the
/// collaborators, the sink and the output path.
pub fn spawn_pipeline(
    pipeline: PagePipeline,
    document: Document,
    mut sink: Box<dyn OutputSink>,
    output_path: PathBuf,
) -> TranslationHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let state = PipelineState::new();

    let inner = Some(Arc::clone(pipeline.progress()));
    let pipeline = pipeline.with_progress(Arc::new(ChannelCallback {
        tx: tx.clone(),
        inner,
    }));

    let run_state = Arc::clone(&state);
    spawn_with(state, tx, rx, async move {
        pipeline
            .run(&document, sink.as_mut(), &output_path, &run_state)
            .await
    })
}

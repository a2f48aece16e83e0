// THEORY:
// Exporting a clip can take minutes, and the preview must stay responsive while
// it runs: the user keeps scrubbing and tuning the matcher. `ExportTask` moves
// a `FrameProcessor` and its sink onto tokio's blocking pool, since decoding
// and matching are synchronous and CPU-bound, and hands back an
// `ExportHandle` for the foreground.
//
// The handle carries three channels back to the caller:
// - a cancel flag, checked by the processor before every frame;
// - a `watch` channel with the number of frames written so far;
// - the join handle resolving to an `ExportSummary`.
//
// The parameter store is shared, not copied, so edits made in the preview reach
// the export on its next frame.

use crate::error::{DepthmapError, Result};
use crate::pipeline::{CancelFlag, FrameProcessor, FrameSink, FrameSource, StereoMatcher};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// The result of a finished export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSummary {
    /// Frames in the requested range.
    pub requested: usize,
    pub written: usize,
    pub cancelled: bool,
}

/// Foreground view of a running export.
pub struct ExportHandle {
    cancel: CancelFlag,
    progress: watch::Receiver<usize>,
    requested: usize,
    task: JoinHandle<Result<ExportSummary>>,
}

impl ExportHandle {
    /// Asks the export to stop before its next frame.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Frames written so far.
    pub fn written(&self) -> usize {
        *self.progress.borrow()
    }

    pub fn requested(&self) -> usize {
        self.requested
    }

    /// A receiver that is notified on every written frame.
    pub fn progress(&self) -> watch::Receiver<usize> {
        self.progress.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn join(self) -> Result<ExportSummary> {
        self.task
            .await
            .map_err(|e| DepthmapError::ExportAborted(e.to_string()))?
    }
}

pub struct ExportTask;

impl ExportTask {
    /// Starts exporting `[start, end]` into an already opened `sink`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<S, M, K>(
        mut processor: FrameProcessor<S, M>,
        mut sink: K,
        start: u32,
        end: u32,
    ) -> ExportHandle
    where
        S: FrameSource + 'static,
        M: StereoMatcher + 'static,
        K: FrameSink + 'static,
    {
        let cancel = processor.cancel_flag();
        let (progress_tx, progress_rx) = watch::channel(0usize);
        let requested = if start >= 1 && end >= start {
            (end - start + 1) as usize
        } else {
            0
        };

        let task = tokio::task::spawn_blocking(move || {
            info!(start, end, "export started");
            let outcome = processor.run_range(start, end, &mut sink, |written| {
                // The receiver may be gone; the export still runs to completion.
                let _ = progress_tx.send(written);
            });
            match outcome {
                Ok(outcome) => {
                    info!(written = outcome.written, cancelled = outcome.cancelled, "export ended");
                    Ok(ExportSummary {
                        requested,
                        written: outcome.written,
                        cancelled: outcome.cancelled,
                    })
                }
                Err(e) => {
                    warn!(error = %e, "export failed");
                    Err(e)
                }
            }
        });

        ExportHandle {
            cancel,
            progress: progress_rx,
            requested,
            task,
        }
    }
}

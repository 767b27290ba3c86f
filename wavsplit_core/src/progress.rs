use std::path::PathBuf;
use std::time::Duration;

/// Events emitted while spans are written to disk.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Segmentation finished; `segments` output files are planned.
    Start { segments: usize },
    /// One output file has been closed.
    SegmentWritten {
        index: usize,
        path: PathBuf,
        duration: Duration,
    },
    Finish,
}

/// Receives [`ProgressEvent`]s. The default implementation ignores them.
pub trait ProgressReporter {
    fn report(&mut self, _event: ProgressEvent) {}
}

impl<F> ProgressReporter for F
where
    F: FnMut(ProgressEvent),
{
    fn report(&mut self, event: ProgressEvent) {
        self(event)
    }
}

/// A reporter that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {}

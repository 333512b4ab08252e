//! Batch completion reporting.

use crate::batching::Batch;

/// A batch has finished and its rows are in the output table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    /// The finished batch.
    pub batch: Batch,
    /// Points finished so far across all batches, this one included.
    pub completed_points: usize,
    /// Points in the whole run.
    pub total_points: usize,
}

impl BatchProgress {
    /// Fraction of the run completed, in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        if self.total_points == 0 {
            1.0
        } else {
            self.completed_points as f64 / self.total_points as f64
        }
    }
}

/// Receives one call per completed batch.
///
/// Under parallel execution calls arrive from worker threads in completion
/// order, not batch order.
pub trait ProgressReporter: Send + Sync {
    /// Called after a batch's rows have been written.
    fn batch_completed(&self, progress: &BatchProgress);
}

/// Logs `Processed X/N points` through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn batch_completed(&self, progress: &BatchProgress) {
        tracing::debug!(
            batch_start = progress.batch.start,
            batch_end = progress.batch.end,
            "Processed {}/{} points",
            progress.completed_points,
            progress.total_points
        );
    }
}

/// Discards progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn batch_completed(&self, _progress: &BatchProgress) {}
}

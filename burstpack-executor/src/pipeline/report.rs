use burstpack_core::{RunId, RunSummary};
use std::time::Duration;

/// The outcome of a completed pipeline run.
#[derive(Debug)]
pub struct RunReport<B> {
    /// Run identifier.
    pub run_id: RunId,
    /// Stage totals.
    pub summary: RunSummary,
    /// Commands applied to the backend.
    pub commands_written: u64,
    /// The backend, finalized.
    pub backend: B,
    /// Wall time from spawn to finalize.
    pub elapsed: Duration,
}

impl<B> RunReport<B> {
    /// Valid items per second over the run.
    pub fn items_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.summary.total_written as f64 / secs
        }
    }

    /// Fraction of written slots that carry valid items.
    pub fn fill_ratio(&self) -> f64 {
        let slots = self.summary.total_written + self.summary.padding_items;
        if slots == 0 {
            1.0
        } else {
            self.summary.total_written as f64 / slots as f64
        }
    }
}

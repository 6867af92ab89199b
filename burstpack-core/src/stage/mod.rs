//! The compressor stage: compaction, ring buffering and burst flushing.
//!
//! Each step runs the components in a fixed order:
//!
//! ```text
//! LaneBatch ─> LaneCompactor ─> WriteIndexTracker ─> CircularBuffer
//!                                        │                 │
//!                                        v                 v
//!                              BurstFlushController ─> MemoryCommandEmitter ─> BurstCommand
//! ```
//!
//! All state is owned by [`CompressorStage`] and mutated only by
//! [`CompressorStage::step`]. A run ends with a drain: once `stop` is
//! asserted the stage force-flushes residual data up to the next alignment
//! boundary and issues the final command within `lcm_pipes` steps.
//!
//! # Example
//!
//! ```ignore
//! use burstpack_core::prelude::*;
//!
//! let config = StageConfig::for_profile(BurstProfile::Max3, 4);
//! let mut stage = CompressorStage::<CorrelationEdge>::new(config)?;
//!
//! for batch in batches {
//!     if let Some(cmd) = stage.step(&batch, false)? {
//!         backend.write_burst(&cmd)?;
//!     }
//! }
//! for cmd in stage.drain()? {
//!     backend.write_burst(&cmd)?;
//! }
//! let summary = stage.finish()?;
//! ```

mod compactor;
mod emitter;
mod flush;
mod ring;
mod tracker;

pub use compactor::LaneCompactor;
pub use emitter::{BurstCommand, MemoryCommandEmitter};
pub use flush::{
    BurstFlushController, CommandTrigger, FlushCounters, FlushDecision, FlushedHalf,
    BURST_OFFSET_BITS, GROUPS_PER_COMMAND,
};
pub use ring::{CircularBuffer, Half};
pub use tracker::{WriteIndexTracker, WriteState};

use crate::config::{Alignment, StageConfig};
use crate::error::{BurstpackError, Result};
use crate::types::{Item, LaneBatch};
use serde::{Deserialize, Serialize};

/// Totals for one run, reported on the final step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Valid items accepted over the run.
    pub total_written: u64,
    /// Steps processed, drain included.
    pub steps: u64,
    /// Steps processed with `stop` asserted.
    pub drain_steps: u64,
    /// Halves staged for output.
    pub half_flushes: u64,
    /// Halves staged by the drain.
    pub forced_flushes: u64,
    /// Burst commands emitted.
    pub commands: u64,
    /// Bursts covered by those commands.
    pub bursts_written: u64,
    /// Items written past `total_written`.
    pub padding_items: u64,
}

/// Everything observable about one step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepTrace<T> {
    /// Zero-based step index.
    pub step: u64,
    /// Write positions of this step.
    pub write: WriteState,
    /// `stop` as sampled for this step.
    pub stop: bool,
    /// Half staged this step, if any.
    pub flushed: Option<FlushedHalf>,
    /// Command emitted this step, if any.
    pub command: Option<BurstCommand<T>>,
    /// Present on the final step only.
    pub summary: Option<RunSummary>,
}

/// A single-run compressor stage for items of type `T`.
#[derive(Debug, Clone)]
pub struct CompressorStage<T: Item> {
    config: StageConfig,
    alignment: Alignment,
    compactor: LaneCompactor,
    tracker: WriteIndexTracker,
    ring: CircularBuffer<T>,
    flush: BurstFlushController,
    emitter: MemoryCommandEmitter<T>,
    /// Compacted items of the current step.
    scratch: Vec<T>,
    stats: RunSummary,
    stopped: bool,
    finished: bool,
}

impl<T: Item> CompressorStage<T> {
    /// Validate `config` and build a stage with zeroed state.
    pub fn new(config: StageConfig) -> Result<Self> {
        let alignment = config.alignment::<T>()?;
        let n = alignment.lane_width;

        tracing::debug!(
            lane_width = n,
            burst_size = alignment.burst_size,
            lcm = alignment.lcm,
            lcm_bursts = alignment.lcm_bursts,
            lcm_pipes = alignment.lcm_pipes,
            base_offset = config.base_offset,
            "Compressor stage created"
        );

        Ok(Self {
            compactor: LaneCompactor::new(n),
            tracker: WriteIndexTracker::new(n),
            ring: CircularBuffer::new(n),
            flush: BurstFlushController::new(alignment),
            emitter: MemoryCommandEmitter::new(config.base_offset, alignment),
            scratch: vec![T::default(); n],
            stats: RunSummary::default(),
            stopped: false,
            finished: false,
            config,
            alignment,
        })
    }

    /// Process one step and return the burst command it produced, if any.
    pub fn step(&mut self, batch: &LaneBatch<T>, stop: bool) -> Result<Option<BurstCommand<T>>> {
        Ok(self.step_traced(batch, stop)?.command)
    }

    /// Process one step and return the full observation.
    ///
    /// On a stop step the batch is ignored. Errors leave the stage unchanged.
    pub fn step_traced(&mut self, batch: &LaneBatch<T>, stop: bool) -> Result<StepTrace<T>> {
        let step = self.stats.steps;
        if self.finished {
            return Err(BurstpackError::StageFinished { steps: step });
        }
        if self.stopped && !stop {
            return Err(BurstpackError::DataAfterStop { step });
        }

        let active = if stop {
            if !self.stopped {
                tracing::info!(
                    step,
                    total_written = self.tracker.total_written(),
                    half_pipeline = self.flush.counters().half_pipeline,
                    "End of stream, draining"
                );
                self.stopped = true;
            }
            let ignored = batch.active_count();
            if ignored > 0 {
                tracing::warn!(step, ignored, "Valid lanes on a stop step are ignored");
            }
            0
        } else {
            self.compactor.compact(batch, &mut self.scratch)?
        };

        let write = self.tracker.advance(active);
        self.ring.write(&self.scratch, &write);

        tracing::trace!(
            step,
            active,
            buffer_index = write.buffer_index,
            new_buffer_index = write.new_buffer_index,
            wrap = write.wrap,
            "Step written"
        );

        let decision = self.flush.observe(&write, stop);

        if let Some(flushed) = decision.flushed {
            self.emitter.stage(self.ring.half(flushed.half));
            self.stats.half_flushes += 1;
            if flushed.forced {
                self.stats.forced_flushes += 1;
            }
            tracing::debug!(step, half = %flushed.half, forced = flushed.forced, "Half flushed");
        }

        let command = decision.command.map(|trigger| self.emitter.emit(trigger));
        if let Some(cmd) = &command {
            self.stats.commands += 1;
            self.stats.bursts_written += u64::from(cmd.burst_count);
            tracing::debug!(
                step,
                offset = cmd.offset,
                burst_count = cmd.burst_count,
                last = cmd.last,
                "Burst command emitted"
            );
        }

        self.stats.steps += 1;
        if stop {
            self.stats.drain_steps += 1;
        }

        let summary = if decision.finished {
            self.finished = true;
            let summary = self.summary();
            tracing::info!(
                total_written = summary.total_written,
                bursts_written = summary.bursts_written,
                padding_items = summary.padding_items,
                drain_steps = summary.drain_steps,
                "Run complete"
            );
            Some(summary)
        } else {
            None
        };

        Ok(StepTrace {
            step,
            write,
            stop,
            flushed: decision.flushed,
            command,
            summary,
        })
    }

    /// Assert `stop` until the final step has run; returns the commands emitted.
    pub fn drain(&mut self) -> Result<Vec<BurstCommand<T>>> {
        let idle = LaneBatch::idle(self.alignment.lane_width);
        let mut commands = Vec::new();
        while !self.finished {
            if let Some(cmd) = self.step(&idle, true)? {
                commands.push(cmd);
            }
        }
        Ok(commands)
    }

    /// Close the run and return its summary.
    pub fn finish(self) -> Result<RunSummary> {
        if !self.finished {
            return Err(BurstpackError::StageNotDrained {
                remaining: self.flush.remaining_drain_steps(),
            });
        }
        Ok(self.summary())
    }

    /// Return to construction state for a new run.
    pub fn reset(&mut self) {
        self.tracker.reset();
        self.ring.reset();
        self.flush.reset();
        self.emitter.reset();
        self.scratch.fill(T::default());
        self.stats = RunSummary::default();
        self.stopped = false;
        self.finished = false;
    }

    fn summary(&self) -> RunSummary {
        let total_written = self.tracker.total_written();
        let capacity = self.stats.bursts_written * self.alignment.burst_size as u64;
        RunSummary {
            total_written,
            padding_items: capacity.saturating_sub(total_written),
            ..self.stats
        }
    }

    /// The configuration the stage was built from.
    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    /// Derived alignment constants.
    pub fn alignment(&self) -> Alignment {
        self.alignment
    }

    /// Items accepted so far.
    pub fn total_written(&self) -> u64 {
        self.tracker.total_written()
    }

    /// Write positions of the most recent step.
    pub fn write_state(&self) -> WriteState {
        self.tracker.last()
    }

    /// Current flush counters.
    pub fn counters(&self) -> FlushCounters {
        self.flush.counters()
    }

    /// The ring contents.
    pub fn buffer(&self) -> &CircularBuffer<T> {
        &self.ring
    }

    /// `stop` has been asserted.
    pub fn is_draining(&self) -> bool {
        self.stopped && !self.finished
    }

    /// The final step has run.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BurstProfile;
    use crate::types::CorrelationEdge;

    fn stage(lanes: usize) -> CompressorStage<CorrelationEdge> {
        CompressorStage::new(StageConfig::for_profile(BurstProfile::Max3, lanes)).unwrap()
    }

    fn edges(range: std::ops::Range<u32>) -> Vec<CorrelationEdge> {
        range.map(|i| CorrelationEdge::new(i, i + 1, 0.25)).collect()
    }

    #[test]
    fn rejects_invalid_config() {
        let err = CompressorStage::<CorrelationEdge>::new(StageConfig::new(0, 384, 0)).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn oversized_burst_is_rejected_not_overflowed() {
        let err = CompressorStage::<CorrelationEdge>::new(StageConfig::new(1, 12usize << 60, 0))
            .unwrap_err();
        assert!(err.is_config());

        let err = CompressorStage::<CorrelationEdge>::new(StageConfig::new(
            (u32::MAX / 8) as usize,
            24,
            0,
        ))
        .unwrap_err();
        assert!(matches!(err, BurstpackError::AlignmentOverflow { .. }));
    }

    #[test]
    fn full_lanes_flush_every_step() {
        let mut stage = stage(4);
        let data = edges(0..32);
        for chunk in data.chunks(4) {
            let trace = stage
                .step_traced(&LaneBatch::from_valid_prefix(4, chunk), false)
                .unwrap();
            assert!(trace.flushed.is_some());
            assert!(trace.command.is_none());
        }
        assert_eq!(stage.counters().burst, 1);

        let commands = stage.drain().unwrap();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].items, data);
        assert_eq!(commands[0].burst_count, 1);

        let summary = stage.finish().unwrap();
        assert_eq!(summary.total_written, 32);
        assert_eq!(summary.drain_steps, 8);
        assert_eq!(summary.padding_items, 0);
    }

    #[test]
    fn partial_batches_drain_to_one_burst() {
        let mut stage = stage(4);
        let data = edges(0..10);
        let mut next = 0;
        for active in [1usize, 3, 0, 4, 2] {
            let batch = LaneBatch::from_valid_prefix(4, &data[next..next + active]);
            next += active;
            assert!(stage.step(&batch, false).unwrap().is_none());
        }

        let commands = stage.drain().unwrap();
        assert_eq!(commands.len(), 1);
        let cmd = &commands[0];
        assert!(cmd.last);
        assert_eq!(cmd.offset, 0);
        assert_eq!(cmd.burst_count, 1);
        assert_eq!(cmd.items.len(), 32);
        assert_eq!(&cmd.items[..10], data.as_slice());

        let summary = stage.finish().unwrap();
        assert_eq!(summary.total_written, 10);
        assert_eq!(summary.forced_flushes, 6);
        assert_eq!(summary.padding_items, 22);
    }

    #[test]
    fn step_after_finish_is_rejected() {
        let mut stage = stage(2);
        stage.drain().unwrap();
        let err = stage.step(&LaneBatch::idle(2), true).unwrap_err();
        assert!(matches!(err, BurstpackError::StageFinished { .. }));
    }

    #[test]
    fn data_after_stop_is_rejected() {
        let mut stage = stage(2);
        stage.step(&LaneBatch::idle(2), true).unwrap();
        assert!(stage.is_draining());
        let err = stage
            .step(&LaneBatch::from_valid_prefix(2, &edges(0..1)), false)
            .unwrap_err();
        assert!(matches!(err, BurstpackError::DataAfterStop { step: 1 }));
    }

    #[test]
    fn finish_before_drain_is_rejected() {
        let stage = stage(4);
        let err = stage.finish().unwrap_err();
        assert!(matches!(
            err,
            BurstpackError::StageNotDrained { remaining: 8 }
        ));
    }

    #[test]
    fn width_mismatch_leaves_state_untouched() {
        let mut stage = stage(4);
        assert!(stage
            .step(&LaneBatch::from_valid_prefix(3, &edges(0..3)), false)
            .is_err());
        assert_eq!(stage.total_written(), 0);
        assert!(!stage.is_draining());
    }

    #[test]
    fn stop_step_ignores_its_batch() {
        let mut stage = stage(4);
        stage
            .step(&LaneBatch::from_valid_prefix(4, &edges(0..4)), true)
            .unwrap();
        assert_eq!(stage.total_written(), 0);
    }

    #[test]
    fn reset_starts_a_fresh_run() {
        let mut stage = stage(4);
        stage
            .step(&LaneBatch::from_valid_prefix(4, &edges(0..3)), false)
            .unwrap();
        stage.drain().unwrap();
        stage.reset();

        assert!(!stage.is_finished());
        assert_eq!(stage.total_written(), 0);
        assert_eq!(stage.counters(), FlushCounters::default());
        assert!(stage.buffer().slots().iter().all(|e| *e == CorrelationEdge::default()));
    }
}

//! Half-buffer flush decisions, alignment counters and end-of-stream drain.
//!
//! A half becomes eligible to flush on the step whose write crosses the
//! ring midpoint. Flushed halves are counted into alignment groups of
//! `lcm_pipes` halves; sixteen groups make one full burst command.
//!
//! Once `stop` is seen the controller owes the open group
//! `pending = lcm_pipes - half_pipeline` halves (none when the run ended
//! exactly on a group boundary). Stop step `k` force-flushes the filling
//! half while `k < pending`, and stop step `lcm_pipes - 1` issues the final
//! command. Since `pending <= lcm_pipes`, every forced half is staged no
//! later than the final command.

use super::ring::Half;
use super::tracker::WriteState;
use crate::config::Alignment;
use serde::{Deserialize, Serialize};

/// Alignment groups covered by one streaming burst command.
pub const GROUPS_PER_COMMAND: u32 = 16;

/// Width of the burst offset counter, in bits.
pub const BURST_OFFSET_BITS: u32 = 23;

const BURST_OFFSET_MASK: u32 = (1 << BURST_OFFSET_BITS) - 1;

/// Counter state of the flush controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlushCounters {
    /// Half that the next trigger flushes; also the half being filled.
    pub next_half: Half,
    /// Halves flushed in the open alignment group, `0..lcm_pipes`.
    pub half_pipeline: usize,
    /// Complete alignment groups since the last command, `0..16`.
    pub burst: u32,
    /// Commands issued so far, modulo `2^23`; selects the write address.
    pub burst_offset: u32,
    /// Stop steps seen so far, saturating at `lcm_pipes - 1`.
    pub end_of_stream: usize,
}

impl Default for FlushCounters {
    fn default() -> Self {
        Self {
            next_half: Half::First,
            half_pipeline: 0,
            burst: 0,
            burst_offset: 0,
            end_of_stream: 0,
        }
    }
}

/// A half selected for output this step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlushedHalf {
    /// Which half.
    pub half: Half,
    /// Flushed by the drain rather than by a midpoint crossing.
    pub forced: bool,
}

/// Request for the emitter to build a burst command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandTrigger {
    /// Value of the burst offset counter for this command.
    pub offset_counter: u32,
    /// Alignment groups covered.
    pub groups: u32,
    /// This is the run's final command.
    pub last: bool,
}

/// Everything the controller decided for one step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushDecision {
    /// Half to stage as payload, if any.
    pub flushed: Option<FlushedHalf>,
    /// Command to emit after staging, if any.
    pub command: Option<CommandTrigger>,
    /// This was the final step of the run.
    pub finished: bool,
}

/// Decides when halves flush and when burst commands fire.
#[derive(Debug, Clone)]
pub struct BurstFlushController {
    alignment: Alignment,
    counters: FlushCounters,
    /// Halves owed to the open group, fixed on the first stop step.
    pending_halves: Option<usize>,
    finished: bool,
}

impl BurstFlushController {
    /// Create a controller with all counters at zero.
    pub fn new(alignment: Alignment) -> Self {
        Self {
            alignment,
            counters: FlushCounters::default(),
            pending_halves: None,
            finished: false,
        }
    }

    /// The write crossed the ring midpoint.
    pub fn ready_to_send(&self, state: &WriteState) -> bool {
        let n = self.alignment.lane_width;
        (state.buffer_index < n) != (state.new_buffer_index < n)
    }

    /// Process one step's write positions.
    pub fn observe(&mut self, state: &WriteState, stop: bool) -> FlushDecision {
        debug_assert!(!self.finished, "observe after final step");
        let mut decision = FlushDecision::default();

        if self.ready_to_send(state) {
            let half = self.counters.next_half;
            self.counters.next_half = half.other();
            decision.flushed = Some(FlushedHalf {
                half,
                forced: false,
            });
            decision.command = self.count_half();
        }

        if stop {
            self.drain_step(state, &mut decision);
        }

        decision
    }

    /// Count a flushed half; returns a full command when 16 groups are complete.
    fn count_half(&mut self) -> Option<CommandTrigger> {
        let c = &mut self.counters;
        c.half_pipeline += 1;
        if c.half_pipeline < self.alignment.lcm_pipes {
            return None;
        }
        c.half_pipeline = 0;

        if c.burst + 1 < GROUPS_PER_COMMAND {
            c.burst += 1;
            return None;
        }
        c.burst = 0;

        let trigger = CommandTrigger {
            offset_counter: c.burst_offset,
            groups: GROUPS_PER_COMMAND,
            last: false,
        };
        c.burst_offset = (c.burst_offset + 1) & BURST_OFFSET_MASK;
        Some(trigger)
    }

    fn drain_step(&mut self, state: &WriteState, decision: &mut FlushDecision) {
        let n = self.alignment.lane_width;
        let lcm_pipes = self.alignment.lcm_pipes;
        let half_pipeline = self.counters.half_pipeline;

        let pending = *self.pending_halves.get_or_insert_with(|| {
            let residual = state.new_buffer_index % n;
            if half_pipeline == 0 && residual == 0 {
                0
            } else {
                lcm_pipes - half_pipeline
            }
        });

        let step = self.counters.end_of_stream;
        let burst_completed = pending <= step;
        if !burst_completed && decision.flushed.is_none() {
            decision.flushed = Some(FlushedHalf {
                half: self.counters.next_half,
                forced: true,
            });
        }

        if step + 1 == lcm_pipes {
            let groups = self.counters.burst + u32::from(pending > 0);
            if groups > 0 {
                decision.command = Some(CommandTrigger {
                    offset_counter: self.counters.burst_offset,
                    groups,
                    last: true,
                });
            }
            decision.finished = true;
            self.finished = true;
        } else {
            self.counters.end_of_stream += 1;
        }
    }

    /// Current counter values.
    pub fn counters(&self) -> FlushCounters {
        self.counters
    }

    /// Halves the drain owes the open group, once draining has begun.
    pub fn pending_halves(&self) -> Option<usize> {
        self.pending_halves
    }

    /// Upper bound on stop steps still needed to finish the run.
    pub fn remaining_drain_steps(&self) -> usize {
        if self.finished {
            0
        } else if self.pending_halves.is_some() {
            self.alignment.lcm_pipes - self.counters.end_of_stream
        } else {
            self.alignment.lcm_pipes
        }
    }

    /// The final step has been processed.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Return all counters to zero.
    pub fn reset(&mut self) {
        self.counters = FlushCounters::default();
        self.pending_halves = None;
        self.finished = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::tracker::WriteIndexTracker;

    fn controller(lanes: usize, burst_size: usize) -> (BurstFlushController, WriteIndexTracker) {
        (
            BurstFlushController::new(Alignment::derive(lanes, burst_size).unwrap()),
            WriteIndexTracker::new(lanes),
        )
    }

    #[test]
    fn triggers_on_midpoint_crossings_and_alternates_halves() {
        let (mut ctl, mut tracker) = controller(4, 32);
        let mut flushed = Vec::new();
        for active in [1, 3, 0, 4, 2] {
            let decision = ctl.observe(&tracker.advance(active), false);
            flushed.push(decision.flushed.map(|f| f.half));
        }
        assert_eq!(
            flushed,
            vec![None, Some(Half::First), None, Some(Half::Second), None]
        );
        assert_eq!(ctl.counters().half_pipeline, 2);
    }

    #[test]
    fn group_wrap_advances_burst_counter() {
        // lcm_pipes = 8: eight full steps complete one group.
        let (mut ctl, mut tracker) = controller(4, 32);
        for _ in 0..8 {
            assert!(ctl.observe(&tracker.advance(4), false).command.is_none());
        }
        let c = ctl.counters();
        assert_eq!(c.half_pipeline, 0);
        assert_eq!(c.burst, 1);
        assert_eq!(c.burst_offset, 0);
    }

    #[test]
    fn sixteenth_group_fires_full_command() {
        // burst_size 4 with 4 lanes: every half is a group.
        let (mut ctl, mut tracker) = controller(4, 4);
        let mut commands = Vec::new();
        for _ in 0..32 {
            if let Some(cmd) = ctl.observe(&tracker.advance(4), false).command {
                commands.push(cmd);
            }
        }
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].offset_counter, 0);
        assert_eq!(commands[1].offset_counter, 1);
        assert!(commands.iter().all(|c| c.groups == 16 && !c.last));
    }

    #[test]
    fn drain_forces_exactly_the_owed_halves() {
        let (mut ctl, mut tracker) = controller(4, 32);
        for active in [1, 3, 0, 4, 2] {
            ctl.observe(&tracker.advance(active), false);
        }

        let mut forced = 0;
        let mut final_command = None;
        for _ in 0..8 {
            let decision = ctl.observe(&tracker.advance(0), true);
            if let Some(f) = decision.flushed {
                assert!(f.forced);
                assert_eq!(f.half, Half::First);
                forced += 1;
            }
            if decision.finished {
                final_command = decision.command;
            }
        }

        assert_eq!(ctl.pending_halves(), Some(6));
        assert_eq!(forced, 6);
        let cmd = final_command.unwrap();
        assert_eq!(cmd.groups, 1);
        assert!(cmd.last);
        assert!(ctl.is_finished());
    }

    #[test]
    fn aligned_end_owes_nothing() {
        let (mut ctl, mut tracker) = controller(4, 32);
        for _ in 0..8 {
            ctl.observe(&tracker.advance(4), false);
        }
        let mut decisions = Vec::new();
        for _ in 0..8 {
            decisions.push(ctl.observe(&tracker.advance(0), true));
        }
        assert!(decisions.iter().all(|d| d.flushed.is_none()));
        let last = decisions.last().unwrap();
        assert!(last.finished);
        assert_eq!(last.command.unwrap().groups, 1);
    }

    #[test]
    fn empty_run_finishes_without_command() {
        let (mut ctl, mut tracker) = controller(3, 8);
        let mut steps = 0;
        loop {
            let decision = ctl.observe(&tracker.advance(0), true);
            steps += 1;
            assert!(decision.flushed.is_none());
            if decision.finished {
                assert!(decision.command.is_none());
                break;
            }
        }
        assert_eq!(steps, Alignment::derive(3, 8).unwrap().lcm_pipes);
    }

    #[test]
    fn single_pipe_group_finishes_on_first_stop() {
        // burst_size divides lane width: lcm_pipes = 1.
        let (mut ctl, mut tracker) = controller(8, 4);
        ctl.observe(&tracker.advance(5), false);
        let decision = ctl.observe(&tracker.advance(0), true);
        assert!(decision.finished);
        assert_eq!(
            decision.flushed,
            Some(FlushedHalf {
                half: Half::First,
                forced: true
            })
        );
        assert_eq!(decision.command.unwrap().groups, 1);
    }

    #[test]
    fn remaining_drain_steps_counts_down() {
        let (mut ctl, mut tracker) = controller(4, 32);
        assert_eq!(ctl.remaining_drain_steps(), 8);
        ctl.observe(&tracker.advance(0), true);
        assert_eq!(ctl.remaining_drain_steps(), 7);
        ctl.reset();
        assert_eq!(ctl.remaining_drain_steps(), 8);
        assert_eq!(ctl.counters(), FlushCounters::default());
    }
}

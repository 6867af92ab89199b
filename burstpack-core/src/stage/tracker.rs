//! Running write position in the circular buffer.

use serde::{Deserialize, Serialize};

/// Write positions computed for one step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteState {
    /// Ring slot receiving the first item of this step.
    pub buffer_index: usize,
    /// Ring slot that will receive the first item of the next step.
    pub new_buffer_index: usize,
    /// This step's write runs past the end of the ring.
    pub wrap: bool,
    /// Items accepted so far, including this step.
    pub total_written: u64,
}

impl WriteState {
    /// Items written by this step.
    pub fn active_count(&self, ring_len: usize) -> usize {
        (self.new_buffer_index + ring_len - self.buffer_index) % ring_len
    }
}

/// Maps the running item count onto ring positions.
#[derive(Debug, Clone)]
pub struct WriteIndexTracker {
    ring_len: usize,
    /// `ring_len - 1` when the ring length is a power of two.
    mask: Option<u64>,
    total_written: u64,
    last: WriteState,
}

impl WriteIndexTracker {
    /// Create a tracker for a ring of `2 * lane_width` slots.
    pub fn new(lane_width: usize) -> Self {
        let ring_len = 2 * lane_width;
        let mask = ring_len
            .is_power_of_two()
            .then(|| ring_len as u64 - 1);
        Self {
            ring_len,
            mask,
            total_written: 0,
            last: WriteState::default(),
        }
    }

    fn ring_index(&self, count: u64) -> usize {
        match self.mask {
            Some(mask) => (count & mask) as usize,
            None => (count % self.ring_len as u64) as usize,
        }
    }

    /// Account for `active_count` new items and return this step's positions.
    pub fn advance(&mut self, active_count: usize) -> WriteState {
        debug_assert!(active_count <= self.ring_len / 2);

        let buffer_index = self.ring_index(self.total_written);
        let after = self.total_written + active_count as u64;
        let state = WriteState {
            buffer_index,
            new_buffer_index: self.ring_index(after),
            wrap: buffer_index + active_count >= self.ring_len,
            total_written: after,
        };

        self.total_written = after;
        self.last = state;
        state
    }

    /// Items accepted so far.
    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Positions computed by the most recent step.
    pub fn last(&self) -> WriteState {
        self.last
    }

    /// Ring length (`2N`).
    pub fn ring_len(&self) -> usize {
        self.ring_len
    }

    /// Return to the start of a run.
    pub fn reset(&mut self) {
        self.total_written = 0;
        self.last = WriteState::default();
    }
}

//! The `2N`-slot circular buffer.

use super::tracker::WriteState;
use crate::types::Item;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two `N`-slot halves of the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Half {
    /// Slots `0..N`.
    First,
    /// Slots `N..2N`.
    Second,
}

impl Half {
    /// The other half.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::First => Self::Second,
            Self::Second => Self::First,
        }
    }
}

impl fmt::Display for Half {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::First => write!(f, "first"),
            Self::Second => write!(f, "second"),
        }
    }
}

/// Ring of the most recently committed items.
///
/// Only slots inside the step's write window change; the half not being
/// written stays stable until it is flushed.
#[derive(Debug, Clone)]
pub struct CircularBuffer<T> {
    lane_width: usize,
    slots: Vec<T>,
}

impl<T: Item> CircularBuffer<T> {
    /// A zeroed ring of `2 * lane_width` slots.
    pub fn new(lane_width: usize) -> Self {
        Self {
            lane_width,
            slots: vec![T::default(); 2 * lane_width],
        }
    }

    /// Whether `slot` is written by a step with positions `state`.
    pub fn in_window(slot: usize, state: &WriteState) -> bool {
        if state.wrap {
            state.buffer_index <= slot || slot < state.new_buffer_index
        } else {
            state.buffer_index <= slot && slot < state.new_buffer_index
        }
    }

    /// Store the first items of `compacted` at the window given by `state`.
    pub fn write(&mut self, compacted: &[T], state: &WriteState) {
        let ring_len = self.slots.len();
        for slot in 0..ring_len {
            if !Self::in_window(slot, state) {
                continue;
            }
            let offset = if state.wrap && slot < state.new_buffer_index {
                slot + ring_len - state.buffer_index
            } else {
                slot - state.buffer_index
            };
            self.slots[slot] = compacted[offset];
        }
    }

    /// Contents of one half.
    pub fn half(&self, half: Half) -> &[T] {
        match half {
            Half::First => &self.slots[..self.lane_width],
            Half::Second => &self.slots[self.lane_width..],
        }
    }

    /// All slots.
    pub fn slots(&self) -> &[T] {
        &self.slots
    }

    /// Zero every slot.
    pub fn reset(&mut self) {
        self.slots.fill(T::default());
    }
}

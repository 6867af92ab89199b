//! Order-preserving gather of valid lanes.
//!
//! Output slot `i` takes the `(i + 1)`-th valid lane in left-to-right
//! order. The selector for every slot comes from an exclusive prefix sum of
//! the validity bits: a valid lane whose prefix sum is `k` feeds slot `k`.

use crate::error::{BurstpackError, Result};
use crate::types::{Item, LaneBatch};

/// Stateless across steps; owns only scratch space.
#[derive(Debug, Clone)]
pub struct LaneCompactor {
    lane_width: usize,
    /// `selectors[i]` is the source lane for output slot `i`.
    selectors: Vec<usize>,
}

impl LaneCompactor {
    /// Create a compactor for `lane_width` lanes.
    pub fn new(lane_width: usize) -> Self {
        Self {
            lane_width,
            selectors: Vec::with_capacity(lane_width),
        }
    }

    /// Lanes per batch.
    pub fn lane_width(&self) -> usize {
        self.lane_width
    }

    /// Compute the source lane of each filled output slot.
    ///
    /// Returns one selector per valid lane; slots past the end are unused.
    pub fn selectors<T: Item>(&mut self, batch: &LaneBatch<T>) -> &[usize] {
        self.selectors.clear();
        let mut prefix = 0usize;
        for (lane, slot) in batch.lanes().iter().enumerate() {
            if slot.valid {
                debug_assert_eq!(prefix, self.selectors.len());
                self.selectors.push(lane);
                prefix += 1;
            }
        }
        &self.selectors
    }

    /// Gather the valid items of `batch` into the front of `out`.
    ///
    /// `out` must hold `lane_width` items. Returns the active count; slots
    /// from there on keep whatever they held before.
    pub fn compact<T: Item>(&mut self, batch: &LaneBatch<T>, out: &mut [T]) -> Result<usize> {
        if batch.width() != self.lane_width {
            return Err(BurstpackError::LaneWidthMismatch {
                expected: self.lane_width,
                actual: batch.width(),
            });
        }
        debug_assert_eq!(out.len(), self.lane_width);

        let lanes = batch.lanes();
        if self.lane_width == 1 {
            out[0] = lanes[0].item;
            return Ok(usize::from(lanes[0].valid));
        }

        let active = self.selectors(batch).len();
        for (slot, &lane) in self.selectors.iter().enumerate() {
            out[slot] = lanes[lane].item;
        }
        Ok(active)
    }
}

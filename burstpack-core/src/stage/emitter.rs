//! Turns flush decisions into burst write commands.

use super::flush::CommandTrigger;
use crate::config::{Alignment, ADDRESS_MASK};
use crate::types::Item;

/// log2 of the alignment groups between consecutive command addresses.
const OFFSET_SHIFT: u32 = 4;

/// A burst write against the storage backend.
///
/// `offset` and `burst_count` are in burst units; `items` holds exactly
/// `burst_count` bursts. Items past the run's total are padding.
#[derive(Debug, Clone, PartialEq)]
pub struct BurstCommand<T> {
    /// First burst address.
    pub offset: u64,
    /// Number of bursts to write.
    pub burst_count: u32,
    /// Bursts to advance between writes; always 1.
    pub stride: u32,
    /// Payload, `burst_count * burst_size` items.
    pub items: Vec<T>,
    /// The run's final command.
    pub last: bool,
}

impl<T: Item> BurstCommand<T> {
    /// One past the last burst written.
    pub fn end(&self) -> u64 {
        self.offset + u64::from(self.burst_count)
    }

    /// Payload size in bytes.
    pub fn byte_len(&self) -> usize {
        self.items.len() * T::SIZE_BYTES
    }

    /// Encode the payload little-endian.
    pub fn encode_payload(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.byte_len());
        for item in &self.items {
            item.encode_into(&mut buf);
        }
        buf
    }
}

/// Stages flushed halves and cuts them into burst commands.
#[derive(Debug, Clone)]
pub struct MemoryCommandEmitter<T> {
    base_offset: u64,
    alignment: Alignment,
    staged: Vec<T>,
}

impl<T: Item> MemoryCommandEmitter<T> {
    /// Create an emitter writing from burst `base_offset` onwards.
    pub fn new(base_offset: u64, alignment: Alignment) -> Self {
        Self {
            base_offset,
            alignment,
            staged: Vec::with_capacity(alignment.lcm.saturating_mul(16).min(4096)),
        }
    }

    /// Append one flushed half to the pending payload.
    pub fn stage(&mut self, half: &[T]) {
        debug_assert_eq!(half.len(), self.alignment.lane_width);
        self.staged.extend_from_slice(half);
    }

    /// Items staged and not yet covered by a command.
    pub fn staged_len(&self) -> usize {
        self.staged.len()
    }

    /// Burst address for a value of the burst offset counter.
    pub fn address(&self, offset_counter: u32) -> u64 {
        let step = (u64::from(offset_counter) << OFFSET_SHIFT) * self.alignment.lcm_bursts as u64;
        (self.base_offset + step) & ADDRESS_MASK
    }

    /// Build the command for `trigger`, consuming its share of staged items.
    pub fn emit(&mut self, trigger: CommandTrigger) -> BurstCommand<T> {
        let burst_count = trigger.groups * self.alignment.lcm_bursts as u32;
        let wanted = burst_count as usize * self.alignment.burst_size;
        debug_assert_eq!(
            self.staged.len(),
            wanted,
            "staged payload does not match command size"
        );

        let take = wanted.min(self.staged.len());
        let mut items: Vec<T> = self.staged.drain(..take).collect();
        items.resize(wanted, T::default());

        BurstCommand {
            offset: self.address(trigger.offset_counter),
            burst_count,
            stride: 1,
            items,
            last: trigger.last,
        }
    }

    /// Drop anything staged.
    pub fn reset(&mut self) {
        self.staged.clear();
    }
}

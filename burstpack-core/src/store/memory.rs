//! In-memory burst store.

use super::backend::{check_alignment, BurstBackend};
use crate::error::{BurstpackError, Result};
use crate::stage::BurstCommand;
use crate::types::Item;

/// Burst-addressed storage held in a `Vec`, growing on demand.
#[derive(Debug, Clone)]
pub struct MemoryBackend<T> {
    burst_size: usize,
    base_offset: u64,
    /// Item slots from `base_offset` onwards; `None` if never written.
    slots: Vec<Option<T>>,
    commands: Vec<BurstCommand<T>>,
    total_written: Option<u64>,
}

impl<T: Item> MemoryBackend<T> {
    /// Create a store whose data region starts at burst `base_offset`.
    pub fn new(burst_size: usize, base_offset: u64) -> Self {
        Self {
            burst_size,
            base_offset,
            slots: Vec::new(),
            commands: Vec::new(),
            total_written: None,
        }
    }

    /// Every command written, in order.
    pub fn commands(&self) -> &[BurstCommand<T>] {
        &self.commands
    }

    /// Total bursts written.
    pub fn bursts_written(&self) -> u64 {
        self.commands.iter().map(|c| u64::from(c.burst_count)).sum()
    }

    /// Item count recorded by [`BurstBackend::finalize`].
    pub fn total_written(&self) -> Option<u64> {
        self.total_written
    }

    /// The first `total_written` items of the data region.
    ///
    /// Returns `None` before finalize or if a slot in range was never written.
    pub fn valid_items(&self) -> Option<Vec<T>> {
        let total = self.total_written? as usize;
        self.slots.get(..total)?.iter().copied().collect()
    }

    /// All written slots, padding included.
    pub fn slots(&self) -> &[Option<T>] {
        &self.slots
    }
}

impl<T: Item> BurstBackend<T> for MemoryBackend<T> {
    fn write_burst(&mut self, command: &BurstCommand<T>) -> Result<()> {
        check_alignment(command, self.burst_size * T::SIZE_BYTES)?;
        if command.offset < self.base_offset {
            return Err(BurstpackError::StoreWrite {
                offset: command.offset,
                cause: format!("below base offset {}", self.base_offset),
            });
        }

        let start = (command.offset - self.base_offset) as usize * self.burst_size;
        let end = start + command.items.len();
        if self.slots.len() < end {
            self.slots.resize(end, None);
        }
        for (slot, item) in self.slots[start..end].iter_mut().zip(&command.items) {
            *slot = Some(*item);
        }

        self.commands.push(command.clone());
        Ok(())
    }

    fn finalize(&mut self, total_written: u64) -> Result<()> {
        self.total_written = Some(total_written);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(offset: u64, burst_count: u32, items: Vec<u64>) -> BurstCommand<u64> {
        BurstCommand {
            offset,
            burst_count,
            stride: 1,
            items,
            last: false,
        }
    }

    #[test]
    fn writes_at_burst_addresses() {
        let mut store = MemoryBackend::new(2, 10);
        store.write_burst(&command(11, 1, vec![3, 4])).unwrap();
        store.write_burst(&command(10, 1, vec![1, 2])).unwrap();
        store.finalize(3).unwrap();

        assert_eq!(store.valid_items(), Some(vec![1, 2, 3]));
        assert_eq!(store.bursts_written(), 2);
        assert_eq!(store.commands().len(), 2);
    }

    #[test]
    fn rejects_partial_bursts() {
        let mut store = MemoryBackend::new(4, 0);
        let err = store.write_burst(&command(0, 1, vec![1, 2, 3])).unwrap_err();
        assert!(matches!(
            err,
            BurstpackError::MisalignedCommand {
                expected: 4,
                actual: 3,
                ..
            }
        ));
    }

    #[test]
    fn unfinalized_store_has_no_valid_items() {
        let mut store = MemoryBackend::new(1, 0);
        store.write_burst(&command(0, 1, vec![9])).unwrap();
        assert_eq!(store.valid_items(), None);
    }

    #[test]
    fn gap_makes_valid_items_unavailable() {
        let mut store = MemoryBackend::new(1, 0);
        store.write_burst(&command(1, 1, vec![9])).unwrap();
        store.finalize(2).unwrap();
        assert_eq!(store.valid_items(), None);
    }
}

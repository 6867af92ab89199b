//! The storage backend seam.

use crate::error::{BurstpackError, Result};
use crate::stage::BurstCommand;
use crate::types::Item;

/// A block-addressed store that accepts burst commands.
///
/// Retry and error policy belong to the implementation; the stage issues
/// each command exactly once.
pub trait BurstBackend<T: Item> {
    /// Write `command.items` at burst `command.offset`.
    fn write_burst(&mut self, command: &BurstCommand<T>) -> Result<()>;

    /// Record the run's valid item count after the final command.
    fn finalize(&mut self, total_written: u64) -> Result<()>;
}

/// Check that a command carries exactly `burst_count` bursts of items.
pub(crate) fn check_alignment<T: Item>(command: &BurstCommand<T>, burst_bytes: usize) -> Result<()> {
    let expected_bytes = command.burst_count as usize * burst_bytes;
    if command.byte_len() != expected_bytes || expected_bytes % T::SIZE_BYTES != 0 {
        return Err(BurstpackError::MisalignedCommand {
            offset: command.offset,
            burst_count: command.burst_count,
            expected: expected_bytes / T::SIZE_BYTES,
            actual: command.items.len(),
        });
    }
    Ok(())
}

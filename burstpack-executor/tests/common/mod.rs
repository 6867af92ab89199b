//! Common test utilities for pipeline integration tests.

#![allow(dead_code)]

use burstpack_core::prelude::*;

/// Deterministic edge for position `i` of a run.
pub fn edge(i: u32) -> CorrelationEdge {
    CorrelationEdge::new(i, i ^ 0x5A5A, (i % 13) as f32 - 6.0)
}

/// Batches with a repeating activity pattern, plus the items they carry.
pub fn patterned_batches(lanes: usize, steps: usize) -> (Vec<LaneBatch<CorrelationEdge>>, Vec<CorrelationEdge>) {
    let mut produced = Vec::new();
    let batches = (0..steps)
        .map(|step| {
            let active = (step * 7 + 2) % (lanes + 1);
            let start = produced.len() as u32;
            let items: Vec<CorrelationEdge> = (start..start + active as u32).map(edge).collect();
            produced.extend_from_slice(&items);
            LaneBatch::from_valid_prefix(lanes, &items)
        })
        .collect();
    (batches, produced)
}

/// A backend that fails once `fail_after` commands have been written.
#[derive(Debug)]
pub struct FailingBackend {
    pub fail_after: usize,
    pub written: usize,
}

impl FailingBackend {
    pub fn new(fail_after: usize) -> Self {
        Self {
            fail_after,
            written: 0,
        }
    }
}

impl<T: Item> BurstBackend<T> for FailingBackend {
    fn write_burst(&mut self, command: &BurstCommand<T>) -> Result<()> {
        if self.written == self.fail_after {
            return Err(BurstpackError::StoreWrite {
                offset: command.offset,
                cause: "injected failure".to_string(),
            });
        }
        self.written += 1;
        Ok(())
    }

    fn finalize(&mut self, _total_written: u64) -> Result<()> {
        Ok(())
    }
}

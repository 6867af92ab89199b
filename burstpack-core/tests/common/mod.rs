//! Common test utilities for integration tests.

#![allow(dead_code)]

use burstpack_core::prelude::*;

/// Marker written into lanes that carry no valid item.
pub const INVALID: u64 = u64::MAX;

/// Stage configuration for `u64` items with `burst_size` items per burst.
pub fn u64_config(lanes: usize, burst_size: usize) -> StageConfig {
    StageConfig::new(lanes, burst_size * u64::SIZE_BYTES, 0)
}

/// Build a batch with `active` valid lanes scattered by `rotation`.
///
/// Valid lanes receive consecutive values starting at `*next`, in lane order.
pub fn scattered_batch(lanes: usize, active: usize, rotation: usize, next: &mut u64) -> LaneBatch<u64> {
    LaneBatch::from_pairs((0..lanes).map(|lane| {
        if (lane + rotation) % lanes < active {
            let value = *next;
            *next += 1;
            (value, true)
        } else {
            (INVALID, false)
        }
    }))
}

/// Everything a completed run produced.
pub struct RunOutcome {
    pub input: Vec<u64>,
    pub commands: Vec<BurstCommand<u64>>,
    pub summary: RunSummary,
    pub backend: MemoryBackend<u64>,
    pub alignment: Alignment,
}

/// Feed one batch per entry of `actives`, drain, and collect the results.
pub fn run_schedule(config: StageConfig, actives: &[usize]) -> RunOutcome {
    let mut stage = CompressorStage::<u64>::new(config.clone()).unwrap();
    let alignment = stage.alignment();
    let lanes = config.lane_width;
    let mut backend = MemoryBackend::new(alignment.burst_size, config.base_offset);
    let mut commands = Vec::new();
    let mut next = 0u64;

    for (step, &active) in actives.iter().enumerate() {
        let batch = scattered_batch(lanes, active.min(lanes), step, &mut next);
        if let Some(cmd) = stage.step(&batch, false).unwrap() {
            backend.write_burst(&cmd).unwrap();
            commands.push(cmd);
        }
    }
    for cmd in stage.drain().unwrap() {
        backend.write_burst(&cmd).unwrap();
        commands.push(cmd);
    }

    let summary = stage.finish().unwrap();
    backend.finalize(summary.total_written).unwrap();

    RunOutcome {
        input: (0..next).collect(),
        commands,
        summary,
        backend,
        alignment,
    }
}

/// Check conservation, order and alignment of a completed run.
pub fn assert_run_invariants(outcome: &RunOutcome) {
    let a = outcome.alignment;
    let summary = &outcome.summary;

    assert_eq!(summary.total_written, outcome.input.len() as u64);
    assert_eq!(
        outcome.backend.valid_items().unwrap(),
        outcome.input,
        "items lost or reordered for {:?}",
        a
    );

    let mut expected_offset = 0u64;
    for (i, cmd) in outcome.commands.iter().enumerate() {
        assert_eq!(cmd.stride, 1);
        assert_eq!(cmd.burst_count as usize % a.lcm_bursts, 0, "{:?}", a);
        assert_eq!(cmd.items.len(), cmd.burst_count as usize * a.burst_size);
        assert_eq!(cmd.offset, expected_offset, "commands must be contiguous");
        if cmd.last {
            assert_eq!(i + 1, outcome.commands.len(), "only the final command is last");
        }
        expected_offset = cmd.end();
    }

    let capacity = summary.bursts_written * a.burst_size as u64;
    assert!(summary.total_written <= capacity);
    assert!(
        summary.padding_items < a.lcm as u64 || summary.total_written == 0,
        "padding {} exceeds one alignment unit for {:?}",
        summary.padding_items,
        a
    );
    assert_eq!(summary.drain_steps, a.lcm_pipes as u64);
    assert_eq!(summary.half_flushes * a.lane_width as u64, capacity);
}

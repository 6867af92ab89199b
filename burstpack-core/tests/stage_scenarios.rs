//! End-to-end runs of the compressor stage against the in-memory backend.

mod common;

use burstpack_core::prelude::*;
use common::{assert_run_invariants, run_schedule, u64_config};

fn edges(count: u32) -> Vec<CorrelationEdge> {
    (0..count)
        .map(|i| CorrelationEdge::new(i, 1000 + i, i as f32 / 8.0))
        .collect()
}

#[test]
fn four_lanes_fully_valid_for_eight_steps() {
    let config = StageConfig::for_profile(BurstProfile::Max3, 4);
    let mut stage = CompressorStage::<CorrelationEdge>::new(config).unwrap();
    let a = stage.alignment();
    assert_eq!((a.burst_size, a.gcd, a.lcm, a.lcm_bursts, a.lcm_pipes), (32, 4, 32, 1, 8));

    let data = edges(32);
    let mut flushes = 0;
    for chunk in data.chunks(4) {
        let trace = stage
            .step_traced(&LaneBatch::from_valid_prefix(4, chunk), false)
            .unwrap();
        if trace.flushed.is_some() {
            flushes += 1;
        }
        assert!(trace.command.is_none());
    }
    // A full step moves the write index by N, crossing the midpoint every time.
    assert_eq!(flushes, 8);
    assert_eq!(stage.counters().half_pipeline, 0);
    assert_eq!(stage.counters().burst, 1);

    let mut backend = MemoryBackend::new(32, 0);
    for cmd in stage.drain().unwrap() {
        backend.write_burst(&cmd).unwrap();
    }
    let summary = stage.finish().unwrap();
    backend.finalize(summary.total_written).unwrap();

    assert_eq!(summary.total_written, 32);
    assert_eq!(summary.bursts_written, 1);
    assert_eq!(summary.forced_flushes, 0);
    assert_eq!(backend.valid_items().unwrap(), data);
}

#[test]
fn four_lanes_partial_batches() {
    let config = StageConfig::for_profile(BurstProfile::Max3, 4);
    let mut stage = CompressorStage::<CorrelationEdge>::new(config).unwrap();
    let data = edges(10);

    let mut next = 0;
    let mut flushed_at = Vec::new();
    for (step, active) in [1usize, 3, 0, 4, 2].into_iter().enumerate() {
        let trace = stage
            .step_traced(&LaneBatch::from_valid_prefix(4, &data[next..next + active]), false)
            .unwrap();
        next += active;
        if trace.flushed.is_some() {
            flushed_at.push((step, stage.total_written()));
        }
    }
    // Flushes fire as the cumulative count crosses 4 and 8.
    assert_eq!(flushed_at, vec![(1, 4), (3, 8)]);

    let commands = stage.drain().unwrap();
    let summary = stage.finish().unwrap();
    assert_eq!(summary.total_written, 10);
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].burst_count, 1);
    assert_eq!(&commands[0].items[..10], data.as_slice());
}

#[test]
fn scattered_lanes_keep_input_order() {
    let data = edges(6);
    let batch = LaneBatch::from_pairs([
        (CorrelationEdge::default(), false),
        (data[0], true),
        (CorrelationEdge::default(), false),
        (data[1], true),
    ]);
    let second = LaneBatch::from_pairs([
        (data[2], true),
        (data[3], true),
        (data[4], true),
        (data[5], true),
    ]);

    let mut stage =
        CompressorStage::<CorrelationEdge>::new(StageConfig::for_profile(BurstProfile::Max3, 4))
            .unwrap();
    stage.step(&batch, false).unwrap();
    stage.step(&second, false).unwrap();
    let commands = stage.drain().unwrap();
    assert_eq!(&commands[0].items[..6], data.as_slice());
}

#[test]
fn single_lane_needs_no_compaction() {
    let outcome = run_schedule(u64_config(1, 4), &[1, 0, 1, 1, 0, 1, 1]);
    assert_run_invariants(&outcome);
    assert_eq!(outcome.summary.total_written, 5);
}

#[test]
fn max2_profile_packs_eight_edges_per_burst() {
    let config = StageConfig::for_profile(BurstProfile::Max2, 3);
    let mut stage = CompressorStage::<CorrelationEdge>::new(config).unwrap();
    let a = stage.alignment();
    assert_eq!((a.burst_size, a.lcm, a.lcm_bursts, a.lcm_pipes), (8, 24, 3, 8));

    let data = edges(7);
    for chunk in data.chunks(3) {
        stage
            .step(&LaneBatch::from_valid_prefix(3, chunk), false)
            .unwrap();
    }
    let commands = stage.drain().unwrap();
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].burst_count, 3);
    assert_eq!(commands[0].items.len(), 24);
    assert_eq!(&commands[0].items[..7], data.as_slice());
}

#[test]
fn long_runs_emit_full_commands_at_sixteen_groups() {
    // 2 lanes, 2-item bursts: one half per group, 16 halves per command.
    let outcome = run_schedule(u64_config(2, 2), &vec![2; 40]);
    assert_run_invariants(&outcome);

    let bursts: Vec<u32> = outcome.commands.iter().map(|c| c.burst_count).collect();
    assert_eq!(bursts, vec![16, 16, 8]);
    assert!(outcome.commands[2].last);
    assert_eq!(outcome.commands[1].offset, 16);
}

#[test]
fn run_ending_on_command_boundary_has_no_final_command() {
    let outcome = run_schedule(u64_config(2, 2), &vec![2; 16]);
    assert_run_invariants(&outcome);
    assert_eq!(outcome.commands.len(), 1);
    assert!(!outcome.commands[0].last);
    assert_eq!(outcome.summary.padding_items, 0);
}

#[test]
fn base_offset_shifts_every_address() {
    let config = StageConfig::builder()
        .lane_width(2)
        .burst_capacity_bytes(16)
        .base_offset(1000)
        .build();
    let mut stage = CompressorStage::<u64>::new(config).unwrap();
    let mut backend = MemoryBackend::new(2, 1000);

    for i in 0..40u64 {
        let batch = LaneBatch::from_valid_prefix(2, &[2 * i, 2 * i + 1]);
        if let Some(cmd) = stage.step(&batch, false).unwrap() {
            assert!(cmd.offset >= 1000);
            backend.write_burst(&cmd).unwrap();
        }
    }
    for cmd in stage.drain().unwrap() {
        backend.write_burst(&cmd).unwrap();
    }
    let summary = stage.finish().unwrap();
    backend.finalize(summary.total_written).unwrap();

    assert_eq!(backend.commands()[0].offset, 1000);
    assert_eq!(backend.commands()[1].offset, 1016);
    assert_eq!(backend.valid_items().unwrap(), (0..80).collect::<Vec<u64>>());
}

#[test]
fn empty_run_writes_nothing() {
    let outcome = run_schedule(u64_config(3, 5), &[0, 0, 0]);
    assert_run_invariants(&outcome);
    assert!(outcome.commands.is_empty());
    assert_eq!(outcome.summary.total_written, 0);
}

#[test]
fn yaml_config_drives_a_run() {
    let yaml = "lane_width: 4\nburst_capacity_bytes: 64\nbase_offset: 8\n";
    let config = StageConfig::from_yaml_str(yaml).unwrap();
    let mut stage = CompressorStage::<u64>::new(config).unwrap();
    stage
        .step(&LaneBatch::from_valid_prefix(4, &[1, 2, 3]), false)
        .unwrap();
    let commands = stage.drain().unwrap();
    assert_eq!(commands[0].offset, 8);
    assert_eq!(commands[0].burst_count, 1);
}

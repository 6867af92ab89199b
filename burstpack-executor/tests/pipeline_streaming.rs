//! Integration tests for the streaming stage pipeline.

mod common;

use burstpack_core::prelude::*;
use burstpack_executor::pipeline::{PipelineConfig, PipelineError, StagePipeline};
use common::{patterned_batches, FailingBackend};
use std::time::Duration;
use tempfile::tempdir;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn streams_into_burst_store() {
    let dir = tempdir().unwrap();
    let config = StageConfig::for_profile(BurstProfile::Max3, 4);
    let store_config = BurstStoreConfig::default()
        .with_capacity(512)
        .with_directory(dir.path());
    let run_id = RunId::new();
    let store = BurstStore::create::<CorrelationEdge>(run_id, &config, &store_config).unwrap();

    let pipeline =
        StagePipeline::<CorrelationEdge, _>::spawn_with_id(run_id, config, PipelineConfig::default(), store)
            .unwrap();
    assert_eq!(pipeline.run_id(), run_id);

    let (batches, produced) = patterned_batches(4, 1000);
    for batch in batches {
        pipeline.send(batch).await.unwrap();
    }
    let report = pipeline.finish().await.unwrap();

    assert_eq!(report.summary.total_written, produced.len() as u64);
    assert_eq!(report.commands_written, report.summary.commands);
    assert!(report.backend.header().is_finalized());
    assert_eq!(report.backend.valid_items::<CorrelationEdge>().unwrap(), produced);
}

#[tokio::test]
async fn tiny_channels_preserve_order() {
    // 3 lanes, 2-edge bursts: lcm_pipes = 2, a full command every 32 halves.
    let config = StageConfig::new(3, 24, 0);
    let pipeline = StagePipeline::<CorrelationEdge, _>::spawn(
        config,
        PipelineConfig::default()
            .with_input_capacity(1)
            .with_command_capacity(1),
        MemoryBackend::<CorrelationEdge>::new(2, 0),
    )
    .unwrap();

    let (batches, produced) = patterned_batches(3, 400);
    for batch in batches {
        pipeline.send(batch).await.unwrap();
    }
    let report = pipeline.finish().await.unwrap();

    assert!(report.commands_written > 1);
    assert_eq!(report.backend.valid_items().unwrap(), produced);
    let offsets: Vec<u64> = report.backend.commands().iter().map(|c| c.offset).collect();
    assert!(offsets.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test]
async fn explicit_stop_step_ends_the_run() {
    let pipeline = StagePipeline::<CorrelationEdge, _>::spawn(
        StageConfig::for_profile(BurstProfile::Max2, 2),
        PipelineConfig::default(),
        MemoryBackend::<CorrelationEdge>::new(8, 0),
    )
    .unwrap();

    let (batches, produced) = patterned_batches(2, 9);
    for batch in batches {
        pipeline.send(batch).await.unwrap();
    }
    pipeline.send_step(LaneBatch::idle(2), true).await.unwrap();

    let report = pipeline.finish().await.unwrap();
    assert_eq!(report.backend.valid_items().unwrap(), produced);
    assert_eq!(report.summary.drain_steps, 4);
}

#[tokio::test]
async fn backend_failure_surfaces_from_finish() {
    // 2 lanes, 1-edge bursts: every full step completes a group.
    let pipeline = StagePipeline::<CorrelationEdge, _>::spawn(
        StageConfig::new(2, 12, 0),
        PipelineConfig::default(),
        FailingBackend::new(1),
    )
    .unwrap();

    let (batches, _) = patterned_batches(2, 200);
    for batch in batches {
        if pipeline.send(batch).await.is_err() {
            break;
        }
    }

    let err = pipeline.finish().await.unwrap_err();
    assert!(
        matches!(err, PipelineError::Stage(BurstpackError::StoreWrite { .. })),
        "unexpected error: {err}"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dropped_producer_still_drains_and_finalizes() {
    let dir = tempdir().unwrap();
    let config = StageConfig::for_profile(BurstProfile::Max3, 4);
    let store_config = BurstStoreConfig::default()
        .with_capacity(64)
        .with_directory(dir.path());
    let store = BurstStore::create::<CorrelationEdge>(RunId::new(), &config, &store_config).unwrap();
    let path = store.path();

    let pipeline =
        StagePipeline::<CorrelationEdge, _>::spawn(config, PipelineConfig::default(), store).unwrap();
    let (batches, produced) = patterned_batches(4, 50);
    for batch in batches {
        pipeline.send(batch).await.unwrap();
    }
    drop(pipeline);

    // The store unlocks once the writer task drops it.
    let reopened = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            if let Ok(store) = BurstStore::open(&path) {
                if store.header().is_finalized() {
                    return store;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    assert_eq!(reopened.valid_items::<CorrelationEdge>().unwrap(), produced);
}

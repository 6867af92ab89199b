//! Run command - stream a synthetic producer through a stage into a store.

use super::StageArgs;
use crate::producer::SyntheticProducer;
use anyhow::{Context, Result};
use burstpack_core::{
    BurstStore, BurstStoreConfig, CorrelationEdge, RunId, RunSummary, StageConfig,
};
use burstpack_executor::pipeline::{PipelineConfig, StagePipeline};
use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

/// Items read back from the store per verification chunk.
const VERIFY_CHUNK: u64 = 4096;

/// Options for the run command.
#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub stage: StageArgs,

    /// Producer steps before stop
    #[arg(short, long, default_value = "1000")]
    pub steps: u64,

    /// Probability that a lane carries a valid item
    #[arg(long, default_value = "0.5")]
    pub valid_prob: f64,

    /// Producer seed
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Pixels in the synthetic image
    #[arg(long, default_value = "65536")]
    pub pixels: u32,

    /// Directory for the store file
    #[arg(short, long, default_value = "/tmp/burstpack")]
    pub dir: PathBuf,

    /// Store capacity in bursts (sized from the run if omitted)
    #[arg(long)]
    pub capacity: Option<u64>,

    /// Lane batches buffered ahead of the stage
    #[arg(long, default_value = "64")]
    pub input_capacity: usize,

    /// Burst commands buffered ahead of the store
    #[arg(long, default_value = "16")]
    pub command_capacity: usize,
}

/// What a completed run produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub run_id: RunId,
    pub path: PathBuf,
    pub summary: RunSummary,
    pub commands_written: u64,
    pub elapsed: Duration,
    pub fill_ratio: f64,
}

/// Store capacity that fits the worst case of `steps` fully valid steps.
fn required_capacity(config: &StageConfig, steps: u64) -> Result<u64> {
    let alignment = config.alignment::<CorrelationEdge>()?;
    let max_items = steps.saturating_mul(config.lane_width as u64);
    let data_bursts = max_items.div_ceil(alignment.burst_size as u64);
    // Round up to a whole alignment group.
    let slack = alignment.lcm_bursts as u64;
    Ok(config.base_offset + data_bursts + slack)
}

/// Execute a run and verify the stored items.
pub async fn execute(args: &RunArgs) -> Result<RunOutcome> {
    let config = args.stage.resolve()?;
    let capacity = match args.capacity {
        Some(capacity) => capacity,
        None => required_capacity(&config, args.steps)?,
    };

    let run_id = RunId::new();
    let store_config = BurstStoreConfig::default()
        .with_directory(&args.dir)
        .with_capacity(capacity);
    let store = BurstStore::create::<CorrelationEdge>(run_id, &config, &store_config)
        .with_context(|| format!("Failed to create store in {}", args.dir.display()))?;
    let path = store.path();

    let pipeline_config = PipelineConfig::default()
        .with_input_capacity(args.input_capacity)
        .with_command_capacity(args.command_capacity);
    let pipeline = StagePipeline::<CorrelationEdge, _>::spawn_with_id(
        run_id,
        config.clone(),
        pipeline_config,
        store,
    )?;

    let mut producer = SyntheticProducer::new(args.seed, config.lane_width, args.valid_prob, args.pixels);
    for _ in 0..args.steps {
        pipeline.send(producer.next_batch()).await?;
    }

    let report = pipeline.finish().await?;
    let verified = verify_store(&report.backend, args, config.lane_width)?;
    tracing::debug!(verified, "Store contents verified");

    Ok(RunOutcome {
        run_id,
        path,
        summary: report.summary,
        commands_written: report.commands_written,
        elapsed: report.elapsed,
        fill_ratio: report.fill_ratio(),
    })
}

/// Replay the producer from its seed and compare against the store chunk by
/// chunk. Returns the number of items checked.
fn verify_store(store: &BurstStore, args: &RunArgs, lanes: usize) -> Result<u64> {
    let header = store.header();
    if !header.is_finalized() {
        anyhow::bail!("Store {} was not finalized", store.path().display());
    }

    let mut replay = SyntheticProducer::new(args.seed, lanes, args.valid_prob, args.pixels);
    let mut expected = (0..args.steps).flat_map(move |_| replay.next_batch().valid_items().collect::<Vec<_>>());

    let total = header.total_written;
    let mut checked = 0u64;
    while checked < total {
        let count = (total - checked).min(VERIFY_CHUNK);
        let stored = store.read_items::<CorrelationEdge>(checked, count)?;
        for (i, item) in stored.into_iter().enumerate() {
            if expected.next() != Some(item) {
                anyhow::bail!(
                    "Stored item {} differs from the produced item",
                    checked + i as u64
                );
            }
        }
        checked += count;
    }

    let missing = expected.count();
    if missing > 0 {
        anyhow::bail!("Store holds {} items, {} produced items are missing", total, missing);
    }
    Ok(checked)
}

/// Run the run command.
pub async fn run(args: &RunArgs) -> Result<()> {
    tracing::info!(steps = args.steps, seed = args.seed, "Starting synthetic run");
    let outcome = execute(args).await?;
    let s = &outcome.summary;

    println!("Run Summary");
    println!("===========");
    println!("Run ID:         {}", outcome.run_id);
    println!("Store:          {}", outcome.path.display());
    println!("Steps:          {} ({} draining)", s.steps, s.drain_steps);
    println!("Items written:  {}", s.total_written);
    println!("Half flushes:   {} ({} forced)", s.half_flushes, s.forced_flushes);
    println!("Commands:       {}", outcome.commands_written);
    println!("Bursts:         {}", s.bursts_written);
    println!("Padding items:  {}", s.padding_items);
    println!("Fill ratio:     {:.4}", outcome.fill_ratio);
    println!("Elapsed:        {:?}", outcome.elapsed);
    println!();
    println!("Verified: store contents match produced items.");

    Ok(())
}

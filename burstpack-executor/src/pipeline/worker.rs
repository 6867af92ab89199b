//! Stage worker and storage writer tasks.

use super::{PipelineError, RunReport};
use burstpack_core::{
    BurstBackend, BurstCommand, BurstpackError, CompressorStage, Item, LaneBatch, RunId,
    RunSummary, StageConfig,
};
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::Instrument;

/// Channel sizing for a [`StagePipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Lane batches buffered between producer and stage worker.
    pub input_capacity: usize,
    /// Burst commands buffered between stage worker and storage writer.
    pub command_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_capacity: 64,
            command_capacity: 16,
        }
    }
}

impl PipelineConfig {
    /// Set the input channel capacity.
    pub fn with_input_capacity(mut self, capacity: usize) -> Self {
        self.input_capacity = capacity;
        self
    }

    /// Set the command channel capacity.
    pub fn with_command_capacity(mut self, capacity: usize) -> Self {
        self.command_capacity = capacity;
        self
    }
}

struct StepMessage<T> {
    batch: LaneBatch<T>,
    stop: bool,
}

enum WriterMessage<T> {
    Command(BurstCommand<T>),
    Finalize(u64),
}

struct WriterOutput<B> {
    backend: B,
    written: u64,
    finalized: bool,
}

/// A compressor stage running on its own task, feeding a backend on another.
///
/// Dropping the pipeline without calling [`finish`](Self::finish) still
/// drains the stage and finalizes the backend in the background.
pub struct StagePipeline<T: Item, B> {
    run_id: RunId,
    lane_width: usize,
    input: mpsc::Sender<StepMessage<T>>,
    stage_task: JoinHandle<Result<RunSummary, PipelineError>>,
    writer_task: JoinHandle<Result<WriterOutput<B>, PipelineError>>,
    started: Instant,
}

impl<T, B> StagePipeline<T, B>
where
    T: Item,
    B: BurstBackend<T> + Send + 'static,
{
    /// Validate `stage_config` and start both tasks on the current runtime.
    pub fn spawn(stage_config: StageConfig, config: PipelineConfig, backend: B) -> Result<Self, PipelineError> {
        Self::spawn_with_id(RunId::new(), stage_config, config, backend)
    }

    /// Like [`spawn`](Self::spawn) with a caller-chosen run id.
    pub fn spawn_with_id(
        run_id: RunId,
        stage_config: StageConfig,
        config: PipelineConfig,
        backend: B,
    ) -> Result<Self, PipelineError> {
        let stage = CompressorStage::<T>::new(stage_config)?;
        let alignment = stage.alignment();
        let span = crate::instrument_run!(run_id, alignment.lane_width, alignment.burst_size);

        let (input_tx, input_rx) = mpsc::channel(config.input_capacity.max(1));
        let (command_tx, command_rx) = mpsc::channel(config.command_capacity.max(1));

        let stage_task = tokio::spawn(run_stage(stage, input_rx, command_tx).instrument(span.clone()));
        let writer_task = tokio::task::spawn_blocking(move || {
            let _entered = span.enter();
            write_commands(backend, command_rx)
        });

        tracing::info!(
            run_id = %run_id,
            lane_width = alignment.lane_width,
            burst_size = alignment.burst_size,
            lcm_pipes = alignment.lcm_pipes,
            "Pipeline started"
        );

        Ok(Self {
            run_id,
            lane_width: alignment.lane_width,
            input: input_tx,
            stage_task,
            writer_task,
            started: Instant::now(),
        })
    }

    /// The run identifier.
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Lanes per batch.
    pub fn lane_width(&self) -> usize {
        self.lane_width
    }

    /// Queue one batch, waiting while the input channel is full.
    pub async fn send(&self, batch: LaneBatch<T>) -> Result<(), PipelineError> {
        self.send_step(batch, false).await
    }

    /// Queue one step with an explicit `stop` flag.
    ///
    /// After a stop step the worker drains and stops reading; later sends
    /// fail with [`PipelineError::ChannelClosed`].
    pub async fn send_step(&self, batch: LaneBatch<T>, stop: bool) -> Result<(), PipelineError> {
        if batch.width() != self.lane_width {
            return Err(BurstpackError::LaneWidthMismatch {
                expected: self.lane_width,
                actual: batch.width(),
            }
            .into());
        }
        self.input
            .send(StepMessage { batch, stop })
            .await
            .map_err(|_| PipelineError::ChannelClosed { channel: "input" })
    }

    /// Assert `stop`, wait for the final command and return the report.
    pub async fn finish(self) -> Result<RunReport<B>, PipelineError> {
        let Self {
            run_id,
            lane_width,
            input,
            stage_task,
            writer_task,
            started,
        } = self;

        // Fails only if the worker already stopped; its result says why.
        let _ = input
            .send(StepMessage {
                batch: LaneBatch::idle(lane_width),
                stop: true,
            })
            .await;
        drop(input);

        let stage_result = join("stage", stage_task).await;
        let writer_result = join("writer", writer_task).await;

        // A backend failure closes the command channel under the stage, so
        // the writer's error is the root cause.
        let (summary, output) = match (stage_result, writer_result) {
            (_, Err(e)) => return Err(e),
            (Err(e), Ok(_)) => return Err(e),
            (Ok(summary), Ok(output)) => (summary, output),
        };
        if !output.finalized {
            return Err(PipelineError::ChannelClosed { channel: "command" });
        }

        let report = RunReport {
            run_id,
            summary,
            commands_written: output.written,
            backend: output.backend,
            elapsed: started.elapsed(),
        };

        tracing::info!(
            run_id = %run_id,
            total_written = summary.total_written,
            commands = report.commands_written,
            bursts = summary.bursts_written,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Pipeline finished"
        );
        Ok(report)
    }
}

async fn join<R>(
    task: &'static str,
    handle: JoinHandle<Result<R, PipelineError>>,
) -> Result<R, PipelineError> {
    handle.await.map_err(|e| PipelineError::Join {
        task,
        cause: e.to_string(),
    })?
}

async fn forward<T>(
    commands: &mpsc::Sender<WriterMessage<T>>,
    message: WriterMessage<T>,
) -> Result<(), PipelineError> {
    commands
        .send(message)
        .await
        .map_err(|_| PipelineError::ChannelClosed { channel: "command" })
}

async fn run_stage<T: Item>(
    mut stage: CompressorStage<T>,
    mut input: mpsc::Receiver<StepMessage<T>>,
    commands: mpsc::Sender<WriterMessage<T>>,
) -> Result<RunSummary, PipelineError> {
    loop {
        match input.recv().await {
            Some(StepMessage { batch, stop }) => {
                if let Some(cmd) = stage.step(&batch, stop)? {
                    forward(&commands, WriterMessage::Command(cmd)).await?;
                }
                if stop {
                    break;
                }
            }
            None => {
                tracing::warn!(
                    total_written = stage.total_written(),
                    "Producer closed without stop, draining"
                );
                break;
            }
        }
    }

    for cmd in stage.drain()? {
        forward(&commands, WriterMessage::Command(cmd)).await?;
    }
    let summary = stage.finish()?;
    forward(&commands, WriterMessage::Finalize(summary.total_written)).await?;
    Ok(summary)
}

fn write_commands<T: Item, B: BurstBackend<T>>(
    mut backend: B,
    mut commands: mpsc::Receiver<WriterMessage<T>>,
) -> Result<WriterOutput<B>, PipelineError> {
    let mut written = 0;
    while let Some(message) = commands.blocking_recv() {
        match message {
            WriterMessage::Command(cmd) => {
                backend.write_burst(&cmd)?;
                written += 1;
            }
            WriterMessage::Finalize(total_written) => {
                backend.finalize(total_written)?;
                return Ok(WriterOutput {
                    backend,
                    written,
                    finalized: true,
                });
            }
        }
    }
    Ok(WriterOutput {
        backend,
        written,
        finalized: false,
    })
}

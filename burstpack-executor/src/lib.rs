//! Burstpack Executor - streaming runtime for compressor stages.
//!
//! This crate runs a [`CompressorStage`](burstpack_core::CompressorStage)
//! as a two-task pipeline:
//! - A stage worker that owns the stage and turns lane batches into burst commands
//! - A storage writer that owns the backend and applies commands in order
//! - Bounded channels between producer, worker and writer
//! - Subscriber setup for structured logging

#![warn(missing_docs)]

pub mod observability;
pub mod pipeline;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::observability::{init_tracing, LogFormat, TracingConfig, TracingGuard};
    pub use crate::pipeline::{PipelineConfig, PipelineError, RunReport, StagePipeline};
}

//! Streaming pipeline around a compressor stage.
//!
//! ```text
//! producer ──LaneBatch──> stage worker ──BurstCommand──> storage writer ──> backend
//!           (input_capacity)            (command_capacity)
//! ```
//!
//! The stage worker is the only owner of the [`CompressorStage`] and the
//! storage writer is the only owner of the backend. Both channels are
//! bounded, so a slow backend throttles the producer. Commands reach the
//! backend in the order the stage emitted them.
//!
//! [`CompressorStage`]: burstpack_core::CompressorStage

mod error;
mod report;
mod worker;

pub use error::PipelineError;
pub use report::RunReport;
pub use worker::{PipelineConfig, StagePipeline};

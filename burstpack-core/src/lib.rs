//! Burstpack Core Library
//!
//! Compacts sparse multi-lane producer output into dense, burst-aligned
//! write commands for a block-addressed store.
//!
//! # Overview
//!
//! A producer emits `N` lanes per step, each carrying one item and a valid
//! flag. The compressor stage packs the valid items into a ring of `2N`
//! slots, flushes each `N`-slot half as it fills, and groups flushed halves
//! into commands whose payload is always a whole number of bursts. At end
//! of stream the stage pads the open group and issues a final command.
//!
//! # Key Components
//!
//! - **Stage**: compaction, write indexing, ring buffer, flush control and
//!   command emission
//! - **Store**: the [`BurstBackend`] seam plus in-memory and memory-mapped
//!   backends
//! - **Config**: stage geometry, board profiles and derived alignment
//! - **Types**: items, lane batches and run identifiers
//!
//! # Example
//!
//! ```ignore
//! use burstpack_core::prelude::*;
//!
//! let config = StageConfig::for_profile(BurstProfile::Max3, 4);
//! let mut stage = CompressorStage::<CorrelationEdge>::new(config.clone())?;
//! let mut backend = MemoryBackend::new(config.burst_size::<CorrelationEdge>(), 0);
//!
//! let batch = LaneBatch::from_valid_prefix(4, &edges);
//! if let Some(cmd) = stage.step(&batch, false)? {
//!     backend.write_burst(&cmd)?;
//! }
//! for cmd in stage.drain()? {
//!     backend.write_burst(&cmd)?;
//! }
//! backend.finalize(stage.total_written())?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod prelude;
pub mod stage;
pub mod store;
pub mod types;

pub use config::{Alignment, BurstProfile, StageConfig};
pub use error::{BurstpackError, Result};
pub use stage::{BurstCommand, CompressorStage, RunSummary, StepTrace};
pub use store::{BurstBackend, BurstStore, BurstStoreConfig, MemoryBackend};
pub use types::{CorrelationEdge, Item, Lane, LaneBatch, RunId};

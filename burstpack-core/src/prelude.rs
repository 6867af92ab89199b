//! Prelude for convenient imports.
//!
//! # Example
//!
//! ```ignore
//! use burstpack_core::prelude::*;
//! ```

// Core types
pub use crate::types::{CorrelationEdge, Item, Lane, LaneBatch, RunId};

// Error handling
pub use crate::error::{BurstpackError, Result};

// Configuration
pub use crate::config::{Alignment, BurstProfile, StageConfig, StageConfigBuilder};

// Stage
pub use crate::stage::{
    BurstCommand, CompressorStage, FlushCounters, FlushedHalf, Half, RunSummary, StepTrace,
    WriteState,
};

// Storage
pub use crate::store::{
    BurstBackend, BurstStore, BurstStoreConfig, BurstStoreReader, MemoryBackend, StoreHeader,
};

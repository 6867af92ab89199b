//! Block-addressed storage backends for burst commands.
//!
//! A backend accepts whole-burst writes at burst addresses. Two backends
//! are provided:
//!
//! - [`MemoryBackend`]: a growable in-memory store that also records every
//!   command, for tests and dry runs.
//! - [`BurstStore`]: a memory-mapped file (`run_{uuid}.bin`) with a fixed
//!   header followed by the burst-addressed data region.
//!
//! # File layout
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │ Header (128 bytes: geometry, high-water mark, total items)  │
//! ├─────────────────────────────────────────────────────────────┤
//! │ Burst 0: [burst_bytes]                                      │
//! │ Burst 1: [burst_bytes]                                      │
//! │ ...                                                         │
//! │ Burst capacity_bursts - 1                                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod backend;
mod header;
mod memory;
mod writer;

pub use backend::BurstBackend;
pub use header::{StoreHeader, HEADER_SIZE, STORE_MAGIC, STORE_VERSION};
pub use memory::MemoryBackend;
pub use writer::{BurstStore, BurstStoreConfig, BurstStoreReader, DEFAULT_CAPACITY_BURSTS};

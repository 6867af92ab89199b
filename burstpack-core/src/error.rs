//! Error types for burstpack.
//!
//! Every variant carries the values needed to act on it (lane widths,
//! offsets, paths). Message prefixes group errors by subsystem so they can
//! be grepped out of logs.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for burstpack operations.
#[derive(Error, Debug)]
pub enum BurstpackError {
    // =========================================================================
    // Configuration Errors (E001-E099)
    // =========================================================================
    /// Lane width must be at least one.
    #[error("E001: Lane width must be at least 1")]
    ZeroLaneWidth,

    /// Burst capacity must be non-zero.
    #[error("E002: Burst capacity must be non-zero")]
    ZeroBurstCapacity,

    /// Burst capacity is not a whole number of items.
    #[error(
        "E003: Burst capacity of {burst_capacity_bytes} bytes is not a multiple of the {item_size_bytes}-byte item size"
    )]
    BurstNotItemAligned {
        /// Configured burst capacity in bytes.
        burst_capacity_bytes: usize,
        /// Size of one item in bytes.
        item_size_bytes: usize,
    },

    /// Base offset does not fit the burst address space.
    #[error("E004: Base offset {base_offset} exceeds the {bits}-bit burst address space")]
    BaseOffsetOutOfRange {
        /// The configured base offset, in bursts.
        base_offset: u64,
        /// Width of the address space in bits.
        bits: u32,
    },

    /// A configuration document could not be parsed.
    #[error("E005: Invalid configuration: {cause}")]
    ConfigParse {
        /// Parser message.
        cause: String,
    },

    /// A geometry field does not fit its 32-bit store header field.
    #[error("E006: {field} of {value} exceeds the maximum of {max}")]
    GeometryTooLarge {
        /// Name of the offending field.
        field: &'static str,
        /// The configured value.
        value: usize,
        /// Largest accepted value.
        max: u64,
    },

    /// The alignment group of a lane width and burst size is not representable.
    #[error(
        "E007: Alignment of {lane_width} lanes with {burst_size}-item bursts overflows the command size"
    )]
    AlignmentOverflow {
        /// Configured lane width.
        lane_width: usize,
        /// Items per burst.
        burst_size: usize,
    },

    // =========================================================================
    // Stage Errors (E100-E199)
    // =========================================================================
    /// Batch does not have exactly one entry per lane.
    #[error("E101: Batch has {actual} lanes, stage is configured for {expected}")]
    LaneWidthMismatch {
        /// Configured lane width.
        expected: usize,
        /// Number of lanes in the offending batch.
        actual: usize,
    },

    /// The stage already issued its final command.
    #[error("E102: Stage already finished after {steps} steps")]
    StageFinished {
        /// Steps processed in the finished run.
        steps: u64,
    },

    /// A streaming step arrived after end-of-stream was signalled.
    #[error("E103: Step {step} carries data after stop was asserted")]
    DataAfterStop {
        /// Index of the offending step.
        step: u64,
    },

    /// The run was finished before the drain completed.
    #[error("E104: Stage not drained: {remaining} drain steps remain")]
    StageNotDrained {
        /// Upper bound on the drain steps still required.
        remaining: usize,
    },

    // =========================================================================
    // Store Errors (E200-E299)
    // =========================================================================
    /// Failed to create or open a store file.
    #[error("E201: Failed to create burst store at {path}: {cause}")]
    StoreCreate {
        /// The path where creation failed.
        path: PathBuf,
        /// Reason for the failure.
        cause: String,
    },

    /// Failed to memory-map the store file.
    #[error("E202: Failed to mmap burst store at {path}: {cause}")]
    StoreMmap {
        /// The path of the store file.
        path: PathBuf,
        /// Reason for the mmap failure.
        cause: String,
    },

    /// A write to the store failed.
    #[error("E203: Burst store write failed at burst {offset}: {cause}")]
    StoreWrite {
        /// Burst offset of the write.
        offset: u64,
        /// Reason for the failure.
        cause: String,
    },

    /// A burst command falls outside the store.
    #[error(
        "E204: Burst store capacity exceeded: bursts {offset}..{end} requested, capacity {capacity} bursts"
    )]
    StoreCapacity {
        /// First burst of the command.
        offset: u64,
        /// One past the last burst of the command.
        end: u64,
        /// Store capacity in bursts.
        capacity: u64,
    },

    /// A burst command payload is not a whole number of bursts.
    #[error(
        "E205: Misaligned burst command at {offset}: {burst_count} bursts need {expected} items, got {actual}"
    )]
    MisalignedCommand {
        /// Burst offset of the command.
        offset: u64,
        /// Bursts claimed by the command.
        burst_count: u32,
        /// Items required for that many bursts.
        expected: usize,
        /// Items actually carried.
        actual: usize,
    },

    /// Store header failed validation.
    #[error("E206: Burst store corruption: {cause}")]
    StoreCorruption {
        /// Description of the corruption.
        cause: String,
    },

    /// Read outside the written region of the store.
    #[error("E207: Burst store read out of range: items {first}..{end}, store holds {available}")]
    StoreReadRange {
        /// First requested item.
        first: u64,
        /// One past the last requested item.
        end: u64,
        /// Items addressable in the store.
        available: u64,
    },

    /// Store geometry does not match the item type or stage.
    #[error("E208: Burst store geometry mismatch: {cause}")]
    StoreGeometry {
        /// What did not match.
        cause: String,
    },

    // =========================================================================
    // Item Codec Errors (E300-E399)
    // =========================================================================
    /// Not enough bytes to decode an item.
    #[error("E301: Item decode needs {expected} bytes, got {actual}")]
    ItemDecode {
        /// Bytes required.
        expected: usize,
        /// Bytes available.
        actual: usize,
    },
}

/// Result type alias for burstpack operations.
pub type Result<T> = std::result::Result<T, BurstpackError>;

impl BurstpackError {
    /// True for errors raised while validating configuration.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::ZeroLaneWidth
                | Self::ZeroBurstCapacity
                | Self::BurstNotItemAligned { .. }
                | Self::BaseOffsetOutOfRange { .. }
                | Self::ConfigParse { .. }
                | Self::GeometryTooLarge { .. }
                | Self::AlignmentOverflow { .. }
        )
    }

    /// True for errors raised by a storage backend.
    pub fn is_store(&self) -> bool {
        matches!(
            self,
            Self::StoreCreate { .. }
                | Self::StoreMmap { .. }
                | Self::StoreWrite { .. }
                | Self::StoreCapacity { .. }
                | Self::MisalignedCommand { .. }
                | Self::StoreCorruption { .. }
                | Self::StoreReadRange { .. }
                | Self::StoreGeometry { .. }
        )
    }
}

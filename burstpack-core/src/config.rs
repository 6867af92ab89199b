//! Stage configuration and derived alignment constants.

use crate::error::{BurstpackError, Result};
use crate::stage::GROUPS_PER_COMMAND;
use crate::types::Item;
use serde::{Deserialize, Serialize};

/// Width of the burst address space, in bits.
pub const ADDRESS_BITS: u32 = 27;

/// Mask applied to computed burst addresses.
pub const ADDRESS_MASK: u64 = (1 << ADDRESS_BITS) - 1;

/// Burst sizes of the supported memory boards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BurstProfile {
    /// Older boards with 96-byte bursts.
    Max2,
    /// Vectis, Maia and Coria class boards with 384-byte bursts.
    Max3,
}

impl BurstProfile {
    /// Burst capacity in bytes.
    pub const fn burst_bytes(self) -> usize {
        match self {
            Self::Max2 => 96,
            Self::Max3 => 384,
        }
    }
}

/// Construction-time configuration of a compressor stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageConfig {
    /// Number of producer lanes (`N`).
    pub lane_width: usize,
    /// Bytes accepted by the backend per burst.
    pub burst_capacity_bytes: usize,
    /// First burst address of the run's output region.
    #[serde(default)]
    pub base_offset: u64,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self::for_profile(BurstProfile::Max3, 4)
    }
}

impl StageConfig {
    /// Create a configuration from raw values.
    pub fn new(lane_width: usize, burst_capacity_bytes: usize, base_offset: u64) -> Self {
        Self {
            lane_width,
            burst_capacity_bytes,
            base_offset,
        }
    }

    /// Configuration for a board profile with base offset zero.
    pub fn for_profile(profile: BurstProfile, lane_width: usize) -> Self {
        Self::new(lane_width, profile.burst_bytes(), 0)
    }

    /// Create a new builder.
    pub fn builder() -> StageConfigBuilder {
        StageConfigBuilder::default()
    }

    /// Parse a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| BurstpackError::ConfigParse {
            cause: e.to_string(),
        })
    }

    /// Render as a YAML document.
    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| BurstpackError::ConfigParse {
            cause: e.to_string(),
        })
    }

    /// Check the configuration against an item type.
    pub fn validate<T: Item>(&self) -> Result<()> {
        if self.lane_width == 0 {
            return Err(BurstpackError::ZeroLaneWidth);
        }
        if self.burst_capacity_bytes == 0 {
            return Err(BurstpackError::ZeroBurstCapacity);
        }
        if self.burst_capacity_bytes % T::SIZE_BYTES != 0 {
            return Err(BurstpackError::BurstNotItemAligned {
                burst_capacity_bytes: self.burst_capacity_bytes,
                item_size_bytes: T::SIZE_BYTES,
            });
        }
        if self.base_offset > ADDRESS_MASK {
            return Err(BurstpackError::BaseOffsetOutOfRange {
                base_offset: self.base_offset,
                bits: ADDRESS_BITS,
            });
        }
        check_u32_field("lane_width", self.lane_width)?;
        check_u32_field("burst_capacity_bytes", self.burst_capacity_bytes)?;
        Alignment::derive(self.lane_width, self.burst_size::<T>()).map(|_| ())
    }

    /// Items per burst for item type `T`.
    pub fn burst_size<T: Item>(&self) -> usize {
        self.burst_capacity_bytes / T::SIZE_BYTES
    }

    /// Validate and derive the alignment constants for item type `T`.
    pub fn alignment<T: Item>(&self) -> Result<Alignment> {
        self.validate::<T>()?;
        Alignment::derive(self.lane_width, self.burst_size::<T>())
    }
}

fn check_u32_field(field: &'static str, value: usize) -> Result<()> {
    if u32::try_from(value).is_err() {
        return Err(BurstpackError::GeometryTooLarge {
            field,
            value,
            max: u64::from(u32::MAX),
        });
    }
    Ok(())
}

/// Builder for [`StageConfig`].
#[derive(Debug, Clone, Default)]
pub struct StageConfigBuilder {
    lane_width: Option<usize>,
    burst_capacity_bytes: Option<usize>,
    base_offset: Option<u64>,
}

impl StageConfigBuilder {
    /// Set the lane width.
    pub fn lane_width(mut self, lanes: usize) -> Self {
        self.lane_width = Some(lanes);
        self
    }

    /// Set the burst capacity in bytes.
    pub fn burst_capacity_bytes(mut self, bytes: usize) -> Self {
        self.burst_capacity_bytes = Some(bytes);
        self
    }

    /// Take the burst capacity from a board profile.
    pub fn profile(self, profile: BurstProfile) -> Self {
        self.burst_capacity_bytes(profile.burst_bytes())
    }

    /// Set the first burst address.
    pub fn base_offset(mut self, offset: u64) -> Self {
        self.base_offset = Some(offset);
        self
    }

    /// Build the configuration. Unset fields take their defaults.
    pub fn build(self) -> StageConfig {
        let defaults = StageConfig::default();
        StageConfig {
            lane_width: self.lane_width.unwrap_or(defaults.lane_width),
            burst_capacity_bytes: self
                .burst_capacity_bytes
                .unwrap_or(defaults.burst_capacity_bytes),
            base_offset: self.base_offset.unwrap_or(defaults.base_offset),
        }
    }
}

/// Constants derived once from the lane width and burst size.
///
/// One alignment group is `lcm` items: `lcm_pipes` half-buffers and
/// `lcm_bursts` bursts at the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alignment {
    /// Lanes per step (`N`), also the half-buffer length.
    pub lane_width: usize,
    /// Items per burst.
    pub burst_size: usize,
    /// `gcd(lane_width, burst_size)`.
    pub gcd: usize,
    /// `lcm(lane_width, burst_size)`, in items.
    pub lcm: usize,
    /// Bursts per alignment group.
    pub lcm_bursts: usize,
    /// Half-buffers per alignment group.
    pub lcm_pipes: usize,
}

impl Alignment {
    /// Derive the constants. Both arguments must be non-zero.
    ///
    /// Fails when a full command (16 groups) would not fit a `u32` burst
    /// count or its payload would overflow `usize` items.
    pub fn derive(lane_width: usize, burst_size: usize) -> Result<Self> {
        let overflow = || BurstpackError::AlignmentOverflow {
            lane_width,
            burst_size,
        };
        if lane_width == 0 {
            return Err(BurstpackError::ZeroLaneWidth);
        }
        if burst_size == 0 {
            return Err(BurstpackError::ZeroBurstCapacity);
        }

        let gcd = gcd(lane_width, burst_size);
        let lcm = (lane_width / gcd)
            .checked_mul(burst_size)
            .ok_or_else(overflow)?;
        let lcm_bursts = lcm / burst_size;
        let groups = GROUPS_PER_COMMAND as usize;
        lcm.checked_mul(groups).ok_or_else(overflow)?;
        lcm_bursts
            .checked_mul(groups)
            .and_then(|bursts| u32::try_from(bursts).ok())
            .ok_or_else(overflow)?;

        Ok(Self {
            lane_width,
            burst_size,
            gcd,
            lcm,
            lcm_bursts,
            lcm_pipes: lcm / lane_width,
        })
    }

    /// Slots in the circular buffer (`2N`).
    pub const fn ring_len(&self) -> usize {
        2 * self.lane_width
    }
}

/// Greatest common divisor (Euclid).
pub fn gcd(a: usize, b: usize) -> usize {
    if b == 0 { a } else { gcd(b, a % b) }
}

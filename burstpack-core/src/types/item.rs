//! Fixed-size items carried through the stage.

use crate::error::{BurstpackError, Result};
use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// A fixed-size record produced by one lane in one step.
///
/// The stage never looks inside an item; it only moves it. `SIZE_BYTES`
/// fixes how many items make up a storage burst, and the codec is what a
/// storage backend uses to lay items out in its address space.
pub trait Item: Copy + Default + Debug + Send + Sync + 'static {
    /// Encoded size of one item in bytes.
    const SIZE_BYTES: usize;

    /// Append the little-endian encoding of this item to `buf`.
    fn encode_into(&self, buf: &mut Vec<u8>);

    /// Decode an item from the first `SIZE_BYTES` bytes of `bytes`.
    fn decode(bytes: &[u8]) -> Result<Self>;
}

/// A thresholded correlation between two pixels.
///
/// Twelve bytes: two 32-bit pixel indices and a single-precision
/// correlation coefficient.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrelationEdge {
    /// First pixel index.
    pub pixel_a: u32,
    /// Second pixel index.
    pub pixel_b: u32,
    /// Correlation coefficient.
    pub correlation: f32,
}

impl CorrelationEdge {
    /// Create a new edge.
    #[must_use]
    pub const fn new(pixel_a: u32, pixel_b: u32, correlation: f32) -> Self {
        Self {
            pixel_a,
            pixel_b,
            correlation,
        }
    }
}

impl Item for CorrelationEdge {
    const SIZE_BYTES: usize = 12;

    fn encode_into(&self, buf: &mut Vec<u8>) {
        // Writing into a Vec cannot fail.
        let _ = buf.write_u32::<LittleEndian>(self.pixel_a);
        let _ = buf.write_u32::<LittleEndian>(self.pixel_b);
        let _ = buf.write_f32::<LittleEndian>(self.correlation);
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE_BYTES {
            return Err(BurstpackError::ItemDecode {
                expected: Self::SIZE_BYTES,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            pixel_a: LittleEndian::read_u32(&bytes[0..4]),
            pixel_b: LittleEndian::read_u32(&bytes[4..8]),
            correlation: LittleEndian::read_f32(&bytes[8..12]),
        })
    }
}

impl Item for u64 {
    const SIZE_BYTES: usize = 8;

    fn encode_into(&self, buf: &mut Vec<u8>) {
        let _ = buf.write_u64::<LittleEndian>(*self);
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE_BYTES {
            return Err(BurstpackError::ItemDecode {
                expected: Self::SIZE_BYTES,
                actual: bytes.len(),
            });
        }
        Ok(LittleEndian::read_u64(&bytes[..8]))
    }
}

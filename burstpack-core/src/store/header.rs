//! Burst store header.

use crate::types::RunId;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

/// Magic number for burst store files ("BRSTPACK").
pub const STORE_MAGIC: u64 = 0x4B43_4150_5453_5242;

/// Current store format version.
pub const STORE_VERSION: u32 = 1;

/// Fixed size of the store header in bytes.
pub const HEADER_SIZE: usize = 128;

/// Set once the run's final item count has been recorded.
const FLAG_FINALIZED: u32 = 1;

/// Store file header.
///
/// Stored at the beginning of every store file; everything needed to
/// interpret the burst region follows from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreHeader {
    /// Magic number for file identification.
    pub magic: u64,
    /// Store format version.
    pub version: u32,
    /// Bit flags.
    pub flags: u32,
    /// Run that owns this store.
    pub run_id: RunId,
    /// Encoded item size in bytes.
    pub item_size: u32,
    /// Burst size in bytes.
    pub burst_bytes: u32,
    /// Lane width of the stage that wrote the store.
    pub lane_width: u32,
    /// First burst address of the run's output.
    pub base_offset: u64,
    /// Bursts addressable in the data region.
    pub capacity_bursts: u64,
    /// One past the highest burst written.
    pub high_water: u64,
    /// Valid items written by the run.
    pub total_written: u64,
    /// Creation timestamp (Unix epoch seconds).
    pub created_at: u64,
}

impl StoreHeader {
    /// Create a header for a fresh store.
    pub fn new(
        run_id: RunId,
        item_size: u32,
        burst_bytes: u32,
        lane_width: u32,
        base_offset: u64,
        capacity_bursts: u64,
    ) -> Self {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        Self {
            magic: STORE_MAGIC,
            version: STORE_VERSION,
            flags: 0,
            run_id,
            item_size,
            burst_bytes,
            lane_width,
            base_offset,
            capacity_bursts,
            high_water: base_offset,
            total_written: 0,
            created_at: now,
        }
    }

    /// Whether the run recorded its final count.
    pub fn is_finalized(&self) -> bool {
        self.flags & FLAG_FINALIZED != 0
    }

    /// Record the final item count.
    pub fn mark_finalized(&mut self, total_written: u64) {
        self.total_written = total_written;
        self.flags |= FLAG_FINALIZED;
    }

    /// Byte offset of burst `burst` within the file, `None` on overflow.
    pub fn burst_position(&self, burst: u64) -> Option<u64> {
        burst
            .checked_mul(u64::from(self.burst_bytes))?
            .checked_add(HEADER_SIZE as u64)
    }

    /// Total file size implied by the header, `None` on overflow.
    pub fn file_len(&self) -> Option<u64> {
        self.burst_position(self.capacity_bursts)
    }

    /// Validate the header.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.magic != STORE_MAGIC {
            return Err("Invalid magic number");
        }
        if self.version != STORE_VERSION {
            return Err("Unsupported store version");
        }
        if self.item_size == 0 || self.burst_bytes == 0 {
            return Err("Zero item or burst size");
        }
        if self.burst_bytes % self.item_size != 0 {
            return Err("Burst size is not a whole number of items");
        }
        if self.high_water > self.capacity_bursts {
            return Err("High-water mark exceeds capacity");
        }
        if self.base_offset > self.capacity_bursts {
            return Err("Base offset exceeds capacity");
        }
        if self.file_len().is_none() {
            return Err("Store size overflows");
        }
        Ok(())
    }

    /// Read header from a byte slice.
    pub fn from_bytes(bytes: &[u8]) -> io::Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Buffer too small for header",
            ));
        }

        let mut cursor = io::Cursor::new(bytes);

        let magic = cursor.read_u64::<LittleEndian>()?;
        let version = cursor.read_u32::<LittleEndian>()?;
        let flags = cursor.read_u32::<LittleEndian>()?;

        let mut uuid_bytes = [0u8; 16];
        cursor.read_exact(&mut uuid_bytes)?;
        let run_id = RunId::from_uuid(uuid::Uuid::from_bytes(uuid_bytes));

        let item_size = cursor.read_u32::<LittleEndian>()?;
        let burst_bytes = cursor.read_u32::<LittleEndian>()?;
        let lane_width = cursor.read_u32::<LittleEndian>()?;
        let _padding = cursor.read_u32::<LittleEndian>()?;
        let base_offset = cursor.read_u64::<LittleEndian>()?;
        let capacity_bursts = cursor.read_u64::<LittleEndian>()?;
        let high_water = cursor.read_u64::<LittleEndian>()?;
        let total_written = cursor.read_u64::<LittleEndian>()?;
        let created_at = cursor.read_u64::<LittleEndian>()?;

        Ok(Self {
            magic,
            version,
            flags,
            run_id,
            item_size,
            burst_bytes,
            lane_width,
            base_offset,
            capacity_bursts,
            high_water,
            total_written,
            created_at,
        })
    }

    /// Write header to a byte buffer of exactly `HEADER_SIZE` bytes.
    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(HEADER_SIZE);

        buf.write_u64::<LittleEndian>(self.magic)?;
        buf.write_u32::<LittleEndian>(self.version)?;
        buf.write_u32::<LittleEndian>(self.flags)?;
        buf.write_all(self.run_id.as_uuid().as_bytes())?;
        buf.write_u32::<LittleEndian>(self.item_size)?;
        buf.write_u32::<LittleEndian>(self.burst_bytes)?;
        buf.write_u32::<LittleEndian>(self.lane_width)?;
        buf.write_u32::<LittleEndian>(0)?; // alignment padding
        buf.write_u64::<LittleEndian>(self.base_offset)?;
        buf.write_u64::<LittleEndian>(self.capacity_bursts)?;
        buf.write_u64::<LittleEndian>(self.high_water)?;
        buf.write_u64::<LittleEndian>(self.total_written)?;
        buf.write_u64::<LittleEndian>(self.created_at)?;

        buf.resize(HEADER_SIZE, 0);
        Ok(buf)
    }
}

//! Memory-mapped burst store.

use super::backend::{check_alignment, BurstBackend};
use super::header::{StoreHeader, HEADER_SIZE};
use crate::config::StageConfig;
use crate::error::{BurstpackError, Result};
use crate::stage::BurstCommand;
use crate::types::{Item, RunId};
use fs2::FileExt;
use memmap2::{MmapMut, MmapOptions};
use parking_lot::RwLock;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default store size: 64 Ki bursts.
pub const DEFAULT_CAPACITY_BURSTS: u64 = 64 * 1024;

/// Configuration for store creation.
#[derive(Debug, Clone)]
pub struct BurstStoreConfig {
    /// Bursts addressable in the data region, counted from address zero.
    pub capacity_bursts: u64,
    /// Directory for store files.
    pub directory: PathBuf,
    /// Whether to flush the mapping after every command.
    pub sync_on_write: bool,
}

impl Default for BurstStoreConfig {
    fn default() -> Self {
        Self {
            capacity_bursts: DEFAULT_CAPACITY_BURSTS,
            directory: PathBuf::from("/tmp/burstpack"),
            sync_on_write: false,
        }
    }
}

impl BurstStoreConfig {
    /// Configuration for tests: small, in a unique temp directory.
    pub fn in_memory() -> Self {
        Self {
            capacity_bursts: 4096,
            directory: std::env::temp_dir().join(format!("burstpack_{}", uuid::Uuid::new_v4())),
            sync_on_write: false,
        }
    }

    /// Set the capacity in bursts.
    pub fn with_capacity(mut self, bursts: u64) -> Self {
        self.capacity_bursts = bursts;
        self
    }

    /// Set the directory.
    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = directory.into();
        self
    }

    /// Enable flushing after every command.
    pub fn with_sync(mut self, sync: bool) -> Self {
        self.sync_on_write = sync;
        self
    }
}

struct StoreInner {
    mmap: MmapMut,
    file: File,
    path: PathBuf,
    header: StoreHeader,
    sync_on_write: bool,
}

impl StoreInner {
    fn write_header(&mut self) -> Result<()> {
        let bytes = self
            .header
            .to_bytes()
            .map_err(|e| BurstpackError::StoreWrite {
                offset: 0,
                cause: e.to_string(),
            })?;
        self.mmap[..HEADER_SIZE].copy_from_slice(&bytes);
        Ok(())
    }

    fn items_written(&self) -> u64 {
        let h = &self.header;
        h.high_water.saturating_sub(h.base_offset) * u64::from(h.burst_bytes)
            / u64::from(h.item_size)
    }

    fn read_items<T: Item>(&self, first: u64, count: u64) -> Result<Vec<T>> {
        let h = &self.header;
        if h.item_size as usize != T::SIZE_BYTES {
            return Err(BurstpackError::StoreGeometry {
                cause: format!(
                    "store holds {}-byte items, reader expects {}",
                    h.item_size,
                    T::SIZE_BYTES
                ),
            });
        }

        let available = self.items_written();
        let out_of_range = || BurstpackError::StoreReadRange {
            first,
            end: first.saturating_add(count),
            available,
        };
        let end = first.checked_add(count).ok_or_else(out_of_range)?;
        if end > available {
            return Err(out_of_range());
        }

        let item_bytes = T::SIZE_BYTES as u64;
        let span = h
            .burst_position(h.base_offset)
            .and_then(|base| {
                let start = base.checked_add(first.checked_mul(item_bytes)?)?;
                let end = start.checked_add(count.checked_mul(item_bytes)?)?;
                Some((usize::try_from(start).ok()?, usize::try_from(end).ok()?))
            })
            .filter(|&(_, end)| end <= self.mmap.len());
        let (start, end) = span.ok_or_else(out_of_range)?;

        self.mmap[start..end]
            .chunks_exact(T::SIZE_BYTES)
            .map(T::decode)
            .collect()
    }
}

fn header_field(value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| BurstpackError::StoreGeometry {
        cause: format!("{} does not fit a 32-bit header field", value),
    })
}

/// A memory-mapped, burst-addressed store for one run.
pub struct BurstStore {
    inner: Arc<RwLock<StoreInner>>,
    run_id: RunId,
}

impl BurstStore {
    /// Create a store for a run of a stage configured with `stage`.
    pub fn create<T: Item>(run_id: RunId, stage: &StageConfig, config: &BurstStoreConfig) -> Result<Self> {
        stage.validate::<T>()?;
        if config.capacity_bursts <= stage.base_offset {
            return Err(BurstpackError::StoreGeometry {
                cause: format!(
                    "capacity of {} bursts leaves no room after base offset {}",
                    config.capacity_bursts, stage.base_offset
                ),
            });
        }

        std::fs::create_dir_all(&config.directory).map_err(|e| BurstpackError::StoreCreate {
            path: config.directory.clone(),
            cause: e.to_string(),
        })?;

        let path = config
            .directory
            .join(format!("run_{}.bin", run_id.as_uuid()));

        let header = StoreHeader::new(
            run_id,
            header_field(T::SIZE_BYTES)?,
            header_field(stage.burst_capacity_bytes)?,
            header_field(stage.lane_width)?,
            stage.base_offset,
            config.capacity_bursts,
        );
        let file_len = header
            .file_len()
            .and_then(|len| usize::try_from(len).ok().map(|_| len))
            .ok_or_else(|| BurstpackError::StoreGeometry {
                cause: format!(
                    "capacity of {} bursts of {} bytes is not addressable",
                    config.capacity_bursts, stage.burst_capacity_bytes
                ),
            })?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| BurstpackError::StoreCreate {
                path: path.clone(),
                cause: e.to_string(),
            })?;

        file.try_lock_exclusive()
            .map_err(|e| BurstpackError::StoreCreate {
                path: path.clone(),
                cause: format!("Failed to lock file: {}", e),
            })?;

        file.set_len(file_len)
            .map_err(|e| BurstpackError::StoreCreate {
                path: path.clone(),
                cause: e.to_string(),
            })?;

        // SAFETY: the file is exclusively locked for the lifetime of the mapping.
        let mmap = unsafe {
            MmapOptions::new()
                .len(file_len as usize)
                .map_mut(&file)
                .map_err(|e| BurstpackError::StoreMmap {
                    path: path.clone(),
                    cause: e.to_string(),
                })?
        };

        let mut inner = StoreInner {
            mmap,
            file,
            path,
            header,
            sync_on_write: config.sync_on_write,
        };
        inner.write_header()?;

        tracing::debug!(
            run_id = %run_id,
            path = %inner.path.display(),
            capacity_bursts = config.capacity_bursts,
            "Burst store created"
        );

        Ok(Self {
            inner: Arc::new(RwLock::new(inner)),
            run_id,
        })
    }

    /// Open an existing store file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| BurstpackError::StoreCreate {
                path: path.clone(),
                cause: e.to_string(),
            })?;

        file.try_lock_exclusive()
            .map_err(|e| BurstpackError::StoreCreate {
                path: path.clone(),
                cause: format!("Failed to lock file: {}", e),
            })?;

        let len = file
            .metadata()
            .map_err(|e| BurstpackError::StoreCreate {
                path: path.clone(),
                cause: e.to_string(),
            })?
            .len();

        // SAFETY: the file is exclusively locked for the lifetime of the mapping.
        let mmap = unsafe {
            MmapOptions::new()
                .len(len as usize)
                .map_mut(&file)
                .map_err(|e| BurstpackError::StoreMmap {
                    path: path.clone(),
                    cause: e.to_string(),
                })?
        };

        let header = StoreHeader::from_bytes(&mmap[..HEADER_SIZE.min(mmap.len())]).map_err(|e| {
            BurstpackError::StoreCorruption {
                cause: e.to_string(),
            }
        })?;
        header
            .validate()
            .map_err(|e| BurstpackError::StoreCorruption {
                cause: e.to_string(),
            })?;
        // validate() rejects headers whose size overflows.
        let needed = header.file_len().unwrap_or(u64::MAX);
        if needed > len {
            return Err(BurstpackError::StoreCorruption {
                cause: format!("file is {} bytes, header needs {}", len, needed),
            });
        }

        let run_id = header.run_id;
        let inner = StoreInner {
            mmap,
            file,
            path,
            header,
            sync_on_write: false,
        };

        Ok(Self {
            inner: Arc::new(RwLock::new(inner)),
            run_id,
        })
    }

    /// The run this store belongs to.
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Path of the store file.
    pub fn path(&self) -> PathBuf {
        self.inner.read().path.clone()
    }

    /// A copy of the current header.
    pub fn header(&self) -> StoreHeader {
        self.inner.read().header
    }

    /// Read `count` items starting at item `first` of the run's output.
    pub fn read_items<T: Item>(&self, first: u64, count: u64) -> Result<Vec<T>> {
        self.inner.read().read_items(first, count)
    }

    /// The run's valid items; requires a finalized store.
    pub fn valid_items<T: Item>(&self) -> Result<Vec<T>> {
        let inner = self.inner.read();
        if !inner.header.is_finalized() {
            return Err(BurstpackError::StoreCorruption {
                cause: "store was not finalized".to_string(),
            });
        }
        inner.read_items(0, inner.header.total_written)
    }

    /// Flush the mapping to disk.
    pub fn flush(&self) -> Result<()> {
        let inner = self.inner.read();
        inner.mmap.flush().map_err(|e| BurstpackError::StoreWrite {
            offset: inner.header.high_water,
            cause: e.to_string(),
        })
    }

    /// A read handle sharing this store's mapping.
    pub fn reader(&self) -> BurstStoreReader {
        BurstStoreReader {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Delete the store file. The store is unusable afterwards.
    pub fn delete(self) -> Result<()> {
        let path = self.path();
        drop(self);
        std::fs::remove_file(&path).map_err(|e| BurstpackError::StoreCreate {
            path,
            cause: format!("Failed to delete store file: {}", e),
        })
    }
}

impl<T: Item> BurstBackend<T> for BurstStore {
    fn write_burst(&mut self, command: &BurstCommand<T>) -> Result<()> {
        let mut inner = self.inner.write();
        let header = inner.header;

        if header.item_size as usize != T::SIZE_BYTES {
            return Err(BurstpackError::StoreGeometry {
                cause: format!(
                    "store holds {}-byte items, command carries {}",
                    header.item_size,
                    T::SIZE_BYTES
                ),
            });
        }
        check_alignment(command, header.burst_bytes as usize)?;

        if command.offset < header.base_offset || command.end() > header.capacity_bursts {
            return Err(BurstpackError::StoreCapacity {
                offset: command.offset,
                end: command.end(),
                capacity: header.capacity_bursts,
            });
        }

        let payload = command.encode_payload();
        let start = header
            .burst_position(command.offset)
            .and_then(|pos| usize::try_from(pos).ok())
            .filter(|&pos| pos + payload.len() <= inner.mmap.len())
            .ok_or(BurstpackError::StoreCapacity {
                offset: command.offset,
                end: command.end(),
                capacity: header.capacity_bursts,
            })?;
        inner.mmap[start..start + payload.len()].copy_from_slice(&payload);

        inner.header.high_water = inner.header.high_water.max(command.end());

        if inner.sync_on_write {
            inner.write_header()?;
            inner.mmap.flush().map_err(|e| BurstpackError::StoreWrite {
                offset: command.offset,
                cause: e.to_string(),
            })?;
        }

        tracing::trace!(
            offset = command.offset,
            burst_count = command.burst_count,
            "Bursts stored"
        );
        Ok(())
    }

    fn finalize(&mut self, total_written: u64) -> Result<()> {
        let mut inner = self.inner.write();
        inner.header.mark_finalized(total_written);
        inner.write_header()?;
        inner.mmap.flush().map_err(|e| BurstpackError::StoreWrite {
            offset: 0,
            cause: e.to_string(),
        })?;

        tracing::debug!(
            run_id = %self.run_id,
            total_written,
            high_water = inner.header.high_water,
            "Burst store finalized"
        );
        Ok(())
    }
}

impl Drop for BurstStore {
    fn drop(&mut self) {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            let inner = inner.get_mut();
            let _ = inner.write_header();
            let _ = inner.mmap.flush();
            let _ = fs2::FileExt::unlock(&inner.file);
        }
    }
}

/// A read-only handle to a store.
#[derive(Clone)]
pub struct BurstStoreReader {
    inner: Arc<RwLock<StoreInner>>,
}

impl BurstStoreReader {
    /// A copy of the current header.
    pub fn header(&self) -> StoreHeader {
        self.inner.read().header
    }

    /// Read `count` items starting at item `first` of the run's output.
    pub fn read_items<T: Item>(&self, first: u64, count: u64) -> Result<Vec<T>> {
        self.inner.read().read_items(first, count)
    }
}

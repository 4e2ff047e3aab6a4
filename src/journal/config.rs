//! Journal configuration
//!
//! All values are consumed once at [`EventJournal::open`] and are immutable
//! for the lifetime of the instance. There is no runtime reconfiguration
//! path.
//!
//! [`EventJournal::open`]: crate::journal::EventJournal::open

use std::path::{Path, PathBuf};

/// Default segment rotation threshold: 1 GiB
pub const DEFAULT_SEGMENT_MAX_BYTES: u64 = 1024 * 1024 * 1024;

/// Default dedup cache capacity
pub const DEFAULT_DEDUP_CACHE_CAPACITY: usize = 1_000_000;

/// Configuration for an [`EventJournal`] instance.
///
/// [`EventJournal`]: crate::journal::EventJournal
#[derive(Debug, Clone)]
pub struct JournalConfig {
    /// Root data directory. Segment files live in `<data_dir>/queue/`.
    pub data_dir: PathBuf,
    /// Byte threshold at which the current segment is rotated.
    pub segment_max_bytes: u64,
    /// Maximum number of event identifiers retained for deduplication.
    pub dedup_cache_capacity: usize,
}

impl JournalConfig {
    /// Create a config with defaults for everything but the data directory.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            segment_max_bytes: DEFAULT_SEGMENT_MAX_BYTES,
            dedup_cache_capacity: DEFAULT_DEDUP_CACHE_CAPACITY,
        }
    }

    /// Override the segment rotation threshold.
    pub fn with_segment_max_bytes(mut self, bytes: u64) -> Self {
        self.segment_max_bytes = bytes;
        self
    }

    /// Override the dedup cache capacity.
    pub fn with_dedup_cache_capacity(mut self, capacity: usize) -> Self {
        self.dedup_cache_capacity = capacity;
        self
    }

    /// Directory holding the segment files.
    pub fn queue_dir(&self) -> PathBuf {
        self.data_dir.join(super::QUEUE_DIR_NAME)
    }
}

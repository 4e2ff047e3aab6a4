//! Durable event journal for the CDC export pipeline
//!
//! The journal persists change records, in order, as a sequence of
//! size-bounded, append-only `segment.<N>.ndjson` files under
//! `<data_dir>/queue/`. It survives abrupt process termination and resumes
//! exactly where it left off, without duplicating or losing records.
//!
//! # Invariants Enforced
//!
//! - Sequence numbers are strictly increasing with no gaps, and after
//!   recovery continue one past the highest number durably on disk
//! - Segment indices are gapless and ascending from 0; a closed segment
//!   (terminal `\.` marker written) is never reopened for writing
//! - An update with an empty value set never reaches storage
//! - An event identifier already present in some segment is never appended
//!   twice, across restarts, within the dedup cache's bounded horizon
//! - The dedup cache never exceeds its capacity; eviction is
//!   oldest-inserted-first

mod config;
mod dedup;
mod errors;
mod queue;
mod record;
mod registry;
mod segment;
mod sequence;

pub use config::{JournalConfig, DEFAULT_DEDUP_CACHE_CAPACITY, DEFAULT_SEGMENT_MAX_BYTES};
pub use dedup::EventDedupCache;
pub use errors::{JournalError, JournalErrorCode, JournalResult, Severity};
pub use queue::EventJournal;
pub use record::{extract_event_id, ColumnValues, Op, Record};
pub use registry::{
    EventCountSource, RecordWriter, RegistryError, RegistryResult, StaticEventCounts,
};
pub use segment::{QueueSegment, EOF_MARKER};
pub use sequence::SequenceNumberGenerator;

use std::path::{Path, PathBuf};

/// Subdirectory of the data directory holding segment files
pub(crate) const QUEUE_DIR_NAME: &str = "queue";

/// Segment file name prefix
const SEGMENT_FILE_PREFIX: &str = "segment";

/// Segment file name extension
const SEGMENT_FILE_EXTENSION: &str = "ndjson";

/// Path of the segment file with the given index:
/// `<queue_dir>/segment.<index>.ndjson`, index in decimal without leading
/// zeros.
pub fn segment_file_path(queue_dir: &Path, index: u64) -> PathBuf {
    queue_dir.join(format!(
        "{}.{}.{}",
        SEGMENT_FILE_PREFIX, index, SEGMENT_FILE_EXTENSION
    ))
}

/// Extracts the segment index from a file name of the segment naming
/// pattern; `None` for anything else.
pub(crate) fn parse_segment_index(file_name: &str) -> Option<u64> {
    let rest = file_name.strip_prefix(SEGMENT_FILE_PREFIX)?;
    let rest = rest.strip_prefix('.')?;
    let index_str = rest.strip_suffix(SEGMENT_FILE_EXTENSION)?;
    let index_str = index_str.strip_suffix('.')?;
    if index_str.is_empty() || !index_str.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    index_str.parse().ok()
}

//! Collaborator seams for the surrounding export pipeline
//!
//! The journal touches two external parties and models both as narrow
//! traits so the core can be tested with fakes:
//! - inbound, the pipeline's batch-delivery loop drives a [`RecordWriter`];
//! - outbound, startup warm-up reads per-segment event totals from an
//!   [`EventCountSource`] (the durable status registry, owned elsewhere).

use thiserror::Error;

use super::errors::JournalResult;
use super::record::Record;

/// Result type for status registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors surfaced by a status registry implementation.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// The registry could not be reached or read
    #[error("Status registry unavailable: {0}")]
    Unavailable(String),

    /// The registry returned counts the journal cannot use
    #[error("Malformed per-segment event counts: {0}")]
    Malformed(String),
}

/// Inbound capability: receive records from the pipeline.
///
/// Calls are sequential with respect to each other; the journal relies on
/// the caller serializing access.
pub trait RecordWriter {
    /// Accept one change record. Logical rejects (empty updates, dedup
    /// hits) return `Ok` and drop the record.
    fn write_record(&mut self, record: Record) -> JournalResult<()>;

    /// Push buffered writes to the operating system.
    fn flush(&mut self) -> JournalResult<()>;

    /// Force durability to stable storage.
    fn sync(&mut self) -> JournalResult<()>;

    /// Close the current segment, leaving a clean EOF boundary for the
    /// next startup.
    fn close(&mut self) -> JournalResult<()>;
}

/// Outbound capability: supply per-segment event totals for dedup warm-up.
pub trait EventCountSource {
    /// Total events per segment index, ordered by descending index.
    /// Read once, at startup.
    fn total_events_per_segment(&self) -> RegistryResult<Vec<(u64, u64)>>;
}

/// In-memory count source for tests and embedders without a registry.
pub struct StaticEventCounts {
    counts: Vec<(u64, u64)>,
}

impl StaticEventCounts {
    /// Build from `(segment_index, event_count)` pairs in any order.
    pub fn new(mut counts: Vec<(u64, u64)>) -> Self {
        counts.sort_by(|a, b| b.0.cmp(&a.0));
        Self { counts }
    }

    /// A source reporting no segments.
    pub fn empty() -> Self {
        Self { counts: Vec::new() }
    }
}

impl EventCountSource for StaticEventCounts {
    fn total_events_per_segment(&self) -> RegistryResult<Vec<(u64, u64)>> {
        Ok(self.counts.clone())
    }
}

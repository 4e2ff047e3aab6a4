//! Bounded event deduplication cache
//!
//! Prevents re-appending an event that is already durably present in some
//! (possibly prior, possibly crashed-mid-write) segment. The cache is never
//! persisted: it is rebuilt at startup by scanning recent segments, which
//! trades a bounded startup read for zero additional durable state.
//!
//! Eviction is oldest-inserted-first. Membership checks do not refresh an
//! entry's position, so this is an insertion-recency bound, not a full LRU.

use std::collections::{HashSet, VecDeque};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::errors::{JournalError, JournalResult};
use super::record::extract_event_id;
use super::segment::EOF_MARKER;
use crate::observability::{Event, Logger};

/// Bounded set of recently-seen event identifiers.
pub struct EventDedupCache {
    /// Maximum number of identifiers retained
    capacity: usize,
    /// Membership set
    cache: HashSet<String>,
    /// Identifiers in insertion order; front is oldest
    insertion_order: VecDeque<String>,
}

impl EventDedupCache {
    /// Create an empty cache with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            cache: HashSet::new(),
            insertion_order: VecDeque::new(),
        }
    }

    /// Pure membership test.
    pub fn contains(&self, event_id: &str) -> bool {
        self.cache.contains(event_id)
    }

    /// Insert an identifier, evicting the oldest-inserted one if the cache
    /// is at capacity. Inserting an identifier that is already present is a
    /// no-op and does not refresh its position.
    pub fn insert(&mut self, event_id: impl Into<String>) {
        let event_id = event_id.into();
        if self.cache.contains(&event_id) {
            return;
        }
        if self.cache.len() >= self.capacity {
            if let Some(oldest) = self.insertion_order.pop_front() {
                self.cache.remove(&oldest);
            }
        }
        self.cache.insert(event_id.clone());
        self.insertion_order.push_back(event_id);
    }

    /// Number of identifiers currently held.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Whether the cache holds no identifiers.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Rebuild the cache from persisted segment contents.
    ///
    /// `counts` maps segment index to the number of records it contains,
    /// ordered by descending segment index (the externally supplied
    /// per-segment totals). Walking that order, counts are accumulated
    /// until they cover the cache capacity; that determines the earliest
    /// segment a forward scan must start from. Every segment from there to
    /// the newest is then read in file order: blank lines are skipped, the
    /// scan of a file stops at its EOF marker, and lines without an
    /// extractable event identifier (including malformed ones) contribute
    /// nothing.
    ///
    /// # Errors
    ///
    /// Any failure reading a segment file is `CDC_WARMUP_FAILED`: without a
    /// complete scan the journal cannot guarantee dedup correctness.
    pub fn warm_up(&mut self, counts: &[(u64, u64)], queue_dir: &Path) -> JournalResult<()> {
        if counts.is_empty() {
            Logger::info(Event::DedupWarmupComplete.as_str(), &[("events", "0")]);
            return Ok(());
        }

        let mut start_index = 0;
        let mut events_covered: u64 = 0;
        for &(index, count) in counts {
            start_index = index;
            events_covered += count;
            if events_covered >= self.capacity as u64 {
                break;
            }
        }

        let newest_index = counts.iter().map(|&(index, _)| index).max().unwrap_or(0);

        for index in start_index..=newest_index {
            let path = super::segment_file_path(queue_dir, index);
            let file = File::open(&path).map_err(|e| {
                JournalError::warmup_io(
                    format!("Failed to open segment for warm-up: {}", path.display()),
                    e,
                )
            })?;
            let reader = BufReader::new(file);
            for line in reader.lines() {
                let line = line.map_err(|e| {
                    JournalError::warmup_io(
                        format!("Failed to read segment during warm-up: {}", path.display()),
                        e,
                    )
                })?;
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if trimmed == EOF_MARKER {
                    break;
                }
                if let Some(event_id) = extract_event_id(trimmed) {
                    self.insert(event_id);
                }
            }
        }

        Logger::info(
            Event::DedupWarmupComplete.as_str(),
            &[("events", &self.len().to_string())],
        );
        Ok(())
    }
}

//! Journal orchestrator
//!
//! The single write entry point for the export pipeline. Owns the
//! currently-open segment, the sequence generator, and the dedup cache.
//!
//! # Startup Sequence (strict order)
//!
//! 1. Ensure the queue directory exists
//! 2. Scan it for segment files; cold start at index 0 if none
//! 3. Reopen the segment with the highest index
//! 4. Derive the next sequence number from disk (falling back to the
//!    previous segment when the latest is empty)
//! 5. Reseed the sequence generator
//! 6. Rotate immediately if the latest segment is already closed, so new
//!    writes never land after an EOF marker
//! 7. Warm the dedup cache from the status registry's per-segment totals
//!
//! The journal is single-writer: callers serialize access to
//! `write_record` / `flush` / `sync` / `close`. There is no `Drop` impl;
//! dropping without `close` is exactly the abrupt-termination case the
//! startup sequence recovers from.

use std::fs;
use std::path::{Path, PathBuf};

use super::config::JournalConfig;
use super::dedup::EventDedupCache;
use super::errors::{JournalError, JournalResult};
use super::record::Record;
use super::registry::{EventCountSource, RecordWriter};
use super::segment::QueueSegment;
use super::sequence::SequenceNumberGenerator;
use super::{parse_segment_index, segment_file_path};
use crate::observability::{Event, Logger};

/// Durable, segment-rotating event journal.
pub struct EventJournal {
    /// Directory holding the segment files
    queue_dir: PathBuf,
    /// Rotation threshold in bytes
    segment_max_bytes: u64,
    /// Index of the currently-open segment
    current_index: u64,
    /// The currently-open segment
    current_segment: QueueSegment,
    /// Sequence number generator, reseeded once at startup
    sequence: SequenceNumberGenerator,
    /// Bounded cache of recently-seen event identifiers
    dedup: EventDedupCache,
}

impl EventJournal {
    /// Opens the journal, running full crash recovery against the queue
    /// directory and warming the dedup cache from `counts`.
    ///
    /// # Errors
    ///
    /// - `CDC_QUEUE_SETUP_FAILED` if the queue directory cannot be created
    /// - `CDC_RECOVERY_FAILED` if the directory scan or segment inspection
    ///   fails
    /// - `CDC_WARMUP_FAILED` if the registry or a segment read fails during
    ///   warm-up
    pub fn open(config: JournalConfig, counts: &dyn EventCountSource) -> JournalResult<Self> {
        let queue_dir = config.queue_dir();
        fs::create_dir_all(&queue_dir).map_err(|e| {
            JournalError::setup_failed(
                format!("Failed to create queue directory: {}", queue_dir.display()),
                e,
            )
        })?;
        Logger::info(
            Event::JournalOpen.as_str(),
            &[("queue_dir", &queue_dir.display().to_string())],
        );

        let latest_index = Self::find_latest_segment_index(&queue_dir)?;

        let mut sequence = SequenceNumberGenerator::new(1);
        let (current_index, current_segment) = match latest_index {
            None => {
                // Cold start: fresh segment 0, sequence 1
                let segment = QueueSegment::open(0, segment_file_path(&queue_dir, 0))?;
                (0, segment)
            }
            Some(index) => {
                let segment = QueueSegment::open(index, segment_file_path(&queue_dir, index))?;
                Logger::info(
                    Event::JournalRecovered.as_str(),
                    &[
                        ("segment_index", &index.to_string()),
                        ("byte_count", &segment.byte_count().to_string()),
                    ],
                );

                let next = Self::recover_next_sequence(&queue_dir, index, &segment)?;
                sequence.advance_to(next);
                Logger::info(
                    Event::SequenceAdvanced.as_str(),
                    &[("next_vsn", &next.to_string())],
                );
                (index, segment)
            }
        };

        let mut journal = Self {
            queue_dir,
            segment_max_bytes: config.segment_max_bytes,
            current_index,
            current_segment,
            sequence,
            dedup: EventDedupCache::new(config.dedup_cache_capacity),
        };

        // A segment closed just before a crash must never receive appends
        // after its EOF marker; advance to the next index right away.
        if latest_index.is_some() && journal.current_segment.is_closed()? {
            journal.rotate()?;
        }

        let counts = counts
            .total_events_per_segment()
            .map_err(|e| JournalError::warmup_failed(e.to_string()))?;
        journal.dedup.warm_up(&counts, &journal.queue_dir)?;

        Ok(journal)
    }

    /// Scans the queue directory for `segment.<N>.ndjson` files and returns
    /// the highest index, or `None` if there is nothing to recover.
    fn find_latest_segment_index(queue_dir: &Path) -> JournalResult<Option<u64>> {
        let entries = fs::read_dir(queue_dir).map_err(|e| {
            JournalError::recovery_io(
                format!("Failed to read queue directory: {}", queue_dir.display()),
                e,
            )
        })?;

        let mut latest: Option<u64> = None;
        for entry in entries {
            let entry = entry.map_err(|e| {
                JournalError::recovery_io(
                    format!("Failed to read queue directory entry: {}", queue_dir.display()),
                    e,
                )
            })?;
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if let Some(index) = parse_segment_index(name) {
                latest = Some(latest.map_or(index, |max| max.max(index)));
            }
        }
        Ok(latest)
    }

    /// Derives the next sequence number from on-disk state.
    ///
    /// An empty latest segment at index > 0 means rotation created it just
    /// before a crash; the answer then lives in the previous segment.
    fn recover_next_sequence(
        queue_dir: &Path,
        index: u64,
        segment: &QueueSegment,
    ) -> JournalResult<u64> {
        if let Some(vsn) = segment.last_record_vsn()? {
            return Ok(vsn + 1);
        }
        if index == 0 {
            return Ok(1);
        }

        let previous_path = segment_file_path(queue_dir, index - 1);
        if !previous_path.exists() {
            return Err(JournalError::recovery_at_segment(
                index - 1,
                "Previous segment missing while recovering sequence number",
            ));
        }
        let previous = QueueSegment::open(index - 1, previous_path)?;
        match previous.last_record_vsn()? {
            Some(vsn) => Ok(vsn + 1),
            None => {
                // Two empty trailing segments cannot come from normal
                // rotation; nothing on disk means the sequence starts over.
                Logger::warn(
                    Event::SequenceAdvanced.as_str(),
                    &[
                        ("next_vsn", "1"),
                        ("reason", "latest and previous segments both empty"),
                    ],
                );
                Ok(1)
            }
        }
    }

    /// Closes the current segment and opens the next index.
    fn rotate(&mut self) -> JournalResult<()> {
        self.current_segment.close()?;
        Logger::info(
            Event::SegmentClosed.as_str(),
            &[("segment_index", &self.current_index.to_string())],
        );

        self.current_index += 1;
        Logger::info(
            Event::SegmentRotate.as_str(),
            &[("segment_index", &self.current_index.to_string())],
        );
        self.current_segment = QueueSegment::open(
            self.current_index,
            segment_file_path(&self.queue_dir, self.current_index),
        )?;
        Ok(())
    }

    fn should_rotate(&self) -> bool {
        self.current_segment.byte_count() >= self.segment_max_bytes
    }

    /// Accepts one change record.
    ///
    /// Empty updates and already-seen event identifiers are dropped with a
    /// log line and `Ok`. An accepted record is assigned the next sequence
    /// number, appended to the current segment (rotating first if the byte
    /// threshold has been reached), and its event identifier is cached.
    ///
    /// The dedup cache is updated only after a successful append, so a
    /// failed write is never marked as deduplicated.
    pub fn write_record(&mut self, mut record: Record) -> JournalResult<()> {
        if record.is_empty_update() {
            Logger::trace(
                Event::RecordDroppedEmptyUpdate.as_str(),
                &[("record", &record.describe())],
            );
            return Ok(());
        }
        if let Some(event_id) = record.event_id.as_deref() {
            if self.dedup.contains(event_id) {
                Logger::info(
                    Event::RecordDroppedDuplicate.as_str(),
                    &[("record", &record.describe())],
                );
                return Ok(());
            }
        }

        if self.should_rotate() {
            self.rotate()?;
        }

        record.assign_vsn(self.sequence.next());
        self.current_segment.write(&record)?;

        if let Some(event_id) = record.event_id {
            self.dedup.insert(event_id);
        }
        Ok(())
    }

    /// Pushes buffered writes to the operating system.
    pub fn flush(&mut self) -> JournalResult<()> {
        self.current_segment.flush()
    }

    /// Forces durability to stable storage.
    pub fn sync(&mut self) -> JournalResult<()> {
        self.current_segment.sync()
    }

    /// Closes the current segment, leaving the EOF-marked boundary the
    /// next startup's recovery expects.
    pub fn close(&mut self) -> JournalResult<()> {
        self.current_segment.close()?;
        Logger::info(
            Event::JournalClose.as_str(),
            &[("segment_index", &self.current_index.to_string())],
        );
        Ok(())
    }

    /// Index of the currently-open segment.
    pub fn current_segment_index(&self) -> u64 {
        self.current_index
    }

    /// The sequence number the next accepted record will receive.
    pub fn next_sequence_number(&self) -> u64 {
        self.sequence.peek()
    }

    /// Byte size of the currently-open segment.
    pub fn current_segment_byte_count(&self) -> u64 {
        self.current_segment.byte_count()
    }

    /// Number of event identifiers currently held for deduplication.
    pub fn dedup_cache_len(&self) -> usize {
        self.dedup.len()
    }
}

impl RecordWriter for EventJournal {
    fn write_record(&mut self, record: Record) -> JournalResult<()> {
        EventJournal::write_record(self, record)
    }

    fn flush(&mut self) -> JournalResult<()> {
        EventJournal::flush(self)
    }

    fn sync(&mut self) -> JournalResult<()> {
        EventJournal::sync(self)
    }

    fn close(&mut self) -> JournalResult<()> {
        EventJournal::close(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::record::Op;
    use crate::journal::registry::StaticEventCounts;
    use tempfile::TempDir;

    fn test_config(dir: &Path) -> JournalConfig {
        JournalConfig::new(dir)
    }

    fn test_record(event_id: &str) -> Record {
        Record::new(Op::Create, "public", "orders")
            .with_key("id", Some("1".to_string()))
            .with_field("total", Some("10".to_string()))
            .with_event_id(event_id)
    }

    #[test]
    fn test_cold_start() {
        let temp_dir = TempDir::new().unwrap();
        let journal =
            EventJournal::open(test_config(temp_dir.path()), &StaticEventCounts::empty()).unwrap();

        assert_eq!(journal.current_segment_index(), 0);
        assert_eq!(journal.next_sequence_number(), 1);
        assert!(temp_dir.path().join("queue").is_dir());
    }

    #[test]
    fn test_first_record_gets_vsn_one() {
        let temp_dir = TempDir::new().unwrap();
        let mut journal =
            EventJournal::open(test_config(temp_dir.path()), &StaticEventCounts::empty()).unwrap();

        journal.write_record(test_record("e1")).unwrap();
        journal.flush().unwrap();

        let content =
            std::fs::read_to_string(segment_file_path(&temp_dir.path().join("queue"), 0)).unwrap();
        let value: serde_json::Value = serde_json::from_str(content.lines().next().unwrap()).unwrap();
        assert_eq!(value["vsn"], 1);
        assert_eq!(journal.next_sequence_number(), 2);
    }

    #[test]
    fn test_empty_update_dropped_without_sequence_increment() {
        let temp_dir = TempDir::new().unwrap();
        let mut journal =
            EventJournal::open(test_config(temp_dir.path()), &StaticEventCounts::empty()).unwrap();

        journal
            .write_record(Record::new(Op::Update, "public", "orders"))
            .unwrap();

        assert_eq!(journal.next_sequence_number(), 1);
        assert_eq!(journal.current_segment_byte_count(), 0);
    }

    #[test]
    fn test_duplicate_event_dropped_in_session() {
        let temp_dir = TempDir::new().unwrap();
        let mut journal =
            EventJournal::open(test_config(temp_dir.path()), &StaticEventCounts::empty()).unwrap();

        journal.write_record(test_record("e1")).unwrap();
        journal.write_record(test_record("e1")).unwrap();
        journal.flush().unwrap();

        let content =
            std::fs::read_to_string(segment_file_path(&temp_dir.path().join("queue"), 0)).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert_eq!(journal.next_sequence_number(), 2);
    }

    #[test]
    fn test_record_without_event_id_never_deduplicated() {
        let temp_dir = TempDir::new().unwrap();
        let mut journal =
            EventJournal::open(test_config(temp_dir.path()), &StaticEventCounts::empty()).unwrap();

        let record = Record::new(Op::Delete, "public", "orders")
            .with_key("id", Some("1".to_string()));
        journal.write_record(record.clone()).unwrap();
        journal.write_record(record).unwrap();
        journal.flush().unwrap();

        let content =
            std::fs::read_to_string(segment_file_path(&temp_dir.path().join("queue"), 0)).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert_eq!(journal.dedup_cache_len(), 0);
    }

    #[test]
    fn test_rotation_at_threshold() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(temp_dir.path()).with_segment_max_bytes(64);
        let mut journal = EventJournal::open(config, &StaticEventCounts::empty()).unwrap();

        for i in 0..20 {
            journal.write_record(test_record(&format!("e{}", i))).unwrap();
        }
        journal.flush().unwrap();

        assert!(journal.current_segment_index() > 0);
    }

    #[test]
    fn test_close_writes_eof_marker() {
        let temp_dir = TempDir::new().unwrap();
        let mut journal =
            EventJournal::open(test_config(temp_dir.path()), &StaticEventCounts::empty()).unwrap();

        journal.write_record(test_record("e1")).unwrap();
        journal.close().unwrap();

        let content =
            std::fs::read_to_string(segment_file_path(&temp_dir.path().join("queue"), 0)).unwrap();
        assert_eq!(content.lines().last().unwrap(), super::super::segment::EOF_MARKER);
    }

    #[test]
    fn test_record_writer_trait_object() {
        let temp_dir = TempDir::new().unwrap();
        let mut journal =
            EventJournal::open(test_config(temp_dir.path()), &StaticEventCounts::empty()).unwrap();

        let writer: &mut dyn RecordWriter = &mut journal;
        writer.write_record(test_record("e1")).unwrap();
        writer.flush().unwrap();
        writer.close().unwrap();
    }
}

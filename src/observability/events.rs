//! Observable journal lifecycle events
//!
//! Events are explicit and typed; the event name is the stable key in the
//! structured log line.

use std::fmt;

/// Observable events in the journal lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Startup & recovery
    /// Journal startup begins
    JournalOpen,
    /// Latest segment located and reopened
    JournalRecovered,
    /// Sequence generator reseeded from disk state
    SequenceAdvanced,
    /// Dedup cache rebuilt from persisted segments
    DedupWarmupComplete,

    // Segment lifecycle
    /// Current segment closed and next index opened
    SegmentRotate,
    /// Segment closed (EOF marker written)
    SegmentClosed,

    // Write path
    /// Update with no values dropped
    RecordDroppedEmptyUpdate,
    /// Record dropped because its event id was already seen
    RecordDroppedDuplicate,

    // Shutdown
    /// Journal closed cleanly
    JournalClose,
}

impl Event {
    /// Returns the stable event name
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::JournalOpen => "JOURNAL_OPEN",
            Event::JournalRecovered => "JOURNAL_RECOVERED",
            Event::SequenceAdvanced => "SEQUENCE_ADVANCED",
            Event::DedupWarmupComplete => "DEDUP_WARMUP_COMPLETE",
            Event::SegmentRotate => "SEGMENT_ROTATE",
            Event::SegmentClosed => "SEGMENT_CLOSED",
            Event::RecordDroppedEmptyUpdate => "RECORD_DROPPED_EMPTY_UPDATE",
            Event::RecordDroppedDuplicate => "RECORD_DROPPED_DUPLICATE",
            Event::JournalClose => "JOURNAL_CLOSE",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

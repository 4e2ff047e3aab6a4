//! Observability subsystem for the journal
//!
//! Provides structured logging (JSON) and typed lifecycle events.
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on journal execution
//! 3. No async or background threads
//! 4. Deterministic output
//!
//! # Usage
//!
//! ```ignore
//! use cdcjournal::observability::{Event, Logger};
//!
//! Logger::info(Event::SegmentRotate.as_str(), &[("segment_index", "3")]);
//! ```

mod events;
mod logger;

pub use events::Event;
pub use logger::{Logger, Severity};

/// Log a lifecycle event at INFO
pub fn log_event(event: Event) {
    Logger::info(event.as_str(), &[]);
}

/// Log a lifecycle event at INFO with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::info(event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event_does_not_panic() {
        log_event(Event::JournalOpen);
        log_event(Event::JournalClose);
    }

    #[test]
    fn test_log_event_with_fields_does_not_panic() {
        log_event_with_fields(Event::JournalRecovered, &[("segment_index", "0")]);
    }
}

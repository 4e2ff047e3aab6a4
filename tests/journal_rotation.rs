//! Segment Rotation and Format Tests
//!
//! The on-disk layout is the contract with the downstream importer:
//! gapless `segment.<N>.ndjson` names, one JSON object per line, a `\.`
//! marker terminating every closed segment, and benign tolerance of a
//! doubled marker.

use cdcjournal::journal::{
    segment_file_path, EventJournal, JournalConfig, Op, Record, StaticEventCounts, EOF_MARKER,
};
use tempfile::TempDir;

fn test_record(event_id: &str) -> Record {
    Record::new(Op::Create, "public", "orders")
        .with_key("id", Some("1".to_string()))
        .with_field("total", Some("10".to_string()))
        .with_event_id(event_id)
}

fn read_segment(data_dir: &std::path::Path, index: u64) -> String {
    std::fs::read_to_string(segment_file_path(&data_dir.join("queue"), index))
        .expect("Failed to read segment file")
}

/// Writing past the byte threshold creates a new segment file and the
/// prior segment ends with the terminal marker line.
#[test]
fn test_rotation_at_byte_threshold() {
    let temp_dir = TempDir::new().unwrap();
    let mut journal = EventJournal::open(
        JournalConfig::new(temp_dir.path()).with_segment_max_bytes(128),
        &StaticEventCounts::empty(),
    )
    .unwrap();

    let mut i = 0;
    while journal.current_segment_index() == 0 {
        journal.write_record(test_record(&format!("e{}", i))).unwrap();
        i += 1;
        assert!(i < 1000, "rotation never triggered");
    }
    journal.flush().unwrap();

    let old = read_segment(temp_dir.path(), 0);
    assert_eq!(old.lines().last().unwrap(), EOF_MARKER);
    assert!(segment_file_path(&temp_dir.path().join("queue"), 1).exists());
}

/// Rotation is driven by segment size, so indices stay gapless and
/// ascending.
#[test]
fn test_segment_indices_gapless() {
    let temp_dir = TempDir::new().unwrap();
    let mut journal = EventJournal::open(
        JournalConfig::new(temp_dir.path()).with_segment_max_bytes(128),
        &StaticEventCounts::empty(),
    )
    .unwrap();

    for i in 0..50 {
        journal.write_record(test_record(&format!("e{}", i))).unwrap();
    }
    journal.close().unwrap();

    let queue_dir = temp_dir.path().join("queue");
    let final_index = journal.current_segment_index();
    assert!(final_index > 0);
    for index in 0..=final_index {
        assert!(
            segment_file_path(&queue_dir, index).exists(),
            "segment {} missing",
            index
        );
    }
    assert!(!segment_file_path(&queue_dir, final_index + 1).exists());
}

/// Every rotated-out segment is terminated by exactly one marker and every
/// line before it is a parseable record.
#[test]
fn test_closed_segment_shape() {
    let temp_dir = TempDir::new().unwrap();
    let mut journal = EventJournal::open(
        JournalConfig::new(temp_dir.path()).with_segment_max_bytes(128),
        &StaticEventCounts::empty(),
    )
    .unwrap();

    for i in 0..20 {
        journal.write_record(test_record(&format!("e{}", i))).unwrap();
    }
    journal.close().unwrap();

    let final_index = journal.current_segment_index();
    for index in 0..=final_index {
        let content = read_segment(temp_dir.path(), index);
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(*lines.last().unwrap(), EOF_MARKER, "segment {}", index);
        for line in &lines[..lines.len() - 1] {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert!(value["vsn"].is_u64());
            assert!(value["op"].is_string());
        }
    }
}

/// Close-then-crash-then-reopen produces a doubled marker on the old
/// segment. That is tolerated by design: readers treat the second marker
/// as a no-op, and the journal never appends records after either marker.
#[test]
fn test_double_eof_marker_is_benign() {
    let temp_dir = TempDir::new().unwrap();

    {
        let mut journal = EventJournal::open(
            JournalConfig::new(temp_dir.path()),
            &StaticEventCounts::empty(),
        )
        .unwrap();
        journal.write_record(test_record("e1")).unwrap();
        journal.close().unwrap();
        // crash here, before any rotation
    }

    // Startup sees a closed latest segment and rotates, which closes the
    // old segment again.
    let mut journal = EventJournal::open(
        JournalConfig::new(temp_dir.path()),
        &StaticEventCounts::new(vec![(0, 1)]),
    )
    .unwrap();
    assert_eq!(journal.current_segment_index(), 1);

    let old = read_segment(temp_dir.path(), 0);
    let markers = old.lines().filter(|l| *l == EOF_MARKER).count();
    assert_eq!(markers, 2);

    // No record line after the first marker
    let first_marker = old.lines().position(|l| l == EOF_MARKER).unwrap();
    for line in old.lines().skip(first_marker + 1) {
        assert_eq!(line, EOF_MARKER);
    }

    // New writes land in the new segment with the continued sequence
    journal.write_record(test_record("e2")).unwrap();
    journal.flush().unwrap();
    let new = read_segment(temp_dir.path(), 1);
    let value: serde_json::Value = serde_json::from_str(new.lines().next().unwrap()).unwrap();
    assert_eq!(value["vsn"], 2);
}

/// An empty update never appears in any segment file and never consumes a
/// sequence number, even interleaved with accepted writes.
#[test]
fn test_empty_update_never_persisted() {
    let temp_dir = TempDir::new().unwrap();
    let mut journal = EventJournal::open(
        JournalConfig::new(temp_dir.path()),
        &StaticEventCounts::empty(),
    )
    .unwrap();

    journal.write_record(test_record("e1")).unwrap();
    journal
        .write_record(Record::new(Op::Update, "public", "orders"))
        .unwrap();
    journal.write_record(test_record("e2")).unwrap();
    journal.close().unwrap();

    let content = read_segment(temp_dir.path(), 0);
    let data_lines: Vec<&str> = content
        .lines()
        .filter(|l| !l.trim().is_empty() && *l != EOF_MARKER)
        .collect();
    assert_eq!(data_lines.len(), 2);

    let vsns: Vec<u64> = data_lines
        .iter()
        .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap()["vsn"]
            .as_u64()
            .unwrap())
        .collect();
    assert_eq!(vsns, vec![1, 2]);
}

/// An update that carries values is accepted like any other operation.
#[test]
fn test_update_with_values_accepted() {
    let temp_dir = TempDir::new().unwrap();
    let mut journal = EventJournal::open(
        JournalConfig::new(temp_dir.path()),
        &StaticEventCounts::empty(),
    )
    .unwrap();

    let record = Record::new(Op::Update, "public", "orders")
        .with_key("id", Some("1".to_string()))
        .with_field("total", Some("11".to_string()))
        .with_before_field("total", Some("10".to_string()))
        .with_event_id("e1");
    journal.write_record(record).unwrap();
    journal.flush().unwrap();

    let content = read_segment(temp_dir.path(), 0);
    let value: serde_json::Value = serde_json::from_str(content.lines().next().unwrap()).unwrap();
    assert_eq!(value["op"], "u");
    assert_eq!(value["fields"]["total"], "11");
    assert_eq!(value["before_fields"]["total"], "10");
}

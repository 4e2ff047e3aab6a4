//! Append-only queue segment files
//!
//! A segment owns exactly one `segment.<index>.ndjson` file. Records are
//! appended one JSON object per line; a closed segment ends with the
//! terminal `\.` marker line and is never written again — the journal
//! always advances to the next index.
//!
//! Closed-state and last-sequence-number are derived by reading the file,
//! not from in-memory flags, so both are correct immediately after a
//! process restart. This disk-derived state is the correctness anchor for
//! recovery; do not replace it with in-memory tracking.

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use super::errors::{JournalError, JournalResult};
use super::record::Record;

/// Terminal marker line written as the last line of a closed segment.
///
/// Two characters on the wire: a backslash and a dot. The downstream
/// importer advances to the next segment on the first marker it sees, so a
/// second consecutive marker is a benign no-op for readers.
pub const EOF_MARKER: &str = "\\.";

/// One append-only segment file holding a contiguous range of records.
pub struct QueueSegment {
    /// Zero-based segment index
    index: u64,
    /// Path to the segment file
    path: PathBuf,
    /// Buffered append handle; `None` once the segment has been closed
    writer: Option<BufWriter<File>>,
    /// Current file size in bytes, including buffered-but-unflushed lines
    byte_count: u64,
}

impl QueueSegment {
    /// Opens (or creates) the segment file at `path` for appending.
    ///
    /// The byte count is initialized from the existing file size, so a
    /// reopened segment resumes rotation accounting where it left off.
    pub fn open(index: u64, path: impl Into<PathBuf>) -> JournalResult<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                JournalError::setup_failed(
                    format!("Failed to open segment file: {}", path.display()),
                    e,
                )
            })?;

        let byte_count = file
            .metadata()
            .map_err(|e| {
                JournalError::setup_failed(
                    format!("Failed to read segment metadata: {}", path.display()),
                    e,
                )
            })?
            .len();

        Ok(Self {
            index,
            path,
            writer: Some(BufWriter::new(file)),
            byte_count,
        })
    }

    /// Returns the segment index.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Returns the path to the segment file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current size in bytes, used for the rotation-threshold comparison.
    pub fn byte_count(&self) -> u64 {
        self.byte_count
    }

    /// Appends one record as a single NDJSON line.
    ///
    /// No flush is performed; durability is the caller's decision via
    /// [`flush`](Self::flush) / [`sync`](Self::sync).
    ///
    /// # Errors
    ///
    /// Returns `CDC_SEGMENT_APPEND_FAILED` if the record cannot be
    /// serialized or written, or if the segment has already been closed.
    pub fn write(&mut self, record: &Record) -> JournalResult<()> {
        let writer = self.writer.as_mut().ok_or_else(|| {
            JournalError::append_failed(
                format!("Segment {} is closed", self.index),
                io::Error::new(io::ErrorKind::Other, "write after close"),
            )
        })?;

        let line = record.to_line().map_err(|e| {
            JournalError::append_failed(
                format!("Failed to serialize record at vsn {}", record.vsn),
                io::Error::new(io::ErrorKind::InvalidData, e),
            )
        })?;

        writer.write_all(line.as_bytes()).map_err(|e| {
            JournalError::append_failed(
                format!("Failed to append record at vsn {}", record.vsn),
                e,
            )
        })?;
        writer.write_all(b"\n").map_err(|e| {
            JournalError::append_failed(
                format!("Failed to append record at vsn {}", record.vsn),
                e,
            )
        })?;

        self.byte_count += line.len() as u64 + 1;
        Ok(())
    }

    /// Forces buffered writes out to the operating system.
    pub fn flush(&mut self) -> JournalResult<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush().map_err(|e| {
                JournalError::sync_failed(
                    format!("Failed to flush segment {}", self.index),
                    e,
                )
            })?;
        }
        Ok(())
    }

    /// Forces durability to stable storage.
    pub fn sync(&mut self) -> JournalResult<()> {
        self.flush()?;
        if let Some(writer) = self.writer.as_ref() {
            writer.get_ref().sync_all().map_err(|e| {
                JournalError::sync_failed(
                    format!("fsync failed on segment {}", self.index),
                    e,
                )
            })?;
        }
        Ok(())
    }

    /// Closes the segment: appends the terminal marker line, flushes,
    /// fsyncs, and releases the file handle.
    ///
    /// The marker is appended unconditionally. Closing a segment that was
    /// already closed by a previous process produces a second consecutive
    /// marker, which readers treat as a no-op.
    pub fn close(&mut self) -> JournalResult<()> {
        let Some(mut writer) = self.writer.take() else {
            return Ok(());
        };

        writer
            .write_all(EOF_MARKER.as_bytes())
            .and_then(|_| writer.write_all(b"\n"))
            .map_err(|e| {
                JournalError::sync_failed(
                    format!("Failed to write EOF marker to segment {}", self.index),
                    e,
                )
            })?;
        writer.flush().map_err(|e| {
            JournalError::sync_failed(
                format!("Failed to flush segment {} on close", self.index),
                e,
            )
        })?;
        writer.get_ref().sync_all().map_err(|e| {
            JournalError::sync_failed(
                format!("fsync failed closing segment {}", self.index),
                e,
            )
        })?;

        self.byte_count += EOF_MARKER.len() as u64 + 1;
        Ok(())
    }

    /// Reports whether the terminal marker has been written, by inspecting
    /// the persisted file.
    ///
    /// Intended for startup recovery, before any writes through this
    /// handle; buffered-but-unflushed lines are not visible to it.
    pub fn is_closed(&self) -> JournalResult<bool> {
        let mut last_line: Option<String> = None;
        self.scan_lines(|line| {
            last_line = Some(line.to_string());
        })?;
        Ok(last_line.as_deref() == Some(EOF_MARKER))
    }

    /// Returns the highest sequence number persisted in this segment, or
    /// `None` if it contains no data records.
    ///
    /// Tolerates a trailing EOF marker, blank lines, and unparseable lines
    /// (skipped).
    pub fn last_record_vsn(&self) -> JournalResult<Option<u64>> {
        let mut last_vsn: Option<u64> = None;
        self.scan_lines(|line| {
            if line == EOF_MARKER {
                return;
            }
            if let Ok(value) = serde_json::from_str::<serde_json::Value>(line) {
                if let Some(vsn) = value.get("vsn").and_then(|v| v.as_u64()) {
                    last_vsn = Some(last_vsn.map_or(vsn, |prev| prev.max(vsn)));
                }
            }
        })?;
        Ok(last_vsn)
    }

    /// Sequential forward scan over the persisted non-blank lines.
    fn scan_lines(&self, mut visit: impl FnMut(&str)) -> JournalResult<()> {
        let file = File::open(&self.path).map_err(|e| {
            JournalError::recovery_io(
                format!("Failed to open segment for reading: {}", self.path.display()),
                e,
            )
        })?;
        let reader = BufReader::new(file);
        for line in reader.lines() {
            let line = line.map_err(|e| {
                JournalError::recovery_io(
                    format!("Failed to read segment line: {}", self.path.display()),
                    e,
                )
            })?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            visit(trimmed);
        }
        Ok(())
    }
}

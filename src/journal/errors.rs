//! Journal error types
//!
//! Error codes:
//! - CDC_QUEUE_SETUP_FAILED (FATAL severity)
//! - CDC_SEGMENT_APPEND_FAILED (ERROR severity)
//! - CDC_SEGMENT_SYNC_FAILED (FATAL severity)
//! - CDC_RECOVERY_FAILED (FATAL severity)
//! - CDC_WARMUP_FAILED (FATAL severity)

use std::fmt;
use std::io;

/// Severity levels for journal errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The current operation fails, the owning process decides what to do
    Error,
    /// The journal cannot continue; the owning process must terminate
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Journal-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalErrorCode {
    /// Queue directory could not be created or read
    CdcQueueSetupFailed,
    /// Appending a record to the current segment failed
    CdcSegmentAppendFailed,
    /// Flushing, fsyncing, or closing a segment failed
    CdcSegmentSyncFailed,
    /// Startup recovery scan or segment inspection failed
    CdcRecoveryFailed,
    /// Dedup cache warm-up could not read a segment or the status registry
    CdcWarmupFailed,
}

impl JournalErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            JournalErrorCode::CdcQueueSetupFailed => "CDC_QUEUE_SETUP_FAILED",
            JournalErrorCode::CdcSegmentAppendFailed => "CDC_SEGMENT_APPEND_FAILED",
            JournalErrorCode::CdcSegmentSyncFailed => "CDC_SEGMENT_SYNC_FAILED",
            JournalErrorCode::CdcRecoveryFailed => "CDC_RECOVERY_FAILED",
            JournalErrorCode::CdcWarmupFailed => "CDC_WARMUP_FAILED",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            JournalErrorCode::CdcSegmentAppendFailed => Severity::Error,
            JournalErrorCode::CdcQueueSetupFailed
            | JournalErrorCode::CdcSegmentSyncFailed
            | JournalErrorCode::CdcRecoveryFailed
            | JournalErrorCode::CdcWarmupFailed => Severity::Fatal,
        }
    }
}

impl fmt::Display for JournalErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Journal error type with full context
#[derive(Debug)]
pub struct JournalError {
    /// Error code
    code: JournalErrorCode,
    /// Human-readable message
    message: String,
    /// Optional details about the error context
    details: Option<String>,
    /// Underlying IO error if applicable
    source: Option<io::Error>,
}

impl JournalError {
    /// Create a new queue setup error
    pub fn setup_failed(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            code: JournalErrorCode::CdcQueueSetupFailed,
            message: message.into(),
            details: None,
            source: Some(source),
        }
    }

    /// Create a new segment append error
    pub fn append_failed(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            code: JournalErrorCode::CdcSegmentAppendFailed,
            message: message.into(),
            details: None,
            source: Some(source),
        }
    }

    /// Create a new segment sync/close error
    pub fn sync_failed(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            code: JournalErrorCode::CdcSegmentSyncFailed,
            message: message.into(),
            details: None,
            source: Some(source),
        }
    }

    /// Create a new recovery error
    pub fn recovery_failed(message: impl Into<String>) -> Self {
        Self {
            code: JournalErrorCode::CdcRecoveryFailed,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    /// Create a recovery error with an IO source
    pub fn recovery_io(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            code: JournalErrorCode::CdcRecoveryFailed,
            message: message.into(),
            details: None,
            source: Some(source),
        }
    }

    /// Create a recovery error with segment index context
    pub fn recovery_at_segment(index: u64, reason: impl Into<String>) -> Self {
        Self {
            code: JournalErrorCode::CdcRecoveryFailed,
            message: reason.into(),
            details: Some(format!("segment_index: {}", index)),
            source: None,
        }
    }

    /// Create a new warm-up error
    pub fn warmup_failed(message: impl Into<String>) -> Self {
        Self {
            code: JournalErrorCode::CdcWarmupFailed,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    /// Create a warm-up error with an IO source
    pub fn warmup_io(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            code: JournalErrorCode::CdcWarmupFailed,
            message: message.into(),
            details: None,
            source: Some(source),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> JournalErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns additional error details
    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    /// Returns whether this error is fatal (requires process termination)
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for JournalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for JournalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for journal operations
pub type JournalResult<T> = Result<T, JournalError>;

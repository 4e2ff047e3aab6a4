//! Change records and their line-delimited JSON encoding
//!
//! The on-disk encoding is part of the contract with the downstream
//! importer and must not change shape:
//! - one JSON object per line
//! - field names: `vsn`, `op`, `schema_name`, `table_name`, `key`,
//!   `fields`, `before_fields`, `event_id`
//! - `op` is a one-letter debezium-style kind: c / r / u / d
//!
//! A record is constructed by the upstream capture collaborator, mutated
//! exactly once (sequence number assignment) by the journal, and immutable
//! after that.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Change operation kinds, encoded as debezium-style one-letter strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    /// Row created
    #[serde(rename = "c")]
    Create,
    /// Row read during the initial snapshot phase
    #[serde(rename = "r")]
    Read,
    /// Row updated
    #[serde(rename = "u")]
    Update,
    /// Row deleted
    #[serde(rename = "d")]
    Delete,
}

impl Op {
    /// Returns the one-letter wire encoding
    pub fn as_str(&self) -> &'static str {
        match self {
            Op::Create => "c",
            Op::Read => "r",
            Op::Update => "u",
            Op::Delete => "d",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Column values keyed by column name. A `None` value is a SQL NULL.
pub type ColumnValues = BTreeMap<String, Option<String>>;

/// One change event flowing through the journal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Journal-assigned sequence number. Zero until assigned.
    pub vsn: u64,
    /// Operation kind
    pub op: Op,
    /// Source schema name
    pub schema_name: String,
    /// Source table name
    pub table_name: String,
    /// Primary key columns
    pub key: ColumnValues,
    /// Post-operation column values. Empty for deletes; an update with an
    /// empty value set carries no information and never reaches storage.
    pub fields: ColumnValues,
    /// Pre-operation column values, carried for the importer's conflict
    /// detection. The journal never inspects this.
    pub before_fields: ColumnValues,
    /// Externally-assigned event identifier used for deduplication.
    pub event_id: Option<String>,
}

impl Record {
    /// Create a record with no values and no event identifier.
    pub fn new(op: Op, schema_name: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            vsn: 0,
            op,
            schema_name: schema_name.into(),
            table_name: table_name.into(),
            key: ColumnValues::new(),
            fields: ColumnValues::new(),
            before_fields: ColumnValues::new(),
            event_id: None,
        }
    }

    /// Add a primary key column.
    pub fn with_key(mut self, column: impl Into<String>, value: Option<String>) -> Self {
        self.key.insert(column.into(), value);
        self
    }

    /// Add a post-operation column value.
    pub fn with_field(mut self, column: impl Into<String>, value: Option<String>) -> Self {
        self.fields.insert(column.into(), value);
        self
    }

    /// Add a pre-operation column value.
    pub fn with_before_field(mut self, column: impl Into<String>, value: Option<String>) -> Self {
        self.before_fields.insert(column.into(), value);
        self
    }

    /// Set the event identifier.
    pub fn with_event_id(mut self, event_id: impl Into<String>) -> Self {
        self.event_id = Some(event_id.into());
        self
    }

    /// Assign the journal sequence number. Called exactly once, by the
    /// journal, immediately before the record is appended.
    pub fn assign_vsn(&mut self, vsn: u64) {
        self.vsn = vsn;
    }

    /// An update with no values to apply carries no information.
    pub fn is_empty_update(&self) -> bool {
        self.op == Op::Update && self.fields.is_empty()
    }

    /// Serialize to one NDJSON line (without the trailing newline).
    pub fn to_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Short human-readable form for log fields.
    pub fn describe(&self) -> String {
        format!(
            "{}.{} op={} event_id={}",
            self.schema_name,
            self.table_name,
            self.op,
            self.event_id.as_deref().unwrap_or("-")
        )
    }
}

/// Extract the event identifier from a persisted record line.
///
/// Tolerant by design: the dedup cache is an optimization, not the source
/// of truth, so an unparseable line or a missing/null `event_id` field
/// yields `None` rather than an error.
pub fn extract_event_id(line: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(line).ok()?;
    match value.get("event_id") {
        Some(serde_json::Value::String(s)) if !s.is_empty() && s != "null" => Some(s.clone()),
        _ => None,
    }
}

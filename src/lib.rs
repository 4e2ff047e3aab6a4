//! cdcjournal - durable event journal for CDC export pipelines
//!
//! The journal receives a continuous stream of change records from an
//! upstream capture process and persists them, in order, as a sequence of
//! size-bounded, append-only segment files that a downstream importer
//! consumes independently and at its own pace.
//!
//! # Design Principles
//!
//! - Durability over throughput
//! - Determinism over optimization
//! - Explicit failure over silent recovery
//! - Disk-derived recovery state over in-memory bookkeeping

pub mod journal;
pub mod observability;

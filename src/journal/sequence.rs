//! Sequence number generation
//!
//! Every accepted record receives a strictly increasing, gap-free sequence
//! number (the vsn). The generator is pure in-memory state: it is re-seeded
//! exactly once during startup recovery and only ever moves forward after
//! that.

/// Generator for journal sequence numbers.
#[derive(Debug)]
pub struct SequenceNumberGenerator {
    /// The value the next call to `next` will return
    next_value: u64,
}

impl SequenceNumberGenerator {
    /// Create a generator whose first returned value is `start`.
    pub fn new(start: u64) -> Self {
        Self { next_value: start }
    }

    /// Return the current value and advance.
    pub fn next(&mut self) -> u64 {
        let value = self.next_value;
        self.next_value += 1;
        value
    }

    /// Return the value the next call to `next` will produce.
    pub fn peek(&self) -> u64 {
        self.next_value
    }

    /// Reseed the generator during recovery. Callers must only move the
    /// value forward; the generator itself does not enforce this.
    pub fn advance_to(&mut self, value: u64) {
        self.next_value = value;
    }
}

//! Connection id generation.

use std::sync::atomic::{AtomicU64, Ordering};

/// Process-local identifier for one accepted connection.
pub type ConnId = u64;

/// Mints unique, monotonically increasing connection ids.
pub struct ConnIdGenerator {
    counter: AtomicU64,
}

impl ConnIdGenerator {
    /// Create a new generator. Ids start at 1; 0 never names a connection.
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(1),
        }
    }

    /// Mint the next id.
    pub fn next(&self) -> ConnId {
        self.counter.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for ConnIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

//! Clock abstraction for cache staleness decisions.
//!
//! Production code uses [`SystemClock`]; tests inject [`ManualClock`] so TTL
//! boundaries can be crossed without sleeping.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Milliseconds since the Unix epoch.
pub type Timestamp = u64;

/// Source of timestamps for staleness decisions.
///
/// Implementations only need millisecond precision and monotonic-enough
/// behavior over the lifetime of a cache entry.
pub trait TimeSource: Send {
    /// Current timestamp in milliseconds.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time from the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn now(&self) -> Timestamp {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as Timestamp
    }
}

/// Adjustable clock for tests; clones share the same instant.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    millis: Arc<AtomicU64>,
}

impl ManualClock {
    /// Clock starting at the given timestamp.
    pub fn new(timestamp: Timestamp) -> Self {
        Self { millis: Arc::new(AtomicU64::new(timestamp)) }
    }

    /// Move the clock forward.
    pub fn advance(&self, millis: u64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }

    /// Jump to an absolute timestamp.
    pub fn set(&self, timestamp: Timestamp) {
        self.millis.store(timestamp, Ordering::SeqCst);
    }
}

impl TimeSource for ManualClock {
    fn now(&self) -> Timestamp {
        self.millis.load(Ordering::SeqCst)
    }
}

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Milliseconds as reported by a [`Clock`]
pub type Timestamp = u64;

/// A source of millisecond timestamps.
///
/// Trackers only ever subtract timestamps taken from the same clock, so the
/// epoch is irrelevant. Clocks are expected to be non-decreasing, but a clock
/// that stands still (or steps backwards) never makes a tracker panic:
/// negative spans saturate to zero.
pub trait Clock: Send + Sync + Debug {
    /// Current time in milliseconds
    fn now(&self) -> Timestamp;
}

/// Real time, milliseconds since the clock was created.
///
/// Backed by [`Instant`], so adjusting the system wall clock never moves it
/// backwards.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Create a clock reading zero now
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        self.origin.elapsed().as_millis() as Timestamp
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same time, so a test can keep one handle and give
/// another to the tracker.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    /// Create a clock reading `start`
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start)),
        }
    }

    /// Jump to an absolute time
    pub fn set(&self, now: Timestamp) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Move forward by `millis` and return the new time, wrapping on overflow
    pub fn advance(&self, millis: u64) -> Timestamp {
        self.now
            .fetch_add(millis, Ordering::SeqCst)
            .wrapping_add(millis)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}

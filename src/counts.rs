use crate::clock::Timestamp;
use crate::error::{Result, StreamError};

/// A rate in milliseconds per item.
///
/// `count` is the number of samples the value was derived from. An empty
/// rate has `count == 0` and a NaN `value`, so check `count` (or
/// [`Rate::ms_per_item`]) before trusting `value`.
///
/// Two empty rates compare equal even though NaN never equals itself.
#[derive(Debug, Clone, Copy)]
pub struct Rate {
    pub count: usize,
    pub value: f64,
}

impl Rate {
    /// The rate reported when there is nothing to measure
    pub const EMPTY: Rate = Rate {
        count: 0,
        value: f64::NAN,
    };

    /// The empty rate
    pub fn empty() -> Self {
        Self::EMPTY
    }

    /// Spread `span_ms` evenly over `count` items, rounded to whole milliseconds
    pub fn from_span(span_ms: u64, count: usize) -> Self {
        if count == 0 {
            return Self::EMPTY;
        }
        Self {
            count,
            value: (span_ms as f64 / count as f64).round(),
        }
    }

    /// The rate of a single item that took `elapsed_ms`
    pub fn single(elapsed_ms: u64) -> Self {
        Self::from_span(elapsed_ms, 1)
    }

    /// Whether no samples contributed to this rate
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The value, if any samples contributed to it
    pub fn ms_per_item(&self) -> Option<f64> {
        (!self.is_empty()).then_some(self.value)
    }
}

impl Default for Rate {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for Rate {
    fn eq(&self, other: &Self) -> bool {
        if self.is_empty() || other.is_empty() {
            return self.is_empty() && other.is_empty();
        }
        self.count == other.count && self.value.to_bits() == other.value.to_bits()
    }
}

/// Item counts for one stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    /// Started but not yet complete
    pub in_progress: usize,
    /// Ever started
    pub total: usize,
    /// Ever completed
    pub complete: usize,
}

/// Counts plus the two timestamps the cumulative rate needs.
///
/// Embedded by value in every tracker; always mutated under the owning
/// tracker's lock.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Activity {
    counts: Counts,
    first_start: Option<Timestamp>,
    last_complete: Option<Timestamp>,
}

impl Activity {
    /// Record an item starting at `now`
    pub(crate) fn start(&mut self, now: Timestamp) {
        self.first_start.get_or_insert(now);
        self.counts.total += 1;
        self.counts.in_progress += 1;
    }

    /// Record an item completing at `now`.
    ///
    /// Leaves everything untouched when nothing is in progress.
    pub(crate) fn finish(&mut self, now: Timestamp) -> Result<()> {
        if self.counts.in_progress == 0 {
            return Err(StreamError::NothingInProgress);
        }
        self.last_complete = Some(now);
        self.counts.in_progress -= 1;
        self.counts.complete += 1;
        Ok(())
    }

    pub(crate) fn counts(&self) -> Counts {
        self.counts
    }

    /// Mean time per completed item from the first start to the latest completion
    pub(crate) fn rate(&self) -> Rate {
        match (self.first_start, self.last_complete) {
            (Some(first), Some(last)) => {
                Rate::from_span(last.saturating_sub(first), self.counts.complete)
            }
            _ => Rate::EMPTY,
        }
    }

    pub(crate) fn snapshot(&self) -> StreamSnapshot {
        StreamSnapshot {
            in_progress: self.counts.in_progress,
            total: self.counts.total,
            complete: self.counts.complete,
            rate: self.rate(),
        }
    }
}

/// A consistent view of a tracker at one point in time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamSnapshot {
    pub in_progress: usize,
    pub total: usize,
    pub complete: usize,
    pub rate: Rate,
}

impl StreamSnapshot {
    /// The counts without the rate
    pub fn counts(&self) -> Counts {
        Counts {
            in_progress: self.in_progress,
            total: self.total,
            complete: self.complete,
        }
    }
}

/// Read access shared by every tracker
pub trait StreamInfo {
    /// Read all counts and the cumulative rate under a single lock
    fn snapshot(&self) -> StreamSnapshot;

    /// Items started but not yet complete
    fn in_progress(&self) -> usize {
        self.snapshot().in_progress
    }

    /// Items ever started
    fn total(&self) -> usize {
        self.snapshot().total
    }

    /// Items ever completed
    fn complete(&self) -> usize {
        self.snapshot().complete
    }

    /// Cumulative milliseconds per item since the first item started
    fn rate(&self) -> Rate {
        self.snapshot().rate
    }
}

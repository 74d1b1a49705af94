use crate::clock::{Clock, SystemClock};
use crate::counter::StreamCounter;
use crate::progress::ProgressNotifier;
use crate::timer::StreamItemsTimer;
use std::sync::Arc;

/// Builder for configuring trackers
///
/// Defaults to the system clock and no progress callback. One builder can be
/// cloned to give several trackers the same clock and callback.
#[derive(Debug, Clone, Default)]
pub struct TrackerBuilder {
    clock: Option<Arc<dyn Clock>>,
    notifier: ProgressNotifier,
}

impl TrackerBuilder {
    /// Create a new tracker builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Read time from `clock` instead of the system clock
    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// Read time from a clock already shared elsewhere
    pub fn with_shared_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Call `callback` after every change to the tracker's counts
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.notifier = ProgressNotifier::new(callback);
        self
    }

    /// Use an existing notifier
    pub fn with_notifier(mut self, notifier: ProgressNotifier) -> Self {
        self.notifier = notifier;
        self
    }

    /// Build a counter
    pub fn build_counter(self) -> StreamCounter {
        let (clock, notifier) = self.into_parts();
        StreamCounter::from_parts(clock, notifier)
    }

    /// Build an item timer
    pub fn build_timer(self) -> StreamItemsTimer {
        let (clock, notifier) = self.into_parts();
        StreamItemsTimer::from_parts(clock, notifier)
    }

    fn into_parts(self) -> (Arc<dyn Clock>, ProgressNotifier) {
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock::new()));
        (clock, self.notifier)
    }
}

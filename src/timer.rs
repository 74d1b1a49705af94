use crate::clock::{Clock, SystemClock, Timestamp};
use crate::counts::{Activity, Rate, StreamInfo, StreamSnapshot};
use crate::progress::ProgressNotifier;
use parking_lot::Mutex;
use std::sync::Arc;

/// Timing record for one item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedItem {
    pub start_time: Timestamp,
    pub end_time: Option<Timestamp>,
    /// Milliseconds between start and end
    pub elapsed: Option<u64>,
}

impl TimedItem {
    fn started(start_time: Timestamp) -> Self {
        Self {
            start_time,
            end_time: None,
            elapsed: None,
        }
    }

    /// Whether the item has been stopped
    pub fn is_complete(&self) -> bool {
        self.end_time.is_some() && self.elapsed.is_some()
    }
}

#[derive(Debug, Default)]
struct TimerState {
    activity: Activity,
    /// Every item ever started, in start order. Indexed by item id.
    items: Vec<TimedItem>,
    /// Ids of stopped items, in completion order
    completed: Vec<usize>,
}

impl TimerState {
    /// The last `window` completed items, oldest completion first
    fn sample(&self, window: Option<usize>) -> impl Iterator<Item = &TimedItem> + '_ {
        let skip = window.map_or(0, |size| self.completed.len().saturating_sub(size));
        self.completed[skip..].iter().map(|&id| &self.items[id])
    }

    fn average_rate(&self, window: Option<usize>) -> Rate {
        let (sum, count) = self
            .sample(window)
            .filter_map(|item| item.elapsed)
            .fold((0u64, 0usize), |(sum, count), elapsed| {
                (sum + elapsed, count + 1)
            });
        Rate::from_span(sum, count)
    }

    fn overall_rate(&self, window: Option<usize>) -> Rate {
        let mut sample = self.sample(window);
        let Some(first) = sample.next() else {
            return Rate::EMPTY;
        };
        let (last, count) = sample.fold((first, 1usize), |(_, count), item| (item, count + 1));
        let span = last
            .end_time
            .unwrap_or(last.start_time)
            .saturating_sub(first.start_time);
        Rate::from_span(span, count)
    }
}

#[derive(Debug)]
struct Shared {
    state: Mutex<TimerState>,
    clock: Arc<dyn Clock>,
    notifier: ProgressNotifier,
}

/// Times individual items through one stage of a pipeline.
///
/// Every started item is kept for the life of the timer, so windowed rates
/// can be computed over the most recently completed items. Clones share the
/// same history.
#[derive(Debug, Clone)]
pub struct StreamItemsTimer {
    shared: Arc<Shared>,
}

impl StreamItemsTimer {
    /// A timer on the system clock with no progress callback
    pub fn new() -> Self {
        Self::from_parts(Arc::new(SystemClock::new()), ProgressNotifier::noop())
    }

    /// A timer reading time from `clock`
    pub fn with_clock<C: Clock + 'static>(clock: C) -> Self {
        Self::from_parts(Arc::new(clock), ProgressNotifier::noop())
    }

    pub(crate) fn from_parts(clock: Arc<dyn Clock>, notifier: ProgressNotifier) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(TimerState::default()),
                clock,
                notifier,
            }),
        }
    }

    /// Start timing a new item.
    ///
    /// The returned handle completes exactly this item when stopped, even if
    /// other items started in the same millisecond.
    pub fn start_item_timer(&self) -> ItemTimer {
        let (id, started_at) = {
            let mut state = self.shared.state.lock();
            let now = self.shared.clock.now();
            state.activity.start(now);
            let id = state.items.len();
            state.items.push(TimedItem::started(now));
            (id, now)
        };
        tracing::trace!(item = id, started_at, "item timer started");
        self.shared.notifier.notify();

        ItemTimer {
            id,
            started_at,
            timer: self.clone(),
        }
    }

    fn stop_item(&self, id: usize) -> Rate {
        let (elapsed, finished) = {
            let mut state = self.shared.state.lock();
            let now = self.shared.clock.now();
            let item = &mut state.items[id];
            debug_assert!(!item.is_complete(), "item {id} stopped twice");
            let elapsed = now.saturating_sub(item.start_time);
            item.end_time = Some(now);
            item.elapsed = Some(elapsed);
            state.completed.push(id);
            (elapsed, state.activity.finish(now))
        };

        if let Err(err) = finished {
            tracing::warn!(item = id, error = %err, "item stopped with counts out of step");
        }
        tracing::trace!(item = id, elapsed, "item timer stopped");
        self.shared.notifier.notify();
        Rate::single(elapsed)
    }

    /// Mean duration of the last `window` completed items (all when `None`)
    pub fn average_rate(&self, window: Option<usize>) -> Rate {
        self.shared.state.lock().average_rate(window)
    }

    /// Milliseconds per item across the wall-clock span of the last `window`
    /// completed items (all when `None`).
    ///
    /// Unlike [`average_rate`](Self::average_rate), overlapping items share
    /// the span, so this reflects throughput under concurrency.
    pub fn overall_rate(&self, window: Option<usize>) -> Rate {
        self.shared.state.lock().overall_rate(window)
    }

    /// Individual rates of the last `window` completed items, oldest completion first
    pub fn rates(&self, window: Option<usize>) -> Vec<Rate> {
        self.shared
            .state
            .lock()
            .sample(window)
            .filter_map(|item| item.elapsed)
            .map(Rate::single)
            .collect()
    }

    /// Copy of every timing record, in start order
    pub fn items(&self) -> Vec<TimedItem> {
        self.shared.state.lock().items.clone()
    }
}

impl Default for StreamItemsTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamInfo for StreamItemsTimer {
    fn snapshot(&self) -> StreamSnapshot {
        self.shared.state.lock().activity.snapshot()
    }
}

/// Handle for one item being timed.
///
/// Dropping the handle without calling [`stop`](Self::stop) leaves the item in
/// progress for good.
#[derive(Debug)]
#[must_use = "an item timer that is never stopped stays in progress"]
pub struct ItemTimer {
    id: usize,
    started_at: Timestamp,
    timer: StreamItemsTimer,
}

impl ItemTimer {
    /// Position of the item in the timer's start order
    pub fn id(&self) -> usize {
        self.id
    }

    /// When the item started
    pub fn started_at(&self) -> Timestamp {
        self.started_at
    }

    /// Complete the item and return its own rate
    pub fn stop(self) -> Rate {
        self.timer.stop_item(self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn timer() -> (StreamItemsTimer, ManualClock) {
        let clock = ManualClock::new(0);
        (StreamItemsTimer::with_clock(clock.clone()), clock)
    }

    /// Run items back to back, the nth taking `durations[n]` ms
    fn run_sequential(timer: &StreamItemsTimer, clock: &ManualClock, durations: &[u64]) {
        for &duration in durations {
            let item = timer.start_item_timer();
            clock.advance(duration);
            item.stop();
        }
    }

    #[test]
    fn test_rates_initially_empty() {
        let (timer, _) = timer();
        assert!(timer.average_rate(None).is_empty());
        assert!(timer.average_rate(None).value.is_nan());
        assert!(timer.overall_rate(Some(5)).is_empty());
        assert!(timer.rates(None).is_empty());
    }

    #[test]
    fn test_rates_empty_while_first_item_runs() {
        let (timer, clock) = timer();
        let _item = timer.start_item_timer();
        clock.advance(500);

        assert_eq!(timer.in_progress(), 1);
        assert_eq!(timer.average_rate(None).count, 0);
        assert_eq!(timer.overall_rate(None).count, 0);
        assert!(timer.rates(Some(5)).is_empty());
    }

    #[test]
    fn test_stop_returns_item_rate() {
        let (timer, clock) = timer();
        let item = timer.start_item_timer();
        clock.advance(750);
        assert_eq!(item.stop(), Rate { count: 1, value: 750.0 });
        assert_eq!(timer.rates(None), vec![Rate { count: 1, value: 750.0 }]);
    }

    #[test]
    fn test_average_rate_tracks_every_cycle() {
        let (timer, clock) = timer();
        for cycle in 1..=4 {
            run_sequential(&timer, &clock, &[1000]);

            let average = timer.average_rate(None);
            assert_eq!(average.count, cycle);
            assert_eq!(average.value, 1000.0);
            assert_eq!(timer.average_rate(Some(5)).count, cycle);
        }
    }

    #[test]
    fn test_window_limits_samples() {
        let (timer, clock) = timer();
        run_sequential(&timer, &clock, &[100, 200, 300, 400, 500, 600, 700, 800]);

        let average = timer.average_rate(Some(5));
        assert_eq!(average, Rate { count: 5, value: 600.0 });
        assert_eq!(timer.average_rate(None), Rate { count: 8, value: 450.0 });

        let overall = timer.overall_rate(Some(5));
        assert_eq!(overall, Rate { count: 5, value: 600.0 });
        assert_eq!(timer.overall_rate(None), Rate { count: 8, value: 450.0 });

        let rates: Vec<f64> = timer.rates(Some(5)).iter().map(|r| r.value).collect();
        assert_eq!(rates, vec![400.0, 500.0, 600.0, 700.0, 800.0]);
    }

    #[test]
    fn test_window_larger_than_history() {
        let (timer, clock) = timer();
        run_sequential(&timer, &clock, &[100, 300]);
        assert_eq!(timer.average_rate(Some(5)), Rate { count: 2, value: 200.0 });
        assert_eq!(timer.rates(Some(5)).len(), 2);
    }

    #[test]
    fn test_zero_window_is_empty() {
        let (timer, clock) = timer();
        run_sequential(&timer, &clock, &[100, 300]);
        assert!(timer.average_rate(Some(0)).is_empty());
        assert!(timer.overall_rate(Some(0)).is_empty());
    }

    #[test]
    fn test_overlapping_items_diverge() {
        let (timer, clock) = timer();
        let first = timer.start_item_timer();
        clock.set(100);
        let second = timer.start_item_timer();
        clock.set(1000);
        first.stop();
        second.stop();

        assert_eq!(timer.average_rate(None), Rate { count: 2, value: 950.0 });
        assert_eq!(timer.overall_rate(None), Rate { count: 2, value: 500.0 });
    }

    #[test]
    fn test_window_follows_completion_order() {
        let (timer, clock) = timer();
        let slow = timer.start_item_timer();
        clock.set(100);
        let fast = timer.start_item_timer();
        clock.set(200);
        fast.stop();
        clock.set(1000);
        slow.stop();

        // The most recent completion is the slow item
        assert_eq!(timer.average_rate(Some(1)), Rate { count: 1, value: 1000.0 });
        assert_eq!(
            timer.rates(None),
            vec![Rate { count: 1, value: 100.0 }, Rate { count: 1, value: 1000.0 }]
        );
    }

    #[test]
    fn test_same_millisecond_starts_stop_the_right_item() {
        let (timer, clock) = timer();
        let first = timer.start_item_timer();
        let second = timer.start_item_timer();
        assert_eq!(first.started_at(), second.started_at());
        assert_ne!(first.id(), second.id());

        clock.set(300);
        second.stop();

        let items = timer.items();
        assert!(!items[0].is_complete());
        assert_eq!(items[1].end_time, Some(300));
        assert_eq!(items[1].elapsed, Some(300));

        clock.set(500);
        first.stop();
        assert_eq!(timer.items()[0].elapsed, Some(500));
    }

    #[test]
    fn test_unstopped_item_stays_in_progress() {
        let (timer, clock) = timer();
        drop(timer.start_item_timer());
        run_sequential(&timer, &clock, &[200]);

        assert_eq!(timer.in_progress(), 1);
        assert_eq!(timer.total(), 2);
        assert_eq!(timer.complete(), 1);
        assert_eq!(timer.average_rate(None).count, 1);
    }

    #[test]
    fn test_cumulative_rate() {
        let (timer, clock) = timer();
        run_sequential(&timer, &clock, &[1000, 1000]);
        assert_eq!(timer.rate(), Rate { count: 2, value: 1000.0 });
    }

    #[test]
    fn test_constant_clock() {
        let (timer, _) = timer();
        timer.start_item_timer().stop();
        timer.start_item_timer().stop();
        assert_eq!(timer.average_rate(None), Rate { count: 2, value: 0.0 });
        assert_eq!(timer.overall_rate(None), Rate { count: 2, value: 0.0 });
    }

    #[test]
    fn test_progress_callback() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        let notifier = ProgressNotifier::new(move || {
            calls_clone.fetch_add(1, Ordering::Relaxed);
        });
        let timer = StreamItemsTimer::from_parts(Arc::new(ManualClock::new(0)), notifier);
        assert_eq!(calls.load(Ordering::Relaxed), 0);

        let item = timer.start_item_timer();
        assert_eq!(calls.load(Ordering::Relaxed), 1);

        item.stop();
        assert_eq!(calls.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_queries_are_repeatable() {
        let (timer, clock) = timer();
        assert_eq!(timer.average_rate(None), timer.average_rate(None));
        assert_eq!(timer.overall_rate(Some(5)), timer.overall_rate(Some(5)));
        assert_eq!(timer.snapshot(), timer.snapshot());

        run_sequential(&timer, &clock, &[120, 340, 560]);
        assert_eq!(timer.average_rate(Some(2)), timer.average_rate(Some(2)));
        assert_eq!(timer.overall_rate(None), timer.overall_rate(None));
        assert_eq!(timer.snapshot(), timer.snapshot());
    }
}

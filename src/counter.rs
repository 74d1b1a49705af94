use crate::clock::{Clock, SystemClock};
use crate::counts::{Activity, StreamInfo, StreamSnapshot};
use crate::error::Result;
use crate::progress::ProgressNotifier;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug)]
struct Shared {
    activity: Mutex<Activity>,
    clock: Arc<dyn Clock>,
    notifier: ProgressNotifier,
}

/// Counts items through one stage of a pipeline.
///
/// Keeps no per-item history: only the counts, when the first item started
/// and when the latest item completed. Clones share the same counts.
#[derive(Debug, Clone)]
pub struct StreamCounter {
    shared: Arc<Shared>,
}

impl StreamCounter {
    /// A counter on the system clock with no progress callback
    pub fn new() -> Self {
        Self::from_parts(Arc::new(SystemClock::new()), ProgressNotifier::noop())
    }

    /// A counter reading time from `clock`
    pub fn with_clock<C: Clock + 'static>(clock: C) -> Self {
        Self::from_parts(Arc::new(clock), ProgressNotifier::noop())
    }

    pub(crate) fn from_parts(clock: Arc<dyn Clock>, notifier: ProgressNotifier) -> Self {
        Self {
            shared: Arc::new(Shared {
                activity: Mutex::new(Activity::default()),
                clock,
                notifier,
            }),
        }
    }

    /// Record an item entering the stream
    pub fn new_item(&self) {
        let counts = {
            let mut activity = self.shared.activity.lock();
            activity.start(self.shared.clock.now());
            activity.counts()
        };
        tracing::trace!(
            total = counts.total,
            in_progress = counts.in_progress,
            "item started"
        );
        self.shared.notifier.notify();
    }

    /// Record an item leaving the stream.
    ///
    /// Fails with [`StreamError::NothingInProgress`](crate::StreamError::NothingInProgress)
    /// when no item is in progress; the counter is left unchanged and the
    /// progress callback does not fire.
    pub fn item_complete(&self) -> Result<()> {
        let result = {
            let mut activity = self.shared.activity.lock();
            activity
                .finish(self.shared.clock.now())
                .map(|()| activity.counts())
        };

        match result {
            Ok(counts) => {
                tracing::trace!(
                    complete = counts.complete,
                    in_progress = counts.in_progress,
                    "item complete"
                );
                self.shared.notifier.notify();
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "ignoring completion");
                Err(err)
            }
        }
    }
}

impl Default for StreamCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamInfo for StreamCounter {
    fn snapshot(&self) -> StreamSnapshot {
        self.shared.activity.lock().snapshot()
    }
}

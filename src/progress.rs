use std::fmt;
use std::sync::Arc;

/// Callback fired whenever a tracker's counts change.
///
/// The callback receives nothing; read whatever it needs from the tracker.
/// It runs on the thread that made the change, after the tracker's lock has
/// been released.
#[derive(Clone, Default)]
pub struct ProgressNotifier {
    callback: Option<Arc<dyn Fn() + Send + Sync>>,
}

impl ProgressNotifier {
    /// Wrap a callback
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            callback: Some(Arc::new(callback)),
        }
    }

    /// A notifier that does nothing
    pub fn noop() -> Self {
        Self::default()
    }

    pub(crate) fn notify(&self) {
        if let Some(callback) = &self.callback {
            callback();
        }
    }
}

impl fmt::Debug for ProgressNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressNotifier")
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

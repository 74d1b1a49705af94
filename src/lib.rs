//! Progress counters and moving-window rate statistics for streaming pipelines.
//!
//! This crate tracks how many items are in flight through a pipeline stage,
//! how many have completed, and how fast they are moving. It does no I/O and
//! no scheduling of its own: pipeline code marks items as started and
//! completed, and reads the numbers back whenever it wants to report.
//!
//! # Features
//!
//! - [`StreamCounter`]: in-progress/total/complete counts and a cumulative
//!   milliseconds-per-item rate
//! - [`StreamItemsTimer`]: per-item timing with windowed average (latency)
//!   and overall (throughput) rates over the last N completed items
//! - Pluggable [`Clock`] so rates can be tested without waiting
//! - Optional progress callback fired on every change
//! - Thread-safe: trackers and item handles can be shared across workers
//!
//! # Example
//!
//! ```
//! use stream_counter::{StreamInfo, TrackerBuilder};
//!
//! let loads = TrackerBuilder::new().build_timer();
//!
//! let item = loads.start_item_timer();
//! // load something...
//! item.stop();
//!
//! let last_five = loads.overall_rate(Some(5));
//! if let Some(ms) = last_five.ms_per_item() {
//!     println!("{}/{} loaded, {ms}ms/item", loads.complete(), loads.total());
//! }
//! ```

pub mod builder;
pub mod clock;
pub mod counter;
pub mod counts;
pub mod error;
pub mod progress;
pub mod timer;

// Re-exports for convenience
pub use builder::TrackerBuilder;
pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use counter::StreamCounter;
pub use counts::{Counts, Rate, StreamInfo, StreamSnapshot};
pub use error::{Result, StreamError};
pub use progress::ProgressNotifier;
pub use timer::{ItemTimer, StreamItemsTimer, TimedItem};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

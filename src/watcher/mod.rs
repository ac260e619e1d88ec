//! Debounced mod-folder watching.
//!
//! Raw filesystem notifications are filtered down to mod artifacts,
//! coalesced per mod name, and reported as single added/removed lines once
//! the folder has been quiet for the debounce interval.
//!
//! # Architecture
//!
//! ```text
//! ModWatcher (notify, recursive)
//!     |  create / delete / rename
//!     v
//! classifier::is_relevant
//!     |  mod artifacts only
//!     v
//! DebounceAggregator (pending map + rearming timer)
//!     |  sorted batch after quiet interval
//!     v
//! NotificationSink (log file, console, memory)
//! ```

mod adapter;
mod aggregator;
pub mod classifier;
mod error;
mod sink;

pub use adapter::{ModWatcher, ModWatcherBuilder, RawChange, translate_event};
pub use aggregator::{ChangeKind, DEFAULT_DEBOUNCE, DebounceAggregator};
pub use error::WatchError;
pub use sink::{LogFileSink, MemorySink, NotificationSink};

//! Watch a game mods folder and log which mods were added or removed.
//!
//! Bursts of filesystem events (an installer writing dozens of files) are
//! coalesced into one line per mod after a quiet period.

pub mod cli;
pub mod config;
pub mod logging;
pub mod watcher;

pub use config::Settings;
pub use watcher::{
    ChangeKind, DebounceAggregator, LogFileSink, MemorySink, ModWatcher, NotificationSink,
    WatchError,
};

//! Debounced aggregation of mod add/remove events.
//!
//! Installers and mod managers write many files in a burst. The aggregator
//! keeps the latest [`ChangeKind`] per mod name and reports the whole batch
//! once no qualifying event has arrived for the configured interval.
//!
//! # Locking
//!
//! The pending map and the scheduled-flush handle live behind one
//! `parking_lot::Mutex`. The lock is held only for the map update and the
//! timer rearm; sink I/O happens after the batch has been taken out.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use super::classifier;
use super::sink::NotificationSink;

/// Default quiet period before a batch is flushed.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(2);

/// Kind of change recorded for a mod.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Added,
    Removed,
}

impl ChangeKind {
    /// Notification line for a mod with this change.
    pub fn message(self, name: &str) -> String {
        match self {
            ChangeKind::Added => format!("Mod adicionado: {name}"),
            ChangeKind::Removed => format!("Mod removido: {name}"),
        }
    }
}

/// Buffers mod changes and flushes them after a quiet interval.
///
/// Every accepted event pushes the flush deadline to `now + interval`, so a
/// continuous stream postpones reporting until it settles. Within one window
/// the last event per mod name wins.
pub struct DebounceAggregator {
    shared: Arc<Shared>,
    runtime: Handle,
}

struct Shared {
    state: Mutex<PendingState>,
    sink: Arc<dyn NotificationSink>,
    interval: Duration,
}

#[derive(Default)]
struct PendingState {
    /// mod name -> latest change. Ordered so flush output is sorted.
    pending: BTreeMap<String, ChangeKind>,
    scheduled: Option<ScheduledFlush>,
    /// Bumped on every rearm; a timer only flushes if it is still current.
    generation: u64,
}

struct ScheduledFlush {
    generation: u64,
    task: JoinHandle<()>,
}

impl DebounceAggregator {
    /// Create an aggregator that schedules flushes on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime. Use [`Self::with_runtime`]
    /// to pass a handle explicitly.
    pub fn new(interval: Duration, sink: Arc<dyn NotificationSink>) -> Self {
        Self::with_runtime(Handle::current(), interval, sink)
    }

    /// Create an aggregator that schedules flushes on `runtime`.
    ///
    /// `record_event` may then be called from any thread, including
    /// threads the runtime does not own.
    pub fn with_runtime(
        runtime: Handle,
        interval: Duration,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(PendingState::default()),
                sink,
                interval,
            }),
            runtime,
        }
    }

    /// Record a raw create/delete for `path`.
    ///
    /// Directories and paths that are not mod artifacts are ignored.
    /// Otherwise the change replaces any pending change for the same mod
    /// name and the flush deadline is rearmed.
    pub fn record_event(&self, kind: ChangeKind, path: &Path) {
        // Deleted entries can no longer be stat'ed; the adapter filters
        // folder removals using the kind reported by the OS.
        if kind == ChangeKind::Added && path.is_dir() {
            crate::debug_event!("aggregator", "directory skipped", "{}", path.display());
            return;
        }

        if !classifier::is_relevant(path) {
            crate::debug_event!("aggregator", "ignored", "{}", path.display());
            return;
        }

        let Some(name) = classifier::mod_name(path) else {
            return;
        };

        let mut state = self.shared.state.lock();
        state.pending.insert(name.to_string(), kind);
        self.rearm(&mut state);
    }

    /// Entry point for filesystem create notifications.
    pub fn notify_created(&self, path: &Path) {
        self.record_event(ChangeKind::Added, path);
    }

    /// Entry point for filesystem delete notifications.
    pub fn notify_deleted(&self, path: &Path) {
        self.record_event(ChangeKind::Removed, path);
    }

    /// Cancel the live timer and drop whatever has not been flushed yet.
    pub fn shutdown(&self) {
        let mut state = self.shared.state.lock();
        if let Some(scheduled) = state.scheduled.take() {
            scheduled.task.abort();
        }

        let dropped = state.pending.len();
        state.pending.clear();
        if dropped > 0 {
            crate::debug_event!("aggregator", "shutdown", "dropped {dropped} pending changes");
        }
    }

    /// Configured quiet interval.
    pub fn interval(&self) -> Duration {
        self.shared.interval
    }

    /// Number of mods waiting for the next flush.
    pub fn pending_count(&self) -> usize {
        self.shared.state.lock().pending.len()
    }

    /// Whether a flush timer is currently armed.
    pub fn has_scheduled_flush(&self) -> bool {
        self.shared.state.lock().scheduled.is_some()
    }

    /// Replace any armed timer with one firing `interval` from now.
    ///
    /// Must be called with the state lock held.
    fn rearm(&self, state: &mut PendingState) {
        if let Some(previous) = state.scheduled.take() {
            previous.task.abort();
        }

        state.generation = state.generation.wrapping_add(1);
        let generation = state.generation;
        let shared = Arc::clone(&self.shared);
        let interval = self.shared.interval;

        let task = self.runtime.spawn(async move {
            tokio::time::sleep(interval).await;
            shared.flush(generation);
        });

        state.scheduled = Some(ScheduledFlush { generation, task });
    }
}

impl Shared {
    /// Drain the pending batch and report it.
    ///
    /// Only the timer of the current generation may flush. A superseded
    /// timer that lost the race with `abort` returns without touching state.
    fn flush(&self, generation: u64) {
        let batch = {
            let mut state = self.state.lock();
            match &state.scheduled {
                Some(scheduled) if scheduled.generation == generation => {}
                _ => {
                    crate::debug_event!("aggregator", "stale timer", "generation {generation}");
                    return;
                }
            }
            state.scheduled = None;
            std::mem::take(&mut state.pending)
        };

        if batch.is_empty() {
            return;
        }

        crate::debug_event!("aggregator", "flush", "{} changes", batch.len());
        for (name, kind) in &batch {
            self.sink.emit(&kind.message(name));
        }
    }
}

impl Drop for DebounceAggregator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watcher::MemorySink;
    use tokio::time::sleep;

    fn aggregator(interval_ms: u64) -> (DebounceAggregator, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let aggregator = DebounceAggregator::new(Duration::from_millis(interval_ms), sink.clone());
        (aggregator, sink)
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_add_flushes_after_interval() {
        let (agg, sink) = aggregator(2000);
        assert_eq!(agg.interval(), Duration::from_secs(2));

        agg.notify_created(Path::new("/mods/CoolArmor.esp"));
        assert_eq!(agg.pending_count(), 1);
        assert!(agg.has_scheduled_flush());

        sleep(Duration::from_millis(1999)).await;
        assert!(sink.is_empty());

        sleep(Duration::from_millis(2)).await;
        assert_eq!(sink.messages(), vec!["Mod adicionado: CoolArmor.esp"]);
        assert_eq!(agg.pending_count(), 0);
        assert!(!agg.has_scheduled_flush());
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_write_wins_and_rearms() {
        let (agg, sink) = aggregator(2000);

        agg.notify_created(Path::new("/mods/weapons.ba2"));
        sleep(Duration::from_millis(1000)).await;
        agg.notify_deleted(Path::new("/mods/weapons.ba2"));

        // Original deadline (t=2000) has passed without a flush
        sleep(Duration::from_millis(1500)).await;
        assert!(sink.is_empty());

        sleep(Duration::from_millis(600)).await;
        assert_eq!(sink.messages(), vec!["Mod removido: weapons.ba2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_distinct_mods_flush_sorted_once_each() {
        let (agg, sink) = aggregator(500);

        agg.notify_created(Path::new("/mods/b.esm"));
        agg.notify_created(Path::new("/mods/c.pak"));
        agg.notify_deleted(Path::new("/mods/a.esp"));

        sleep(Duration::from_millis(600)).await;
        assert_eq!(
            sink.messages(),
            vec![
                "Mod removido: a.esp",
                "Mod adicionado: b.esm",
                "Mod adicionado: c.pak",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_irrelevant_paths_never_arm_timer() {
        let (agg, sink) = aggregator(100);

        for _ in 0..50 {
            agg.notify_created(Path::new("/mods/~lock.esp"));
            agg.notify_created(Path::new("/mods/Temp~.esp"));
            agg.notify_created(Path::new("/mods/partial.esp.tmp"));
            agg.notify_deleted(Path::new("/mods/readme.txt"));
        }

        assert!(!agg.has_scheduled_flush());
        sleep(Duration::from_millis(500)).await;
        assert!(sink.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_directories_are_ignored() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let dir = temp_dir.path().join("Looks.esp");
        std::fs::create_dir(&dir).unwrap();

        let (agg, sink) = aggregator(100);
        agg.notify_created(&dir);

        assert_eq!(agg.pending_count(), 0);
        sleep(Duration::from_millis(200)).await;
        assert!(sink.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_continuous_stream_postpones_flush() {
        let (agg, sink) = aggregator(1000);

        for i in 0..10 {
            agg.notify_created(Path::new(&format!("/mods/part{i}.bsa")));
            sleep(Duration::from_millis(900)).await;
            assert!(sink.is_empty(), "flushed during burst at step {i}");
        }

        sleep(Duration::from_millis(200)).await;
        assert_eq!(sink.len(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_generation_does_not_flush() {
        let (agg, sink) = aggregator(1000);

        agg.notify_created(Path::new("/mods/a.esp"));
        agg.shared.flush(0);

        assert!(sink.is_empty());
        assert_eq!(agg.pending_count(), 1);
        assert!(agg.has_scheduled_flush());
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_of_empty_batch_is_noop() {
        let (agg, sink) = aggregator(1000);

        agg.notify_created(Path::new("/mods/a.esp"));
        agg.shared.state.lock().pending.clear();

        sleep(Duration::from_millis(1100)).await;
        assert!(sink.is_empty());
        assert!(!agg.has_scheduled_flush());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_timer_and_drops_batch() {
        let (agg, sink) = aggregator(1000);

        agg.notify_created(Path::new("/mods/a.esp"));
        agg.shutdown();

        assert!(!agg.has_scheduled_flush());
        assert_eq!(agg.pending_count(), 0);
        sleep(Duration::from_millis(2000)).await;
        assert!(sink.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_flushes_promptly() {
        let (agg, sink) = aggregator(0);

        agg.notify_created(Path::new("/mods/quick.jar"));
        sleep(Duration::from_millis(1)).await;
        assert_eq!(sink.messages(), vec!["Mod adicionado: quick.jar"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_window_after_flush() {
        let (agg, sink) = aggregator(100);

        agg.notify_created(Path::new("/mods/a.esp"));
        sleep(Duration::from_millis(150)).await;
        agg.notify_deleted(Path::new("/mods/a.esp"));
        sleep(Duration::from_millis(150)).await;

        assert_eq!(
            sink.messages(),
            vec!["Mod adicionado: a.esp", "Mod removido: a.esp"]
        );
    }

    #[test]
    fn test_change_kind_messages() {
        assert_eq!(ChangeKind::Added.message("x.esp"), "Mod adicionado: x.esp");
        assert_eq!(ChangeKind::Removed.message("x.esp"), "Mod removido: x.esp");
    }
}

//! Recursive directory watcher feeding the aggregator.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval};

use super::aggregator::{ChangeKind, DebounceAggregator};
use super::error::WatchError;

/// A create/delete extracted from a raw notify event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChange {
    pub kind: ChangeKind,
    pub path: PathBuf,
    /// The OS reported this entry as a directory.
    pub is_dir: bool,
}

impl RawChange {
    fn file(kind: ChangeKind, path: &Path) -> Self {
        Self {
            kind,
            path: path.to_path_buf(),
            is_dir: false,
        }
    }
}

/// Translate a notify event into creates and deletes.
///
/// Renames count as a delete of the old name plus a create of the new
/// one, so a `CoolArmor.esp.tmp` -> `CoolArmor.esp` install step is
/// reported. Modifications and access events are dropped.
pub fn translate_event(event: &Event) -> Vec<RawChange> {
    match event.kind {
        EventKind::Create(kind) => event
            .paths
            .iter()
            .map(|p| RawChange {
                kind: ChangeKind::Added,
                path: p.clone(),
                is_dir: kind == CreateKind::Folder,
            })
            .collect(),

        EventKind::Remove(kind) => event
            .paths
            .iter()
            .map(|p| RawChange {
                kind: ChangeKind::Removed,
                path: p.clone(),
                is_dir: kind == RemoveKind::Folder,
            })
            .collect(),

        EventKind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::From => event
                .paths
                .iter()
                .map(|p| RawChange::file(ChangeKind::Removed, p))
                .collect(),
            RenameMode::To => event
                .paths
                .iter()
                .map(|p| RawChange::file(ChangeKind::Added, p))
                .collect(),
            RenameMode::Both => match event.paths.as_slice() {
                [from, to] => vec![
                    RawChange::file(ChangeKind::Removed, from),
                    RawChange::file(ChangeKind::Added, to),
                ],
                _ => Vec::new(),
            },
            // Backends that cannot tell the direction (FSEvents) report
            // one path per side; existence decides which one it was.
            RenameMode::Any | RenameMode::Other => event
                .paths
                .iter()
                .map(|p| {
                    let kind = if p.exists() {
                        ChangeKind::Added
                    } else {
                        ChangeKind::Removed
                    };
                    RawChange::file(kind, p)
                })
                .collect(),
        },

        _ => Vec::new(),
    }
}

/// Watches a mods directory recursively and forwards changes to a
/// [`DebounceAggregator`].
pub struct ModWatcher {
    root: PathBuf,
    aggregator: Arc<DebounceAggregator>,
    event_rx: mpsc::Receiver<notify::Result<Event>>,
    /// Kept alive for the lifetime of the session; dropping it stops events.
    _watcher: notify::RecommendedWatcher,
    liveness_interval: Duration,
}

impl ModWatcher {
    /// Create a builder for configuring the watcher.
    pub fn builder() -> ModWatcherBuilder {
        ModWatcherBuilder::new()
    }

    /// Directory being watched.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run the watch session.
    ///
    /// Only returns on failure: the watched directory disappeared, the OS
    /// watch was invalidated, or the event channel closed. Callers stop a
    /// healthy session by dropping the future.
    pub async fn watch(mut self) -> Result<(), WatchError> {
        let mut liveness = interval(self.liveness_interval);
        liveness.set_missed_tick_behavior(MissedTickBehavior::Skip);

        crate::log_event!("watcher", "started", "{}", self.root.display());

        loop {
            tokio::select! {
                res = self.event_rx.recv() => {
                    match res {
                        Some(Ok(event)) => self.handle_event(&event),
                        Some(Err(e)) => self.handle_error(e)?,
                        None => return Err(WatchError::ChannelClosed),
                    }
                }

                _ = liveness.tick() => {
                    self.check_root()?;
                }
            }
        }
    }

    fn handle_event(&self, event: &Event) {
        for change in translate_event(event) {
            if change.is_dir {
                crate::debug_event!("watcher", "directory event", "{}", change.path.display());
                continue;
            }
            self.aggregator.record_event(change.kind, &change.path);
        }
    }

    fn handle_error(&self, error: notify::Error) -> Result<(), WatchError> {
        match error.kind {
            notify::ErrorKind::PathNotFound | notify::ErrorKind::WatchNotFound => {
                Err(WatchError::RootUnavailable {
                    path: self.root.clone(),
                    reason: error.to_string(),
                })
            }
            _ => {
                tracing::error!("[watcher] file watch error: {error}");
                Ok(())
            }
        }
    }

    /// Fail the session if the root was deleted or replaced by a file.
    fn check_root(&self) -> Result<(), WatchError> {
        match std::fs::metadata(&self.root) {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(WatchError::RootUnavailable {
                path: self.root.clone(),
                reason: "path is no longer a directory".to_string(),
            }),
            Err(e) => Err(WatchError::RootUnavailable {
                path: self.root.clone(),
                reason: e.to_string(),
            }),
        }
    }
}

/// Builder for constructing a [`ModWatcher`].
pub struct ModWatcherBuilder {
    root: Option<PathBuf>,
    aggregator: Option<Arc<DebounceAggregator>>,
    liveness_interval: Duration,
    channel_capacity: usize,
}

impl ModWatcherBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            root: None,
            aggregator: None,
            liveness_interval: Duration::from_secs(1),
            channel_capacity: 1024,
        }
    }

    /// Set the directory to watch.
    pub fn root(mut self, path: impl Into<PathBuf>) -> Self {
        self.root = Some(path.into());
        self
    }

    /// Set the aggregator that receives changes.
    pub fn aggregator(mut self, aggregator: Arc<DebounceAggregator>) -> Self {
        self.aggregator = Some(aggregator);
        self
    }

    /// How often to confirm the watched directory still exists.
    pub fn liveness_interval(mut self, interval: Duration) -> Self {
        self.liveness_interval = interval;
        self
    }

    /// Build the watcher and register the recursive OS watch.
    ///
    /// Events start queueing as soon as this returns, before
    /// [`ModWatcher::watch`] is polled.
    pub fn build(self) -> Result<ModWatcher, WatchError> {
        let root = self.root.ok_or(WatchError::MissingPath)?;
        let aggregator = self.aggregator.ok_or_else(|| WatchError::InitFailed {
            reason: "Aggregator is required".to_string(),
        })?;

        if !root.is_dir() {
            return Err(WatchError::NotADirectory { path: root });
        }

        if self.liveness_interval.is_zero() {
            return Err(WatchError::ConfigError {
                reason: "liveness interval must be greater than zero".to_string(),
            });
        }

        let (tx, rx) = mpsc::channel(self.channel_capacity);

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.blocking_send(res);
        })?;

        watcher
            .watch(&root, RecursiveMode::Recursive)
            .map_err(|e| WatchError::PathWatchFailed {
                path: root.clone(),
                reason: e.to_string(),
            })?;

        crate::debug_event!("watcher", "watching", "{}", root.display());

        Ok(ModWatcher {
            root,
            aggregator,
            event_rx: rx,
            _watcher: watcher,
            liveness_interval: self.liveness_interval,
        })
    }
}

impl Default for ModWatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watcher::MemorySink;
    use notify::event::{AccessKind, DataChange};

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        paths
            .iter()
            .fold(Event::new(kind), |e, p| e.add_path(PathBuf::from(p)))
    }

    #[test]
    fn test_translate_create_and_remove() {
        let created = translate_event(&event(
            EventKind::Create(CreateKind::File),
            &["/mods/a.esp"],
        ));
        assert_eq!(created, vec![RawChange::file(ChangeKind::Added, Path::new("/mods/a.esp"))]);

        let removed = translate_event(&event(
            EventKind::Remove(RemoveKind::Any),
            &["/mods/a.esp"],
        ));
        assert_eq!(removed, vec![RawChange::file(ChangeKind::Removed, Path::new("/mods/a.esp"))]);
    }

    #[test]
    fn test_translate_flags_folders() {
        let changes = translate_event(&event(
            EventKind::Create(CreateKind::Folder),
            &["/mods/Data"],
        ));
        assert_eq!(changes.len(), 1);
        assert!(changes[0].is_dir);

        let changes = translate_event(&event(
            EventKind::Remove(RemoveKind::Folder),
            &["/mods/Old.esp"],
        ));
        assert!(changes[0].is_dir);
    }

    #[test]
    fn test_translate_rename_both() {
        let changes = translate_event(&event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/mods/CoolArmor.esp.tmp", "/mods/CoolArmor.esp"],
        ));
        assert_eq!(
            changes,
            vec![
                RawChange::file(ChangeKind::Removed, Path::new("/mods/CoolArmor.esp.tmp")),
                RawChange::file(ChangeKind::Added, Path::new("/mods/CoolArmor.esp")),
            ]
        );
    }

    #[test]
    fn test_translate_undirected_rename_uses_existence() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let present = temp_dir.path().join("Renamed.esp");
        std::fs::write(&present, b"TES4").unwrap();
        let gone = temp_dir.path().join("Original.esp");

        for mode in [RenameMode::Any, RenameMode::Other] {
            let event = Event::new(EventKind::Modify(ModifyKind::Name(mode)))
                .add_path(gone.clone())
                .add_path(present.clone());

            assert_eq!(
                translate_event(&event),
                vec![
                    RawChange::file(ChangeKind::Removed, &gone),
                    RawChange::file(ChangeKind::Added, &present),
                ]
            );
        }
    }

    #[test]
    fn test_translate_rename_halves() {
        let from = translate_event(&event(
            EventKind::Modify(ModifyKind::Name(RenameMode::From)),
            &["/mods/old.pak"],
        ));
        assert_eq!(from[0].kind, ChangeKind::Removed);

        let to = translate_event(&event(
            EventKind::Modify(ModifyKind::Name(RenameMode::To)),
            &["/mods/new.pak"],
        ));
        assert_eq!(to[0].kind, ChangeKind::Added);
    }

    #[test]
    fn test_translate_ignores_modify_and_access() {
        assert!(
            translate_event(&event(
                EventKind::Modify(ModifyKind::Data(DataChange::Content)),
                &["/mods/a.esp"],
            ))
            .is_empty()
        );
        assert!(
            translate_event(&event(EventKind::Access(AccessKind::Any), &["/mods/a.esp"]))
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_builder_rejects_missing_directory() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let sink = Arc::new(MemorySink::new());
        let aggregator = Arc::new(DebounceAggregator::new(Duration::from_millis(10), sink));

        let result = ModWatcher::builder()
            .root(temp_dir.path().join("missing"))
            .aggregator(aggregator)
            .build();
        assert!(matches!(result, Err(WatchError::NotADirectory { .. })));
    }

    #[tokio::test]
    async fn test_builder_requires_root() {
        let sink = Arc::new(MemorySink::new());
        let aggregator = Arc::new(DebounceAggregator::new(Duration::from_millis(10), sink));

        let result = ModWatcher::builder().aggregator(aggregator).build();
        assert!(matches!(result, Err(WatchError::MissingPath)));
    }
}

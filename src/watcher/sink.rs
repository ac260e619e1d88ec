//! Notification sinks that render flushed mod changes.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::WatchError;

/// Receives finalized notification messages from the aggregator.
///
/// Implementations own formatting, persistence and console output.
/// `emit` is called outside the aggregator's lock and must not fail
/// through to the caller.
pub trait NotificationSink: Send + Sync {
    /// Render a single notification line.
    fn emit(&self, message: &str);
}

/// Timestamp format for persisted log lines.
const LOG_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Appends timestamped lines to a log file and optionally echoes them.
///
/// Lines look like `2024-05-01 18:22:04 - Mod adicionado: CoolArmor.esp`.
pub struct LogFileSink {
    path: PathBuf,
    file: Mutex<File>,
    echo: bool,
}

impl LogFileSink {
    /// Open (or create) the log file in append mode.
    pub fn open(path: impl AsRef<Path>, echo: bool) -> Result<Self, WatchError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| WatchError::SinkFailed {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| WatchError::SinkFailed {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            path,
            file: Mutex::new(file),
            echo,
        })
    }

    /// Path of the log file being written.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl NotificationSink for LogFileSink {
    fn emit(&self, message: &str) {
        if self.echo {
            println!("{message}");
        }

        let timestamp = chrono::Local::now().format(LOG_TIME_FORMAT);
        let mut file = self.file.lock();
        if let Err(e) = writeln!(file, "{timestamp} - {message}").and_then(|_| file.flush()) {
            tracing::warn!("[sink] failed to write {}: {e}", self.path.display());
        }
    }
}

/// Collects messages in memory.
///
/// Useful as a test double and for embedding the watcher in other tools.
#[derive(Debug, Default)]
pub struct MemorySink {
    messages: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all messages emitted so far.
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    /// Drain and return all messages emitted so far.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.messages.lock())
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }
}

impl NotificationSink for MemorySink {
    fn emit(&self, message: &str) {
        self.messages.lock().push(message.to_string());
    }
}

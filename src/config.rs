//! Configuration for the mod watcher.
//!
//! Settings are layered:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//! - CLI argument overrides (applied by the command layer)
//!
//! # Config file location
//!
//! The nearest `.modwatch/settings.toml` found walking up from the current
//! directory wins. Otherwise the per-user config directory is used
//! (`~/.config/modwatch/settings.toml` on Linux).
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `MODWATCH_` and use double
//! underscores to separate nested levels:
//! - `MODWATCH_DEBOUNCE_MS=500` sets `debounce_ms`
//! - `MODWATCH_MODS_PATH=/games/mods` sets `mods_path`
//! - `MODWATCH_LOGGING__DEFAULT=debug` sets `logging.default`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::watcher::{DEFAULT_DEBOUNCE, WatchError};

/// Name of the per-project configuration directory.
pub const CONFIG_DIR_NAME: &str = ".modwatch";

/// Settings file name inside the configuration directory.
pub const CONFIG_FILE_NAME: &str = "settings.toml";

const ENV_PREFIX: &str = "MODWATCH_";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Directory to watch for mod files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mods_path: Option<PathBuf>,

    /// Quiet period in milliseconds before pending changes are reported
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// File receiving timestamped notification lines
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    /// Echo notifications to stdout as well
    #[serde(default = "default_true")]
    pub echo: bool,

    /// Diagnostic logging
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Default level for all modules
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module level overrides, e.g. `watcher = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE.as_millis() as u64
}
fn default_log_file() -> PathBuf {
    PathBuf::from("log.txt")
}
fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mods_path: None,
            debounce_ms: default_debounce_ms(),
            log_file: default_log_file(),
            echo: true,
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, Box<figment::Error>> {
        Self::load_from(Self::config_path())
    }

    /// Load configuration from a specific file, plus defaults and env vars.
    ///
    /// A missing file is not an error; defaults apply.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).map(|key| {
                key.as_str()
                    .to_lowercase()
                    .replace("__", ".")
                    .into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Load only what is stored in the settings file, over defaults.
    ///
    /// Environment overrides are left out so that rewriting the file never
    /// persists a temporary `MODWATCH_*` value.
    pub fn load_file_only(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            .extract()
            .map_err(Box::new)
    }

    /// Path of the settings file used by [`Settings::load`].
    pub fn config_path() -> PathBuf {
        if let Some(path) = Self::find_workspace_config() {
            return path;
        }

        dirs::config_dir()
            .map(|dir| dir.join("modwatch").join(CONFIG_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Find `.modwatch/settings.toml` from the current directory up to root.
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        for ancestor in current.ancestors() {
            let config_dir = ancestor.join(CONFIG_DIR_NAME);
            if config_dir.is_dir() {
                return Some(config_dir.join(CONFIG_FILE_NAME));
            }
        }

        None
    }

    /// Debounce interval as a duration.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Check invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), WatchError> {
        if self.debounce_ms == 0 {
            return Err(WatchError::ConfigError {
                reason: "debounce_ms must be greater than zero".to_string(),
            });
        }
        if self.log_file.as_os_str().is_empty() {
            return Err(WatchError::ConfigError {
                reason: "log_file must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Save current configuration to file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file in `.modwatch/` under the current directory.
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = PathBuf::from(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME);

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        Settings::default().save(&config_path)?;
        Ok(config_path)
    }
}

/// Determine the directory to watch.
///
/// Precedence: `override_path`, then `settings.mods_path`, then `prompt`.
/// Prompting repeats until an existing directory is entered; the answer is
/// stored in `settings.mods_path` so the caller can persist it. A path from
/// the CLI or config that is not an existing directory is an error.
pub fn resolve_watch_path<F>(
    settings: &mut Settings,
    override_path: Option<PathBuf>,
    mut prompt: F,
) -> Result<PathBuf, WatchError>
where
    F: FnMut() -> Option<String>,
{
    if let Some(path) = override_path.or_else(|| settings.mods_path.clone()) {
        if !path.is_dir() {
            return Err(WatchError::NotADirectory { path });
        }
        return Ok(path);
    }

    loop {
        let Some(answer) = prompt() else {
            return Err(WatchError::MissingPath);
        };

        let answer = answer.trim();
        if answer.is_empty() {
            continue;
        }

        let path = PathBuf::from(answer);
        if path.is_dir() {
            settings.mods_path = Some(path.clone());
            return Ok(path);
        }

        eprintln!("Not an existing directory: {}", path.display());
    }
}

/// Read one answer from stdin after printing a prompt.
///
/// Returns `None` on EOF or read failure.
pub fn prompt_stdin() -> Option<String> {
    print!("Enter the path to your mods folder: ");
    std::io::stdout().flush().ok()?;

    let mut line = String::new();
    match std::io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line),
    }
}

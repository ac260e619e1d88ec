//! Init, Config and SetPath commands.

use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};

use crate::config::Settings;
use crate::watcher::WatchError;

/// Run init command - create configuration file.
pub fn run_init(force: bool) -> Result<()> {
    let path = Settings::init_config_file(force).map_err(|e| anyhow!("{e}"))?;
    println!("Created configuration file at: {}", path.display());
    println!("Set mods_path there or run 'modwatch set-path <DIR>'.");
    Ok(())
}

/// Run config command - display current configuration.
pub fn run_config(config: &Settings, config_path: &Path) {
    println!("Current Configuration ({}):", config_path.display());
    println!("{}", "=".repeat(50));
    match toml::to_string_pretty(config) {
        Ok(toml_str) => println!("{toml_str}"),
        Err(e) => eprintln!("Error displaying config: {e}"),
    }
}

/// Run set-path command - validate and persist `mods_path`.
pub fn run_set_path(path: PathBuf, config_path: &Path) -> Result<()> {
    if !path.is_dir() {
        return Err(WatchError::NotADirectory { path }.into());
    }

    persist_mods_path(&path, config_path)?;
    println!("Mods path set to: {}", path.display());
    Ok(())
}

/// Store `mods_path` in the settings file, keeping its other values.
pub fn persist_mods_path(path: &Path, config_path: &Path) -> Result<()> {
    let mut stored = Settings::load_file_only(config_path).map_err(|e| anyhow!("{e}"))?;
    stored.mods_path = Some(path.to_path_buf());
    stored
        .save(config_path)
        .map_err(|e| anyhow!("Failed to save {}: {e}", config_path.display()))?;

    crate::debug_event!("config", "saved", "{}", config_path.display());
    Ok(())
}

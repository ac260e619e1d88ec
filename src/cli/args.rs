//! CLI argument parsing using clap.

use clap::{
    Args, Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Watch a mods folder and log added/removed mods
#[derive(Parser, Debug)]
#[command(name = "modwatch", version, about, styles = clap_cargo_style())]
pub struct Cli {
    /// Path to settings file (overrides discovery)
    #[arg(short, long, global = true, env = "MODWATCH_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Options for the default `watch` command
    #[command(flatten)]
    pub watch: WatchArgs,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Watch the mods folder (default)
    Watch(WatchArgs),

    /// Create a default settings file in .modwatch/
    Init {
        /// Overwrite an existing settings file
        #[arg(short, long)]
        force: bool,
    },

    /// Display active settings
    Config,

    /// Store the mods folder in the settings file
    SetPath {
        /// Existing directory containing mods
        path: PathBuf,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct WatchArgs {
    /// Mods folder to watch (overrides settings)
    pub path: Option<PathBuf>,

    /// Quiet period in milliseconds before changes are logged
    #[arg(long)]
    pub debounce_ms: Option<u64>,

    /// File receiving notification lines
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Do not echo notifications to stdout
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Resolve the command, treating a bare invocation as `watch`.
    pub fn into_command(self) -> Commands {
        self.command.unwrap_or(Commands::Watch(self.watch))
    }
}

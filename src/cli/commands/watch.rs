//! Watch command - the long-running mod folder session.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::cli::WatchArgs;
use crate::config::{Settings, prompt_stdin, resolve_watch_path};
use crate::watcher::{DebounceAggregator, LogFileSink, ModWatcher};

/// Apply CLI overrides on top of loaded settings.
pub fn apply_overrides(settings: &mut Settings, args: &WatchArgs) {
    if let Some(ms) = args.debounce_ms {
        settings.debounce_ms = ms;
    }
    if let Some(ref log_file) = args.log_file {
        settings.log_file = log_file.clone();
    }
    if args.quiet {
        settings.echo = false;
    }
}

/// Run the watch session until Ctrl-C or a fatal watch error.
pub async fn run(args: WatchArgs, mut settings: Settings, config_path: &Path) -> Result<()> {
    apply_overrides(&mut settings, &args);
    settings.validate()?;

    let configured = settings.mods_path.is_some();

    // Prompting reads stdin; keep it off the runtime's worker threads
    let override_path = args.path.clone();
    let (settings, resolved) = tokio::task::spawn_blocking(move || {
        let resolved = resolve_watch_path(&mut settings, override_path, prompt_stdin);
        (settings, resolved)
    })
    .await
    .context("Mods path prompt failed")?;
    let mods_path = resolved?;

    // A prompted answer is remembered for the next run
    if !configured && args.path.is_none() {
        super::init::persist_mods_path(&mods_path, config_path)?;
        println!("Saved mods path to {}", config_path.display());
    }

    let sink = Arc::new(
        LogFileSink::open(&settings.log_file, settings.echo)
            .context("Failed to open notification log")?,
    );
    let aggregator = Arc::new(DebounceAggregator::new(settings.debounce(), sink.clone()));

    let watcher = ModWatcher::builder()
        .root(mods_path.clone())
        .aggregator(aggregator.clone())
        .build()
        .with_context(|| format!("Failed to watch {}", mods_path.display()))?;

    println!("Monitoring mods folder: {}", watcher.root().display());
    crate::log_event!(
        "watcher",
        "debounce",
        "{:?}, log file {}",
        aggregator.interval(),
        sink.path().display()
    );

    let result = tokio::select! {
        res = watcher.watch() => res.map_err(anyhow::Error::from),
        signal = tokio::signal::ctrl_c() => signal.context("Failed to listen for Ctrl-C"),
    };

    aggregator.shutdown();
    crate::log_event!("watcher", "stopped");

    result.with_context(|| format!("Stopped watching {}", mods_path.display()))
}

use clap::Parser;
use modwatch::cli::{Cli, Commands, commands};
use modwatch::{Settings, logging};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Settings::config_path);

    let settings = match Settings::load_from(&config_path) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error in {}: {e}", config_path.display());
            std::process::exit(1);
        }
    };

    logging::init_with_config(&settings.logging);

    let result = match cli.into_command() {
        Commands::Init { force } => commands::init::run_init(force),
        Commands::Config => {
            commands::init::run_config(&settings, &config_path);
            Ok(())
        }
        Commands::SetPath { path } => commands::init::run_set_path(path, &config_path),
        Commands::Watch(args) => commands::watch::run(args, settings, &config_path).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

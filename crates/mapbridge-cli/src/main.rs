//! MAP Bridge CLI entry point

use std::path::Path;

use clap::Parser;
use tracing::info;

use mapbridge_cli::{
    app::{run_simulation, SimulationOptions},
    cli::{Cli, Commands},
    config::AppConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let config = load_configuration(&cli)?;

    match cli.command {
        Commands::Simulate {
            device,
            messages,
            unreachable,
        } => {
            let options = SimulationOptions {
                device,
                messages,
                unreachable,
            };
            let report = run_simulation(&config, &options).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            info!(
                "Delivered {} messages from {}",
                report.delivered.len(),
                report.device
            );
        }
        Commands::Config => {
            println!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

/// Setup logging based on verbosity level
fn setup_logging(verbose: bool) {
    let log_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    // Logs go to stderr so the JSON report on stdout stays parseable
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Load configuration from an optional file, the environment and defaults
fn load_configuration(cli: &Cli) -> mapbridge_cli::Result<AppConfig> {
    if let Some(path) = &cli.config {
        info!("Loading configuration from: {}", path);
    }
    AppConfig::load(cli.config.as_deref().map(Path::new))
}

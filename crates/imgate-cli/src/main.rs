//! imgate - account-session gateway over a JSON-lines stdio transport

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use imgate_cli::{
    app::GatewayApp,
    cli::{Cli, Commands},
    config::AppConfig,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let mut config = load_configuration(&cli)?;

    match cli.command {
        Commands::Serve(args) => {
            args.apply(&mut config);
            let app = GatewayApp::start(config)
                .await
                .context("Failed to start gateway")?;
            app.serve_stdio().await.context("Transport failed")?;
            app.shutdown().await.context("Failed to shut down")?;
            info!("imgate exited");
        }
        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

/// Setup logging based on verbosity level. Logs go to stderr; stdout carries
/// the transport.
fn setup_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

/// Load configuration from file or use defaults
fn load_configuration(cli: &Cli) -> Result<AppConfig> {
    if let Some(config_path) = &cli.config {
        info!("Loading configuration from: {}", config_path);
        AppConfig::load_from_file(config_path)
            .with_context(|| format!("Failed to load {config_path}"))
    } else {
        info!("Using default configuration");
        Ok(AppConfig::default())
    }
}

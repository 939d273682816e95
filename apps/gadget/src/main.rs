use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use frontend_core::{orchestrator, ShutdownHandle};
use tracing_subscriber::EnvFilter;

mod config;
mod demo;
mod frontend;
mod windowed;

use demo::EchoController;

#[derive(Parser, Debug)]
#[command(version, about = "Front-end for the gadget: window emulator or SSD1306 panel")]
struct Args {
    /// Settings file; defaults to ./gadget.toml, then the user config directory.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override the configured front-end ("windowed" or "hardware-display").
    #[arg(long)]
    frontend: Option<String>,
    /// Resolve and print the configuration, then exit.
    #[arg(long)]
    check_config: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let (mut settings, source) = config::load_settings(args.config.as_deref())?;
    if let Some(frontend) = args.frontend {
        settings.frontend = Some(frontend);
    }
    init_tracing(&settings.log_filter);

    match &source {
        Some(path) => tracing::info!(path = %path.display(), "settings loaded"),
        None => tracing::info!("no settings file found; using defaults"),
    }

    let backend_config = match settings.resolve().and_then(|c| c.validate().map(|()| c)) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("{err}");
            return Err(err).context("resolving front-end configuration");
        }
    };

    if args.check_config {
        tracing::info!(?backend_config, "configuration ok");
        println!("{backend_config:#?}");
        return Ok(());
    }

    let controller = EchoController::new(backend_config.display, Duration::from_millis(10));
    let result = orchestrator::run(
        &backend_config,
        frontend::build_backend,
        controller,
        install_signal_handler,
    );
    if let Err(err) = &result {
        tracing::error!("{err}");
    }
    result.context("front-end stopped with an error")
}

fn init_tracing(configured: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(configured))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn install_signal_handler(shutdown: ShutdownHandle) {
    let result = ctrlc::set_handler(move || {
        tracing::info!("termination signal received");
        shutdown.shutdown();
    });
    if let Err(err) = result {
        tracing::warn!("failed to install signal handler: {err}");
    }
}

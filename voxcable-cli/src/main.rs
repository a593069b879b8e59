use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod commands;
mod formatter;
mod interactive_app;

use voxcable_core::{BackendKind, SettingsManager};

use crate::interactive_app::InteractiveApp;

#[derive(Parser, Debug)]
#[command(name = "voxcable")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Speak typed text into a virtual audio cable")]
struct Args {
    /// Load settings from a specific file instead of ~/.voxcable/settings.toml
    #[arg(long, value_name = "PATH")]
    settings: Option<PathBuf>,

    /// Override the output device name fragment for this session
    #[arg(long, value_name = "NAME")]
    device: Option<String>,

    /// Override the startup backend (network-neural or local-offline)
    #[arg(long, value_name = "KIND")]
    backend: Option<String>,
}

fn main() -> Result<()> {
    setup_tracing()?;

    // Playback streams are not Send, so everything runs on one thread.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let local = tokio::task::LocalSet::new();
        local.run_until(async_main()).await
    })
}

async fn async_main() -> Result<()> {
    let args = Args::parse();

    info!(
        settings = ?args.settings,
        device = ?args.device,
        backend = ?args.backend,
        "CLI startup"
    );

    let settings_manager = match args.settings {
        Some(path) => SettingsManager::from_path(path)?,
        None => SettingsManager::new()?,
    };

    // CLI overrides apply to the in-memory settings only.
    if let Some(device) = args.device {
        settings_manager.update_setting(|s| s.audio.device_name = device.clone());
    }
    if let Some(backend) = args.backend {
        let kind: BackendKind = backend.parse()?;
        settings_manager.update_setting(|s| s.tts.default_backend = kind);
    }

    let mut app = InteractiveApp::new(&settings_manager)?;
    app.run().await
}

fn setup_tracing() -> Result<()> {
    use std::fs;
    use tracing_subscriber::fmt;

    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/tmp"));
    let trace_dir = home.join(".voxcable").join("trace");
    fs::create_dir_all(&trace_dir)?;

    let log_file = trace_dir.join("voxcable.log");
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)?;

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(file)
                .with_ansi(false)
                .with_target(true),
        )
        .with(EnvFilter::new("info"))
        .init();

    info!("Tracing initialized to {:?}", log_file);
    Ok(())
}

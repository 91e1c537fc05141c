//! tubeset - playlist thumbnail dataset builder
//!
//! Serves a single-page UI for building a thumbnail + metadata store from a
//! playlist, browsing it, merging uploaded stores into it, downloading it
//! and moving it to and from a holding area.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tubeset_common::config::{RootFolderInitializer, Settings, TomlConfig, BIND_ENV, ROOT_FOLDER_ENV};

use tubeset_app::AppState;

/// Command-line arguments
#[derive(Debug, Parser)]
#[command(name = "tubeset", version, about = "Playlist thumbnail dataset builder")]
struct Args {
    /// Data root holding database/, recyclebin/ and uploads/
    #[arg(long, env = ROOT_FOLDER_ENV)]
    root_folder: Option<PathBuf>,

    /// Listen address, e.g. 127.0.0.1:5740
    #[arg(long, env = BIND_ENV)]
    bind: Option<String>,

    /// Config file (defaults to ~/.config/tubeset/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is read before logging starts so its level can apply
    let toml = TomlConfig::load_or_default(args.config.as_deref());
    let settings = Settings::resolve(args.root_folder, args.bind, &toml);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tubeset={lvl},tubeset_app={lvl},tubeset_common={lvl},tower_http={lvl}", lvl = settings.log_level)));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(
        "Starting tubeset v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let initializer = RootFolderInitializer::new(&settings.root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;
    info!("Root folder: {}", initializer.root().display());
    info!("Store: {}", initializer.store_path().display());

    let pipeline = tubeset_app::build_pipeline(&settings).context("Failed to build HTTP clients")?;

    let bind_address = settings.bind_address.clone();
    let state = AppState::new(settings, pipeline);
    let app = tubeset_app::build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    info!("Listening on http://{}", bind_address);
    info!("Health check: http://{}/health", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}

//! mediastem-api - media acquisition and stem separation service
//!
//! HTTP API that fetches media from a third-party video platform through
//! a provider fallback chain, converts it to downloadable audio/video,
//! and can split stored audio into stems.

use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

use mediastem_api::{build_router, AppState};
use mediastem_common::config::{resolve_data_dir, ServiceConfig};

#[derive(Debug, Parser)]
#[command(name = "mediastem-api", version, about = "Media acquisition and stem separation service")]
struct Args {
    /// Data folder for downloads, stems, and scratch space
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting mediastem-api v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let data_dir = resolve_data_dir(args.data_dir.as_deref());
    let config = ServiceConfig::from_env(data_dir)?;
    config.ensure_directories()?;

    info!("Data folder: {}", config.data_dir.display());
    info!(
        instances = config.cobalt_instances.len(),
        acquire_quota = config.acquire_quota.max_requests,
        separate_quota = config.separate_quota.max_requests,
        "configuration loaded"
    );

    let bind = config.bind_addr();
    let state = AppState::new(config)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!("mediastem-api listening on http://{bind}");
    info!("Health check: http://{bind}/health");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

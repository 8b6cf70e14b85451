//! mediastem-api library - media acquisition and stem separation service
//!
//! Resolves user-submitted media URLs through a fixed provider fallback
//! chain (Cobalt instance pool first, yt-dlp last), stores the result
//! under an opaque id, and optionally splits stored audio into stems via
//! Demucs. All acquisition and separation traffic is gated by per-client
//! sliding-window rate limiters.

use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use mediastem_common::config::ServiceConfig;
use mediastem_common::Result;

pub mod api;
pub mod error;
pub mod orchestrator;
pub mod pool;
pub mod providers;
pub mod ratelimit;
pub mod separation;
pub mod store;

use orchestrator::Orchestrator;
use pool::InstancePool;
use providers::{CobaltProvider, MediaProvider, YtDlpProvider};
use ratelimit::SlidingWindowLimiter;
use separation::StemSeparator;
use store::MetadataStore;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub store: Arc<MetadataStore>,
    pub orchestrator: Arc<Orchestrator>,
    pub acquire_limiter: Arc<SlidingWindowLimiter>,
    pub separate_limiter: Arc<SlidingWindowLimiter>,
    /// Shared with the provider chain; also serves metadata probes
    pub prober: Arc<YtDlpProvider>,
    pub separator: Arc<StemSeparator>,
}

impl AppState {
    /// Assemble all components from immutable configuration
    pub fn new(config: ServiceConfig) -> Result<Self> {
        let config = Arc::new(config);
        let store = Arc::new(MetadataStore::new());

        let pool = Arc::new(InstancePool::new(config.cobalt_instances.clone())?);
        let cobalt = Arc::new(CobaltProvider::new(
            pool,
            config.audio_bitrate.clone(),
            config.video_quality.clone(),
        )?);
        let ytdlp = Arc::new(YtDlpProvider::new(
            config.ytdlp_binary.clone(),
            config.scratch_dir(),
            config.cookie_source.clone(),
            config.player_clients.clone(),
        ));

        // Fixed priority order: the remote conversion service is cheaper
        // and faster when available; local extraction is the fallback of
        // last resort.
        let chain: Vec<Arc<dyn MediaProvider>> = vec![cobalt, ytdlp.clone()];
        let orchestrator = Arc::new(Orchestrator::new(
            chain,
            Arc::clone(&store),
            config.downloads_dir(),
        ));

        let acquire_limiter = Arc::new(SlidingWindowLimiter::new(
            config.acquire_quota.max_requests,
            config.acquire_quota.window(),
        ));
        let separate_limiter = Arc::new(SlidingWindowLimiter::new(
            config.separate_quota.max_requests,
            config.separate_quota.window(),
        ));

        let separator = Arc::new(StemSeparator::new(
            config.demucs_binary.clone(),
            config.stems_dir(),
        ));

        Ok(Self {
            config,
            store,
            orchestrator,
            acquire_limiter,
            separate_limiter,
            prober: ytdlp,
            separator,
        })
    }
}

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    Router::new()
        .route("/api/acquire", post(api::acquire))
        .route("/api/probe", post(api::probe))
        .route("/api/limits", get(api::limits))
        .route("/api/result/:id", get(api::download_result))
        .route("/api/separate", post(api::separate))
        .route("/api/stem/:id/:name", get(api::download_stem))
        .merge(api::health_routes())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

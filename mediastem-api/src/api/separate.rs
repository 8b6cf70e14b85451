//! Stem separation endpoint
//!
//! Gated by its own, stricter rate limiter: separation is far more
//! resource-costly than acquisition.

use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use axum::Json;
use mediastem_common::types::MediaKind;
use mediastem_common::Error;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tracing::info;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::ratelimit::client_key;
use crate::separation::Stem;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SeparateRequest {
    pub id: Uuid,
    /// Two-stem mode (vocals + accompaniment) is much faster than the
    /// full four-stem split and is the default.
    #[serde(default = "default_two_stems")]
    pub two_stems: bool,
}

fn default_two_stems() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct SeparateResponse {
    pub id: Uuid,
    pub stems: Vec<Stem>,
}

/// POST /api/separate
pub async fn separate(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(request): Json<SeparateRequest>,
) -> ApiResult<Json<SeparateResponse>> {
    // Input validation before the quota check: an unknown or non-audio
    // id never consumes separation quota.
    let record = state
        .store
        .get(&request.id)
        .ok_or_else(|| Error::NotFound(format!("unknown acquisition: {}", request.id)))?;
    if record.kind != MediaKind::Audio {
        return Err(
            Error::InvalidInput("stem separation requires an audio acquisition".to_string()).into(),
        );
    }

    let key = client_key(&headers, peer);
    let status = state.separate_limiter.check(&key);
    if !status.allowed {
        return Err(Error::RateLimited {
            remaining: 0,
            total: status.total,
            reset_at: status.reset_at,
        }
        .into());
    }
    state.separate_limiter.record(&key);

    info!(client = %key, id = %request.id, two_stems = request.two_stems, "separation admitted");

    let input = state.config.download_file(&request.id, MediaKind::Audio);
    let stems = state
        .separator
        .separate(request.id, &input, request.two_stems)
        .await?;

    Ok(Json(SeparateResponse {
        id: request.id,
        stems,
    }))
}

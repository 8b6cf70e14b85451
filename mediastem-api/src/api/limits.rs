//! Rate-limit status endpoint

use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use axum::Json;
use mediastem_common::types::LimitStatus;
use serde::Serialize;
use std::net::SocketAddr;

use crate::ratelimit::client_key;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct LimitsResponse {
    pub client: String,
    pub acquire: LimitStatus,
    pub separate: LimitStatus,
}

/// GET /api/limits
///
/// Current quota standing for the calling client; a pure read that
/// never consumes quota.
pub async fn limits(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Json<LimitsResponse> {
    let key = client_key(&headers, peer);
    Json(LimitsResponse {
        acquire: state.acquire_limiter.check(&key),
        separate: state.separate_limiter.check(&key),
        client: key,
    })
}

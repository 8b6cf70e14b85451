//! Acquisition and probe endpoints

use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use axum::Json;
use mediastem_common::types::{AcquireRequest, AcquireResponse};
use mediastem_common::Error;
use serde::Deserialize;
use std::net::SocketAddr;
use tracing::{info, warn};

use crate::error::ApiResult;
use crate::providers::ytdlp::ProbeInfo;
use crate::ratelimit::client_key;
use crate::AppState;

/// POST /api/acquire
///
/// Validation runs before the limiter check, and the limiter check runs
/// before any provider, so quota is never consumed by malformed input
/// and providers never run for a denied client.
pub async fn acquire(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(request): Json<AcquireRequest>,
) -> ApiResult<Json<AcquireResponse>> {
    validate_url(&request.url)?;

    let key = client_key(&headers, peer);
    let status = state.acquire_limiter.check(&key);
    if !status.allowed {
        return Err(Error::RateLimited {
            remaining: 0,
            total: status.total,
            reset_at: status.reset_at,
        }
        .into());
    }
    state.acquire_limiter.record(&key);

    info!(client = %key, url = %request.url, kind = ?request.kind, "acquisition admitted");
    let record = state.orchestrator.resolve(&request).await?;

    Ok(Json(AcquireResponse {
        id: record.id,
        filename: record.filename,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ProbeRequest {
    pub url: String,
}

/// POST /api/probe
///
/// Metadata lookup without downloading; not counted against the quota.
pub async fn probe(
    State(state): State<AppState>,
    Json(request): Json<ProbeRequest>,
) -> ApiResult<Json<ProbeInfo>> {
    validate_url(&request.url)?;

    let info = state.prober.probe(&request.url).await.map_err(|e| {
        warn!(url = %request.url, error = %e.message, "probe failed");
        Error::InvalidInput(format!("could not probe source URL: {}", e.message))
    })?;
    Ok(Json(info))
}

fn validate_url(url: &str) -> Result<(), Error> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|_| Error::InvalidInput(format!("malformed source URL: {url}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(Error::InvalidInput(format!(
            "unsupported URL scheme: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_validation() {
        assert!(validate_url("https://example.com/watch?v=abc").is_ok());
        assert!(validate_url("http://example.com/v").is_ok());
        assert!(validate_url("not a url").is_err());
        assert!(validate_url("ftp://example.com/file").is_err());
        assert!(validate_url("file:///etc/passwd").is_err());
    }
}

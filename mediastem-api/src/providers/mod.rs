//! Provider adapters: independent backends that turn a source URL into
//! downloadable media bytes
//!
//! Two concrete adapters exist behind one capability trait:
//! - `CobaltProvider` - multi-instance remote conversion service
//! - `YtDlpProvider` - local extraction tool, the fallback of last resort
//!
//! Each adapter encapsulates its own retry/rotation policy and
//! normalizes every failure into `AcquireError`, so the orchestrator can
//! aggregate outcomes without inspecting provider internals.

pub mod cobalt;
pub mod ytdlp;

pub use cobalt::CobaltProvider;
pub use ytdlp::YtDlpProvider;

use bytes::Bytes;
use mediastem_common::types::AcquireRequest;
use std::path::PathBuf;
use thiserror::Error;

/// Raw media produced by a provider, before the orchestrator persists it
#[derive(Debug)]
pub enum MediaPayload {
    /// Content held in memory (fetched over HTTP)
    Bytes(Bytes),
    /// Content already on disk (written by an external tool)
    File(PathBuf),
}

/// Successful provider outcome
#[derive(Debug)]
pub struct Acquired {
    pub payload: MediaPayload,
    /// Provider-reported title, extension stripped, not yet sanitized
    pub title: String,
}

/// Normalized provider failure
#[derive(Debug, Clone, Error)]
#[error("{provider}: {message}")]
pub struct AcquireError {
    pub provider: &'static str,
    pub message: String,
}

impl AcquireError {
    pub fn new(provider: &'static str, message: impl Into<String>) -> Self {
        Self {
            provider,
            message: message.into(),
        }
    }
}

/// Capability implemented once per backend technology
#[async_trait::async_trait]
pub trait MediaProvider: Send + Sync {
    /// Provider name for diagnostics and error aggregation
    fn name(&self) -> &'static str;

    /// Resolve the request into retrievable media. Any internal
    /// retry/rotation happens inside this call; the orchestrator never
    /// retries a provider.
    async fn acquire(&self, request: &AcquireRequest) -> Result<Acquired, AcquireError>;
}

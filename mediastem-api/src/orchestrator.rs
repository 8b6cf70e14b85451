//! Acquisition orchestrator: the provider fallback chain
//!
//! Drives the configured providers in fixed priority order (remote
//! conversion service first, local extraction last) until one succeeds.
//! Providers are never retried here; each adapter encapsulates its own
//! retry/rotation policy. First success wins: the payload is persisted
//! under a freshly minted id, the title is sanitized into a download
//! filename, and a record lands in the metadata store. When the whole
//! chain fails, the aggregated error carries every provider's reason.

use crate::providers::{Acquired, MediaPayload, MediaProvider};
use crate::store::{AcquisitionRecord, MetadataStore};
use mediastem_common::sanitize::sanitize_filename;
use mediastem_common::types::{AcquireRequest, MediaKind};
use mediastem_common::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

pub struct Orchestrator {
    providers: Vec<Arc<dyn MediaProvider>>,
    store: Arc<MetadataStore>,
    downloads_dir: PathBuf,
}

impl Orchestrator {
    pub fn new(
        providers: Vec<Arc<dyn MediaProvider>>,
        store: Arc<MetadataStore>,
        downloads_dir: PathBuf,
    ) -> Self {
        Self {
            providers,
            store,
            downloads_dir,
        }
    }

    /// Resolve a request into a stored acquisition. Each call mints a
    /// new id and redoes the work, even for a URL seen before; there is
    /// no content-addressed caching.
    pub async fn resolve(&self, request: &AcquireRequest) -> Result<AcquisitionRecord> {
        let mut failures: Vec<String> = Vec::new();

        for provider in &self.providers {
            let started = Instant::now();
            match provider.acquire(request).await {
                Ok(acquired) => {
                    info!(
                        provider = provider.name(),
                        latency_ms = started.elapsed().as_millis() as u64,
                        url = %request.url,
                        "provider attempt succeeded"
                    );
                    return self.persist(request.kind, acquired).await;
                }
                Err(err) => {
                    warn!(
                        provider = err.provider,
                        latency_ms = started.elapsed().as_millis() as u64,
                        url = %request.url,
                        error = %err.message,
                        "provider attempt failed"
                    );
                    failures.push(format!("{}: {}", err.provider, err.message));
                }
            }
        }

        if failures.is_empty() {
            return Err(Error::AllProvidersFailed(
                "no providers configured".to_string(),
            ));
        }
        Err(Error::AllProvidersFailed(failures.join("; ")))
    }

    /// Write the payload to durable storage and record its metadata.
    /// A partially written file is removed before the error surfaces.
    async fn persist(&self, kind: MediaKind, acquired: Acquired) -> Result<AcquisitionRecord> {
        let id = Uuid::new_v4();
        let dest = self
            .downloads_dir
            .join(format!("{id}.{}", kind.extension()));

        let byte_size = match acquired.payload {
            MediaPayload::Bytes(bytes) => {
                let len = bytes.len() as u64;
                if let Err(e) = tokio::fs::write(&dest, &bytes).await {
                    remove_partial(&dest).await;
                    return Err(e.into());
                }
                len
            }
            MediaPayload::File(source) => {
                if let Err(e) = move_file(&source, &dest).await {
                    remove_partial(&dest).await;
                    return Err(e.into());
                }
                tokio::fs::metadata(&dest).await?.len()
            }
        };

        let mut title = sanitize_filename(&acquired.title);
        if title.is_empty() {
            title = kind.fallback_title().to_string();
        }
        let filename = format!("{title}.{}", kind.extension());

        let record = AcquisitionRecord {
            id,
            title,
            filename,
            kind,
            byte_size,
        };
        self.store.insert(record.clone());

        info!(
            id = %id,
            filename = %record.filename,
            byte_size,
            "acquisition stored"
        );
        Ok(record)
    }
}

/// Rename when possible; fall back to copy-then-remove when the scratch
/// and downloads folders sit on different filesystems.
async fn move_file(source: &Path, dest: &Path) -> std::io::Result<()> {
    if tokio::fs::rename(source, dest).await.is_ok() {
        return Ok(());
    }
    tokio::fs::copy(source, dest).await?;
    tokio::fs::remove_file(source).await
}

async fn remove_partial(dest: &Path) {
    if let Err(e) = tokio::fs::remove_file(dest).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %dest.display(), error = %e, "failed to clean up partial file");
        }
    }
}

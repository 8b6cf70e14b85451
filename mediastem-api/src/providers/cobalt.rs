//! Cobalt remote conversion service adapter
//!
//! Submits a job to the current pool instance and interprets the
//! structured response: either a direct download URL plus filename, or
//! an error body. Any transport failure, non-2xx status, or error-status
//! body rotates the shared instance pool and retries against the next
//! instance, exhausting after one attempt per pool entry. On success the
//! returned download URL is fetched with redirect-following and a long
//! timeout (media transfers are large).

use crate::pool::InstancePool;
use crate::providers::{AcquireError, Acquired, MediaPayload, MediaProvider};
use mediastem_common::types::{AcquireRequest, MediaKind};
use mediastem_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const PROVIDER_NAME: &str = "cobalt";

/// Job submission is quick; the instance either answers or it does not
const JOB_TIMEOUT: Duration = Duration::from_secs(30);
/// The bulk content fetch can move hundreds of megabytes
const FETCH_TIMEOUT: Duration = Duration::from_secs(600);

/// Cobalt job request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CobaltJob<'a> {
    url: &'a str,
    download_mode: &'a str,
    audio_format: &'a str,
    audio_bitrate: &'a str,
    video_quality: &'a str,
    filename_style: &'a str,
    disable_metadata: bool,
}

/// Cobalt response: `status` is `tunnel`/`redirect` with `url` and
/// `filename` on success, or `error` with a nested code
#[derive(Debug, Deserialize)]
struct CobaltResponse {
    status: String,
    url: Option<String>,
    filename: Option<String>,
    error: Option<CobaltErrorBody>,
}

#[derive(Debug, Deserialize)]
struct CobaltErrorBody {
    code: String,
}

pub struct CobaltProvider {
    pool: Arc<InstancePool>,
    job_client: reqwest::Client,
    fetch_client: reqwest::Client,
    audio_bitrate: String,
    video_quality: String,
}

impl CobaltProvider {
    pub fn new(pool: Arc<InstancePool>, audio_bitrate: String, video_quality: String) -> Result<Self> {
        let job_client = reqwest::Client::builder()
            .timeout(JOB_TIMEOUT)
            .build()
            .map_err(|e| Error::Internal(format!("failed to build HTTP client: {e}")))?;
        let fetch_client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| Error::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            pool,
            job_client,
            fetch_client,
            audio_bitrate,
            video_quality,
        })
    }

    /// Submit the job to one instance. Returns the download URL and the
    /// server-suggested filename, or the failure reason.
    async fn submit_job(
        &self,
        instance: &str,
        job: &CobaltJob<'_>,
    ) -> std::result::Result<(String, String), String> {
        let response = self
            .job_client
            .post(instance)
            .header("Accept", "application/json")
            .json(job)
            .send()
            .await
            .map_err(|e| format!("transport error: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {status}"));
        }

        let body: CobaltResponse = response
            .json()
            .await
            .map_err(|e| format!("malformed response: {e}"))?;

        if body.status == "error" {
            let code = body.error.map(|e| e.code).unwrap_or_default();
            return Err(format!("instance reported error: {code}"));
        }

        match (body.url, body.filename) {
            (Some(url), Some(filename)) => Ok((url, filename)),
            _ => Err(format!(
                "response status '{}' carried no download url",
                body.status
            )),
        }
    }

    async fn fetch_content(&self, url: &str) -> std::result::Result<bytes::Bytes, String> {
        let response = self
            .fetch_client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("content fetch failed: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("content fetch returned HTTP {status}"));
        }

        response
            .bytes()
            .await
            .map_err(|e| format!("content read failed: {e}"))
    }
}

#[async_trait::async_trait]
impl MediaProvider for CobaltProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn acquire(&self, request: &AcquireRequest) -> std::result::Result<Acquired, AcquireError> {
        let audio_bitrate = request
            .options
            .get("audio_bitrate")
            .map(String::as_str)
            .unwrap_or(&self.audio_bitrate);
        let video_quality = request
            .options
            .get("video_quality")
            .map(String::as_str)
            .unwrap_or(&self.video_quality);

        let job = CobaltJob {
            url: &request.url,
            download_mode: match request.kind {
                MediaKind::Audio => "audio",
                MediaKind::Video => "auto",
            },
            audio_format: "mp3",
            audio_bitrate,
            video_quality,
            filename_style: "basic",
            disable_metadata: false,
        };

        let mut last_error = String::from("no instances attempted");

        // One attempt per pool entry; the cursor is shared, so rotation
        // also steers concurrent requests away from a failing instance.
        for _ in 0..self.pool.len() {
            let instance = self.pool.current().to_string();
            debug!(instance = %instance, url = %request.url, "submitting cobalt job");

            match self.submit_job(&instance, &job).await {
                Ok((download_url, filename)) => {
                    match self.fetch_content(&download_url).await {
                        Ok(bytes) => {
                            debug!(
                                instance = %instance,
                                bytes = bytes.len(),
                                filename = %filename,
                                "cobalt content fetched"
                            );
                            return Ok(Acquired {
                                payload: MediaPayload::Bytes(bytes),
                                title: strip_extension(&filename).to_string(),
                            });
                        }
                        Err(reason) => {
                            warn!(instance = %instance, error = %reason, "cobalt fetch failed");
                            last_error = format!("{instance}: {reason}");
                            self.pool.advance();
                        }
                    }
                }
                Err(reason) => {
                    warn!(instance = %instance, error = %reason, "cobalt job failed");
                    last_error = format!("{instance}: {reason}");
                    self.pool.advance();
                }
            }
        }

        Err(AcquireError::new(
            PROVIDER_NAME,
            format!("all {} instances failed; last: {last_error}", self.pool.len()),
        ))
    }
}

/// Strip a short trailing extension from a server-suggested filename;
/// the caller re-appends one per requested kind.
fn strip_extension(filename: &str) -> &str {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.len() <= 4 => stem,
        _ => filename,
    }
}

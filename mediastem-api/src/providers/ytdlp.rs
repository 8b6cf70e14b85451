//! yt-dlp local extraction tool adapter
//!
//! Invokes the external yt-dlp binary once per acquisition; the tool has
//! its own retry policy, so there is no rotation at this level. Session
//! credentials (inline cookie data, a browser profile, or a cookies
//! file) and a prioritized list of client-emulation profiles reduce
//! bot-detection false positives. Materially slower than the remote
//! conversion service; used strictly as the fallback of last resort.

use crate::providers::{AcquireError, Acquired, MediaPayload, MediaProvider};
use mediastem_common::config::CookieSource;
use mediastem_common::types::{AcquireRequest, MediaKind};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};
use uuid::Uuid;

const PROVIDER_NAME: &str = "yt-dlp";

/// Single overall ceiling; the tool manages its own internal retries
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(900);
const PROBE_TIMEOUT: Duration = Duration::from_secs(60);

const AUDIO_FORMAT: &str = "bestaudio[ext=m4a]/bestaudio/best";
const VIDEO_FORMAT: &str = "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best";

pub struct YtDlpProvider {
    binary: String,
    scratch_dir: PathBuf,
    cookie_source: CookieSource,
    player_clients: Vec<String>,
}

/// Metadata probe result (`POST /api/probe`)
#[derive(Debug, Clone, Serialize)]
pub struct ProbeInfo {
    pub id: Option<String>,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub thumbnail: Option<String>,
    pub duration: Option<f64>,
    pub view_count: Option<u64>,
    pub upload_date: Option<String>,
    pub description: Option<String>,
}

/// Subset of the yt-dlp `-J` info dict this service cares about
#[derive(Debug, Deserialize)]
struct RawProbe {
    id: Option<String>,
    title: Option<String>,
    artist: Option<String>,
    uploader: Option<String>,
    channel: Option<String>,
    thumbnail: Option<String>,
    duration: Option<f64>,
    view_count: Option<u64>,
    upload_date: Option<String>,
    description: Option<String>,
}

impl From<RawProbe> for ProbeInfo {
    fn from(raw: RawProbe) -> Self {
        ProbeInfo {
            id: raw.id,
            title: raw.title,
            artist: raw.artist.or(raw.uploader).or(raw.channel),
            thumbnail: raw.thumbnail,
            duration: raw.duration,
            view_count: raw.view_count,
            upload_date: raw.upload_date,
            description: raw.description.map(|d| d.chars().take(200).collect()),
        }
    }
}

impl YtDlpProvider {
    pub fn new(
        binary: String,
        scratch_dir: PathBuf,
        cookie_source: CookieSource,
        player_clients: Vec<String>,
    ) -> Self {
        Self {
            binary,
            scratch_dir,
            cookie_source,
            player_clients,
        }
    }

    /// Probe a URL for metadata without downloading
    pub async fn probe(&self, url: &str) -> Result<ProbeInfo, AcquireError> {
        let (cookie_args, cookie_temp) = self.materialize_cookies().await?;

        let mut args = common_args(&self.player_clients);
        args.extend(cookie_args);
        args.push("-J".to_string());
        args.push(url.to_string());

        let output = self.run(&args, PROBE_TIMEOUT).await;
        self.discard_temp(cookie_temp).await;
        let output = output?;

        let raw: RawProbe = serde_json::from_slice(&output.stdout).map_err(|e| {
            AcquireError::new(PROVIDER_NAME, format!("unparseable probe output: {e}"))
        })?;
        Ok(raw.into())
    }

    async fn run(
        &self,
        args: &[String],
        ceiling: Duration,
    ) -> Result<std::process::Output, AcquireError> {
        debug!(binary = %self.binary, ?args, "invoking yt-dlp");

        let mut command = Command::new(&self.binary);
        command.args(args).kill_on_drop(true);

        let output = tokio::time::timeout(ceiling, command.output())
            .await
            .map_err(|_| {
                AcquireError::new(
                    PROVIDER_NAME,
                    format!("timed out after {}s", ceiling.as_secs()),
                )
            })?
            .map_err(|e| {
                AcquireError::new(
                    PROVIDER_NAME,
                    format!("failed to execute {}: {e}", self.binary),
                )
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AcquireError::new(PROVIDER_NAME, relevant_stderr(&stderr)));
        }
        Ok(output)
    }

    /// Cookie arguments for one invocation. Inline data is written to a
    /// per-invocation temp file that the caller discards afterwards.
    async fn materialize_cookies(
        &self,
    ) -> Result<(Vec<String>, Option<PathBuf>), AcquireError> {
        match &self.cookie_source {
            CookieSource::None => Ok((vec![], None)),
            CookieSource::Inline(data) => {
                let path = self
                    .scratch_dir
                    .join(format!("cookies-{}.txt", Uuid::new_v4()));
                tokio::fs::write(&path, data).await.map_err(|e| {
                    AcquireError::new(PROVIDER_NAME, format!("failed to stage cookies: {e}"))
                })?;
                Ok((
                    vec!["--cookies".to_string(), path.display().to_string()],
                    Some(path),
                ))
            }
            CookieSource::Browser(profile) => Ok((
                vec!["--cookies-from-browser".to_string(), profile.clone()],
                None,
            )),
            CookieSource::File(path) => Ok((
                vec!["--cookies".to_string(), path.display().to_string()],
                None,
            )),
        }
    }

    async fn discard_temp(&self, temp: Option<PathBuf>) {
        if let Some(path) = temp {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                warn!(path = %path.display(), error = %e, "failed to remove staged cookies");
            }
        }
    }

    /// Find the file the tool produced under the scratch folder for the
    /// given invocation token.
    async fn find_output(&self, token: &str) -> Option<PathBuf> {
        let prefix = format!("{token}.");
        let mut entries = tokio::fs::read_dir(&self.scratch_dir).await.ok()?;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name();
            if name.to_string_lossy().starts_with(&prefix) {
                return Some(entry.path());
            }
        }
        None
    }
}

#[async_trait::async_trait]
impl MediaProvider for YtDlpProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn acquire(&self, request: &AcquireRequest) -> Result<Acquired, AcquireError> {
        let token = Uuid::new_v4().to_string();
        let template = self.scratch_dir.join(format!("{token}.%(ext)s"));
        // Removes whatever the tool wrote under scratch if this call
        // fails or is cancelled mid-flight; disarmed on success.
        let mut scratch_guard = ScratchGuard::new(&self.scratch_dir, &token);
        let (cookie_args, cookie_temp) = self.materialize_cookies().await?;

        let mut args = common_args(&self.player_clients);
        args.extend(cookie_args);
        args.extend(format_args(request.kind));
        args.extend([
            "--no-simulate".to_string(),
            "--print".to_string(),
            "after_move:title".to_string(),
            "-o".to_string(),
            template.display().to_string(),
            request.url.clone(),
        ]);

        let output = self.run(&args, ACQUIRE_TIMEOUT).await;
        self.discard_temp(cookie_temp).await;
        let output = output?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let title = stdout
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or_default()
            .to_string();

        let path = self.find_output(&token).await.ok_or_else(|| {
            AcquireError::new(PROVIDER_NAME, "tool reported success but produced no file")
        })?;
        scratch_guard.disarm();

        debug!(path = %path.display(), title = %title, "yt-dlp produced output");
        Ok(Acquired {
            payload: MediaPayload::File(path),
            title,
        })
    }
}

/// Deletes every scratch file carrying one invocation's token prefix
/// when dropped armed. The subprocess itself dies via `kill_on_drop`;
/// this covers the files it already wrote (including `.part` output).
struct ScratchGuard {
    dir: PathBuf,
    prefix: String,
    armed: bool,
}

impl ScratchGuard {
    fn new(dir: &std::path::Path, token: &str) -> Self {
        Self {
            dir: dir.to_path_buf(),
            prefix: format!("{token}."),
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for ScratchGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return;
        };
        for entry in entries.flatten() {
            if entry.file_name().to_string_lossy().starts_with(&self.prefix) {
                if let Err(e) = std::fs::remove_file(entry.path()) {
                    warn!(path = %entry.path().display(), error = %e, "failed to remove partial output");
                }
            }
        }
    }
}

/// Arguments shared by every invocation
fn common_args(player_clients: &[String]) -> Vec<String> {
    let mut args = vec![
        "--no-playlist".to_string(),
        "--no-warnings".to_string(),
        "--no-check-certificates".to_string(),
    ];
    if !player_clients.is_empty() {
        args.push("--extractor-args".to_string());
        args.push(format!("youtube:player_client={}", player_clients.join(",")));
    }
    args
}

/// Format selection and postprocessing per requested kind
fn format_args(kind: MediaKind) -> Vec<String> {
    match kind {
        MediaKind::Audio => vec![
            "-f".to_string(),
            AUDIO_FORMAT.to_string(),
            "-x".to_string(),
            "--audio-format".to_string(),
            "mp3".to_string(),
            "--audio-quality".to_string(),
            "0".to_string(),
            "--postprocessor-args".to_string(),
            "ffmpeg:-b:a 320k -ar 48000".to_string(),
        ],
        MediaKind::Video => vec![
            "-f".to_string(),
            VIDEO_FORMAT.to_string(),
            "--merge-output-format".to_string(),
            "mp4".to_string(),
        ],
    }
}

/// Pull the most useful line out of yt-dlp stderr. The tool prefixes
/// real failures with "ERROR:"; everything else is progress noise.
fn relevant_stderr(stderr: &str) -> String {
    let line = stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| line.contains("ERROR"))
        .or_else(|| {
            stderr
                .lines()
                .rev()
                .map(str::trim)
                .find(|line| !line.is_empty())
        })
        .unwrap_or("unknown error");
    line.chars().take(500).collect()
}

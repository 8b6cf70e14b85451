//! Service configuration: data folder resolution and environment-driven
//! settings, read once at process start and treated as immutable.

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::types::MediaKind;

/// Public Cobalt instances used when none are configured.
/// The hosted API now requires a key, so these community instances are
/// the default rotation set.
const DEFAULT_COBALT_INSTANCES: &[&str] = &[
    "https://cobalt.api.timelessnesses.me",
    "https://api.cobalt.best",
    "https://cobalt-api.kwiatekmiki.com",
    "https://dl.khyernet.xyz",
];

/// Where yt-dlp gets its session credentials from.
/// At most one source applies; precedence is Inline > Browser > File.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieSource {
    /// No credentials; anonymous extraction
    None,
    /// Netscape-format cookie data supplied inline via environment
    Inline(String),
    /// Browser profile name for `--cookies-from-browser`
    Browser(String),
    /// Path to a Netscape-format cookies file
    File(PathBuf),
}

/// Quota/window pair for one sliding-window rate limiter
#[derive(Debug, Clone, Copy)]
pub struct QuotaConfig {
    pub max_requests: u32,
    pub window_hours: i64,
}

impl QuotaConfig {
    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::hours(self.window_hours)
    }
}

/// Immutable service configuration assembled at startup
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Ordered Cobalt endpoint rotation set; never empty
    pub cobalt_instances: Vec<String>,
    pub cookie_source: CookieSource,
    /// yt-dlp client-emulation profiles, tried in order
    pub player_clients: Vec<String>,
    pub audio_bitrate: String,
    pub video_quality: String,
    pub acquire_quota: QuotaConfig,
    pub separate_quota: QuotaConfig,
    pub ytdlp_binary: String,
    pub demucs_binary: String,
}

impl ServiceConfig {
    /// Configuration with compiled defaults, before environment overrides
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            data_dir,
            cobalt_instances: DEFAULT_COBALT_INSTANCES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            cookie_source: CookieSource::None,
            player_clients: vec!["android_creator".to_string()],
            audio_bitrate: "320".to_string(),
            video_quality: "1080".to_string(),
            acquire_quota: QuotaConfig {
                max_requests: 10,
                window_hours: 24,
            },
            separate_quota: QuotaConfig {
                max_requests: 3,
                window_hours: 24,
            },
            ytdlp_binary: "yt-dlp".to_string(),
            demucs_binary: "demucs".to_string(),
        }
    }

    /// Load configuration: compiled defaults overridden by environment
    /// variables. Read once at startup; the core treats the result as
    /// immutable input.
    pub fn from_env(data_dir: PathBuf) -> Result<Self> {
        let mut config = Self::new(data_dir);

        if let Some(host) = env_var("MEDIASTEM_HOST") {
            config.host = host;
        }
        if let Some(port) = env_var("MEDIASTEM_PORT") {
            config.port = port
                .parse()
                .map_err(|_| Error::Config(format!("invalid MEDIASTEM_PORT: {port}")))?;
        }
        if let Some(list) = env_var("MEDIASTEM_COBALT_INSTANCES") {
            let instances: Vec<String> = list
                .split(',')
                .map(|s| s.trim().trim_end_matches('/').to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if instances.is_empty() {
                return Err(Error::Config(
                    "MEDIASTEM_COBALT_INSTANCES contains no endpoints".to_string(),
                ));
            }
            config.cobalt_instances = instances;
        }

        // Credential source precedence: inline data, browser profile, file
        config.cookie_source = if let Some(data) = env_var("MEDIASTEM_COOKIES") {
            CookieSource::Inline(data)
        } else if let Some(profile) = env_var("MEDIASTEM_COOKIES_BROWSER") {
            CookieSource::Browser(profile)
        } else if let Some(path) = env_var("MEDIASTEM_COOKIES_FILE") {
            CookieSource::File(PathBuf::from(path))
        } else {
            CookieSource::None
        };

        if let Some(list) = env_var("MEDIASTEM_PLAYER_CLIENTS") {
            let clients: Vec<String> = list
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if !clients.is_empty() {
                config.player_clients = clients;
            }
        }
        if let Some(bitrate) = env_var("MEDIASTEM_AUDIO_BITRATE") {
            config.audio_bitrate = bitrate;
        }
        if let Some(quality) = env_var("MEDIASTEM_VIDEO_QUALITY") {
            config.video_quality = quality;
        }

        config.acquire_quota = quota_from_env(
            "MEDIASTEM_ACQUIRE_LIMIT",
            "MEDIASTEM_ACQUIRE_WINDOW_HOURS",
            config.acquire_quota,
        )?;
        config.separate_quota = quota_from_env(
            "MEDIASTEM_SEPARATE_LIMIT",
            "MEDIASTEM_SEPARATE_WINDOW_HOURS",
            config.separate_quota,
        )?;

        if let Some(bin) = env_var("MEDIASTEM_YTDLP_BIN") {
            config.ytdlp_binary = bin;
        }
        if let Some(bin) = env_var("MEDIASTEM_DEMUCS_BIN") {
            config.demucs_binary = bin;
        }

        Ok(config)
    }

    /// Completed acquisitions live here as `{id}.{ext}`
    pub fn downloads_dir(&self) -> PathBuf {
        self.data_dir.join("downloads")
    }

    /// Demucs output tree: `stems/{model}/{id}/{stem}.mp3`
    pub fn stems_dir(&self) -> PathBuf {
        self.data_dir.join("stems")
    }

    /// Scratch space for in-flight provider output
    pub fn scratch_dir(&self) -> PathBuf {
        self.data_dir.join("scratch")
    }

    /// Storage path of one completed acquisition
    pub fn download_file(&self, id: &Uuid, kind: MediaKind) -> PathBuf {
        self.downloads_dir().join(format!("{id}.{}", kind.extension()))
    }

    /// Create the data folder tree if missing
    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [
            self.data_dir.clone(),
            self.downloads_dir(),
            self.stems_dir(),
            self.scratch_dir(),
        ] {
            std::fs::create_dir_all(&dir)?;
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn quota_from_env(limit_var: &str, window_var: &str, defaults: QuotaConfig) -> Result<QuotaConfig> {
    let mut quota = defaults;
    if let Some(limit) = env_var(limit_var) {
        quota.max_requests = limit
            .parse()
            .map_err(|_| Error::Config(format!("invalid {limit_var}: {limit}")))?;
    }
    if let Some(hours) = env_var(window_var) {
        quota.window_hours = hours
            .parse()
            .map_err(|_| Error::Config(format!("invalid {window_var}: {hours}")))?;
        if quota.window_hours <= 0 {
            return Err(Error::Config(format!(
                "{window_var} must be positive, got {hours}"
            )));
        }
    }
    Ok(quota)
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// OS-dependent default data folder, used when neither the CLI argument
/// nor the environment supplies one
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("mediastem"))
        .unwrap_or_else(|| PathBuf::from("./mediastem_data"))
}

/// Resolve the data folder with priority: CLI argument, environment
/// variable, OS-dependent compiled default
pub fn resolve_data_dir(cli_arg: Option<&Path>) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }
    if let Some(path) = env_var("MEDIASTEM_DATA_DIR") {
        return PathBuf::from(path);
    }
    default_data_dir()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for var in [
            "MEDIASTEM_HOST",
            "MEDIASTEM_PORT",
            "MEDIASTEM_COBALT_INSTANCES",
            "MEDIASTEM_COOKIES",
            "MEDIASTEM_COOKIES_BROWSER",
            "MEDIASTEM_COOKIES_FILE",
            "MEDIASTEM_PLAYER_CLIENTS",
            "MEDIASTEM_ACQUIRE_LIMIT",
            "MEDIASTEM_ACQUIRE_WINDOW_HOURS",
            "MEDIASTEM_SEPARATE_LIMIT",
            "MEDIASTEM_SEPARATE_WINDOW_HOURS",
            "MEDIASTEM_DATA_DIR",
        ] {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn defaults_without_environment() {
        clear_env();
        let config = ServiceConfig::from_env(PathBuf::from("/tmp/ms")).unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.cobalt_instances.len(), 4);
        assert_eq!(config.cookie_source, CookieSource::None);
        assert_eq!(config.acquire_quota.max_requests, 10);
        assert_eq!(config.separate_quota.max_requests, 3);
        assert!(config.separate_quota.max_requests <= config.acquire_quota.max_requests);
    }

    #[test]
    #[serial]
    fn instance_list_from_environment() {
        clear_env();
        std::env::set_var(
            "MEDIASTEM_COBALT_INSTANCES",
            "https://a.example/, https://b.example",
        );
        let config = ServiceConfig::from_env(PathBuf::from("/tmp/ms")).unwrap();
        assert_eq!(
            config.cobalt_instances,
            vec!["https://a.example", "https://b.example"]
        );
        clear_env();
    }

    #[test]
    #[serial]
    fn inline_cookies_take_precedence() {
        clear_env();
        std::env::set_var("MEDIASTEM_COOKIES", "# Netscape HTTP Cookie File");
        std::env::set_var("MEDIASTEM_COOKIES_BROWSER", "firefox");
        let config = ServiceConfig::from_env(PathBuf::from("/tmp/ms")).unwrap();
        assert!(matches!(config.cookie_source, CookieSource::Inline(_)));
        clear_env();
    }

    #[test]
    #[serial]
    fn rejects_invalid_quota() {
        clear_env();
        std::env::set_var("MEDIASTEM_ACQUIRE_LIMIT", "lots");
        assert!(ServiceConfig::from_env(PathBuf::from("/tmp/ms")).is_err());
        clear_env();
    }

    #[test]
    #[serial]
    fn data_dir_resolution_priority() {
        clear_env();
        let cli = PathBuf::from("/tmp/cli-data");
        assert_eq!(resolve_data_dir(Some(&cli)), cli);

        std::env::set_var("MEDIASTEM_DATA_DIR", "/tmp/env-data");
        assert_eq!(resolve_data_dir(None), PathBuf::from("/tmp/env-data"));
        clear_env();

        assert_eq!(resolve_data_dir(None), default_data_dir());
    }

    #[test]
    fn ensure_directories_creates_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let config = ServiceConfig::new(tmp.path().join("data"));
        config.ensure_directories().unwrap();
        assert!(config.downloads_dir().is_dir());
        assert!(config.stems_dir().is_dir());
        assert!(config.scratch_dir().is_dir());
    }
}

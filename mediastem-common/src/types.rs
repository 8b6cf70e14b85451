//! API wire types shared between handlers and core components

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Kind of media the client asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    /// File extension for stored output of this kind
    pub fn extension(&self) -> &'static str {
        match self {
            MediaKind::Audio => "mp3",
            MediaKind::Video => "mp4",
        }
    }

    /// Media type served with stored output of this kind
    pub fn media_type(&self) -> &'static str {
        match self {
            MediaKind::Audio => "audio/mpeg",
            MediaKind::Video => "video/mp4",
        }
    }

    /// Fallback base filename when a title sanitizes to nothing
    pub fn fallback_title(&self) -> &'static str {
        match self {
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
        }
    }
}

/// Body of `POST /api/acquire`; immutable once constructed
#[derive(Debug, Clone, Deserialize)]
pub struct AcquireRequest {
    pub url: String,
    pub kind: MediaKind,
    /// Provider-specific knobs (output bitrate, resolution ceiling, ...)
    #[serde(default)]
    pub options: HashMap<String, String>,
}

/// Response of `POST /api/acquire`
#[derive(Debug, Clone, Serialize)]
pub struct AcquireResponse {
    pub id: Uuid,
    pub filename: String,
}

/// Rate-limit status for one client against one limiter
#[derive(Debug, Clone, Serialize)]
pub struct LimitStatus {
    pub allowed: bool,
    pub remaining: u32,
    pub total: u32,
    pub reset_at: DateTime<Utc>,
}

// Common data models for the download pipeline

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Supported media platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Youtube,
    Instagram,
}

impl Platform {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "youtube" => Some(Self::Youtube),
            "instagram" => Some(Self::Instagram),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Youtube => "youtube",
            Self::Instagram => "instagram",
        }
    }

    /// Host fragments a URL must contain to belong to this platform
    pub fn domains(&self) -> &'static [&'static str] {
        match self {
            Self::Youtube => &["youtube.com", "youtu.be"],
            Self::Instagram => &["instagram.com"],
        }
    }

    /// Display name used in user-facing messages
    pub fn label(&self) -> &'static str {
        match self {
            Self::Youtube => "YouTube",
            Self::Instagram => "Instagram",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const DEFAULT_QUALITY: &str = "720p";
pub const DEFAULT_AUDIO_TYPE: &str = "mp3";
pub const AUDIO_ONLY: &str = "audio_only";

/// Raw download request as submitted by a client
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DownloadRequestBody {
    pub url: Option<String>,
    pub platform: Option<String>,
    pub quality: Option<String>,
    #[serde(rename = "audioType")]
    pub audio_type: Option<String>,
}

/// Validated download request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    pub platform: Platform,
    pub quality: String,
    pub audio_type: String,
}

/// Audio extraction post-processing directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioExtraction {
    /// Target container (mp3, m4a, ...)
    pub format: String,
    /// Bitrate tier in kbps, or "0" for the extractor's best VBR setting
    pub quality: String,
}

/// Concrete extraction/download specification for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSpec {
    /// yt-dlp format selector expression
    pub format: String,
    /// Output path template
    pub output_template: String,
    pub restrict_filenames: bool,
    pub extract_audio: Option<AudioExtraction>,
    pub write_info_json: bool,
    pub write_thumbnail: bool,
    /// Keep going when a single item of a multi-item extraction fails
    pub ignore_errors: bool,
}

/// Metadata returned by the extractor's metadata pass.
///
/// Every field is optional; the orchestrator substitutes placeholders.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub id: Option<String>,
    pub title: Option<String>,
    pub duration: Option<u64>,
    pub uploader: Option<String>,
    pub view_count: Option<u64>,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    pub upload_date: Option<String>,
    pub format_count: usize,
}

pub const UNKNOWN_ID: &str = "unknown";
pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const UNKNOWN_UPLOADER: &str = "Unknown";

impl Metadata {
    pub fn id_or_default(&self) -> String {
        self.id.clone().unwrap_or_else(|| UNKNOWN_ID.to_string())
    }

    pub fn title_or_default(&self) -> String {
        self.title.clone().unwrap_or_else(|| UNKNOWN_TITLE.to_string())
    }

    pub fn uploader_or_default(&self) -> String {
        self.uploader
            .clone()
            .unwrap_or_else(|| UNKNOWN_UPLOADER.to_string())
    }

    pub fn duration_or_default(&self) -> u64 {
        self.duration.unwrap_or(0)
    }
}

/// Read-only view returned by a metadata peek
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoDetails {
    pub title: String,
    pub duration: u64,
    pub uploader: String,
    pub view_count: u64,
    pub description: String,
    pub thumbnail: String,
    pub upload_date: String,
    /// Number of formats the platform offers
    pub formats: usize,
}

impl From<Metadata> for VideoDetails {
    fn from(meta: Metadata) -> Self {
        Self {
            title: meta.title.unwrap_or_else(|| "Unknown".to_string()),
            duration: meta.duration.unwrap_or(0),
            uploader: meta.uploader.unwrap_or_else(|| UNKNOWN_UPLOADER.to_string()),
            view_count: meta.view_count.unwrap_or(0),
            description: meta.description.unwrap_or_default(),
            thumbnail: meta.thumbnail.unwrap_or_default(),
            upload_date: meta.upload_date.unwrap_or_default(),
            formats: meta.format_count,
        }
    }
}

/// Final result of a completed download
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadResult {
    pub video_id: String,
    pub title: String,
    pub duration: u64,
    pub uploader: String,
    pub filename: String,
    pub file_size: u64,
    pub download_url: String,
    pub platform: Platform,
    pub quality: String,
    pub audio_type: Option<String>,
    /// Non-fatal problems reported by a best-effort download
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip)]
    pub file_path: PathBuf,
}

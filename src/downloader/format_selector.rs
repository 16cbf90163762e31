// FormatSelector - maps (platform, quality, audio type) to a DownloadSpec
//
// YouTube exposes a resolution ladder, so video qualities become a
// height-capped video+audio selector. Audio-only requests pick the best
// audio stream and ask for post-processing into the requested container.
// Instagram has no ladder here and always takes the best single stream.

use std::path::{Path, PathBuf};

use super::models::{AudioExtraction, DownloadSpec, Platform, AUDIO_ONLY};

/// Selector used when nothing more specific applies
pub const BEST: &str = "best";
pub const BEST_AUDIO: &str = "bestaudio/best";

/// Recognized YouTube resolutions and their height caps
const RESOLUTIONS: &[(&str, u32)] = &[
    ("2160p", 2160),
    ("1440p", 1440),
    ("1080p", 1080),
    ("720p", 720),
    ("480p", 480),
    ("360p", 360),
];

/// Resolves download specifications for a fixed output directory
#[derive(Debug, Clone)]
pub struct FormatSelector {
    output_dir: PathBuf,
}

impl FormatSelector {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Build the spec for one request. Pure: same inputs, same spec.
    pub fn resolve(&self, platform: Platform, quality: &str, audio_type: &str) -> DownloadSpec {
        let (format, extract_audio) = match platform {
            Platform::Youtube if quality == AUDIO_ONLY => (
                BEST_AUDIO.to_string(),
                Some(AudioExtraction {
                    format: audio_type.to_string(),
                    quality: Self::audio_quality(audio_type).to_string(),
                }),
            ),
            Platform::Youtube => (Self::get_format_spec(quality), None),
            Platform::Instagram => (BEST.to_string(), None),
        };

        DownloadSpec {
            format,
            output_template: self
                .output_dir
                .join("%(title)s.%(ext)s")
                .to_string_lossy()
                .to_string(),
            restrict_filenames: true,
            extract_audio,
            write_info_json: true,
            write_thumbnail: true,
            ignore_errors: true,
        }
    }

    /// Combined video+audio selector capped at the requested height
    pub fn get_format_spec(quality: &str) -> String {
        match Self::height_for(quality) {
            Some(h) => format!(
                "bestvideo[height<={}]+bestaudio/best[height<={}]",
                h, h
            ),
            None => BEST.to_string(),
        }
    }

    pub fn height_for(quality: &str) -> Option<u32> {
        RESOLUTIONS
            .iter()
            .find(|(label, _)| *label == quality)
            .map(|(_, h)| *h)
    }

    /// Maximum bitrate for mp3, best VBR for everything else
    fn audio_quality(audio_type: &str) -> &'static str {
        if audio_type == "mp3" {
            "320"
        } else {
            "0"
        }
    }
}

// Builds the client-facing result of a finished download

use std::path::{Path, PathBuf};

use super::models::{DownloadRequest, DownloadResult, Metadata, Platform};
use super::progress::ProgressEntry;

/// URL prefix under which finished artifacts are served
pub const DOWNLOADS_PREFIX: &str = "/downloads";

/// Assemble a result from the metadata pass and the terminal progress entry.
///
/// A missing file is reported with size 0 rather than failing; the download
/// pass has already reported success by the time we get here.
pub async fn assemble(
    request: &DownloadRequest,
    metadata: &Metadata,
    entry: &ProgressEntry,
    warnings: Vec<String>,
) -> DownloadResult {
    let file_path = entry.filename.as_deref().map(PathBuf::from).unwrap_or_default();
    let filename = file_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let file_size = probe_size(&file_path).await;

    DownloadResult {
        video_id: metadata.id_or_default(),
        title: metadata.title_or_default(),
        duration: metadata.duration_or_default(),
        uploader: metadata.uploader_or_default(),
        download_url: serving_path(&filename),
        filename,
        file_size,
        platform: request.platform,
        quality: request.quality.clone(),
        audio_type: match request.platform {
            Platform::Youtube => Some(request.audio_type.clone()),
            Platform::Instagram => None,
        },
        warnings,
        file_path,
    }
}

pub fn serving_path(filename: &str) -> String {
    format!("{}/{}", DOWNLOADS_PREFIX, filename)
}

async fn probe_size(path: &Path) -> u64 {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => meta.len(),
        Ok(_) | Err(_) => {
            log::warn!(
                "Finished download is missing on disk: {}",
                path.display()
            );
            0
        }
    }
}

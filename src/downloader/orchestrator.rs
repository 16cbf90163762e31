// Download orchestration: validate, resolve, extract, download, assemble

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::assembler::assemble;
use super::errors::{DownloadError, ExtractionError, SubmitError};
use super::format_selector::FormatSelector;
use super::models::{DownloadRequest, DownloadRequestBody, DownloadResult, VideoDetails};
use super::progress::{compute_percent, ProgressEntry, ProgressStatus, ProgressStore, ProgressUpdate};
use super::traits::{Extractor, ProgressEvent, ProgressObserver};
use super::validator::validate;

/// Writes extractor progress into the store under one content id
struct StoreObserver<'a> {
    store: &'a ProgressStore,
    expected_id: &'a str,
    foreign_id: Mutex<Option<String>>,
}

impl<'a> StoreObserver<'a> {
    fn new(store: &'a ProgressStore, expected_id: &'a str) -> Self {
        Self {
            store,
            expected_id,
            foreign_id: Mutex::new(None),
        }
    }

    /// First content id seen that did not match the metadata pass
    async fn foreign_id(&self) -> Option<String> {
        self.foreign_id.lock().await.clone()
    }
}

#[async_trait]
impl<'a> ProgressObserver for StoreObserver<'a> {
    async fn on_event(&self, event: ProgressEvent) {
        if let Some(id) = event.content_id() {
            if id != self.expected_id {
                let mut foreign = self.foreign_id.lock().await;
                if foreign.is_none() {
                    log::warn!(
                        "Progress for {} arrived while tracking {}; not recording it",
                        id,
                        self.expected_id
                    );
                    *foreign = Some(id.to_string());
                }
                return;
            }
        }

        let update = match event {
            ProgressEvent::Downloading {
                downloaded_bytes,
                total_bytes,
                total_bytes_estimate,
                speed,
                eta,
                ..
            } => {
                let percent = compute_percent(
                    downloaded_bytes.unwrap_or(0),
                    total_bytes,
                    total_bytes_estimate,
                );
                ProgressUpdate::downloading(percent, speed, eta)
            }
            ProgressEvent::Finished { filename, .. } => {
                ProgressUpdate::finished(filename.to_string_lossy())
            }
        };

        self.store.upsert(self.expected_id, update).await;
    }
}

/// Drives downloads through an extractor and records their progress
pub struct Downloader {
    extractor: Arc<dyn Extractor>,
    store: ProgressStore,
    selector: FormatSelector,
}

impl Downloader {
    pub fn new(extractor: Arc<dyn Extractor>, store: ProgressStore, selector: FormatSelector) -> Self {
        Self {
            extractor,
            store,
            selector,
        }
    }

    pub fn store(&self) -> &ProgressStore {
        &self.store
    }

    pub fn extractor_name(&self) -> &'static str {
        self.extractor.name()
    }

    /// Validate a raw request and run it to completion
    pub async fn submit(&self, body: DownloadRequestBody) -> Result<DownloadResult, SubmitError> {
        let request = validate(body).map_err(|e| {
            log::warn!("Rejected download request: {}", e);
            e
        })?;
        log::info!("Received download request for: {}", request.url);

        Ok(self.execute(&request).await?)
    }

    /// Run a validated request: metadata pass, then download pass.
    ///
    /// Blocks until the extractor is done. No retry happens here.
    pub async fn execute(&self, request: &DownloadRequest) -> Result<DownloadResult, DownloadError> {
        let spec = self
            .selector
            .resolve(request.platform, &request.quality, &request.audio_type);
        log::info!(
            "Starting download for {} via {} (format '{}')",
            request.url,
            self.extractor.name(),
            spec.format
        );

        let metadata = self
            .extractor
            .extract_metadata(&request.url)
            .await
            .map_err(|e| {
                log::error!("Metadata extraction failed for {}: {}", request.url, e);
                DownloadError::from(e)
            })?;

        let id = metadata.id_or_default();
        let title = metadata.title_or_default();
        self.store.begin(&id, title.clone()).await;

        let observer = StoreObserver::new(&self.store, &id);
        let outcome = match self.extractor.download(&request.url, &spec, &observer).await {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("Download failed for {}: {}", id, e);
                self.store.mark_failed(&id, e.to_string()).await;
                return Err(e.into());
            }
        };

        if let Some(actual) = observer.foreign_id().await {
            let err = DownloadError::IdentifierChanged {
                expected: id.clone(),
                actual,
            };
            log::error!("Download failed for {}: {}", id, err);
            self.store.mark_failed(&id, err.to_string()).await;
            return Err(err);
        }

        let entry = match self.store.get(&id).await {
            Some(entry) if entry.status == ProgressStatus::Finished => entry,
            _ => {
                let err = DownloadError::Incomplete;
                log::error!("Download failed for {}: {}", id, err);
                self.store.mark_failed(&id, err.to_string()).await;
                return Err(err);
            }
        };

        for warning in outcome.warnings() {
            log::warn!("Download of {} finished with warning: {}", id, warning);
        }

        let result = assemble(request, &metadata, &entry, outcome.warnings().to_vec()).await;
        log::info!("Download completed: {} ({} bytes)", title, result.file_size);
        Ok(result)
    }

    pub async fn poll_progress(&self, id: &str) -> Option<ProgressEntry> {
        self.store.get(id).await
    }

    /// Metadata only; never touches the progress store
    pub async fn peek_metadata(&self, url: &str) -> Result<VideoDetails, ExtractionError> {
        self.extractor
            .extract_metadata(url)
            .await
            .map(VideoDetails::from)
            .map_err(|e| {
                log::error!("Info extraction failed for {}: {}", url, e);
                e
            })
    }
}

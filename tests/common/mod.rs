// Scripted extractor shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use mediagrab::downloader::{
    DownloadSpec, Downloader, ExtractionError, ExtractionOutcome, Extractor, FormatSelector,
    Metadata, ProgressEvent, ProgressObserver, ProgressStore,
};

pub struct FakeExtractor {
    pub metadata: Result<Metadata, ExtractionError>,
    pub events: Vec<ProgressEvent>,
    pub outcome: Result<ExtractionOutcome, ExtractionError>,
    pub metadata_calls: AtomicUsize,
    pub download_calls: AtomicUsize,
    pub last_spec: Mutex<Option<DownloadSpec>>,
}

impl FakeExtractor {
    pub fn new(metadata: Result<Metadata, ExtractionError>) -> Self {
        Self {
            metadata,
            events: Vec::new(),
            outcome: Ok(ExtractionOutcome::Succeeded),
            metadata_calls: AtomicUsize::new(0),
            download_calls: AtomicUsize::new(0),
            last_spec: Mutex::new(None),
        }
    }

    pub fn with_events(mut self, events: Vec<ProgressEvent>) -> Self {
        self.events = events;
        self
    }

    pub fn with_outcome(mut self, outcome: Result<ExtractionOutcome, ExtractionError>) -> Self {
        self.outcome = outcome;
        self
    }

    pub fn metadata_calls(&self) -> usize {
        self.metadata_calls.load(Ordering::SeqCst)
    }

    pub fn download_calls(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Extractor for FakeExtractor {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn extract_metadata(&self, _url: &str) -> Result<Metadata, ExtractionError> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        self.metadata.clone()
    }

    async fn download(
        &self,
        _url: &str,
        spec: &DownloadSpec,
        observer: &dyn ProgressObserver,
    ) -> Result<ExtractionOutcome, ExtractionError> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_spec.lock().unwrap() = Some(spec.clone());
        for event in &self.events {
            observer.on_event(event.clone()).await;
        }
        self.outcome.clone()
    }
}

pub fn metadata(id: &str, title: &str) -> Metadata {
    Metadata {
        id: Some(id.to_string()),
        title: Some(title.to_string()),
        duration: Some(212),
        uploader: Some("Rick Astley".to_string()),
        view_count: Some(1_000),
        format_count: 3,
        ..Default::default()
    }
}

pub fn downloading(id: &str, downloaded: u64, total: u64) -> ProgressEvent {
    ProgressEvent::Downloading {
        content_id: Some(id.to_string()),
        downloaded_bytes: Some(downloaded),
        total_bytes: Some(total),
        total_bytes_estimate: None,
        speed: Some(1024.0),
        eta: Some(3),
    }
}

pub fn finished(id: &str, path: &Path) -> ProgressEvent {
    ProgressEvent::Finished {
        content_id: Some(id.to_string()),
        filename: path.to_path_buf(),
    }
}

pub fn downloader(extractor: Arc<FakeExtractor>, dir: &Path) -> Downloader {
    Downloader::new(extractor, ProgressStore::new(), FormatSelector::new(dir))
}

pub fn write_artifact(dir: &Path, name: &str, len: usize) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, vec![7u8; len]).unwrap();
    path
}

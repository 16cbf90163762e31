// Extractor capability trait and the progress event channel it reports on

use async_trait::async_trait;
use std::path::PathBuf;

use super::errors::ExtractionError;
use super::models::{DownloadSpec, Metadata};

/// Progress reported by an extractor during its download pass
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Downloading {
        /// Content id the extractor is working on, if it reports one
        content_id: Option<String>,
        downloaded_bytes: Option<u64>,
        total_bytes: Option<u64>,
        total_bytes_estimate: Option<u64>,
        /// Bytes per second
        speed: Option<f64>,
        /// Seconds remaining
        eta: Option<u64>,
    },
    /// Item fully written and moved to its final path
    Finished {
        content_id: Option<String>,
        filename: PathBuf,
    },
}

impl ProgressEvent {
    pub fn content_id(&self) -> Option<&str> {
        match self {
            Self::Downloading { content_id, .. } | Self::Finished { content_id, .. } => {
                content_id.as_deref()
            }
        }
    }
}

/// Receiver of progress events
#[async_trait]
pub trait ProgressObserver: Send + Sync {
    async fn on_event(&self, event: ProgressEvent);
}

/// How a download pass that did not fail outright went
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionOutcome {
    Succeeded,
    /// Some items or steps failed but the extraction as a whole went on
    SucceededWithWarnings(Vec<String>),
}

impl ExtractionOutcome {
    pub fn warnings(&self) -> &[String] {
        match self {
            Self::Succeeded => &[],
            Self::SucceededWithWarnings(w) => w,
        }
    }
}

/// External capability that knows how to talk to media platforms
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Name of the extractor (for logging)
    fn name(&self) -> &'static str;

    /// Fetch metadata only; must not download anything
    async fn extract_metadata(&self, url: &str) -> Result<Metadata, ExtractionError>;

    /// Download according to `spec`, reporting progress to `observer`
    async fn download(
        &self,
        url: &str,
        spec: &DownloadSpec,
        observer: &dyn ProgressObserver,
    ) -> Result<ExtractionOutcome, ExtractionError>;
}

// Downloader module - validation, option resolution, extraction and progress

pub mod assembler;
pub mod errors;
pub mod extractors;
pub mod format_selector;
pub mod models;
pub mod orchestrator;
pub mod progress;
pub mod traits;
pub mod utils;
pub mod validator;

pub use errors::{DownloadError, ExtractionError, SubmitError, ValidationError};
pub use extractors::CliExtractor;
pub use format_selector::FormatSelector;
pub use models::{
    DownloadRequest, DownloadRequestBody, DownloadResult, DownloadSpec, Metadata, Platform,
    VideoDetails,
};
pub use orchestrator::Downloader;
pub use progress::{ProgressEntry, ProgressStatus, ProgressStore, ProgressUpdate};
pub use traits::{ExtractionOutcome, Extractor, ProgressEvent, ProgressObserver};

// Error types for the download pipeline

use thiserror::Error;

/// A submitted request was malformed or inconsistent and was rejected
/// before any extraction work started.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Required field absent from the request body
    #[error("{0} is required")]
    MissingField(&'static str),

    /// Platform is not one of the recognized values
    #[error("Platform must be either \"youtube\" or \"instagram\" (got \"{0}\")")]
    UnsupportedPlatform(String),

    /// URL could not be parsed as an absolute http(s) URL
    #[error("Invalid URL format: {url} ({reason})")]
    InvalidUrl { url: String, reason: String },

    /// URL host does not belong to the requested platform
    #[error("Invalid {platform} URL: {url}")]
    PlatformMismatch { platform: String, url: String },

    /// Audio container the extractor cannot produce
    #[error("Unsupported audio type: {0}")]
    UnsupportedAudioType(String),
}

/// The extractor capability could not produce metadata or could not
/// complete a download.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    /// yt-dlp binary not found or not executable
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Extractor ran but returned nothing usable
    #[error("Could not extract video information")]
    NoMetadata,

    /// Private, deleted or region-blocked content
    #[error("Content unavailable: {0}")]
    Unavailable(String),

    /// Platform throttled or flagged the request (429, bot checks)
    #[error("Request blocked by platform: {0}")]
    Blocked(String),

    /// Extractor output could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// Process failed for any other reason
    #[error("Execution error: {0}")]
    Execution(String),
}

// Classify raw extractor stderr into a typed error
impl From<String> for ExtractionError {
    fn from(s: String) -> Self {
        let lower = s.to_lowercase();

        if lower.contains("private video")
            || lower.contains("video unavailable")
            || lower.contains("has been removed")
            || lower.contains("in your country")
            || lower.contains("content isn't available")
        {
            return Self::Unavailable(s);
        }

        if lower.contains("429")
            || lower.contains("too many requests")
            || lower.contains("sign in to confirm")
            || lower.contains("rate-limit")
        {
            return Self::Blocked(s);
        }

        if lower.contains("no such file") || lower.contains("command not found") {
            return Self::ToolNotFound(s);
        }

        if lower.contains("json") {
            return Self::Parse(s);
        }

        Self::Execution(s)
    }
}

/// Orchestration-level failure: either a propagated extraction failure or
/// a download that never reached the finished state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DownloadError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// Download pass returned but the progress entry is not finished
    #[error("Download did not complete successfully (incomplete)")]
    Incomplete,

    /// Extractor reported progress for a different content id than the
    /// metadata pass (e.g. a playlist resolved to its items)
    #[error("Content identifier changed during download: expected {expected}, got {actual}")]
    IdentifierChanged { expected: String, actual: String },
}

/// Outcome of a failed `submit`: rejected up front, or attempted and failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Rejected(#[from] ValidationError),

    #[error(transparent)]
    Failed(#[from] DownloadError),
}

impl SubmitError {
    /// Machine-readable failure kind for the response envelope
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Rejected(_) => "validation",
            Self::Failed(DownloadError::Extraction(_)) => "extraction",
            Self::Failed(_) => "download",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifies_unavailable_content() {
        let err = ExtractionError::from("ERROR: [youtube] abc: Private video. Sign in".to_string());
        assert!(matches!(err, ExtractionError::Unavailable(_)));

        let err = ExtractionError::from(
            "ERROR: This video is not available in your country".to_string(),
        );
        assert!(matches!(err, ExtractionError::Unavailable(_)));
    }

    #[test]
    fn test_classifies_blocking() {
        let err = ExtractionError::from("HTTP Error 429: Too Many Requests".to_string());
        assert!(matches!(err, ExtractionError::Blocked(_)));
    }

    #[test]
    fn test_unknown_stderr_is_execution_error() {
        let err = ExtractionError::from("something odd happened".to_string());
        assert_eq!(
            err,
            ExtractionError::Execution("something odd happened".to_string())
        );
    }

    #[test]
    fn test_submit_error_kinds() {
        let rejected = SubmitError::from(ValidationError::MissingField("URL"));
        assert_eq!(rejected.kind(), "validation");

        let extraction = SubmitError::from(DownloadError::from(ExtractionError::NoMetadata));
        assert_eq!(extraction.kind(), "extraction");

        let incomplete = SubmitError::from(DownloadError::Incomplete);
        assert_eq!(incomplete.kind(), "download");
    }

    #[test]
    fn test_messages_are_human_readable() {
        assert_eq!(
            ValidationError::MissingField("URL").to_string(),
            "URL is required"
        );
        assert_eq!(
            DownloadError::from(ExtractionError::NoMetadata).to_string(),
            "Could not extract video information"
        );
    }
}

//! HTTP surface of the service.
//!
//! Routes:
//! - `GET /` service descriptor
//! - `GET /health`
//! - `POST /api/download` submit and wait for a download
//! - `GET /api/progress/{id}`
//! - `GET /api/info?url=` metadata only
//! - `GET /downloads/{filename}` finished artifacts

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Reply};

use crate::downloader::{
    DownloadRequestBody, DownloadResult, Downloader, ExtractionError, SubmitError,
};

const MAX_BODY_BYTES: u64 = 16 * 1024;

/// Envelope returned by `POST /api/download`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<DownloadResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
}

impl DownloadResponse {
    fn completed(result: DownloadResult) -> Self {
        Self {
            success: true,
            message: "Download completed successfully".to_string(),
            data: Some(result),
            error: None,
            error_kind: None,
        }
    }

    fn failed(err: &SubmitError) -> Self {
        Self {
            success: false,
            message: "Download failed".to_string(),
            data: None,
            error: Some(err.to_string()),
            error_kind: Some(err.kind().to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct InfoQuery {
    url: Option<String>,
}

/// Every route, with rejection handling and CORS applied
pub fn routes(
    downloader: Arc<Downloader>,
    downloads_dir: PathBuf,
    cors_origins: &[String],
) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    let with_downloader = warp::any().map(move || downloader.clone());

    let root = warp::path::end().and(warp::get()).map(|| {
        warp::reply::json(&serde_json::json!({
            "name": "MediaGrab API",
            "version": env!("CARGO_PKG_VERSION"),
            "status": "running",
            "endpoints": {
                "download": "POST /api/download",
                "progress": "GET /api/progress/{id}",
                "info": "GET /api/info?url=",
                "files": "GET /downloads/{filename}",
                "health": "GET /health",
            }
        }))
    });

    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .map(health_reply);

    let download = warp::path!("api" / "download")
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with_downloader.clone())
        .and_then(handle_download);

    let progress = warp::path!("api" / "progress" / String)
        .and(warp::get())
        .and(with_downloader.clone())
        .and_then(handle_progress);

    let info = warp::path!("api" / "info")
        .and(warp::get())
        .and(warp::query::<InfoQuery>())
        .and(with_downloader)
        .and_then(handle_info);

    let files = warp::path!("downloads" / String)
        .and(warp::get())
        .and(warp::any().map(move || downloads_dir.clone()))
        .and_then(serve_download);

    root.or(health)
        .or(download)
        .or(progress)
        .or(info)
        .or(files)
        .recover(handle_rejection)
        .with(cors(cors_origins))
}

fn cors(origins: &[String]) -> warp::filters::cors::Builder {
    // warp panics on malformed origins, so normalize through url first
    let origins: Vec<String> = origins
        .iter()
        .filter_map(|raw| match url::Url::parse(raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {
                Some(url.origin().ascii_serialization())
            }
            _ => {
                log::warn!("Ignoring invalid CORS origin: {}", raw);
                None
            }
        })
        .collect();

    warp::cors()
        .allow_origins(origins.iter().map(String::as_str))
        .allow_methods(vec!["GET", "POST", "OPTIONS"])
        .allow_headers(vec!["Content-Type"])
}

fn health_reply() -> warp::reply::Json {
    let timestamp = time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default();
    warp::reply::json(&serde_json::json!({
        "status": "healthy",
        "timestamp": timestamp,
    }))
}

fn error_reply(status: StatusCode, message: impl Into<String>) -> Response {
    let error = status.canonical_reason().unwrap_or("Error");
    warp::reply::with_status(
        warp::reply::json(&serde_json::json!({
            "error": error,
            "message": message.into(),
        })),
        status,
    )
    .into_response()
}

async fn handle_download(
    body: DownloadRequestBody,
    downloader: Arc<Downloader>,
) -> Result<Response, warp::Rejection> {
    // Run on its own task so a dropped client connection does not cancel the download
    let task = tokio::spawn(async move { downloader.submit(body).await });

    let reply = match task.await {
        Ok(Ok(result)) => warp::reply::with_status(
            warp::reply::json(&DownloadResponse::completed(result)),
            StatusCode::OK,
        ),
        Ok(Err(err)) => {
            let status = match err {
                SubmitError::Rejected(_) => StatusCode::BAD_REQUEST,
                SubmitError::Failed(_) => StatusCode::OK,
            };
            warp::reply::with_status(warp::reply::json(&DownloadResponse::failed(&err)), status)
        }
        Err(join_err) => {
            log::error!("Download task aborted: {}", join_err);
            return Ok(error_reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Download task aborted",
            ));
        }
    };

    Ok(reply.into_response())
}

async fn handle_progress(
    id: String,
    downloader: Arc<Downloader>,
) -> Result<Response, warp::Rejection> {
    match downloader.poll_progress(&id).await {
        Some(entry) => Ok(warp::reply::json(&entry).into_response()),
        None => Ok(error_reply(StatusCode::NOT_FOUND, "Download not found")),
    }
}

async fn handle_info(
    query: InfoQuery,
    downloader: Arc<Downloader>,
) -> Result<Response, warp::Rejection> {
    let url = match query.url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => url.to_string(),
        _ => return Ok(error_reply(StatusCode::BAD_REQUEST, "url is required")),
    };

    match downloader.peek_metadata(&url).await {
        Ok(details) => Ok(warp::reply::json(&details).into_response()),
        Err(ExtractionError::NoMetadata) => Ok(error_reply(
            StatusCode::BAD_REQUEST,
            ExtractionError::NoMetadata.to_string(),
        )),
        Err(e) => Ok(error_reply(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to get video info: {}", e),
        )),
    }
}

/// Artifact names produced with restricted filenames never need escaping,
/// so anything that could walk out of the downloads directory is refused.
fn is_safe_filename(name: &str) -> bool {
    !name.is_empty()
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains("..")
        && !name.contains('%')
}

async fn serve_download(filename: String, base_dir: PathBuf) -> Result<Response, warp::Rejection> {
    if !is_safe_filename(&filename) {
        log::warn!("Refusing to serve suspicious path: {}", filename);
        return Ok(error_reply(StatusCode::BAD_REQUEST, "Invalid filename"));
    }

    let file_path = base_dir.join(&filename);
    if !file_path.is_file() {
        return Ok(error_reply(StatusCode::NOT_FOUND, "File not found"));
    }

    let body = match tokio::fs::read(&file_path).await {
        Ok(body) => body,
        Err(e) => {
            log::error!("Failed to read {}: {}", file_path.display(), e);
            return Ok(error_reply(StatusCode::NOT_FOUND, "File not found"));
        }
    };

    // Vec<u8> replies as application/octet-stream
    let reply = warp::reply::with_header(
        body,
        "Content-Disposition",
        format!("attachment; filename=\"{}\"", filename),
    );
    Ok(reply.into_response())
}

async fn handle_rejection(err: warp::Rejection) -> Result<Response, Infallible> {
    let reply = if err.is_not_found() {
        error_reply(StatusCode::NOT_FOUND, "Not Found")
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        error_reply(StatusCode::BAD_REQUEST, format!("Invalid request body: {}", e))
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        error_reply(StatusCode::BAD_REQUEST, "Invalid query string")
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        error_reply(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large")
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        error_reply(StatusCode::UNSUPPORTED_MEDIA_TYPE, "Expected a JSON body")
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        error_reply(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    } else {
        log::error!("Unhandled rejection: {:?}", err);
        error_reply(
            StatusCode::INTERNAL_SERVER_ERROR,
            "An unexpected error occurred",
        )
    };
    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_filename() {
        assert!(is_safe_filename("My_Video.mp4"));
        assert!(!is_safe_filename("../etc/passwd"));
        assert!(!is_safe_filename("..%2Fsecret"));
        assert!(!is_safe_filename("a\\b"));
        assert!(!is_safe_filename(""));
    }

    #[test]
    fn test_failed_envelope_carries_kind() {
        let err = SubmitError::from(crate::downloader::ValidationError::MissingField("URL"));
        let body = serde_json::to_value(DownloadResponse::failed(&err)).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "URL is required");
        assert_eq!(body["error_kind"], "validation");
        assert!(body.get("data").is_none());
    }
}

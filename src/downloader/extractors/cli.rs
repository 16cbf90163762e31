// yt-dlp extractor - drives the yt-dlp command line
//
// Metadata comes from `-J`. Downloads run with a machine-readable progress
// template on stdout plus an `after_move` print carrying the final path,
// so post-processed files (merged video, extracted audio) are reported
// rather than their intermediate streams.

use async_trait::async_trait;
use regex::Regex;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command as TokioCommand;

use crate::downloader::errors::ExtractionError;
use crate::downloader::models::{DownloadSpec, Metadata};
use crate::downloader::traits::{ExtractionOutcome, Extractor, ProgressEvent, ProgressObserver};
use crate::downloader::utils::{
    find_ytdlp, parse_f64_field, parse_field, parse_u64_field, run_output,
};

const PROGRESS_TEMPLATE: &str = "download:[progress] %(info.id)s\t%(progress.status)s\t\
%(progress.downloaded_bytes)s\t%(progress.total_bytes)s\t%(progress.total_bytes_estimate)s\t\
%(progress.speed)s\t%(progress.eta)s\t%(progress.filename)s";

const COMPLETE_PRINT: &str = "after_move:[complete] %(id)s\t%(filepath)s";

lazy_static::lazy_static! {
    static ref MARKER_RE: Regex = Regex::new(r"^\[(progress|complete)\] (.*)$").unwrap();
    static ref STDERR_RE: Regex = Regex::new(r"^(WARNING|ERROR):\s*(.*)$").unwrap();
}

/// A single classified line of yt-dlp output
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum OutputLine {
    Event(ProgressEvent),
    Warning(String),
    Error(String),
    Other,
}

/// Extractor backed by the yt-dlp binary or the `yt_dlp` Python module
pub struct CliExtractor {
    program: String,
    prefix_args: Vec<String>,
    socket_timeout: Option<u32>,
}

impl CliExtractor {
    /// Use the yt-dlp binary found on this machine
    pub fn new() -> Self {
        Self::with_binary(find_ytdlp())
    }

    pub fn with_binary(path: impl Into<String>) -> Self {
        Self::with_command(path, Vec::new())
    }

    /// Run yt-dlp as `python -m yt_dlp`
    pub fn python_module(python: impl Into<String>) -> Self {
        Self::with_command(python, vec!["-m".to_string(), "yt_dlp".to_string()])
    }

    /// Arbitrary launcher: `program prefix_args... <yt-dlp args>`
    pub fn with_command(program: impl Into<String>, prefix_args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            prefix_args,
            socket_timeout: None,
        }
    }

    pub fn with_socket_timeout(mut self, seconds: Option<u32>) -> Self {
        self.socket_timeout = seconds;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn base_args(&self) -> Vec<String> {
        let mut args = self.prefix_args.clone();
        if let Some(timeout) = self.socket_timeout {
            args.push("--socket-timeout".to_string());
            args.push(timeout.to_string());
        }
        args
    }

    pub(crate) fn build_metadata_args(&self, url: &str) -> Vec<String> {
        let mut args = self.base_args();
        args.extend(["-J".to_string(), "--no-warnings".to_string()]);
        args.push(url.to_string());
        args
    }

    pub(crate) fn build_download_args(&self, url: &str, spec: &DownloadSpec) -> Vec<String> {
        let mut args = self.base_args();
        args.extend([
            "-f".to_string(),
            spec.format.clone(),
            "-o".to_string(),
            spec.output_template.clone(),
            "--newline".to_string(),
            "--progress".to_string(),
            "--progress-template".to_string(),
            PROGRESS_TEMPLATE.to_string(),
            "--print".to_string(),
            COMPLETE_PRINT.to_string(),
            "--no-simulate".to_string(),
        ]);

        if spec.restrict_filenames {
            args.push("--restrict-filenames".to_string());
        }
        if spec.ignore_errors {
            args.push("--ignore-errors".to_string());
        }
        if spec.write_info_json {
            args.push("--write-info-json".to_string());
        }
        if spec.write_thumbnail {
            args.push("--write-thumbnail".to_string());
        }
        if let Some(audio) = &spec.extract_audio {
            args.extend([
                "-x".to_string(),
                "--audio-format".to_string(),
                audio.format.clone(),
                "--audio-quality".to_string(),
                audio_quality_arg(&audio.quality),
            ]);
        }

        args.push(url.to_string());
        args
    }
}

impl Default for CliExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// yt-dlp reads 0-10 as a VBR level and anything larger needs a unit
fn audio_quality_arg(quality: &str) -> String {
    match quality.parse::<u32>() {
        Ok(kbps) if kbps > 10 => format!("{}K", kbps),
        _ => quality.to_string(),
    }
}

/// Parse `-J` output
pub(crate) fn parse_metadata(stdout: &[u8]) -> Result<Metadata, ExtractionError> {
    let text = String::from_utf8_lossy(stdout);
    let text = text.trim();
    if text.is_empty() || text == "null" {
        return Err(ExtractionError::NoMetadata);
    }

    let json: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| ExtractionError::Parse(format!("Invalid JSON: {}", e)))?;
    if !json.is_object() {
        return Err(ExtractionError::NoMetadata);
    }

    let text_field = |key: &str| json[key].as_str().map(|s| s.to_string());

    Ok(Metadata {
        id: text_field("id"),
        title: text_field("title"),
        duration: json["duration"].as_f64().map(|d| d.max(0.0).round() as u64),
        uploader: text_field("uploader"),
        view_count: json["view_count"].as_u64(),
        description: text_field("description"),
        thumbnail: text_field("thumbnail"),
        upload_date: text_field("upload_date"),
        format_count: json["formats"].as_array().map_or(0, |f| f.len()),
    })
}

/// Classify one line of yt-dlp output
pub(crate) fn parse_line(line: &str) -> OutputLine {
    let line = line.trim_end_matches(['\r', '\n']);

    if let Some(caps) = MARKER_RE.captures(line) {
        let body = caps.get(2).map_or("", |m| m.as_str());
        let event = match &caps[1] {
            "progress" => parse_progress_fields(body),
            _ => parse_complete_fields(body),
        };
        return event.map_or(OutputLine::Other, OutputLine::Event);
    }

    if let Some(caps) = STDERR_RE.captures(line) {
        let message = caps[2].to_string();
        return match &caps[1] {
            "WARNING" => OutputLine::Warning(message),
            _ => OutputLine::Error(message),
        };
    }

    OutputLine::Other
}

fn parse_progress_fields(body: &str) -> Option<ProgressEvent> {
    let fields: Vec<&str> = body.splitn(8, '\t').collect();
    if fields.len() < 8 {
        return None;
    }

    // A "finished" status here only closes one stream of a possibly merged
    // item; the item itself is done once the `[complete]` line arrives.
    if parse_field(fields[1])? != "downloading" {
        return None;
    }

    Some(ProgressEvent::Downloading {
        content_id: parse_field(fields[0]).map(|s| s.to_string()),
        downloaded_bytes: parse_u64_field(fields[2]),
        total_bytes: parse_u64_field(fields[3]),
        total_bytes_estimate: parse_u64_field(fields[4]),
        speed: parse_f64_field(fields[5]),
        eta: parse_u64_field(fields[6]),
    })
}

fn parse_complete_fields(body: &str) -> Option<ProgressEvent> {
    let (id, path) = body.split_once('\t')?;
    Some(ProgressEvent::Finished {
        content_id: parse_field(id).map(|s| s.to_string()),
        filename: PathBuf::from(parse_field(path)?),
    })
}

#[async_trait]
impl Extractor for CliExtractor {
    fn name(&self) -> &'static str {
        if self.prefix_args.is_empty() {
            "yt-dlp"
        } else {
            "yt-dlp-module"
        }
    }

    async fn extract_metadata(&self, url: &str) -> Result<Metadata, ExtractionError> {
        let args = self.build_metadata_args(url);
        log::debug!("[{}] {} {}", self.name(), self.program, args.join(" "));

        let output = run_output(&self.program, args).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if stderr.is_empty() {
                return Err(ExtractionError::NoMetadata);
            }
            return Err(ExtractionError::from(stderr));
        }

        parse_metadata(&output.stdout)
    }

    async fn download(
        &self,
        url: &str,
        spec: &DownloadSpec,
        observer: &dyn ProgressObserver,
    ) -> Result<ExtractionOutcome, ExtractionError> {
        let args = self.build_download_args(url, spec);
        log::info!("[{}] Downloading {} with format '{}'", self.name(), url, spec.format);
        log::debug!("[{}] {} {}", self.name(), self.program, args.join(" "));

        let mut child = TokioCommand::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExtractionError::from(format!("Failed to start {}: {}", self.program, e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ExtractionError::Execution("Failed to capture stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ExtractionError::Execution("Failed to capture stderr".to_string()))?;

        // stderr is drained on its own task so a chatty extractor cannot
        // block on a full pipe while we read stdout
        let stderr_task = tokio::spawn(async move {
            let mut warnings = Vec::new();
            let mut errors = Vec::new();
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                log::debug!("yt-dlp stderr: {}", line);
                match parse_line(&line) {
                    OutputLine::Warning(w) => warnings.push(w),
                    OutputLine::Error(e) => errors.push(e),
                    _ if !line.trim().is_empty() => errors.push(line),
                    _ => {}
                }
            }
            (warnings, errors)
        });

        let mut finished_items = 0usize;
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            log::debug!("yt-dlp: {}", line);
            if let OutputLine::Event(event) = parse_line(&line) {
                if matches!(event, ProgressEvent::Finished { .. }) {
                    finished_items += 1;
                }
                observer.on_event(event).await;
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| ExtractionError::Execution(format!("Process error: {}", e)))?;
        let (mut warnings, errors) = stderr_task
            .await
            .map_err(|e| ExtractionError::Execution(format!("stderr task failed: {}", e)))?;

        if status.success() {
            return Ok(if warnings.is_empty() {
                ExtractionOutcome::Succeeded
            } else {
                ExtractionOutcome::SucceededWithWarnings(warnings)
            });
        }

        if finished_items > 0 {
            log::warn!(
                "[{}] {} exited with {} after finishing {} item(s)",
                self.name(),
                url,
                status,
                finished_items
            );
            warnings.extend(errors);
            return Ok(ExtractionOutcome::SucceededWithWarnings(warnings));
        }

        if errors.is_empty() {
            Err(ExtractionError::Execution(format!(
                "yt-dlp exited with {}",
                status
            )))
        } else {
            Err(ExtractionError::from(errors.join("\n")))
        }
    }
}

// Helper functions for running the extractor binary

use std::path::PathBuf;
use std::process::{Command as StdCommand, Output, Stdio};
use tokio::io::AsyncReadExt;
use tokio::process::Command as TokioCommand;

/// Run a command to completion, collecting stdout and stderr concurrently
pub async fn run_output(program: &str, args: Vec<String>) -> Result<Output, String> {
    let mut child = TokioCommand::new(program)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| format!("Failed to start {}: {}", program, e))?;

    let mut stdout_pipe = child
        .stdout
        .take()
        .ok_or_else(|| format!("Failed to capture stdout from {}", program))?;
    let mut stderr_pipe = child
        .stderr
        .take()
        .ok_or_else(|| format!("Failed to capture stderr from {}", program))?;

    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stdout_pipe
            .read_to_end(&mut buf)
            .await
            .map_err(|e| format!("Failed to read stdout: {}", e))?;
        Ok::<Vec<u8>, String>(buf)
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stderr_pipe
            .read_to_end(&mut buf)
            .await
            .map_err(|e| format!("Failed to read stderr: {}", e))?;
        Ok::<Vec<u8>, String>(buf)
    });

    let status = child
        .wait()
        .await
        .map_err(|e| format!("Failed to wait for {}: {}", program, e))?;
    let stdout = stdout_task
        .await
        .map_err(|e| format!("stdout task failed: {}", e))??;
    let stderr = stderr_task
        .await
        .map_err(|e| format!("stderr task failed: {}", e))??;

    Ok(Output {
        status,
        stdout,
        stderr,
    })
}

/// Locate the yt-dlp binary
pub fn find_ytdlp() -> String {
    let mut candidates: Vec<PathBuf> = vec![
        PathBuf::from("/opt/homebrew/bin/yt-dlp"), // Homebrew on Apple Silicon
        PathBuf::from("/usr/local/bin/yt-dlp"),    // Homebrew on Intel Mac, pipx
        PathBuf::from("/usr/bin/yt-dlp"),          // System installation
    ];
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".local/bin/yt-dlp")); // pip --user
    }

    for path in candidates {
        if path.exists() {
            return path.to_string_lossy().to_string();
        }
    }

    if let Ok(output) = StdCommand::new("which").arg("yt-dlp").output() {
        if output.status.success() {
            let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !path.is_empty() {
                return path;
            }
        }
    }

    "yt-dlp".to_string()
}

/// Parse a yt-dlp template field; "NA" and "None" mean absent
pub fn parse_field(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    match trimmed {
        "" | "NA" | "None" | "null" => None,
        other => Some(other),
    }
}

/// Parse a numeric template field, tolerating floats for integer counters
pub fn parse_u64_field(raw: &str) -> Option<u64> {
    parse_field(raw)
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v.round() as u64)
}

pub fn parse_f64_field(raw: &str) -> Option<f64> {
    parse_field(raw)
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_field_treats_placeholders_as_absent() {
        assert_eq!(parse_field("NA"), None);
        assert_eq!(parse_field(" None "), None);
        assert_eq!(parse_field("abc"), Some("abc"));
    }

    #[test]
    fn test_parse_numeric_fields() {
        assert_eq!(parse_u64_field("1024"), Some(1024));
        assert_eq!(parse_u64_field("1023.6"), Some(1024));
        assert_eq!(parse_u64_field("NA"), None);
        assert_eq!(parse_u64_field("-5"), None);
        assert_eq!(parse_f64_field("2048.5"), Some(2048.5));
        assert_eq!(parse_f64_field("inf"), None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_output_collects_both_streams() {
        let output = run_output(
            "sh",
            vec!["-c".to_string(), "echo out; echo err >&2; exit 3".to_string()],
        )
        .await
        .unwrap();
        assert_eq!(output.status.code(), Some(3));
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "out");
        assert_eq!(String::from_utf8_lossy(&output.stderr).trim(), "err");
    }

    #[tokio::test]
    async fn test_run_output_missing_program() {
        let err = run_output("definitely-not-a-real-binary-xyz", Vec::new())
            .await
            .unwrap_err();
        assert!(err.contains("Failed to start"));
    }
}

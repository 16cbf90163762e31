//! Runtime configuration for the MediaGrab server.
//!
//! Every option can come from the command line or a `MEDIAGRAB_*`
//! environment variable.

use clap::Parser;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::downloader::{CliExtractor, Extractor};

/// MediaGrab - download YouTube and Instagram media through yt-dlp
#[derive(Parser, Debug, Clone)]
#[command(name = "mediagrab", version, about)]
pub struct ServerConfig {
    /// Address to bind
    #[arg(long, env = "MEDIAGRAB_HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(short, long, env = "MEDIAGRAB_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Directory finished downloads are written to and served from
    #[arg(long, env = "MEDIAGRAB_DOWNLOADS_DIR", value_name = "DIR", default_value = "downloads")]
    pub downloads_dir: PathBuf,

    /// Path to the yt-dlp binary (discovered when omitted)
    #[arg(long, env = "MEDIAGRAB_YTDLP", value_name = "PATH")]
    pub ytdlp: Option<String>,

    /// Run yt-dlp as a module of this Python interpreter instead of a binary
    #[arg(long, env = "YTDLP_PYTHON", value_name = "PYTHON", conflicts_with = "ytdlp")]
    pub python: Option<String>,

    /// Network timeout handed to yt-dlp, in seconds
    #[arg(long, env = "MEDIAGRAB_SOCKET_TIMEOUT", value_name = "SECS")]
    pub socket_timeout: Option<u32>,

    /// Seconds a finished or failed progress entry stays pollable (0 keeps them forever)
    #[arg(long, env = "MEDIAGRAB_PROGRESS_TTL", value_name = "SECS", default_value_t = 3600)]
    pub progress_ttl: u64,

    /// Seconds between progress eviction sweeps
    #[arg(long, env = "MEDIAGRAB_SWEEP_INTERVAL", value_name = "SECS", default_value_t = 60)]
    pub sweep_interval: u64,

    /// Origins allowed to call the API from a browser
    #[arg(
        long = "cors-origin",
        env = "MEDIAGRAB_CORS_ORIGINS",
        value_delimiter = ',',
        default_values_t = vec!["http://localhost:3000".to_string(), "http://127.0.0.1:3000".to_string()]
    )]
    pub cors_origins: Vec<String>,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn progress_ttl(&self) -> Option<Duration> {
        (self.progress_ttl > 0).then(|| Duration::from_secs(self.progress_ttl))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval.max(1))
    }

    /// Extractor described by this configuration
    pub fn extractor(&self) -> Arc<dyn Extractor> {
        let extractor = match (&self.python, &self.ytdlp) {
            (Some(python), _) => CliExtractor::python_module(python.clone()),
            (None, Some(path)) => CliExtractor::with_binary(path.clone()),
            (None, None) => CliExtractor::new(),
        };
        Arc::new(extractor.with_socket_timeout(self.socket_timeout))
    }
}

pub mod api;
pub mod config;
pub mod downloader;

use std::sync::Arc;
use thiserror::Error;

use config::ServerConfig;
use downloader::{Downloader, FormatSelector, ProgressStore};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to prepare downloads directory {path}: {source}")]
    DownloadsDir {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to bind server: {0}")]
    Bind(#[from] warp::Error),
}

/// Build the downloader described by `config`
pub fn build_downloader(config: &ServerConfig) -> Downloader {
    let store = match config.progress_ttl() {
        Some(ttl) => ProgressStore::with_ttl(ttl),
        None => ProgressStore::new(),
    };
    Downloader::new(
        config.extractor(),
        store,
        FormatSelector::new(config.downloads_dir.clone()),
    )
}

/// Drop expired progress entries until the process exits
fn spawn_progress_sweeper(store: ProgressStore, every: std::time::Duration) {
    if store.ttl().is_none() {
        return;
    }
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            store.evict_expired().await;
        }
    });
}

pub async fn run(config: ServerConfig) -> Result<(), ServerError> {
    tokio::fs::create_dir_all(&config.downloads_dir)
        .await
        .map_err(|source| ServerError::DownloadsDir {
            path: config.downloads_dir.display().to_string(),
            source,
        })?;

    let downloader = Arc::new(build_downloader(&config));
    log::info!(
        "Using extractor {} writing to {}",
        downloader.extractor_name(),
        config.downloads_dir.display()
    );
    spawn_progress_sweeper(downloader.store().clone(), config.sweep_interval());

    let routes = api::routes(
        downloader,
        config.downloads_dir.clone(),
        &config.cors_origins,
    );

    let (addr, server) = warp::serve(routes).try_bind_with_graceful_shutdown(
        config.bind_addr(),
        async {
            tokio::signal::ctrl_c().await.ok();
            log::info!("Shutdown signal received");
        },
    )?;

    log::info!("MediaGrab server listening on http://{}", addr);
    server.await;
    log::info!("Server stopped");
    Ok(())
}

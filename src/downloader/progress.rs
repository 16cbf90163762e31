// Progress tracking shared between running downloads and polling clients

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Lifecycle state of a tracked download
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    Starting,
    Downloading,
    Finished,
    Failed,
}

impl ProgressStatus {
    /// Finished and failed entries expect no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Failed)
    }
}

/// Progress of a single download, keyed by content id in the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub status: ProgressStatus,
    pub percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip, default = "Instant::now")]
    updated_at: Instant,
}

impl ProgressEntry {
    fn new() -> Self {
        Self {
            status: ProgressStatus::Starting,
            percent: 0.0,
            speed: None,
            eta: None,
            title: None,
            filename: None,
            error: None,
            updated_at: Instant::now(),
        }
    }

    /// Merge a partial update. Returns false when the update was dropped
    /// because it would move a terminal entry back to a running state.
    fn apply(&mut self, update: ProgressUpdate) -> bool {
        let next = update.status.unwrap_or(self.status);
        if self.status.is_terminal() && !next.is_terminal() {
            return false;
        }

        if let Some(percent) = update.percent {
            let percent = round2(percent.clamp(0.0, 100.0));
            self.percent = if self.status == ProgressStatus::Downloading
                && next == ProgressStatus::Downloading
            {
                self.percent.max(percent)
            } else {
                percent
            };
        }
        if update.speed.is_some() {
            self.speed = update.speed;
        }
        if update.eta.is_some() {
            self.eta = update.eta;
        }
        if update.title.is_some() {
            self.title = update.title;
        }
        if update.filename.is_some() {
            self.filename = update.filename;
        }
        if update.error.is_some() {
            self.error = update.error;
        }

        self.status = next;
        self.updated_at = Instant::now();
        true
    }
}

/// Partial update merged into an entry by `ProgressStore::upsert`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressUpdate {
    pub status: Option<ProgressStatus>,
    pub percent: Option<f64>,
    pub speed: Option<f64>,
    pub eta: Option<u64>,
    pub title: Option<String>,
    pub filename: Option<String>,
    pub error: Option<String>,
}

impl ProgressUpdate {
    pub fn starting(title: impl Into<String>) -> Self {
        Self {
            status: Some(ProgressStatus::Starting),
            percent: Some(0.0),
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn downloading(percent: f64, speed: Option<f64>, eta: Option<u64>) -> Self {
        Self {
            status: Some(ProgressStatus::Downloading),
            percent: Some(percent),
            speed,
            eta,
            ..Default::default()
        }
    }

    pub fn finished(filename: impl Into<String>) -> Self {
        Self {
            status: Some(ProgressStatus::Finished),
            percent: Some(100.0),
            filename: Some(filename.into()),
            ..Default::default()
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: Some(ProgressStatus::Failed),
            error: Some(message.into()),
            ..Default::default()
        }
    }
}

/// Percent complete from byte counters.
///
/// Uses the exact total when known, then the estimate, else 0. Always in
/// [0, 100] and rounded to two decimals.
pub fn compute_percent(downloaded: u64, total: Option<u64>, estimate: Option<u64>) -> f64 {
    let denominator = total.filter(|t| *t > 0).or(estimate.filter(|e| *e > 0));
    match denominator {
        Some(d) => round2((downloaded as f64 / d as f64 * 100.0).clamp(0.0, 100.0)),
        None => 0.0,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Keyed progress state, cheap to clone and share across tasks.
///
/// A single lock guards the map; updates arrive per progress line, not
/// per byte, so contention stays low.
#[derive(Debug, Clone)]
pub struct ProgressStore {
    entries: Arc<RwLock<HashMap<String, ProgressEntry>>>,
    ttl: Option<Duration>,
}

impl ProgressStore {
    /// Store that never evicts
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl: None,
        }
    }

    /// Store whose terminal entries expire `ttl` after their last update
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl: Some(ttl),
            ..Self::new()
        }
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Merge `update` into the entry for `id`, creating it if absent
    pub async fn upsert(&self, id: &str, update: ProgressUpdate) -> ProgressEntry {
        let mut entries = self.entries.write().await;
        let entry = entries
            .entry(id.to_string())
            .or_insert_with(ProgressEntry::new);

        if !entry.apply(update) {
            log::debug!(
                "Dropped non-terminal update for {} (already {:?})",
                id,
                entry.status
            );
        }
        entry.clone()
    }

    /// Start a new lifecycle for `id`, replacing whatever a previous
    /// download of the same content left behind
    pub async fn begin(&self, id: &str, title: impl Into<String>) -> ProgressEntry {
        let mut entry = ProgressEntry::new();
        entry.apply(ProgressUpdate::starting(title));

        let previous = self
            .entries
            .write()
            .await
            .insert(id.to_string(), entry.clone());
        if let Some(previous) = previous.filter(|p| !p.status.is_terminal()) {
            log::warn!(
                "Restarting progress for {} while a download of it is still {:?}",
                id,
                previous.status
            );
        }
        entry
    }

    pub async fn get(&self, id: &str) -> Option<ProgressEntry> {
        self.entries.read().await.get(id).cloned()
    }

    pub async fn mark_failed(&self, id: &str, message: impl Into<String>) -> ProgressEntry {
        self.upsert(id, ProgressUpdate::failed(message)).await
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Drop terminal entries older than the TTL. Returns how many went.
    pub async fn evict_expired(&self) -> usize {
        let Some(ttl) = self.ttl else {
            return 0;
        };

        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| !(e.status.is_terminal() && e.updated_at.elapsed() >= ttl));
        let evicted = before - entries.len();

        if evicted > 0 {
            log::info!("Evicted {} expired progress entries", evicted);
        }
        evicted
    }
}

impl Default for ProgressStore {
    fn default() -> Self {
        Self::new()
    }
}

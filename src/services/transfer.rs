use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use serde::Serialize;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::watch;

use crate::errors::{CompanionError, Result};

/// Minimum interval between intermediate progress emissions, so a fast
/// stream does not flood subscribers. The final emission is unconditional.
const PROGRESS_EMIT_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferPhase {
    Idle,
    InProgress,
    Cancelled,
    Failed,
    Completed,
}

/// Byte counts and derived rate for one transfer. `percent` stays 0 while
/// `total` is unknown (0); consumers never divide by it themselves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct TransferProgress {
    pub downloaded: u64,
    pub total: u64,
    pub speed_bps: f64,
    pub percent: f64,
}

/// Observable state of the manager, published through a watch channel.
#[derive(Clone, Debug, Serialize)]
pub struct TransferSnapshot {
    pub phase: TransferPhase,
    pub progress: TransferProgress,
    pub error: Option<String>,
}

impl TransferSnapshot {
    fn idle() -> Self {
        Self {
            phase: TransferPhase::Idle,
            progress: TransferProgress::default(),
            error: None,
        }
    }

    pub fn cancellable(&self) -> bool {
        self.phase == TransferPhase::InProgress
    }
}

/// Owns at most one outstanding download-to-file operation.
///
/// A second `start` while one is in flight is rejected with
/// [`CompanionError::TransferBusy`]; the caller retries after the current
/// transfer reaches a terminal phase.
#[derive(Clone)]
pub struct TransferManager {
    client: reqwest::Client,
    cancel: Arc<AtomicBool>,
    in_flight: Arc<AtomicBool>,
    snapshot_tx: Arc<watch::Sender<TransferSnapshot>>,
}

impl Default for TransferManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Clears the in-flight marker even if the transfer future is dropped.
struct FlightGuard(Arc<AtomicBool>);

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl TransferManager {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self::with_client(client)
    }

    /// Build with a caller-configured client, e.g. to set timeouts.
    pub fn with_client(client: reqwest::Client) -> Self {
        let (snapshot_tx, _) = watch::channel(TransferSnapshot::idle());
        Self {
            client,
            cancel: Arc::new(AtomicBool::new(false)),
            in_flight: Arc::new(AtomicBool::new(false)),
            snapshot_tx: Arc::new(snapshot_tx),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<TransferSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn snapshot(&self) -> TransferSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Request cooperative cancellation of the in-flight transfer. No-op
    /// when nothing is in flight.
    pub fn cancel(&self) {
        if self.in_flight.load(Ordering::SeqCst) {
            self.cancel.store(true, Ordering::SeqCst);
            tracing::info!("transfer cancellation requested");
        }
    }

    /// Drop the recorded error and return a failed manager to `Idle`. An
    /// in-progress transfer is left untouched.
    pub fn clear_error(&self) {
        self.snapshot_tx.send_modify(|snapshot| {
            if snapshot.phase == TransferPhase::InProgress {
                return;
            }
            snapshot.error = None;
            if snapshot.phase == TransferPhase::Failed {
                snapshot.phase = TransferPhase::Idle;
            }
        });
    }

    /// Download `url` to `dest_path`, resolving with the path once the file
    /// is fully written and flushed. Progress snapshots are published while
    /// the byte stream is consumed; a fresh start resets progress to zero
    /// and overwrites any prior terminal state.
    pub async fn start(&self, url: &str, dest_path: &Path) -> Result<PathBuf> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            return Err(CompanionError::TransferBusy);
        }
        let _guard = FlightGuard(Arc::clone(&self.in_flight));
        self.cancel.store(false, Ordering::SeqCst);

        self.publish(TransferPhase::InProgress, TransferProgress::default(), None);
        tracing::info!(url, dest = %dest_path.display(), "transfer started");

        match self.run(url, dest_path).await {
            Ok(progress) => {
                self.publish(TransferPhase::Completed, progress, None);
                tracing::info!(bytes = progress.downloaded, "transfer completed");
                Ok(dest_path.to_path_buf())
            }
            Err(CompanionError::Cancelled) => {
                let progress = self.snapshot_tx.borrow().progress;
                self.publish(TransferPhase::Cancelled, progress, None);
                tracing::info!("transfer cancelled");
                Err(CompanionError::Cancelled)
            }
            Err(err) => {
                let progress = self.snapshot_tx.borrow().progress;
                self.publish(TransferPhase::Failed, progress, Some(err.to_string()));
                tracing::warn!(error = %err, "transfer failed");
                Err(err)
            }
        }
    }

    async fn run(&self, url: &str, dest_path: &Path) -> Result<TransferProgress> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CompanionError::Http(format!(
                "Download failed with status: {status}"
            )));
        }

        let total = response.content_length().unwrap_or(0);

        if let Some(parent) = dest_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = File::create(dest_path).await?;

        let started = Instant::now();
        let mut last_emit = started;
        let mut downloaded: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            // Cooperative cancel between chunks; received bytes are discarded.
            if self.cancel.load(Ordering::SeqCst) {
                drop(file);
                let _ = tokio::fs::remove_file(dest_path).await;
                return Err(CompanionError::Cancelled);
            }

            let chunk = chunk?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;

            let now = Instant::now();
            if now.duration_since(last_emit) >= PROGRESS_EMIT_INTERVAL {
                self.publish(
                    TransferPhase::InProgress,
                    measure(downloaded, total, started),
                    None,
                );
                last_emit = now;
            }
        }

        file.flush().await?;

        let mut progress = measure(downloaded, total, started);
        if total > 0 {
            progress.percent = 100.0;
        }
        Ok(progress)
    }

    fn publish(&self, phase: TransferPhase, progress: TransferProgress, error: Option<String>) {
        let _ = self.snapshot_tx.send(TransferSnapshot {
            phase,
            progress,
            error,
        });
    }
}

fn measure(downloaded: u64, total: u64, started: Instant) -> TransferProgress {
    let elapsed = started.elapsed().as_secs_f64();
    let speed_bps = if elapsed > 0.0 {
        downloaded as f64 / elapsed
    } else {
        0.0
    };
    let percent = if total > 0 {
        downloaded as f64 / total as f64 * 100.0
    } else {
        0.0
    };
    TransferProgress {
        downloaded,
        total,
        speed_bps,
        percent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_manager_is_idle_and_not_cancellable() {
        let manager = TransferManager::new();
        let snapshot = manager.snapshot();
        assert_eq!(snapshot.phase, TransferPhase::Idle);
        assert!(!snapshot.cancellable());
        assert_eq!(snapshot.progress, TransferProgress::default());
    }

    #[test]
    fn measure_guards_unknown_total() {
        let progress = measure(4096, 0, Instant::now());
        assert_eq!(progress.downloaded, 4096);
        assert_eq!(progress.percent, 0.0);
    }

    #[test]
    fn clear_error_resets_failed_to_idle() {
        let manager = TransferManager::new();
        manager.publish(
            TransferPhase::Failed,
            TransferProgress::default(),
            Some("boom".to_string()),
        );
        manager.clear_error();
        let snapshot = manager.snapshot();
        assert_eq!(snapshot.phase, TransferPhase::Idle);
        assert!(snapshot.error.is_none());
    }

    #[test]
    fn clear_error_leaves_in_progress_untouched() {
        let manager = TransferManager::new();
        let progress = TransferProgress {
            downloaded: 10,
            total: 100,
            speed_bps: 1.0,
            percent: 10.0,
        };
        manager.publish(TransferPhase::InProgress, progress, None);
        manager.clear_error();
        let snapshot = manager.snapshot();
        assert_eq!(snapshot.phase, TransferPhase::InProgress);
        assert_eq!(snapshot.progress, progress);
    }

    #[tokio::test]
    async fn unreachable_url_fails_and_records_error() {
        let manager = TransferManager::new();
        let dest = std::env::temp_dir().join(format!("companion-transfer-{}.zip", uuid::Uuid::new_v4()));
        let result = manager.start("http://127.0.0.1:1/pack.zip", &dest).await;
        assert!(matches!(result, Err(CompanionError::Network(_))));
        let snapshot = manager.snapshot();
        assert_eq!(snapshot.phase, TransferPhase::Failed);
        assert!(snapshot.error.is_some());
    }
}

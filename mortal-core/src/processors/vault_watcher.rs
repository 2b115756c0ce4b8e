//! Periodic agent status refresh for dashboard-style views.

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::api::AgentApi;
use crate::events::{StatusSnapshot, StatusSnapshotReceiver, StatusSnapshotSender, status_snapshot_channel};

/// Polls `GET /status` and publishes the latest result.
///
/// Unlike the order poller this never stops on its own; it runs until the
/// shutdown signal fires or every subscriber is gone. A failed fetch keeps
/// the last good status and only bumps the failure counter.
pub struct VaultStatusWatcher {
    api: Arc<dyn AgentApi>,
    interval: Duration,
    tx: StatusSnapshotSender,
}

impl VaultStatusWatcher {
    pub fn new(api: Arc<dyn AgentApi>, interval: Duration) -> (Self, StatusSnapshotReceiver) {
        let (tx, rx) = status_snapshot_channel();
        (Self { api, interval, tx }, rx)
    }

    /// Run until shutdown. The first fetch is immediate.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(interval = ?self.interval, "VaultStatusWatcher started");
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("VaultStatusWatcher received shutdown signal");
                        break;
                    }
                }

                _ = ticker.tick() => {
                    if self.tx.is_closed() {
                        debug!("No status subscribers left");
                        break;
                    }
                    self.refresh().await;
                }
            }
        }

        info!("VaultStatusWatcher shutdown complete");
    }

    async fn refresh(&self) {
        match self.api.status().await {
            Ok(status) => {
                debug!(vault = ?status.vault_address, "Agent status refreshed");
                self.tx.send_replace(StatusSnapshot {
                    status: Some(status),
                    fetched_at: Some(OffsetDateTime::now_utc()),
                    failures: 0,
                });
            }
            Err(e) => {
                warn!(error = %e, "Agent status fetch failed, keeping last snapshot");
                self.tx.send_modify(|snapshot| snapshot.failures += 1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeApi, VAULT};

    #[tokio::test(start_paused = true)]
    async fn test_publishes_and_keeps_last_good_status() {
        let api = Arc::new(FakeApi::new());
        let (watcher, mut rx) = VaultStatusWatcher::new(api.clone(), Duration::from_secs(15));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(watcher.run(shutdown_rx));

        rx.changed().await.unwrap();
        {
            let snapshot = rx.borrow_and_update();
            let status = snapshot.status.as_ref().unwrap();
            assert_eq!(status.vault_address.as_deref(), Some(VAULT));
            assert_eq!(snapshot.failures, 0);
        }

        *api.status_fails.lock().unwrap() = true;
        rx.changed().await.unwrap();
        {
            let snapshot = rx.borrow_and_update();
            assert!(snapshot.status.is_some());
            assert_eq!(snapshot.failures, 1);
        }

        shutdown_tx.send(true).unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_when_subscribers_drop() {
        let api = Arc::new(FakeApi::new());
        let (watcher, rx) = VaultStatusWatcher::new(api, Duration::from_secs(15));
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        drop(rx);
        tokio::time::timeout(Duration::from_secs(60), watcher.run(shutdown_rx))
            .await
            .unwrap();
    }
}

//! Signal handling.
//!
//! The CLI never exits mid-write: an interrupted wait leaves the saved
//! snapshot in place so the flow can be resumed later.

use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::watch;

/// Completes when SIGTERM or SIGINT (Ctrl+C) is received.
pub async fn shutdown_signal() -> std::io::Result<()> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM, stopping");
        }
        _ = sigint.recv() => {
            tracing::info!("Received SIGINT, stopping");
        }
    }
    Ok(())
}

/// Spawn the signal listener. The returned receiver flips to `true` once.
pub fn spawn_shutdown_watch() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = shutdown_signal().await {
            tracing::error!("Failed to install signal handlers: {}", e);
            // Keep the sender alive so receivers never see a closed channel.
            std::future::pending::<()>().await;
        }
        let _ = tx.send(true);
    });
    rx
}

/// Completes once shutdown has been requested.
pub async fn requested(rx: &mut watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}

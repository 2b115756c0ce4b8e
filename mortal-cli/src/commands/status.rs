use anyhow::Context;
use mortal_core::processors::VaultStatusWatcher;

use crate::render;
use crate::shutdown;
use crate::state::AppState;

pub async fn run(app: &AppState, watch: bool) -> anyhow::Result<()> {
    if !watch {
        let status = app.api.get_status().await.context("failed to load agent status")?;
        render::status(&status);
        return Ok(());
    }

    let interval = app.config.timings.dashboard_poll_interval;
    let (watcher, mut rx) = VaultStatusWatcher::new(app.agent(), interval);
    let task = tokio::spawn(watcher.run(app.shutdown.clone()));
    let mut shutdown_rx = app.shutdown.clone();

    loop {
        tokio::select! {
            biased;

            () = shutdown::requested(&mut shutdown_rx) => break,

            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = rx.borrow_and_update().clone();
                match (&snapshot.status, snapshot.fetched_at) {
                    (Some(status), Some(at)) => {
                        println!("--- {at} ---");
                        render::status(status);
                        if snapshot.failures > 0 {
                            println!("(last {} refreshes failed)", snapshot.failures);
                        }
                    }
                    _ => println!("Agent unreachable ({} attempts)", snapshot.failures),
                }
            }
        }
    }

    task.await.context("status watcher task failed")?;
    Ok(())
}

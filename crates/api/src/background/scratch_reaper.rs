//! Periodic removal of stale scratch directories.
//!
//! Request scratch space is normally released when the request finishes.
//! Directories survive only if the service is killed mid-request; this task
//! deletes any older than the maximum scratch lifetime. Runs on a fixed
//! interval using `tokio::time::interval`.

use std::sync::Arc;
use std::time::Duration;

use pdfrelay_worker::ScratchSpace;
use tokio_util::sync::CancellationToken;

/// Run the scratch reaper loop until `cancel` is triggered.
pub async fn run(
    scratch: Arc<ScratchSpace>,
    max_age: Duration,
    interval: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(
        root = %scratch.root().display(),
        max_age_secs = max_age.as_secs(),
        interval_secs = interval.as_secs(),
        "Scratch reaper started"
    );

    let mut interval = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Scratch reaper stopping");
                break;
            }
            _ = interval.tick() => {
                let scratch = Arc::clone(&scratch);
                let result = tokio::task::spawn_blocking(move || scratch.reap_stale(max_age)).await;
                match result {
                    Ok(Ok(removed)) => {
                        if removed > 0 {
                            tracing::info!(removed, "Scratch reaper: removed stale directories");
                        } else {
                            tracing::debug!("Scratch reaper: nothing to remove");
                        }
                    }
                    Ok(Err(e)) => {
                        tracing::error!(error = %e, "Scratch reaper: scan failed");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Scratch reaper: task panicked");
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Background sync on a fixed interval.

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::sync::SyncService;

/// Spawn the sync loop. The first sync runs immediately; ticks with no
/// stored user are skipped.
pub fn spawn(sync: SyncService, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(interval_secs = interval.as_secs(), "Sync scheduler started");

        loop {
            ticker.tick().await;
            run_once(&sync).await;
        }
    })
}

async fn run_once(sync: &SyncService) {
    match sync.has_user() {
        Ok(true) => {
            let outcome = sync.sync_events().await;
            if !outcome.success {
                tracing::warn!(error = ?outcome.error, "Scheduled sync failed");
            }
        }
        Ok(false) => tracing::debug!("No authenticated user, skipping scheduled sync"),
        Err(e) => tracing::error!(error = %e, "Could not check for a user before sync"),
    }
}

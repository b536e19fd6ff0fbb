//! Sync commands

use crate::app::AppState;
use crate::error::Result;
use crate::services::sync::{SyncOutcome, SyncStatus};

/// Pull the published catalog now, ignoring the cooldown
pub async fn sync_now(state: &AppState) -> SyncOutcome {
    state.sync.sync_now().await
}

/// Probe the last commit and pull only when it is newer than local data
pub async fn check_for_updates(state: &AppState) -> SyncOutcome {
    state.sync.on_visibility_regained().await
}

pub async fn sync_status(state: &AppState) -> Option<SyncStatus> {
    state.sync.last_status().await
}

/// Run the scheduler until Ctrl+C
pub async fn watch(state: &AppState) -> Result<()> {
    let handle = state.sync.clone().start();

    tokio::signal::ctrl_c().await?;
    tracing::info!("Stopping sync scheduler");
    handle.abort();
    Ok(())
}

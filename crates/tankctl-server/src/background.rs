//! Background tasks for the tank server.
//!
//! Includes:
//! - Mirroring the newest store values into the cached tank attributes.

use crate::AppState;
use std::sync::Arc;
use tokio::time::{sleep, Duration};

/// Starts the attribute refresh task.
///
/// Runs indefinitely, re-reading the three logs every `interval_seconds`
/// so the cached attributes follow values written by other processes
/// sharing the database. An interval of 0 disables the task.
pub async fn start_attribute_refresh_task(state: Arc<AppState>, interval_seconds: u64) {
    if interval_seconds == 0 {
        tracing::info!("attribute refresh task disabled (interval=0)");
        return;
    }

    let interval = Duration::from_secs(interval_seconds);
    tracing::info!(interval_seconds, "starting attribute refresh task");

    loop {
        sleep(interval).await;

        let dispatcher = Arc::clone(&state.dispatcher);
        // Store failures and empty logs are logged by the dispatcher.
        if let Err(e) = tokio::task::spawn_blocking(move || dispatcher.refresh_attributes()).await
        {
            tracing::error!("attribute refresh task join error: {}", e);
        }
    }
}

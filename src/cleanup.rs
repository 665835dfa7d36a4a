//! Background sweep for expired challenges.
//!
//! Consumption re-checks expiry on its own, so the sweep only reclaims
//! space. Running it late or never does not make a stale challenge usable.

use crate::storage::ChallengeStore;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Run the sweep loop.
///
/// Removes expired challenges every `interval`. Errors are logged and the
/// loop carries on with the next tick.
pub async fn run_sweep_loop(store: Arc<dyn ChallengeStore>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    // First tick completes immediately; skip it so startup isn't a sweep
    ticker.tick().await;

    loop {
        ticker.tick().await;
        sweep_once(store.as_ref()).await;
    }
}

/// Single sweep pass. Returns the number of removed challenges.
pub async fn sweep_once(store: &dyn ChallengeStore) -> usize {
    match store.sweep_expired(Utc::now()).await {
        Ok(removed) => {
            if removed > 0 {
                tracing::info!(action = "challenge_sweep", removed = removed, "Expired challenges removed");
            }
            removed
        }
        Err(e) => {
            tracing::error!(error = %e, "Challenge sweep failed");
            0
        }
    }
}

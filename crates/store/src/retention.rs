//! Expiry of abandoned temp copies.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use planview_core::traits::Prunable;

/// Configuration for temp copy retention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionPolicy {
    /// Maximum age of an unclaimed temp copy.
    pub max_age: Duration,
    /// How often the sweep runs.
    pub interval: Duration,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_age: Duration::from_secs(60 * 60), // 1 hour
            interval: Duration::from_secs(5 * 60),
        }
    }
}

impl RetentionPolicy {
    pub fn new(max_age: Duration, interval: Duration) -> Self {
        Self { max_age, interval }
    }
}

/// Run `store.prune` on every tick of `policy.interval` until aborted.
///
/// Sweep failures are logged and the loop keeps going.
pub fn spawn_sweeper(store: Arc<dyn Prunable>, policy: RetentionPolicy) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(policy.interval.max(Duration::from_secs(1)));
        // The first tick completes immediately; skip it so startup is quiet.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match store.prune(policy.max_age).await {
                Ok(removed) => {
                    tracing::debug!(removed, "Temp copy sweep finished");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Temp copy sweep failed");
                }
            }
        }
    })
}

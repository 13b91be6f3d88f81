//! Post-batch reconciliation of cached ledger views

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::traits::CachedView;

/// Time given to the ledger to converge before re-fetching
pub const DEFAULT_SETTLEMENT_DELAY: Duration = Duration::from_secs(2);

/// The three views a batch action makes stale
#[derive(Clone)]
pub struct CachedViews {
    pub allowed_tokens: Arc<dyn CachedView>,
    pub staked_tokens: Arc<dyn CachedView>,
    pub pool_entries: Arc<dyn CachedView>,
}

impl CachedViews {
    fn all(&self) -> [Arc<dyn CachedView>; 3] {
        [
            self.allowed_tokens.clone(),
            self.staked_tokens.clone(),
            self.pool_entries.clone(),
        ]
    }
}

/// Invalidates the cached views after a batch and re-fetches them once the
/// settlement delay has passed.
///
/// The delay is a heuristic: under high latency the re-fetched views may
/// still be stale, and nothing retries.
pub struct RefreshScheduler {
    views: CachedViews,
    delay: Duration,
}

impl RefreshScheduler {
    pub fn new(views: CachedViews, delay: Duration) -> Self {
        Self { views, delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Invalidate every view now and schedule a single delayed re-fetch
    pub async fn settle(&self) -> JoinHandle<()> {
        let views = self.views.all();
        join_all(views.iter().map(|view| view.invalidate())).await;
        debug!(delay_ms = self.delay.as_millis() as u64, "cached views invalidated");

        let delay = self.delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let results = join_all(views.iter().map(|view| view.refetch())).await;
            for (view, result) in views.iter().zip(results) {
                if let Err(e) = result {
                    warn!(view = view.name(), error = %e, "refetch failed");
                }
            }
        })
    }
}

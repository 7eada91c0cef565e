//! Periodic removal of expired links.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::registry::LinkRegistry;

/// Default time between sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Background task calling [`LinkRegistry::sweep`] on a fixed interval.
#[derive(Debug, Clone)]
pub struct LinkSweeper {
    registry: Arc<LinkRegistry>,
    interval: Duration,
}

impl LinkSweeper {
    /// Create a sweeper with the default hourly interval.
    pub fn new(registry: Arc<LinkRegistry>) -> Self {
        Self::with_interval(registry, DEFAULT_SWEEP_INTERVAL)
    }

    /// Create a sweeper with a custom interval.
    pub fn with_interval(registry: Arc<LinkRegistry>, interval: Duration) -> Self {
        Self {
            registry,
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    /// Start sweeping on the current runtime.
    ///
    /// The first sweep runs one interval after this call.
    pub fn spawn(self) -> SweepHandle {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        info!(interval = ?self.interval, "Link sweeper started");

        let handle = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + self.interval;
            let mut ticker = tokio::time::interval_at(start, self.interval);
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => {
                        let removed = self.registry.sweep();
                        debug!(removed, "Link sweep finished");
                    }
                }
            }
            info!("Link sweeper stopped");
        });

        SweepHandle { token, handle }
    }
}

/// Handle to a running sweeper.
#[derive(Debug)]
pub struct SweepHandle {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl SweepHandle {
    /// Ask the sweeper to stop without waiting.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Check if the sweeper has been asked to stop.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Stop the sweeper and wait for it to exit.
    pub async fn shutdown(self) {
        self.token.cancel();
        let _ = self.handle.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};

    #[tokio::test(start_paused = true)]
    async fn test_sweeps_after_interval() {
        let registry = Arc::new(LinkRegistry::new());
        let past = Utc::now() - ChronoDuration::hours(2);
        registry
            .create_link_at("https://x", "f", past + ChronoDuration::hours(1), past)
            .unwrap();

        let handle = LinkSweeper::with_interval(Arc::clone(&registry), Duration::from_secs(60)).spawn();

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(registry.len(), 1);

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(registry.is_empty());

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_is_prompt() {
        let registry = Arc::new(LinkRegistry::new());
        let handle = LinkSweeper::new(registry).spawn();
        assert!(!handle.is_cancelled());
        tokio::time::timeout(Duration::from_secs(1), handle.shutdown())
            .await
            .unwrap();
    }
}

//! Per-client redirect loop detection
//!
//! The login page forwards clients holding a `token` cookie to the
//! dashboard without checking the token, and the dashboard sends clients
//! with a bad token back to the login page. A stale cookie therefore
//! bounces between the two. Each client gets its own [`RedirectTracker`],
//! keyed by its cookie value, so the bounce can be detected and broken.

use common::redirect::{self, RedirectTracker, RedirectTrackerConfig};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::warn;

/// Registry of redirect trackers, one per client
#[derive(Debug, Clone)]
pub struct RedirectLoopGuard {
    config: RedirectTrackerConfig,
    trackers: Arc<Mutex<HashMap<String, RedirectTracker>>>,
}

impl RedirectLoopGuard {
    /// Create an empty registry
    pub fn new(config: RedirectTrackerConfig) -> Self {
        Self {
            config,
            trackers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Record a redirect of `client` to `path`; true means a loop was detected
    pub async fn track(&self, client: &str, path: &str) -> bool {
        let now = Instant::now();
        let mut trackers = self.trackers.lock().await;

        trackers.retain(|_, tracker| !tracker.is_stale_at(now));

        let looping = trackers
            .entry(client.to_string())
            .or_insert_with(|| RedirectTracker::new(self.config))
            .track_redirect_at(path, now);

        if looping {
            warn!(
                "Redirect loop detected towards {} ({} redirects within {:?})",
                path, self.config.max_redirects, self.config.window
            );
        }

        looping
    }

    /// Forget the redirect history of `client`
    pub async fn reset(&self, client: &str) {
        if let Some(tracker) = self.trackers.lock().await.get_mut(client) {
            tracker.reset();
        }
    }

    /// A marker telling the next request not to re-enter the redirect chain
    pub fn bypass_marker(&self) -> String {
        redirect::bypass_marker()
    }

    /// Number of clients currently tracked
    pub async fn tracked_clients(&self) -> usize {
        self.trackers.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn guard(max_redirects: usize, window_ms: u64) -> RedirectLoopGuard {
        RedirectLoopGuard::new(RedirectTrackerConfig {
            max_redirects,
            window: Duration::from_millis(window_ms),
        })
    }

    #[tokio::test]
    async fn test_clients_are_tracked_independently() {
        let guard = guard(3, 60_000);

        assert!(!guard.track("alice", "/dashboard").await);
        assert!(!guard.track("alice", "/dashboard").await);
        assert!(!guard.track("bob", "/dashboard").await);
        assert!(guard.track("alice", "/dashboard").await);
        assert!(!guard.track("bob", "/dashboard").await);
        assert_eq!(guard.tracked_clients().await, 2);
    }

    #[tokio::test]
    async fn test_reset_forgets_client() {
        let guard = guard(2, 60_000);

        assert!(!guard.track("alice", "/dashboard").await);
        guard.reset("alice").await;
        assert!(!guard.track("alice", "/dashboard").await);
        assert!(guard.track("alice", "/dashboard").await);
    }

    #[tokio::test]
    async fn test_stale_trackers_are_pruned() {
        let guard = guard(5, 10);

        guard.track("alice", "/dashboard").await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        guard.track("bob", "/dashboard").await;

        assert_eq!(guard.tracked_clients().await, 1);
    }

    #[tokio::test]
    async fn test_bypass_marker() {
        assert!(guard(5, 3000).bypass_marker().starts_with("bypass_"));
    }
}

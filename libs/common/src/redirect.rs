//! Sliding-window redirect tracker
//!
//! Counts the redirects issued for one client inside a rolling time window
//! and reports when the count reaches the configured maximum, which is the
//! signal that two pages keep bouncing the client between each other.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Monotonic suffix for bypass markers issued in the same millisecond
static BYPASS_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// A `bypass_`-prefixed marker, unique within the process.
///
/// The millisecond timestamp alone repeats for calls in the same
/// millisecond, so a process-wide sequence number is appended.
pub fn bypass_marker() -> String {
    let sequence = BYPASS_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!(
        "bypass_{}_{}",
        chrono::Utc::now().timestamp_millis(),
        sequence
    )
}

/// Redirect tracker configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedirectTrackerConfig {
    /// Number of redirects inside the window that counts as a loop
    pub max_redirects: usize,
    /// Length of the sliding window
    pub window: Duration,
}

impl Default for RedirectTrackerConfig {
    fn default() -> Self {
        Self {
            max_redirects: 5,
            window: Duration::from_millis(3000),
        }
    }
}

/// A single observed redirect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectRecord {
    /// Target path of the redirect
    pub path: String,
    /// When the redirect was issued
    pub at: Instant,
}

/// Redirect tracker
#[derive(Debug, Clone)]
pub struct RedirectTracker {
    config: RedirectTrackerConfig,
    records: VecDeque<RedirectRecord>,
}

impl Default for RedirectTracker {
    fn default() -> Self {
        Self::new(RedirectTrackerConfig::default())
    }
}

impl RedirectTracker {
    /// Create a new redirect tracker
    pub fn new(config: RedirectTrackerConfig) -> Self {
        Self {
            config,
            records: VecDeque::new(),
        }
    }

    /// Record a redirect to `path` happening now.
    ///
    /// Returns `true` when the redirect completes a loop and the caller must
    /// stop redirecting.
    pub fn track_redirect(&mut self, path: &str) -> bool {
        self.track_redirect_at(path, Instant::now())
    }

    /// Record a redirect to `path` issued at `now`.
    pub fn track_redirect_at(&mut self, path: &str, now: Instant) -> bool {
        self.evict_expired(now);

        self.records.push_back(RedirectRecord {
            path: path.to_string(),
            at: now,
        });

        self.records.len() >= self.config.max_redirects
    }

    /// Forget every recorded redirect
    pub fn reset(&mut self) {
        self.records.clear();
    }

    /// A query-parameter value telling the next request not to re-enter
    /// the redirect chain.
    pub fn bypass_marker(&self) -> String {
        bypass_marker()
    }

    /// Number of redirects currently held
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no redirects are held
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether every held redirect has left the window at `now`
    pub fn is_stale_at(&self, now: Instant) -> bool {
        self.records
            .back()
            .is_none_or(|newest| self.expired(newest, now))
    }

    /// Iterate the held redirects, oldest first
    pub fn records(&self) -> impl Iterator<Item = &RedirectRecord> {
        self.records.iter()
    }

    /// Get the tracker configuration
    pub fn config(&self) -> &RedirectTrackerConfig {
        &self.config
    }

    fn evict_expired(&mut self, now: Instant) {
        // Records are in insertion order, so expiry only ever happens at the front.
        while let Some(oldest) = self.records.front() {
            if self.expired(oldest, now) {
                self.records.pop_front();
            } else {
                break;
            }
        }
    }

    fn expired(&self, record: &RedirectRecord, now: Instant) -> bool {
        now.saturating_duration_since(record.at) >= self.config.window
    }
}

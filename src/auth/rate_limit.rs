//! Sliding-window rate limiting keyed by an arbitrary identifier.
//!
//! State lives in process memory only: it resets on restart and is not
//! shared between instances.

use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// 单个标识的请求时间戳队列
type Window = Arc<Mutex<VecDeque<Instant>>>;

/// Per-identifier request timestamps
#[derive(Debug, Default)]
pub struct RateLimiter {
    windows: DashMap<String, Window>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit the call iff fewer than `max_requests` were admitted for
    /// `identifier` during the trailing `window`.
    pub fn is_allowed(&self, identifier: &str, max_requests: usize, window: Duration) -> bool {
        self.is_allowed_at(identifier, max_requests, window, Instant::now())
    }

    fn window_for(&self, identifier: &str) -> Window {
        if let Some(existing) = self.windows.get(identifier) {
            return existing.clone();
        }
        self.windows
            .entry(identifier.to_string())
            .or_default()
            .clone()
    }

    fn is_allowed_at(
        &self,
        identifier: &str,
        max_requests: usize,
        window: Duration,
        now: Instant,
    ) -> bool {
        let entry = self.window_for(identifier);
        // prune + count + append under this identifier's lock only
        let mut timestamps = entry.lock().unwrap_or_else(|e| e.into_inner());

        // None: the process is younger than the window, nothing has expired.
        if let Some(window_start) = now.checked_sub(window) {
            while timestamps.front().is_some_and(|&t| t <= window_start) {
                timestamps.pop_front();
            }
        }

        if timestamps.len() >= max_requests {
            return false;
        }

        timestamps.push_back(now);
        true
    }

    /// Drop identifiers with no request inside `window`
    pub fn purge_idle(&self, window: Duration) {
        let now = Instant::now();
        self.windows.retain(|_, entry| {
            let timestamps = entry.lock().unwrap_or_else(|e| e.into_inner());
            timestamps
                .back()
                .is_some_and(|&last| now.saturating_duration_since(last) < window)
        });
    }

    /// Number of identifiers currently tracked
    pub fn tracked(&self) -> usize {
        self.windows.len()
    }
}

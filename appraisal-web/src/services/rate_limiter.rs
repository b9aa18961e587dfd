//! Per-caller request ceiling for the analysis endpoints
//!
//! Fixed window: the window opens with a caller's first request and the
//! entry resets once the window has elapsed. Rejected requests are not
//! counted. The table is bounded; when full, expired entries are dropped
//! first, then the least recently seen caller.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::HeaderMap;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Check-and-increment counter keyed by caller
///
/// Kept behind a trait so an external TTL store can replace the
/// in-process table.
#[async_trait]
pub trait RequestCounter: Send + Sync {
    /// Returns `true` and counts the request when the caller is below
    /// `limit` in the current window; returns `false` otherwise.
    async fn check_and_increment(&self, key: &str, limit: u32) -> bool;
}

#[derive(Debug, Clone, Copy)]
struct WindowEntry {
    opened: Instant,
    last_seen: Instant,
    count: u32,
}

/// In-process fixed-window limiter
pub struct InMemoryRateLimiter {
    window: Duration,
    capacity: usize,
    entries: Mutex<HashMap<String, WindowEntry>>,
}

impl InMemoryRateLimiter {
    pub fn new(window: Duration, capacity: usize) -> Self {
        Self {
            window,
            capacity: capacity.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    #[cfg(test)]
    async fn tracked_callers(&self) -> usize {
        self.entries.lock().await.len()
    }

    fn evict(&self, entries: &mut HashMap<String, WindowEntry>, now: Instant) {
        entries.retain(|_, e| now.duration_since(e.opened) < self.window);
        if entries.len() < self.capacity {
            return;
        }

        let oldest = entries
            .iter()
            .min_by_key(|(_, e)| e.last_seen)
            .map(|(k, _)| k.clone());
        if let Some(key) = oldest {
            debug!(caller = %key, "Rate limit table full, evicting least recent caller");
            entries.remove(&key);
        }
    }
}

#[async_trait]
impl RequestCounter for InMemoryRateLimiter {
    async fn check_and_increment(&self, key: &str, limit: u32) -> bool {
        if limit == 0 {
            return false;
        }

        let now = Instant::now();
        let mut entries = self.entries.lock().await;

        if let Some(entry) = entries.get_mut(key) {
            if now.duration_since(entry.opened) >= self.window {
                entry.opened = now;
                entry.count = 0;
            }
            entry.last_seen = now;
            if entry.count >= limit {
                return false;
            }
            entry.count += 1;
            return true;
        }

        if entries.len() >= self.capacity {
            self.evict(&mut entries, now);
        }
        entries.insert(
            key.to_string(),
            WindowEntry {
                opened: now,
                last_seen: now,
                count: 1,
            },
        );
        true
    }
}

/// Caller key: first `X-Forwarded-For` address, else the peer address,
/// else `"unknown"`
pub fn caller_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    match (forwarded, peer) {
        (Some(addr), _) => addr.to_string(),
        (None, Some(peer)) => peer.ip().to_string(),
        (None, None) => "unknown".to_string(),
    }
}

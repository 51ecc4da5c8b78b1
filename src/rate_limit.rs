//! Fixed-window, per-client rate limiting
//!
//! Counters live behind the [`RateLimitStore`] trait so a single instance
//! can keep them in memory while a multi-instance deployment plugs in a
//! shared key-value store. The clock is always passed in.

use crate::config::RateLimitConfig;
use crate::error::{ContentError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Counter state for one client within its current window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    pub count: u64,
    /// Epoch milliseconds at which the window closes
    pub reset_time_ms: u64,
}

/// Backing store for rate-limit counters
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Count one request from `key` at `now_ms` and return the updated entry
    ///
    /// Expired entries (for any key) must be dropped first. A key with no
    /// live entry starts a new window with a count of 1. Counts keep
    /// increasing past any limit until the window resets.
    async fn record_hit(&self, key: &str, now_ms: u64, window_ms: u64) -> Result<RateLimitEntry>;

    /// Number of clients currently tracked
    async fn tracked_clients(&self) -> usize;
}

/// Process-local store guarded by a mutex
#[derive(Debug, Default)]
pub struct InMemoryRateLimitStore {
    entries: Mutex<HashMap<String, RateLimitEntry>>,
}

impl InMemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateLimitStore for InMemoryRateLimitStore {
    async fn record_hit(&self, key: &str, now_ms: u64, window_ms: u64) -> Result<RateLimitEntry> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| ContentError::RateLimitStoreError(format!("lock poisoned: {}", e)))?;

        let before = entries.len();
        entries.retain(|_, entry| entry.reset_time_ms > now_ms);
        if entries.len() < before {
            debug!("Evicted {} expired rate limit entries", before - entries.len());
        }

        let entry = entries
            .entry(key.to_string())
            .and_modify(|entry| entry.count += 1)
            .or_insert(RateLimitEntry {
                count: 1,
                reset_time_ms: now_ms + window_ms,
            });
        Ok(*entry)
    }

    async fn tracked_clients(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }
}

/// Outcome of a rate-limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub count: u64,
    pub limit: u64,
    pub reset_time_ms: u64,
}

impl RateLimitDecision {
    /// Whole seconds until the window resets, rounded up
    pub fn retry_after_secs(&self, now_ms: u64) -> u64 {
        self.reset_time_ms.saturating_sub(now_ms).div_ceil(1000)
    }

    /// Requests left in this window, never below zero
    pub fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.count)
    }
}

/// Fixed-window limiter over a pluggable store
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    window_ms: u64,
    max_requests: u64,
}

impl RateLimiter {
    /// Create a limiter backed by a fresh in-memory store
    pub fn new(config: &RateLimitConfig) -> Self {
        Self::with_store(config, Arc::new(InMemoryRateLimitStore::new()))
    }

    /// Create a limiter backed by the given store
    pub fn with_store(config: &RateLimitConfig, store: Arc<dyn RateLimitStore>) -> Self {
        RateLimiter {
            store,
            window_ms: config.window_ms,
            max_requests: config.max_requests,
        }
    }

    /// Record a request from `client` at `now_ms` and decide whether to serve it
    pub async fn check(&self, client: &str, now_ms: u64) -> Result<RateLimitDecision> {
        let entry = self.store.record_hit(client, now_ms, self.window_ms).await?;
        let allowed = entry.count <= self.max_requests;
        if !allowed {
            debug!(
                "Rate limit exceeded: client={}, count={}, limit={}",
                client, entry.count, self.max_requests
            );
        }
        Ok(RateLimitDecision {
            allowed,
            count: entry.count,
            limit: self.max_requests,
            reset_time_ms: entry.reset_time_ms,
        })
    }

    /// Number of clients the store currently tracks
    pub async fn tracked_clients(&self) -> usize {
        self.store.tracked_clients().await
    }
}

/// Current wall-clock time in epoch milliseconds
pub fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

//! In-memory response cache.

use crate::client::Response;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, trace};

struct CacheEntry {
    response: Response,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

/// Deadline for an entry stored now. When both are set the earlier wins;
/// an `expire_at` in the past expires the entry immediately.
pub fn expiry_deadline(
    expire_in: Option<Duration>,
    expire_at: Option<DateTime<Utc>>,
) -> Option<Instant> {
    let now = Instant::now();
    let relative = expire_in.map(|ttl| now + ttl);
    let absolute = expire_at.map(|at| {
        let remaining = (at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        now + remaining
    });
    match (relative, absolute) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// Completed responses keyed by request fingerprint.
///
/// Expired entries read as absent but stay in the map until
/// [`clear`](Self::clear), [`clear_by_key`](Self::clear_by_key) or
/// [`purge_expired`](Self::purge_expired) removes them.
#[derive(Default)]
pub struct ResponseCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Response> {
        let entries = self.entries.read();
        let entry = entries.get(key)?;
        if entry.is_expired(Instant::now()) {
            debug!("Cache entry '{}' expired, treating as miss", key);
            return None;
        }
        debug!("Cache hit for '{}'", key);
        Some(entry.response.clone())
    }

    /// Store `response` under `key`, replacing any previous entry.
    pub fn set(&self, key: String, response: Response, expires_at: Option<Instant>) {
        trace!("Caching response under '{}'", key);
        self.entries.write().insert(
            key,
            CacheEntry {
                response,
                expires_at,
            },
        );
    }

    pub fn clear(&self) {
        let mut entries = self.entries.write();
        let count = entries.len();
        entries.clear();
        info!("Cleared {} cached responses", count);
    }

    /// Drop every entry whose key starts with `{prefix}|`. An empty prefix does nothing.
    pub fn clear_by_key(&self, prefix: &str) {
        if prefix.is_empty() {
            return;
        }
        let marker = format!("{prefix}|");
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(&marker));
        info!(
            "Cleared {} cached responses for key '{}'",
            before - entries.len(),
            prefix
        );
    }

    /// Remove expired entries and return how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        let purged = before - entries.len();
        if purged > 0 {
            info!("Purged {} expired cached responses", purged);
        }
        purged
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("entries", &self.len())
            .finish()
    }
}

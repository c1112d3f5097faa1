//! In-memory content cache with time-based expiry and tag invalidation.
//!
//! Best effort only: a miss simply means the content backend is asked again.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

/// Tag carried by every cached content entry.
pub const TAG_CONTENT: &str = "content";
/// Tag carried by calendar event entries.
pub const TAG_EVENTS: &str = "events";

struct Entry<T> {
    value: T,
    tags: Vec<String>,
    fetched_at: DateTime<Utc>,
    stored_at: Instant,
}

/// A cache hit.
#[derive(Debug, Clone)]
pub struct Cached<T> {
    pub value: T,
    /// When the value was fetched from the backend.
    pub fetched_at: DateTime<Utc>,
}

pub struct ContentCache<T> {
    ttl: Duration,
    entries: RwLock<HashMap<String, Entry<T>>>,
}

impl<T: Clone> ContentCache<T> {
    /// Entries older than `ttl` are treated as absent. A zero `ttl` disables caching.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// The entry under `key`, if present and not yet expired.
    pub async fn get(&self, key: &str) -> Option<Cached<T>> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| entry.stored_at.elapsed() < self.ttl)
            .map(|entry| Cached {
                value: entry.value.clone(),
                fetched_at: entry.fetched_at,
            })
    }

    pub async fn insert(&self, key: &str, tags: &[&str], value: T, fetched_at: DateTime<Utc>) {
        let entry = Entry {
            value,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            fetched_at,
            stored_at: Instant::now(),
        };
        let mut entries = self.entries.write().await;
        // Expired entries are pruned on write.
        let ttl = self.ttl;
        entries.retain(|_, e| e.stored_at.elapsed() < ttl);
        entries.insert(key.to_string(), entry);
    }

    /// Remove every entry carrying `tag`. Returns how many were removed.
    pub async fn invalidate_tag(&self, tag: &str) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| !e.tags.iter().any(|t| t == tag));
        before - entries.len()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

//! Optional cache collaborator for block lookups and verdicts.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use super::Clock;

/// Default entry cap for the in-memory cache.
const DEFAULT_MAX_ENTRIES: usize = 4096;

/// Key-value cache with single-key atomic puts.
///
/// The engine treats the cache as best-effort: a miss is never an error and
/// implementations may evict at will.
pub trait Cache: Send + Sync {
    /// Fetches a value, `None` on miss or expiry.
    fn get(&self, key: &str) -> Option<Vec<u8>>;

    /// Stores a value, optionally expiring after `ttl`.
    fn put(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>);

    /// Removes a key if present.
    fn delete(&self, key: &str);
}

struct Entry {
    value: Vec<u8>,
    expires_at: Option<u64>,
}

/// In-memory reference cache.
///
/// Expiry is evaluated against the injected [`Clock`], so tests can advance
/// time deterministically. When full, expired entries are dropped first;
/// if none are expired the put is skipped.
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
    max_entries: usize,
}

impl MemoryCache {
    /// Creates a cache with the default entry cap.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_max_entries(clock, DEFAULT_MAX_ENTRIES)
    }

    /// Creates a cache bounded at `max_entries`.
    #[must_use]
    pub fn with_max_entries(clock: Arc<dyn Clock>, max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
            max_entries,
        }
    }

    /// Number of live entries (expired ones included until swept).
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().expect("lock poisoned").len()
    }

    /// Returns true when the cache holds no entries.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().expect("lock poisoned").is_empty()
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        let entries = self.entries.read().expect("lock poisoned");
        let entry = entries.get(key)?;
        if let Some(expires_at) = entry.expires_at {
            if self.clock.now() >= expires_at {
                return None;
            }
        }
        Some(entry.value.clone())
    }

    fn put(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) {
        let now = self.clock.now();
        let mut entries = self.entries.write().expect("lock poisoned");
        if entries.len() >= self.max_entries && !entries.contains_key(key) {
            entries.retain(|_, entry| entry.expires_at.map_or(true, |at| now < at));
            if entries.len() >= self.max_entries {
                tracing::debug!(key, "cache full, skipping put");
                return;
            }
        }
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: ttl.map(|ttl| now.saturating_add(ttl.as_secs())),
            },
        );
    }

    fn delete(&self, key: &str) {
        self.entries.write().expect("lock poisoned").remove(key);
    }
}

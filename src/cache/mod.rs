//! Keyed store with a per-entry expiry
//!
//! Non-durable; meant for low-volume data such as recently applied
//! payment references.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Longest lifetime an entry can get; longer TTLs are clamped
pub const MAX_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> Entry<V> {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Cloning shares the underlying map
pub struct ExpiringStore<K, V> {
    inner: Arc<Mutex<HashMap<K, Entry<V>>>>,
}

impl<K, V> Clone for ExpiringStore<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> Default for ExpiringStore<K, V> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<K, V> ExpiringStore<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Value for `key`, or None when absent or expired
    pub async fn get(&self, key: &K) -> Option<V> {
        let map = self.inner.lock().await;
        map.get(key)
            .filter(|entry| entry.is_live(Instant::now()))
            .map(|entry| entry.value.clone())
    }

    /// Insert or replace `key`, live for `ttl` (at most `MAX_TTL`) from now
    pub async fn set(&self, key: K, value: V, ttl: Duration) {
        let now = Instant::now();
        // An unrepresentable deadline leaves the entry already expired
        let expires_at = now.checked_add(ttl.min(MAX_TTL)).unwrap_or(now);
        let entry = Entry { value, expires_at };
        self.inner.lock().await.insert(key, entry);
    }

    /// Returns the removed value if it was still live
    pub async fn delete(&self, key: &K) -> Option<V> {
        let removed = self.inner.lock().await.remove(key)?;
        removed.is_live(Instant::now()).then_some(removed.value)
    }

    /// Drop expired entries. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let mut map = self.inner.lock().await;
        let before = map.len();
        let now = Instant::now();
        map.retain(|_, entry| entry.is_live(now));
        before - map.len()
    }

    /// Number of entries held, expired ones included until purged
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

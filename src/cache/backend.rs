//! Store backends: the shared key-value store holding cache entries and the
//! daily request counters.

use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Key-value store with per-key expiry and an atomic counter primitive.
///
/// Cache entries and counters are separate keyspaces distinguished only by
/// key shape. Implementations must make `increment_counter` atomic across
/// every process sharing the store.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    /// Unconditional upsert with expiry. Last writer wins.
    async fn set_string(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Current counter value, 0 when the key does not exist.
    async fn get_count(&self, key: &str) -> Result<u64>;

    /// Add one to the counter and, when this created it (post-increment value
    /// of 1), attach `expiry` in the same atomic step. Returns the new value.
    async fn increment_counter(&self, key: &str, expiry: Duration) -> Result<u64>;

    fn name(&self) -> &'static str;
}

#[derive(Clone, Debug)]
enum Value {
    Text(String),
    Counter(u64),
}

#[derive(Clone, Debug)]
struct StoreEntry {
    value: Value,
    created_at: Instant,
    ttl: Option<Duration>,
}

impl StoreEntry {
    fn new(value: Value, ttl: Option<Duration>) -> Self {
        Self {
            value,
            created_at: Instant::now(),
            ttl,
        }
    }
    fn is_expired(&self) -> bool {
        self.ttl.map_or(false, |ttl| self.created_at.elapsed() >= ttl)
    }
}

/// Writes between two sweeps of expired entries that were never read again.
const SWEEP_EVERY: usize = 1024;

/// In-process store with the same semantics as Redis for one instance.
///
/// Expired entries are dropped lazily on access, plus a full sweep every
/// `SWEEP_EVERY` writes. Counters stored here are not shared between
/// processes, so a quota enforced through this store is per instance.
pub struct MemoryStore {
    entries: Mutex<HashMap<String, StoreEntry>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            writes: AtomicUsize::new(0),
        }
    }

    /// Drop every expired entry. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, e| !e.is_expired());
        before - entries.len()
    }

    /// Lifetime the entry was written with, if it is still live.
    pub async fn ttl_of(&self, key: &str) -> Option<Duration> {
        let entries = self.entries.lock().await;
        entries
            .get(key)
            .filter(|e| !e.is_expired())
            .and_then(|e| e.ttl)
    }

    /// Number of live entries, cache and counters together.
    pub async fn len(&self) -> usize {
        let entries = self.entries.lock().await;
        entries.values().filter(|e| !e.is_expired()).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries.lock().await;
        if let Some(entry) = entries.get(key) {
            if entry.is_expired() {
                entries.remove(key);
                return Ok(None);
            }
            return Ok(Some(match &entry.value {
                Value::Text(s) => s.clone(),
                Value::Counter(n) => n.to_string(),
            }));
        }
        Ok(None)
    }

    async fn set_string(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let sweep = (self.writes.fetch_add(1, Ordering::Relaxed) + 1) % SWEEP_EVERY == 0;
        let mut entries = self.entries.lock().await;
        if sweep {
            entries.retain(|_, e| !e.is_expired());
        }
        entries.insert(
            key.to_string(),
            StoreEntry::new(Value::Text(value.to_string()), Some(ttl)),
        );
        Ok(())
    }

    async fn get_count(&self, key: &str) -> Result<u64> {
        let mut entries = self.entries.lock().await;
        if entries.get(key).map_or(false, |e| e.is_expired()) {
            entries.remove(key);
            return Ok(0);
        }
        Ok(match entries.get(key).map(|e| &e.value) {
            Some(Value::Counter(n)) => *n,
            Some(Value::Text(s)) => s.parse().unwrap_or(0),
            None => 0,
        })
    }

    async fn increment_counter(&self, key: &str, expiry: Duration) -> Result<u64> {
        let mut entries = self.entries.lock().await;
        let live = entries.get(key).filter(|e| !e.is_expired()).cloned();
        let (count, created_at, ttl) = match live {
            Some(StoreEntry {
                value: Value::Counter(n),
                created_at,
                ttl,
            }) => (n + 1, created_at, ttl),
            // a fresh counter gets its expiry together with the first increment
            _ => (1, Instant::now(), Some(expiry)),
        };
        entries.insert(
            key.to_string(),
            StoreEntry {
                value: Value::Counter(count),
                created_at,
                ttl,
            },
        );
        Ok(count)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

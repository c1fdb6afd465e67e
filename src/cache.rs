use anyhow::Context;
use redis::{aio::ConnectionManager, AsyncCommands};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// The key-value operations needed by the page cache. Each call is atomic on its own, but
/// nothing groups several calls into a transaction.
#[async_trait::async_trait]
pub trait PageStore: Send {
    /// Increment the integer at `key` by one and return the new value. A missing key counts
    /// from zero.
    async fn incr(&mut self, key: &str) -> anyhow::Result<u64>;
    async fn get(&mut self, key: &str) -> anyhow::Result<Option<String>>;
    /// Store `value` at `key`, letting the store drop it once `ttl` has elapsed.
    async fn set_ex(&mut self, key: &str, value: &str, ttl: Duration) -> anyhow::Result<()>;
}

/// SETEX only takes whole seconds and rejects zero, so sub-second TTLs round up to one.
fn expiry_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

// `PageStore` and `AsyncCommands` share method names, hence the qualified calls.
#[async_trait::async_trait]
impl PageStore for ConnectionManager {
    async fn incr(&mut self, key: &str) -> anyhow::Result<u64> {
        AsyncCommands::incr(self, key, 1)
            .await
            .with_context(|| format!("fail to make INCR request to redis for key `{key}`"))
    }

    async fn get(&mut self, key: &str) -> anyhow::Result<Option<String>> {
        AsyncCommands::get(self, key)
            .await
            .with_context(|| format!("fail to make GET request to redis for key `{key}`"))
    }

    async fn set_ex(&mut self, key: &str, value: &str, ttl: Duration) -> anyhow::Result<()> {
        AsyncCommands::set_ex(self, key, value, expiry_secs(ttl))
            .await
            .with_context(|| format!("fail to make SETEX request to redis for key `{key}`"))
    }
}

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-process store with the same semantics as the redis commands above. Expired entries are
/// dropped lazily when they are next touched. Clones share the same map.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries, counters included.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.lock().await;
        entries.values().filter(|e| !e.is_expired(now)).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Remaining time to live of `key`, `None` if it is missing or never expires.
    pub async fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let entries = self.entries.lock().await;
        let entry = entries.get(key).filter(|e| !e.is_expired(now))?;
        entry.expires_at.map(|at| at - now)
    }
}

#[async_trait::async_trait]
impl PageStore for MemoryStore {
    async fn incr(&mut self, key: &str) -> anyhow::Result<u64> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        if entries.get(key).is_some_and(|e| e.is_expired(now)) {
            entries.remove(key);
        }

        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: "0".to_string(),
            expires_at: None,
        });
        let current: u64 = entry
            .value
            .parse()
            .with_context(|| format!("value of key `{key}` is not an integer"))?;
        let Some(next) = current.checked_add(1) else {
            anyhow::bail!("increment of key `{key}` would overflow");
        };
        entry.value = next.to_string();

        Ok(next)
    }

    async fn get(&mut self, key: &str) -> anyhow::Result<Option<String>> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn set_ex(&mut self, key: &str, value: &str, ttl: Duration) -> anyhow::Result<()> {
        if ttl.is_zero() {
            anyhow::bail!("invalid expire time for key `{key}`");
        }

        let mut entries = self.entries.lock().await;
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(Instant::now() + ttl),
            },
        );

        Ok(())
    }
}

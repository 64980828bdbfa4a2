use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::{future::Cache, Expiry};
use thiserror::Error;

pub mod profile;
pub mod session;

pub use profile::ProfileCache;
pub use session::SessionCache;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),

    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Key-value backing store with per-entry TTL.
///
/// `get` distinguishes a miss (`Ok(None)`) from a backend failure (`Err`).
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    /// Deleting an absent key is not an error.
    async fn del(&self, key: &str) -> Result<(), CacheError>;
}

#[derive(Clone)]
struct Entry {
    value: String,
    ttl: Duration,
}

struct EntryTtl;

impl Expiry<String, Entry> for EntryTtl {
    fn expire_after_create(&self, _key: &String, value: &Entry, _created_at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-process `KvStore` on a bounded moka cache.
#[derive(Clone)]
pub struct MokaStore {
    inner: Cache<String, Entry>,
}

impl MokaStore {
    pub fn new(max_entries: u64) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_entries)
            .expire_after(EntryTtl)
            .build();
        Self { inner }
    }

    #[cfg(test)]
    pub async fn len(&self) -> u64 {
        self.inner.run_pending_tasks().await;
        self.inner.entry_count()
    }
}

#[async_trait]
impl KvStore for MokaStore {
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        self.inner.insert(key.to_owned(), Entry { value, ttl }).await;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.inner.get(key).await.map(|e| e.value))
    }

    async fn del(&self, key: &str) -> Result<(), CacheError> {
        self.inner.invalidate(key).await;
        Ok(())
    }
}

pub(crate) fn namespaced(prefix: &str, key: &str) -> String {
    format!("{prefix}:{key}")
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_del() {
        let store = MokaStore::new(100);
        assert_eq!(store.get("k").await.unwrap(), None);

        store.set("k", "v".into(), Duration::from_secs(60)).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));

        store.del("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
        store.del("k").await.unwrap();
    }

    #[tokio::test]
    async fn entries_expire_independently() {
        let store = MokaStore::new(100);
        store.set("short", "a".into(), Duration::from_millis(50)).await.unwrap();
        store.set("long", "b".into(), Duration::from_secs(60)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(store.get("short").await.unwrap(), None);
        assert_eq!(store.get("long").await.unwrap().as_deref(), Some("b"));
    }

    #[test]
    fn keys_are_prefixed() {
        assert_eq!(namespaced("token", "abc"), "token:abc");
    }
}

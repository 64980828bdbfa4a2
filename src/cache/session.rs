use std::{sync::Arc, time::Duration};

use super::{namespaced, CacheError, KvStore};

/// Session token -> username.
#[derive(Clone)]
pub struct SessionCache {
    store: Arc<dyn KvStore>,
    prefix: String,
    ttl: Duration,
}

impl SessionCache {
    pub fn new(store: Arc<dyn KvStore>, prefix: impl Into<String>, ttl: Duration) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            ttl,
        }
    }

    pub async fn set(&self, token: &str, username: &str) -> Result<(), CacheError> {
        self.store
            .set(&namespaced(&self.prefix, token), username.to_owned(), self.ttl)
            .await
    }

    /// An empty stored value counts as absent.
    pub async fn get(&self, token: &str) -> Result<Option<String>, CacheError> {
        let value = self.store.get(&namespaced(&self.prefix, token)).await?;
        Ok(value.filter(|v| !v.is_empty()))
    }

    pub async fn del(&self, token: &str) -> Result<(), CacheError> {
        self.store.del(&namespaced(&self.prefix, token)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MokaStore;

    #[tokio::test]
    async fn empty_value_is_absent() {
        let store = Arc::new(MokaStore::new(10));
        let cache = SessionCache::new(store.clone(), "token", Duration::from_secs(60));
        store
            .set("token:t1", String::new(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get("t1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn shares_backing_store_without_collisions() {
        let store = Arc::new(MokaStore::new(10));
        let a = SessionCache::new(store.clone(), "token", Duration::from_secs(60));
        let b = SessionCache::new(store, "other", Duration::from_secs(60));

        a.set("same", "alice").await.unwrap();
        assert_eq!(b.get("same").await.unwrap(), None);
        assert_eq!(a.get("same").await.unwrap().as_deref(), Some("alice"));
    }
}

use std::{sync::Arc, time::Duration};

use super::{namespaced, CacheError, KvStore};
use crate::users::UserRecord;

/// Username -> JSON snapshot of the user row. Never authoritative.
#[derive(Clone)]
pub struct ProfileCache {
    store: Arc<dyn KvStore>,
    prefix: String,
    ttl: Duration,
}

impl ProfileCache {
    pub fn new(store: Arc<dyn KvStore>, prefix: impl Into<String>, ttl: Duration) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            ttl,
        }
    }

    pub async fn set(&self, user: &UserRecord) -> Result<(), CacheError> {
        let data = serde_json::to_string(user)?;
        self.store
            .set(&namespaced(&self.prefix, &user.username), data, self.ttl)
            .await
    }

    pub async fn get(&self, username: &str) -> Result<Option<UserRecord>, CacheError> {
        match self.store.get(&namespaced(&self.prefix, username)).await? {
            Some(data) if !data.is_empty() => Ok(Some(serde_json::from_str(&data)?)),
            _ => Ok(None),
        }
    }

    pub async fn del(&self, username: &str) -> Result<(), CacheError> {
        self.store.del(&namespaced(&self.prefix, username)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MokaStore;
    use time::macros::datetime;

    fn record() -> UserRecord {
        UserRecord {
            id: 7,
            username: "alice".into(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".into(),
            salt: "c2FsdA".into(),
            nickname: "Alice".into(),
            picture_path: Some("avatars/a.png".into()),
            created_at: datetime!(2024-01-02 03:04:05 UTC),
            updated_at: datetime!(2024-01-03 03:04:05 UTC),
            version: 3,
        }
    }

    #[tokio::test]
    async fn snapshot_survives_the_cache() {
        let cache = ProfileCache::new(Arc::new(MokaStore::new(10)), "user", Duration::from_secs(60));
        cache.set(&record()).await.unwrap();
        assert_eq!(cache.get("alice").await.unwrap(), Some(record()));

        cache.del("alice").await.unwrap();
        assert_eq!(cache.get("alice").await.unwrap(), None);
    }

    #[tokio::test]
    async fn corrupt_snapshot_is_an_error_not_a_miss() {
        let store = Arc::new(MokaStore::new(10));
        store
            .set("user:alice", "{not json".into(), Duration::from_secs(60))
            .await
            .unwrap();
        let cache = ProfileCache::new(store, "user", Duration::from_secs(60));
        assert!(matches!(
            cache.get("alice").await,
            Err(CacheError::Serialization(_))
        ));
    }
}

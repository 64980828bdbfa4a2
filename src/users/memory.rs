use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use time::OffsetDateTime;

use super::password::new_credential;
use super::repo::{StoreError, UserStore};
use super::repo_types::{ProfileField, UserRecord};

/// In-memory `UserStore` used by the unit tests.
///
/// `update_field` reads the version and applies the conditional write in two
/// separate steps with a yield in between, like the two statements of the
/// Postgres adapter, so concurrent callers can interleave.
#[derive(Default)]
pub struct MemoryUserStore {
    rows: Mutex<HashMap<String, UserRecord>>,
    next_id: Mutex<i64>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remove(&self, username: &str) {
        self.rows.lock().remove(username);
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.rows.lock().get(username).cloned())
    }

    async fn create_user(
        &self,
        username: &str,
        raw_password: &str,
        nickname: &str,
    ) -> Result<UserRecord, StoreError> {
        let cred = new_credential(raw_password)?;
        let now = OffsetDateTime::now_utc();

        let mut rows = self.rows.lock();
        if rows.contains_key(username) {
            return Err(StoreError::AlreadyExists);
        }
        let id = {
            let mut next = self.next_id.lock();
            *next += 1;
            *next
        };
        let user = UserRecord {
            id,
            username: username.to_owned(),
            password_hash: cred.password_hash,
            salt: cred.salt,
            nickname: nickname.to_owned(),
            picture_path: None,
            created_at: now,
            updated_at: now,
            version: 1,
        };
        rows.insert(username.to_owned(), user.clone());
        Ok(user)
    }

    async fn update_field(
        &self,
        username: &str,
        field: ProfileField,
        value: &str,
    ) -> Result<i32, StoreError> {
        let observed = match self.rows.lock().get(username) {
            Some(row) => row.version,
            None => return Err(StoreError::VersionConflict),
        };

        tokio::task::yield_now().await;

        let mut rows = self.rows.lock();
        let row = match rows.get_mut(username) {
            Some(row) if row.version == observed => row,
            _ => return Err(StoreError::VersionConflict),
        };
        match field {
            ProfileField::Nickname => row.nickname = value.to_owned(),
            ProfileField::PicturePath => row.picture_path = Some(value.to_owned()),
        }
        row.updated_at = OffsetDateTime::now_utc();
        row.version = observed + 1;
        Ok(row.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_starts_at_version_one() {
        let store = MemoryUserStore::new();
        let user = store.create_user("alice", "secret123", "Alice").await.unwrap();
        assert_eq!(user.version, 1);
        assert_eq!(user.nickname, "Alice");
        assert_ne!(user.password_hash, "secret123");
    }

    #[tokio::test]
    async fn duplicate_create_is_already_exists() {
        let store = MemoryUserStore::new();
        store.create_user("alice", "secret123", "").await.unwrap();
        let err = store.create_user("alice", "other", "").await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists));
    }

    #[tokio::test]
    async fn sequential_updates_bump_version_by_one() {
        let store = MemoryUserStore::new();
        store.create_user("alice", "secret123", "").await.unwrap();
        assert_eq!(
            store.update_field("alice", ProfileField::Nickname, "A").await.unwrap(),
            2
        );
        assert_eq!(
            store
                .update_field("alice", ProfileField::PicturePath, "/p.png")
                .await
                .unwrap(),
            3
        );
        let row = store.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(row.nickname, "A");
        assert_eq!(row.picture_path.as_deref(), Some("/p.png"));
    }

    #[tokio::test]
    async fn concurrent_updates_on_same_version_one_loses() {
        let store = MemoryUserStore::new();
        store.create_user("alice", "secret123", "orig").await.unwrap();

        let (a, b) = tokio::join!(
            store.update_field("alice", ProfileField::Nickname, "first"),
            store.update_field("alice", ProfileField::PicturePath, "/second.png"),
        );

        let nickname_won = match (a, b) {
            (Ok(2), Err(StoreError::VersionConflict)) => true,
            (Err(StoreError::VersionConflict), Ok(2)) => false,
            other => panic!("expected exactly one winner, got {other:?}"),
        };
        let row = store.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(row.version, 2);
        if nickname_won {
            assert_eq!(row.nickname, "first");
            assert_eq!(row.picture_path, None);
        } else {
            assert_eq!(row.nickname, "orig");
            assert_eq!(row.picture_path.as_deref(), Some("/second.png"));
        }
    }

    #[tokio::test]
    async fn update_of_missing_row_is_conflict() {
        let store = MemoryUserStore::new();
        let err = store
            .update_field("ghost", ProfileField::Nickname, "x")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict));
    }
}

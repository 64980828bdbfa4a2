use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::debug;

use super::password::new_credential;
use super::repo_types::{ProfileField, UserRecord};
use crate::shard::ShardRouter;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("username already exists")]
    AlreadyExists,

    /// The row's version moved (or the row is gone) between read and write.
    #[error("version conflict")]
    VersionConflict,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("credential error: {0}")]
    Credential(String),
}

/// Authoritative user storage.
///
/// `find_by_username` returns `Ok(None)` for an absent user; `Err` is reserved
/// for infrastructure failures.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Hashes `raw_password` with a fresh salt and inserts the row at version 1.
    async fn create_user(
        &self,
        username: &str,
        raw_password: &str,
        nickname: &str,
    ) -> Result<UserRecord, StoreError>;

    /// Optimistic single-column update. Returns the new version.
    ///
    /// Never retries: a lost race is reported as `VersionConflict`.
    async fn update_field(
        &self,
        username: &str,
        field: ProfileField,
        value: &str,
    ) -> Result<i32, StoreError>;
}

const USER_COLUMNS: &str =
    "id, username, password_hash, salt, nickname, picture_path, created_at, updated_at, version";

/// Postgres adapter over the partition tables.
#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
    router: ShardRouter,
}

impl PgUserStore {
    pub fn new(db: PgPool, router: ShardRouter) -> Self {
        Self { db, router }
    }
}

fn map_insert_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StoreError::AlreadyExists;
        }
    }
    StoreError::Database(e)
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        let table = self.router.table_for(username);
        let user = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM {table} WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create_user(
        &self,
        username: &str,
        raw_password: &str,
        nickname: &str,
    ) -> Result<UserRecord, StoreError> {
        let table = self.router.table_for(username);
        let cred = new_credential(raw_password)?;
        let now = OffsetDateTime::now_utc();

        let user = sqlx::query_as::<_, UserRecord>(&format!(
            r#"
            INSERT INTO {table} (username, password_hash, salt, nickname, created_at, updated_at, version)
            VALUES ($1, $2, $3, $4, $5, $5, 1)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(username)
        .bind(&cred.password_hash)
        .bind(&cred.salt)
        .bind(nickname)
        .bind(now)
        .fetch_one(&self.db)
        .await
        .map_err(map_insert_error)?;

        debug!(username, table = %table, "user row inserted");
        Ok(user)
    }

    async fn update_field(
        &self,
        username: &str,
        field: ProfileField,
        value: &str,
    ) -> Result<i32, StoreError> {
        let table = self.router.table_for(username);
        let column = field.column();
        let mut tx = self.db.begin().await?;

        let Some(version) = sqlx::query_scalar::<_, i32>(&format!(
            "SELECT version FROM {table} WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&mut *tx)
        .await?
        else {
            debug!(username, column, "update target row missing");
            return Err(StoreError::VersionConflict);
        };

        let next = version + 1;
        let res = sqlx::query(&format!(
            r#"
            UPDATE {table}
               SET {column} = $1, updated_at = $2, version = $3
             WHERE username = $4 AND version = $5
            "#
        ))
        .bind(value)
        .bind(OffsetDateTime::now_utc())
        .bind(next)
        .bind(username)
        .bind(version)
        .execute(&mut *tx)
        .await?;

        if res.rows_affected() == 0 {
            debug!(username, column, version, "optimistic update not applied");
            tx.rollback().await?;
            return Err(StoreError::VersionConflict);
        }

        tx.commit().await?;
        Ok(next)
    }
}

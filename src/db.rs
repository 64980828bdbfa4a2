use std::time::Duration;

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::shard::ShardRouter;

/// Bounded pool. Connections go back to the pool when dropped, on every path.
pub async fn connect(cfg: &DatabaseConfig) -> anyhow::Result<PgPool> {
    let db = PgPoolOptions::new()
        .max_connections(cfg.max_connections)
        .idle_timeout(Duration::from_secs(cfg.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(cfg.max_lifetime_secs))
        .acquire_timeout(Duration::from_secs(cfg.acquire_timeout_secs))
        .connect(&cfg.url)
        .await
        .context("connect to database")?;
    info!(max_connections = cfg.max_connections, "database pool ready");
    Ok(db)
}

pub(crate) fn partition_ddl(table: &str) -> String {
    format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            id            BIGSERIAL PRIMARY KEY,
            username      VARCHAR(64)  NOT NULL,
            password_hash VARCHAR(255) NOT NULL,
            salt          VARCHAR(64)  NOT NULL,
            nickname      VARCHAR(64)  NOT NULL DEFAULT '',
            picture_path  VARCHAR(255),
            created_at    TIMESTAMPTZ  NOT NULL DEFAULT now(),
            updated_at    TIMESTAMPTZ  NOT NULL DEFAULT now(),
            version       INTEGER      NOT NULL DEFAULT 1,
            CONSTRAINT {table}_username_key UNIQUE (username)
        )
        "#
    )
}

/// Creates any missing partition table.
pub async fn ensure_partitions(db: &PgPool, router: &ShardRouter) -> anyhow::Result<()> {
    for table in router.tables() {
        sqlx::query(&partition_ddl(&table))
            .execute(db)
            .await
            .with_context(|| format!("create partition {table}"))?;
        debug!(table = %table, "partition ready");
    }
    info!(partitions = router.partitions().get(), "user partitions ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ddl_has_the_full_column_set() {
        let ddl = partition_ddl("users_3");
        for col in [
            "id", "username", "password_hash", "salt", "nickname", "picture_path",
            "created_at", "updated_at", "version",
        ] {
            assert!(ddl.contains(col), "missing {col}");
        }
        assert!(ddl.contains("users_3_username_key UNIQUE (username)"));
        assert!(ddl.contains("IF NOT EXISTS users_3"));
    }
}

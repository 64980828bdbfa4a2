use std::{num::NonZeroU32, time::Duration};

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
    pub acquire_timeout_secs: u64,
    /// Number of `users_N` partition tables. Fixed for the lifetime of the data.
    pub user_table_count: NonZeroU32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub token_prefix: String,
    pub token_ttl_secs: u64,
    pub user_prefix: String,
    pub user_ttl_secs: u64,
    pub max_entries: u64,
}

impl CacheConfig {
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }

    pub fn user_ttl(&self) -> Duration {
        Duration::from_secs(self.user_ttl_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub url_ttl_secs: u64,
}

impl StorageConfig {
    pub fn url_ttl(&self) -> Duration {
        Duration::from_secs(self.url_ttl_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub storage: StorageConfig,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(v) => v
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("invalid {key}={v}: {e}")),
        Err(_) => Ok(default),
    }
}

fn env_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database = DatabaseConfig {
            url: std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            max_connections: env_or("DB_MAX_CONNECTIONS", 10)?,
            idle_timeout_secs: env_or("DB_IDLE_TIMEOUT_SECS", 600)?,
            max_lifetime_secs: env_or("DB_MAX_LIFETIME_SECS", 3600)?,
            acquire_timeout_secs: env_or("DB_ACQUIRE_TIMEOUT_SECS", 5)?,
            user_table_count: NonZeroU32::new(env_or("DB_USER_TABLE_COUNT", 10u32)?)
                .context("DB_USER_TABLE_COUNT must be greater than zero")?,
        };

        let cache = CacheConfig {
            token_prefix: env_str("CACHE_TOKEN_PREFIX", "token"),
            token_ttl_secs: env_or("CACHE_TOKEN_EXPIRE", 60 * 60 * 24)?,
            user_prefix: env_str("CACHE_USER_PREFIX", "user"),
            user_ttl_secs: env_or("CACHE_USER_EXPIRE", 60 * 60)?,
            max_entries: env_or("CACHE_MAX_ENTRIES", 100_000)?,
        };
        anyhow::ensure!(
            cache.token_prefix != cache.user_prefix,
            "CACHE_TOKEN_PREFIX and CACHE_USER_PREFIX must differ"
        );

        let storage = StorageConfig {
            endpoint: env_str("MINIO_ENDPOINT", "http://localhost:9000"),
            bucket: env_str("MINIO_BUCKET", "avatars"),
            access_key: env_str("MINIO_ACCESS_KEY", "minioadmin"),
            secret_key: env_str("MINIO_SECRET_KEY", "minioadmin"),
            region: env_str("MINIO_REGION", "us-east-1"),
            url_ttl_secs: env_or("AVATAR_URL_TTL_SECS", 30 * 60)?,
        };

        Ok(Self {
            host: env_str("APP_HOST", "0.0.0.0"),
            port: env_or("APP_PORT", 8080)?,
            database,
            cache,
            storage,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

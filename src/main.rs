mod app;
mod auth;
mod cache;
mod config;
mod db;
mod error;
mod images;
mod profile;
mod shard;
mod state;
mod storage;
mod users;

use crate::config::AppConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "useraccount=debug,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = AppConfig::from_env()?;
    tracing::info!(
        partitions = config.database.user_table_count.get(),
        token_ttl_secs = config.cache.token_ttl_secs,
        user_ttl_secs = config.cache.user_ttl_secs,
        "configuration loaded"
    );

    let addr = config.addr();
    let state = AppState::init(config).await?;
    app::serve(app::build_app(state), &addr).await
}

use std::sync::Arc;

mod api;
mod api_keys;
mod app;
mod auth;
mod config;
mod db;
mod error;
#[cfg(test)]
mod memory;
mod people;
mod state;
mod storage;
#[cfg(test)]
mod testing;
mod users;

use crate::config::AppConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "cipherstorm=debug,axum=info,tower_http=info".to_string());
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

    let config = Arc::new(AppConfig::from_env()?);
    tracing::info!(
        upload_dir = %config.upload.dir.display(),
        max_connections = config.max_connections,
        bootstrap_admin = config.bootstrap.is_some(),
        "configuration loaded"
    );

    let pool = db::connect(&config).await?;
    db::migrate(&pool).await?;

    let state = AppState::from_pool(config.clone(), pool.clone());
    db::seed(&config, state.users.as_ref()).await?;

    let app = app::build_app(state);
    app::serve(app, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for shutdown signal");
        }
        tracing::info!("shutting down");
    })
    .await?;

    pool.close().await;
    Ok(())
}

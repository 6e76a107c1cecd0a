use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

use crate::config::AppConfig;
use crate::users::{repo::UserRepo, services::seed_bootstrap_admin};

pub async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    let db = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(config.database.clone())
        .await
        .context("connect to database")?;
    Ok(db)
}

pub async fn migrate(db: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(db)
        .await
        .context("run database migrations")?;
    info!("database schema ready");
    Ok(())
}

/// Seeds the bootstrap admin account when one is configured.
pub async fn seed(config: &AppConfig, users: &dyn UserRepo) -> anyhow::Result<()> {
    if let Some(admin) = &config.bootstrap {
        if seed_bootstrap_admin(users, admin)
            .await
            .context("seed bootstrap admin")?
        {
            info!(username = %admin.username, "bootstrap admin created");
        }
    }
    Ok(())
}

//! Relational store connection.
use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::config::Postgres;

/// Pooled PostgreSQL connection shared between requests.
#[derive(Clone)]
pub struct Database {
    pub postgres: PgPool,
}

impl Database {
    /// Init database connections.
    pub async fn new(config: &Postgres) -> Result<Self, sqlx::Error> {
        let addr = format!(
            "postgres://{}:{}@{}/{}",
            config.username, config.password, config.address, config.database
        );
        let postgres = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(Duration::from_secs(config.timeout))
            .connect(&addr)
            .await?;

        tracing::info!(
            hostname = %config.address,
            db = %config.database,
            pool_size = config.pool_size,
            "postgres connected"
        );

        Ok(Self { postgres })
    }

    /// Apply pending migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!().run(&self.postgres).await
    }
}

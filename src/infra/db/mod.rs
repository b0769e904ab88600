//! Postgres-backed option stores.
//!
//! Site options live in `site_options`, network options in
//! `network_options`; values are stored as JSONB.

mod options;
mod util;

pub use util::map_sqlx_error;

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use crate::infra::error::InfraError;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct PostgresRepositories {
    pool: Arc<PgPool>,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect(url)
            .await
    }

    /// Create the option tables if they are missing.
    pub async fn run_migrations(pool: &PgPool) -> Result<(), InfraError> {
        let migrator = sqlx::migrate!("./migrations");
        migrator.run(pool).await?;
        info!(
            target = "infra::db",
            migrations = migrator.iter().count(),
            "option schema up to date"
        );
        Ok(())
    }
}

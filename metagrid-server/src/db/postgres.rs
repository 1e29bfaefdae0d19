//! PostgreSQL storage backend
//!
//! Repository implementations live next to their entities; this module owns
//! the connection pool, migrations and health checks.

use std::time::Duration;

use async_trait::async_trait;
use backoff::{future::retry_notify, ExponentialBackoff};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use super::{Store, StoreError};

/// Give up connecting after this long (database may still be starting)
const CONNECT_MAX_ELAPSED: Duration = Duration::from_secs(30);

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect to PostgreSQL, retrying with exponential backoff
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, StoreError> {
        let backoff = ExponentialBackoff {
            initial_interval: Duration::from_millis(250),
            max_interval: Duration::from_secs(5),
            max_elapsed_time: Some(CONNECT_MAX_ELAPSED),
            ..ExponentialBackoff::default()
        };

        let pool = retry_notify(
            backoff,
            || async {
                PgPoolOptions::new()
                    .max_connections(max_connections)
                    .min_connections(min_connections)
                    .acquire_timeout(Duration::from_secs(5))
                    .connect(database_url)
                    .await
                    .map_err(|e| match e {
                        // Bad credentials or URL will not fix themselves
                        sqlx::Error::Configuration(_) => backoff::Error::permanent(e),
                        other => backoff::Error::transient(other),
                    })
            },
            |err: sqlx::Error, duration: Duration| {
                tracing::warn!(
                    error = %err,
                    retry_after_ms = duration.as_millis() as u64,
                    "Database connection failed, retrying"
                );
            },
        )
        .await
        .map_err(|e| StoreError::Connection(e.to_string()))?;

        tracing::info!("Connected to PostgreSQL database");
        Ok(Self { pool })
    }

    /// Create from an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub(crate) fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Migration(e.to_string()))?;

        tracing::info!("Database migrations completed");
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn check_health(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(())
    }
}

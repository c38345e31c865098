//! PostgreSQL backend for the animal and match stores.

mod animals;
mod matches;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use std::time::Duration;

use crate::services::store::{StoreError, TransactionScope};

/// Open transaction on a pooled connection
pub type PgTx = Transaction<'static, Postgres>;

/// SQLSTATE for a CHECK constraint violation
const CHECK_VIOLATION: &str = "23514";
/// SQLSTATE for a unique constraint violation
const UNIQUE_VIOLATION: &str = "23505";

/// PostgreSQL client owning the connection pool
///
/// Implements the transaction scope together with both store interfaces, so
/// the same client is handed to every core service.
pub struct PostgresClient {
    pool: PgPool,
    lock_timeout_ms: Option<u64>,
}

impl PostgresClient {
    /// Create a new PostgreSQL client from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self {
            pool,
            lock_timeout_ms: None,
        })
    }

    /// Create a new PostgreSQL client from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, StoreError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }

    /// Wrap an existing pool without running migrations
    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            lock_timeout_ms: None,
        }
    }

    /// Bound how long a transaction waits on a row lock before failing
    pub fn with_lock_timeout(mut self, lock_timeout_ms: Option<u64>) -> Self {
        self.lock_timeout_ms = lock_timeout_ms.filter(|ms| *ms > 0);
        self
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl TransactionScope for PostgresClient {
    type Tx = PgTx;

    async fn begin(&self) -> Result<PgTx, StoreError> {
        let mut tx = self.pool.begin().await?;

        if let Some(ms) = self.lock_timeout_ms {
            // SET does not take bind parameters
            sqlx::query(&format!("SET LOCAL lock_timeout = '{}ms'", ms))
                .execute(&mut *tx)
                .await?;
        }

        Ok(tx)
    }

    async fn begin_read(&self) -> Result<PgTx, StoreError> {
        // Plain snapshot reads; no FOR UPDATE is ever issued on this handle
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION READ ONLY")
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }

    async fn commit(&self, tx: PgTx) -> Result<(), StoreError> {
        tx.commit().await.map_err(map_sqlx_error)
    }

    async fn rollback(&self, tx: PgTx) -> Result<(), StoreError> {
        tx.rollback().await.map_err(map_sqlx_error)
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}

/// Surface constraint violations as their own error kind
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        let code = db_err.code();
        if matches!(code.as_deref(), Some(CHECK_VIOLATION) | Some(UNIQUE_VIOLATION)) {
            return StoreError::ConstraintViolation(db_err.message().to_string());
        }
    }
    StoreError::SqlxError(err)
}

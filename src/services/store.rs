//! Store interfaces consumed by the core services.
//!
//! Every call issued inside a scoped operation receives the open unit-of-work
//! handle explicitly; no store reaches for ambient transaction state.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    Animal, AnimalQuery, AnimalUpdate, MatchDeleteFilter, MatchDetail, MatchRecord, NewAnimal,
    NewMatch,
};

/// Errors raised by a store backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

/// Atomic unit-of-work provider
///
/// A `Tx` dropped without `commit` is rolled back, so cancelling the caller's
/// future aborts the in-flight operation.
#[async_trait]
pub trait TransactionScope: Send + Sync {
    type Tx: Send;

    async fn begin(&self) -> Result<Self::Tx, StoreError>;

    /// Unit of work for reads that take no locks and never wait on writers.
    /// Committing it publishes nothing.
    async fn begin_read(&self) -> Result<Self::Tx, StoreError>;

    async fn commit(&self, tx: Self::Tx) -> Result<(), StoreError>;

    async fn rollback(&self, tx: Self::Tx) -> Result<(), StoreError>;

    async fn health_check(&self) -> Result<bool, StoreError>;
}

/// Persistence for animal aggregates
#[async_trait]
pub trait AnimalStore<Tx: Send>: Send + Sync {
    async fn create(&self, tx: &mut Tx, animal: NewAnimal) -> Result<Animal, StoreError>;

    /// Rows come back in ascending id order; with `for_update` they are locked
    /// in that same order.
    async fn get_by_ids(&self, tx: &mut Tx, query: AnimalQuery<'_>)
        -> Result<Vec<Animal>, StoreError>;

    /// Writes only the fields present in `update`; returns the rows touched.
    async fn update(&self, tx: &mut Tx, update: &AnimalUpdate) -> Result<u64, StoreError>;
}

/// Persistence for pairing proposals
#[async_trait]
pub trait MatchStore<Tx: Send>: Send + Sync {
    async fn create(&self, tx: &mut Tx, new_match: NewMatch) -> Result<MatchRecord, StoreError>;

    async fn get_by_id(
        &self,
        tx: &mut Tx,
        id: i64,
        for_update: bool,
    ) -> Result<Option<MatchRecord>, StoreError>;

    /// Proposals issued or received by the user, newest first
    async fn list_for_user(&self, tx: &mut Tx, user_id: i64)
        -> Result<Vec<MatchDetail>, StoreError>;

    /// Flags an unresolved proposal as resolved; false if nothing changed.
    async fn mark_resolved(&self, tx: &mut Tx, id: i64) -> Result<bool, StoreError>;

    async fn delete(&self, tx: &mut Tx, filter: &MatchDeleteFilter) -> Result<u64, StoreError>;
}

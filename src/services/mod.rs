// Service exports
pub mod memory;
pub mod postgres;
pub mod store;

pub use memory::{MemoryStore, MemoryTx};
pub use postgres::{PgTx, PostgresClient};
pub use store::{AnimalStore, MatchStore, StoreError, TransactionScope};

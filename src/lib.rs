//! Pawmatch - pairing service for listed animals
//!
//! This library provides the transactional match lifecycle: proposals between
//! animals of different owners, approval with cascade cleanup, rejection and
//! withdrawal, all under a fixed row-locking order.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{
    AnimalRegistry, AnimalService, CreateMatchArgs, EngineError, ErrorKind, MatchEngine,
    MatchService,
};
pub use models::{Animal, AnimalUpdate, MatchRecord, PairingCountChange, Sex};
pub use services::{MemoryStore, PostgresClient, StoreError};

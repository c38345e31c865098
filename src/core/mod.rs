// Core service exports
pub mod animals;
pub mod engine;
pub mod error;
mod scope;

pub use animals::{AnimalRegistry, AnimalService};
pub use engine::{CreateMatchArgs, MatchEngine, MatchService};
pub use error::{parse_id, EngineError, ErrorKind};

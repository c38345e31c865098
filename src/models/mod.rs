// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    Animal, AnimalChanges, AnimalQuery, AnimalUpdate, MatchDeleteFilter, MatchDetail, MatchRecord,
    NewAnimal, NewMatch, PairingCountChange, Sex,
};
pub use requests::{CreateAnimalRequest, CreateMatchRequest, ResolveMatchRequest, UpdateAnimalRequest};
pub use responses::{
    AnimalResponse, CreatedResponse, ErrorResponse, HealthResponse, MatchListItem, ResTemplate,
};

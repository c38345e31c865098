use thiserror::Error;

use crate::services::StoreError;

/// Coarse classification used by callers to pick a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Conflict,
    Authorization,
    Infrastructure,
}

impl ErrorKind {
    /// HTTP status for this kind; authorization failures look like 404 so
    /// existence is not leaked.
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::NotFound => 404,
            ErrorKind::Validation => 400,
            ErrorKind::Conflict => 400,
            ErrorKind::Authorization => 404,
            ErrorKind::Infrastructure => 500,
        }
    }
}

/// Errors returned by the match engine and the animal registry
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("animal not found")]
    AnimalNotFound,

    #[error("animal has already been matched")]
    AlreadyMatched,

    #[error("animals are from the same owner")]
    SameOwner,

    #[error("animals have the same sex")]
    SameSex,

    #[error("user does not own either animal")]
    NotOwner,

    #[error("match not found")]
    MatchNotFound,

    #[error("match has already been approved or rejected")]
    MatchAlreadyResolved,

    #[error("match was not issued by this user")]
    NotIssuer,

    #[error("match was not addressed to this user")]
    NotReceiver,

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("animal sex cannot be changed after a match has been requested")]
    SexLocked,

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("{context}: {source}")]
    Store {
        context: &'static str,
        #[source]
        source: StoreError,
    },
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::AnimalNotFound | EngineError::MatchNotFound => ErrorKind::NotFound,
            EngineError::AlreadyMatched
            | EngineError::SameOwner
            | EngineError::SameSex
            | EngineError::InvalidId(_)
            | EngineError::SexLocked => ErrorKind::Validation,
            EngineError::MatchAlreadyResolved => ErrorKind::Conflict,
            EngineError::NotOwner | EngineError::NotIssuer | EngineError::NotReceiver => {
                ErrorKind::Authorization
            }
            EngineError::InvariantViolation(_) | EngineError::Store { .. } => {
                ErrorKind::Infrastructure
            }
        }
    }

    /// Short machine-readable code for response bodies
    ///
    /// Authorization failures report the code of the resource they hide.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::AnimalNotFound | EngineError::NotOwner => "animal_not_found",
            EngineError::AlreadyMatched => "already_matched",
            EngineError::SameOwner => "same_owner",
            EngineError::SameSex => "same_sex",
            EngineError::MatchNotFound => "match_not_found",
            EngineError::MatchAlreadyResolved => "match_already_resolved",
            EngineError::NotIssuer | EngineError::NotReceiver => "match_not_found",
            EngineError::InvalidId(_) => "invalid_id",
            EngineError::SexLocked => "sex_locked",
            EngineError::InvariantViolation(_) | EngineError::Store { .. } => "internal_error",
        }
    }

    pub(crate) fn store(context: &'static str) -> impl FnOnce(StoreError) -> EngineError {
        move |source| EngineError::Store { context, source }
    }
}

/// Parse a decimal identifier as received from a client
pub fn parse_id(raw: &str) -> Result<i64, EngineError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| EngineError::InvalidId(raw.to_string()))
}

// Route exports
pub mod animals;
pub mod auth;
pub mod matches;

use actix_web::{error, http::StatusCode, web, HttpResponse, Responder, ResponseError};
use std::sync::Arc;

use crate::core::{AnimalRegistry, AnimalService, EngineError, ErrorKind, MatchEngine, MatchService};
use crate::models::{ErrorResponse, HealthResponse};
use crate::services::{AnimalStore, MatchStore, TransactionScope};
use auth::TokenVerifier;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub matches: Arc<dyn MatchService>,
    pub animals: Arc<dyn AnimalService>,
    pub auth: Arc<TokenVerifier>,
}

impl AppState {
    /// Wire both services onto one store that implements every store trait
    pub fn from_store<S>(store: Arc<S>, jwt_secret: &str) -> Self
    where
        S: TransactionScope + AnimalStore<S::Tx> + MatchStore<S::Tx> + 'static,
    {
        let matches = MatchEngine::new(store.clone(), store.clone(), store.clone());
        let animals = AnimalRegistry::new(store.clone(), store);

        Self {
            matches: Arc::new(matches),
            animals: Arc::new(animals),
            auth: Arc::new(TokenVerifier::new(jwt_secret)),
        }
    }
}

/// Configure all routes under the versioned prefix
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/health", web::get().to(health_check))
            .configure(animals::configure)
            .configure(matches::configure),
    );
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let status = if state.matches.health_check().await {
        "healthy"
    } else {
        "degraded"
    };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

impl ResponseError for EngineError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        // Store failures can carry connection details, keep them in the log
        let message = if self.kind() == ErrorKind::Infrastructure {
            tracing::error!("Request failed: {}", self);
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        HttpResponse::build(status).json(ErrorResponse {
            error: self.code().to_string(),
            message,
            status_code: status.as_u16(),
        })
    }
}

/// 400 response for a request body that decoded but failed validation
pub(crate) fn validation_failed(message: impl Into<String>) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: "Validation failed".to_string(),
        message: message.into(),
        status_code: 400,
    })
}

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl ResponseError for JsonError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST)
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(
    err: error::JsonPayloadError,
    req: &actix_web::HttpRequest,
) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

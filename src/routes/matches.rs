use actix_web::{web, HttpResponse};
use validator::Validate;

use crate::core::{parse_id, CreateMatchArgs, EngineError};
use crate::models::{
    CreateMatchRequest, CreatedResponse, MatchListItem, ResTemplate, ResolveMatchRequest,
};
use crate::routes::auth::AuthenticatedUser;
use crate::routes::{validation_failed, AppState};

/// Configure all match-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/matches", web::post().to(create_match))
        .route("/matches", web::get().to(list_matches))
        .route("/matches/approve", web::post().to(approve_match))
        .route("/matches/reject", web::post().to(reject_match))
        .route("/matches/{id}", web::delete().to(delete_match));
}

/// Propose a pairing
///
/// POST /api/v1/matches
///
/// Request body:
/// ```json
/// {
///   "matchAnimalId": "string",
///   "userAnimalId": "string",
///   "message": "string"
/// }
/// ```
async fn create_match(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    req: web::Json<CreateMatchRequest>,
) -> Result<HttpResponse, EngineError> {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for create_match request: {:?}", errors);
        return Ok(validation_failed(errors.to_string()));
    }

    let req = req.into_inner();
    let args = CreateMatchArgs {
        issuer_animal_id: parse_id(&req.user_animal_id)?,
        receiver_animal_id: parse_id(&req.match_animal_id)?,
        user_id: user.id(),
        message: req.message,
    };

    let record = state.matches.create(args).await?;

    Ok(HttpResponse::Created().json(ResTemplate::new(
        "successfully send match request",
        CreatedResponse {
            id: record.id.to_string(),
            created_at: record.created_at.to_rfc3339(),
        },
    )))
}

/// Proposals issued or received by the requester, newest first
///
/// GET /api/v1/matches
async fn list_matches(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, EngineError> {
    let details = state.matches.list(user.id()).await?;
    let items: Vec<MatchListItem> = details
        .iter()
        .map(|detail| MatchListItem::for_viewer(detail, user.id()))
        .collect();

    Ok(HttpResponse::Ok().json(ResTemplate::new("success", items)))
}

/// Approve a proposal addressed to the requester
///
/// POST /api/v1/matches/approve
async fn approve_match(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    req: web::Json<ResolveMatchRequest>,
) -> Result<HttpResponse, EngineError> {
    if let Err(errors) = req.validate() {
        return Ok(validation_failed(errors.to_string()));
    }

    let match_id = parse_id(&req.match_id)?;
    state.matches.approve(match_id, Some(user.id())).await?;

    Ok(HttpResponse::Ok().json(ResTemplate::new("successfully matches the animals", ())))
}

/// Reject a proposal addressed to the requester
///
/// POST /api/v1/matches/reject
async fn reject_match(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    req: web::Json<ResolveMatchRequest>,
) -> Result<HttpResponse, EngineError> {
    if let Err(errors) = req.validate() {
        return Ok(validation_failed(errors.to_string()));
    }

    let match_id = parse_id(&req.match_id)?;
    state.matches.reject(match_id, Some(user.id())).await?;

    Ok(HttpResponse::Ok().json(ResTemplate::new("successfully reject the match request", ())))
}

/// Withdraw a proposal the requester issued
///
/// DELETE /api/v1/matches/{id}
async fn delete_match(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> Result<HttpResponse, EngineError> {
    let match_id = parse_id(&path)?;
    state.matches.delete(match_id, user.id()).await?;

    Ok(HttpResponse::Ok().json(ResTemplate::new("successfully remove the match request", ())))
}

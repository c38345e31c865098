use actix_web::{web, HttpResponse};
use validator::Validate;

use crate::core::{parse_id, EngineError};
use crate::models::{
    AnimalResponse, CreateAnimalRequest, CreatedResponse, NewAnimal, ResTemplate,
    UpdateAnimalRequest,
};
use crate::routes::auth::AuthenticatedUser;
use crate::routes::{validation_failed, AppState};

/// Configure all animal-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/animals", web::post().to(create_animal))
        .route("/animals/{id}", web::get().to(get_animal))
        .route("/animals/{id}", web::put().to(update_animal))
        .route("/animals/{id}", web::delete().to(delete_animal));
}

async fn create_animal(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    req: web::Json<CreateAnimalRequest>,
) -> Result<HttpResponse, EngineError> {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for create_animal request: {:?}", errors);
        return Ok(validation_failed(errors.to_string()));
    }
    if !req.image_urls_valid() {
        return Ok(validation_failed("imageUrls must be absolute URLs"));
    }

    let req = req.into_inner();
    let animal = state
        .animals
        .create(NewAnimal {
            owner_id: user.id(),
            name: req.name,
            sex: req.sex,
            age_in_months: req.age_in_months,
            description: req.description,
            image_urls: req.image_urls,
        })
        .await?;

    Ok(HttpResponse::Created().json(ResTemplate::new(
        "success",
        CreatedResponse {
            id: animal.id.to_string(),
            created_at: animal.created_at.to_rfc3339(),
        },
    )))
}

async fn get_animal(
    state: web::Data<AppState>,
    _user: AuthenticatedUser,
    path: web::Path<String>,
) -> Result<HttpResponse, EngineError> {
    let animal = state.animals.get(parse_id(&path)?).await?;

    Ok(HttpResponse::Ok().json(ResTemplate::new("success", AnimalResponse::from(&animal))))
}

/// Partial edit; sex is frozen once the animal has a pairing request
async fn update_animal(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<String>,
    req: web::Json<UpdateAnimalRequest>,
) -> Result<HttpResponse, EngineError> {
    let id = parse_id(&path)?;

    if let Err(errors) = req.validate() {
        return Ok(validation_failed(errors.to_string()));
    }
    if !req.image_urls_valid() {
        return Ok(validation_failed("imageUrls must be absolute URLs"));
    }

    let animal = state
        .animals
        .update(user.id(), id, req.into_inner().into_changes())
        .await?;

    Ok(HttpResponse::Ok().json(ResTemplate::new("success", AnimalResponse::from(&animal))))
}

async fn delete_animal(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> Result<HttpResponse, EngineError> {
    state.animals.delete(user.id(), parse_id(&path)?).await?;

    Ok(HttpResponse::Ok().json(ResTemplate::new("success", ())))
}

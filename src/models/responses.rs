use serde::{Deserialize, Serialize};
use crate::models::domain::{Animal, MatchDetail};

/// Envelope for successful responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResTemplate<T> {
    pub message: String,
    pub data: T,
}

impl<T> ResTemplate<T> {
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data,
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

/// Returned after a resource has been created
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

/// Public view of an animal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimalResponse {
    pub id: String,
    pub name: String,
    pub sex: String,
    #[serde(rename = "ageInMonths")]
    pub age_in_months: i32,
    #[serde(rename = "imageUrls")]
    pub image_urls: Vec<String>,
    pub description: String,
    #[serde(rename = "hasMatched")]
    pub has_matched: bool,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

impl From<&Animal> for AnimalResponse {
    fn from(animal: &Animal) -> Self {
        Self {
            id: animal.id.to_string(),
            name: animal.name.clone(),
            sex: animal.sex.to_string(),
            age_in_months: animal.age_in_months,
            image_urls: animal.image_urls.clone(),
            description: animal.description.clone(),
            has_matched: animal.matched,
            created_at: animal.created_at.to_rfc3339(),
        }
    }
}

/// A proposal as seen by one of its two participants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchListItem {
    pub id: String,
    pub message: String,
    pub resolved: bool,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "issuedBy")]
    pub issued_by: String,
    #[serde(rename = "userAnimalDetail")]
    pub user_animal_detail: AnimalResponse,
    #[serde(rename = "matchAnimalDetail")]
    pub match_animal_detail: AnimalResponse,
}

impl MatchListItem {
    /// Orient a proposal so the viewer's own animal comes first
    pub fn for_viewer(detail: &MatchDetail, viewer_id: i64) -> Self {
        let (own, other) = if detail.issuer_user_id == viewer_id {
            (&detail.issuer_animal, &detail.receiver_animal)
        } else {
            (&detail.receiver_animal, &detail.issuer_animal)
        };

        Self {
            id: detail.id.to_string(),
            message: detail.message.clone(),
            resolved: detail.resolved,
            created_at: detail.created_at.to_rfc3339(),
            issued_by: detail.issuer_user_id.to_string(),
            user_animal_detail: AnimalResponse::from(own),
            match_animal_detail: AnimalResponse::from(other),
        }
    }
}

use crate::models::domain::{AnimalChanges, Sex};
use serde::{Deserialize, Serialize};
use url::Url;
use validator::Validate;

/// Request to list a new animal
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateAnimalRequest {
    #[validate(length(min = 1, max = 30))]
    pub name: String,
    pub sex: Sex,
    #[validate(range(min = 1, max = 120082))]
    #[serde(alias = "age_in_months", rename = "ageInMonths")]
    pub age_in_months: i32,
    #[validate(length(min = 1, max = 200))]
    pub description: String,
    #[validate(length(min = 1))]
    #[serde(alias = "image_urls", rename = "imageUrls")]
    pub image_urls: Vec<String>,
}

impl CreateAnimalRequest {
    pub fn image_urls_valid(&self) -> bool {
        all_absolute_urls(&self.image_urls)
    }
}

/// Request to edit an animal; omitted fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateAnimalRequest {
    #[validate(length(min = 1, max = 30))]
    pub name: Option<String>,
    pub sex: Option<Sex>,
    #[validate(range(min = 1, max = 120082))]
    #[serde(alias = "age_in_months", rename = "ageInMonths")]
    pub age_in_months: Option<i32>,
    #[validate(length(min = 1, max = 200))]
    pub description: Option<String>,
    #[validate(length(min = 1))]
    #[serde(alias = "image_urls", rename = "imageUrls")]
    pub image_urls: Option<Vec<String>>,
}

impl UpdateAnimalRequest {
    pub fn image_urls_valid(&self) -> bool {
        self.image_urls
            .as_deref()
            .map(all_absolute_urls)
            .unwrap_or(true)
    }

    pub fn into_changes(self) -> AnimalChanges {
        AnimalChanges {
            name: self.name,
            sex: self.sex,
            age_in_months: self.age_in_months,
            description: self.description,
            image_urls: self.image_urls,
        }
    }
}

/// Request to propose a pairing between the requester's animal and another user's
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateMatchRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "match_animal_id", rename = "matchAnimalId")]
    pub match_animal_id: String,
    #[validate(length(min = 1))]
    #[serde(alias = "user_animal_id", rename = "userAnimalId")]
    pub user_animal_id: String,
    #[validate(length(min = 5, max = 120))]
    pub message: String,
}

/// Request to approve or reject a proposal
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ResolveMatchRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "match_id", rename = "matchId")]
    pub match_id: String,
}

/// Image URLs must carry both a scheme and a host
fn all_absolute_urls(urls: &[String]) -> bool {
    urls.iter().all(|raw| match Url::parse(raw) {
        Ok(url) => !url.scheme().is_empty() && url.host_str().is_some_and(|h| !h.is_empty()),
        Err(_) => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_match_message_length() {
        let mut req = CreateMatchRequest {
            match_animal_id: "1".to_string(),
            user_animal_id: "2".to_string(),
            message: "hey".to_string(),
        };
        assert!(req.validate().is_err());

        req.message = "hello there".to_string();
        assert!(req.validate().is_ok());

        req.message = "x".repeat(121);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_create_animal_rejects_relative_image_urls() {
        let req: CreateAnimalRequest = serde_json::from_value(serde_json::json!({
            "name": "Miso",
            "sex": "female",
            "ageInMonths": 12,
            "description": "calm and curious",
            "imageUrls": ["not-a-url"]
        }))
        .unwrap();

        assert!(req.validate().is_ok());
        assert!(!req.image_urls_valid());
    }

    #[test]
    fn test_update_request_allows_partial_bodies() {
        let req: UpdateAnimalRequest =
            serde_json::from_value(serde_json::json!({ "sex": "male" })).unwrap();

        assert!(req.validate().is_ok());
        assert!(req.image_urls_valid());

        let changes = req.into_changes();
        assert_eq!(changes.sex, Some(Sex::Male));
        assert!(changes.name.is_none());
    }

    #[test]
    fn test_unknown_sex_fails_to_decode() {
        let decoded: Result<UpdateAnimalRequest, _> =
            serde_json::from_value(serde_json::json!({ "sex": "unknown" }));
        assert!(decoded.is_err());
    }

    #[test]
    fn test_image_urls_need_scheme_and_host() {
        let urls = |raw: &[&str]| raw.iter().map(|u| u.to_string()).collect::<Vec<_>>();

        assert!(all_absolute_urls(&urls(&["https://img.example/a.png", "http://cdn/b.jpg"])));
        assert!(!all_absolute_urls(&urls(&["mailto:owner@example.com"])));
        assert!(!all_absolute_urls(&urls(&["data:image/png;base64,AAAA"])));
        assert!(!all_absolute_urls(&urls(&["//img.example/a.png"])));
        assert!(!all_absolute_urls(&urls(&["https://img.example/a.png", "a.png"])));
    }
}

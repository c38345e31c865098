use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Biological sex of a listed animal
///
/// Stored as the `animal_sex` Postgres enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "animal_sex", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Male => "male",
            Sex::Female => "female",
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sex {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Sex::Male),
            "female" => Ok(Sex::Female),
            other => Err(format!("unknown sex: {}", other)),
        }
    }
}

/// Animal aggregate listed by a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Animal {
    pub id: i64,
    #[serde(rename = "ownerId")]
    pub owner_id: i64,
    pub name: String,
    pub sex: Sex,
    #[serde(rename = "ageInMonths")]
    pub age_in_months: i32,
    pub description: String,
    #[serde(rename = "imageUrls")]
    pub image_urls: Vec<String>,
    pub matched: bool,
    /// Unresolved proposals referencing this animal; collapsed to 1 on approval
    #[serde(rename = "pairingCount")]
    pub pairing_count: i32,
    #[serde(rename = "isDeleted")]
    pub is_deleted: bool,
    #[serde(rename = "createdAt")]
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Fields required to list a new animal
#[derive(Debug, Clone)]
pub struct NewAnimal {
    pub owner_id: i64,
    pub name: String,
    pub sex: Sex,
    pub age_in_months: i32,
    pub description: String,
    pub image_urls: Vec<String>,
}

/// Owner-editable fields of an animal; absent fields are left untouched
#[derive(Debug, Clone, Default)]
pub struct AnimalChanges {
    pub name: Option<String>,
    pub sex: Option<Sex>,
    pub age_in_months: Option<i32>,
    pub description: Option<String>,
    pub image_urls: Option<Vec<String>>,
}

impl AnimalChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.sex.is_none()
            && self.age_in_months.is_none()
            && self.description.is_none()
            && self.image_urls.is_none()
    }
}

/// How a partial update touches `pairing_count`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingCountChange {
    /// Overwrite with an absolute value
    Set(i32),
    /// Add a (possibly negative) delta to the stored value
    Adjust(i32),
}

/// Partial update applied to a batch of animals
#[derive(Debug, Clone, Default)]
pub struct AnimalUpdate {
    pub ids: Vec<i64>,
    pub name: Option<String>,
    pub sex: Option<Sex>,
    pub age_in_months: Option<i32>,
    pub description: Option<String>,
    pub image_urls: Option<Vec<String>>,
    pub matched: Option<bool>,
    pub pairing_count: Option<PairingCountChange>,
    pub is_deleted: Option<bool>,
}

impl AnimalUpdate {
    pub fn for_ids(ids: impl Into<Vec<i64>>) -> Self {
        Self {
            ids: ids.into(),
            ..Default::default()
        }
    }

    pub fn from_changes(id: i64, changes: AnimalChanges) -> Self {
        Self {
            ids: vec![id],
            name: changes.name,
            sex: changes.sex,
            age_in_months: changes.age_in_months,
            description: changes.description,
            image_urls: changes.image_urls,
            ..Default::default()
        }
    }

    pub fn has_changes(&self) -> bool {
        self.name.is_some()
            || self.sex.is_some()
            || self.age_in_months.is_some()
            || self.description.is_some()
            || self.image_urls.is_some()
            || self.matched.is_some()
            || self.pairing_count.is_some()
            || self.is_deleted.is_some()
    }
}

/// Locked or unlocked batch read of animals
#[derive(Debug, Clone, Copy)]
pub struct AnimalQuery<'a> {
    pub ids: &'a [i64],
    pub for_update: bool,
    pub include_deleted: bool,
}

impl<'a> AnimalQuery<'a> {
    pub fn read(ids: &'a [i64]) -> Self {
        Self {
            ids,
            for_update: false,
            include_deleted: false,
        }
    }

    pub fn locked(ids: &'a [i64]) -> Self {
        Self {
            ids,
            for_update: true,
            include_deleted: false,
        }
    }

    pub fn including_deleted(mut self) -> Self {
        self.include_deleted = true;
        self
    }
}

/// Pairing proposal row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: i64,
    #[serde(rename = "issuerUserId")]
    pub issuer_user_id: i64,
    #[serde(rename = "receiverUserId")]
    pub receiver_user_id: i64,
    #[serde(rename = "issuerAnimalId")]
    pub issuer_animal_id: i64,
    #[serde(rename = "receiverAnimalId")]
    pub receiver_animal_id: i64,
    pub message: String,
    /// True once approved or rejected
    pub resolved: bool,
    #[serde(rename = "createdAt")]
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl MatchRecord {
    pub fn animal_ids(&self) -> [i64; 2] {
        [self.issuer_animal_id, self.receiver_animal_id]
    }

    pub fn references_animal(&self, animal_id: i64) -> bool {
        self.issuer_animal_id == animal_id || self.receiver_animal_id == animal_id
    }
}

/// Fields of a proposal about to be inserted
#[derive(Debug, Clone)]
pub struct NewMatch {
    pub issuer_user_id: i64,
    pub receiver_user_id: i64,
    pub issuer_animal_id: i64,
    pub receiver_animal_id: i64,
    pub message: String,
}

/// Proposal joined with both referenced animals, as shown in listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchDetail {
    pub id: i64,
    pub message: String,
    pub resolved: bool,
    #[serde(rename = "createdAt")]
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(rename = "issuerUserId")]
    pub issuer_user_id: i64,
    #[serde(rename = "receiverUserId")]
    pub receiver_user_id: i64,
    #[serde(rename = "issuerAnimal")]
    pub issuer_animal: Animal,
    #[serde(rename = "receiverAnimal")]
    pub receiver_animal: Animal,
}

/// Row selection for a bulk proposal delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchDeleteFilter {
    /// A single proposal by id
    ById(i64),
    /// Every unresolved proposal referencing any of the animals, except one
    UnresolvedForAnimals { animal_ids: Vec<i64>, except: i64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sex_round_trips_through_str() {
        assert_eq!("male".parse::<Sex>().unwrap(), Sex::Male);
        assert_eq!(Sex::Female.to_string(), "female");
        assert!("MALE".parse::<Sex>().is_err());
    }

    #[test]
    fn test_update_from_changes_leaves_engine_fields_absent() {
        let update = AnimalUpdate::from_changes(
            7,
            AnimalChanges {
                name: Some("Miso".to_string()),
                ..Default::default()
            },
        );

        assert_eq!(update.ids, vec![7]);
        assert!(update.has_changes());
        assert!(update.matched.is_none());
        assert!(update.pairing_count.is_none());
        assert!(!AnimalUpdate::for_ids(vec![7]).has_changes());
    }

    #[test]
    fn test_match_references_animal() {
        let record = MatchRecord {
            id: 1,
            issuer_user_id: 10,
            receiver_user_id: 20,
            issuer_animal_id: 3,
            receiver_animal_id: 4,
            message: "hello there".to_string(),
            resolved: false,
            created_at: chrono::Utc::now(),
        };

        assert!(record.references_animal(3));
        assert!(record.references_animal(4));
        assert!(!record.references_animal(5));
        assert_eq!(record.animal_ids(), [3, 4]);
    }
}

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{Postgres, QueryBuilder, Row};

use super::{map_sqlx_error, PgTx, PostgresClient};
use crate::models::{Animal, AnimalQuery, AnimalUpdate, NewAnimal, PairingCountChange};
use crate::services::store::{AnimalStore, StoreError};

pub(super) const ANIMAL_COLUMNS: &str = "id, owner_id, name, sex, age_in_months, description, \
     image_urls, matched, pairing_count, is_deleted, created_at";

/// Decode an animal whose columns may carry a join alias prefix
pub(super) fn animal_from_row(row: &PgRow, prefix: &str) -> Result<Animal, sqlx::Error> {
    let col = |name: &str| format!("{}{}", prefix, name);

    Ok(Animal {
        id: row.try_get(col("id").as_str())?,
        owner_id: row.try_get(col("owner_id").as_str())?,
        name: row.try_get(col("name").as_str())?,
        sex: row.try_get(col("sex").as_str())?,
        age_in_months: row.try_get(col("age_in_months").as_str())?,
        description: row.try_get(col("description").as_str())?,
        image_urls: row.try_get(col("image_urls").as_str())?,
        matched: row.try_get(col("matched").as_str())?,
        pairing_count: row.try_get(col("pairing_count").as_str())?,
        is_deleted: row.try_get(col("is_deleted").as_str())?,
        created_at: row.try_get(col("created_at").as_str())?,
    })
}

#[async_trait]
impl AnimalStore<PgTx> for PostgresClient {
    async fn create(&self, tx: &mut PgTx, animal: NewAnimal) -> Result<Animal, StoreError> {
        let query = format!(
            r#"
            INSERT INTO animals (owner_id, name, sex, age_in_months, description, image_urls)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            ANIMAL_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(animal.owner_id)
            .bind(&animal.name)
            .bind(animal.sex)
            .bind(animal.age_in_months)
            .bind(&animal.description)
            .bind(&animal.image_urls)
            .fetch_one(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        let created = animal_from_row(&row, "")?;
        tracing::debug!("Inserted animal {} for owner {}", created.id, created.owner_id);

        Ok(created)
    }

    async fn get_by_ids(
        &self,
        tx: &mut PgTx,
        query: AnimalQuery<'_>,
    ) -> Result<Vec<Animal>, StoreError> {
        if query.ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::<Postgres>::new("SELECT ");
        builder
            .push(ANIMAL_COLUMNS)
            .push(" FROM animals WHERE id = ANY(")
            .push_bind(query.ids.to_vec())
            .push(")");

        if !query.include_deleted {
            builder.push(" AND is_deleted = FALSE");
        }

        // Locks are taken as sorted rows are emitted, giving ascending-id lock order
        builder.push(" ORDER BY id");
        if query.for_update {
            builder.push(" FOR UPDATE");
        }

        let rows = builder
            .build()
            .fetch_all(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        rows.iter()
            .map(|row| animal_from_row(row, "").map_err(StoreError::from))
            .collect()
    }

    async fn update(&self, tx: &mut PgTx, update: &AnimalUpdate) -> Result<u64, StoreError> {
        if update.ids.is_empty() || !update.has_changes() {
            return Ok(0);
        }

        let mut builder = QueryBuilder::<Postgres>::new("UPDATE animals SET ");
        {
            let mut set = builder.separated(", ");

            if let Some(name) = &update.name {
                set.push("name = ");
                set.push_bind_unseparated(name.clone());
            }
            if let Some(sex) = update.sex {
                set.push("sex = ");
                set.push_bind_unseparated(sex);
            }
            if let Some(age) = update.age_in_months {
                set.push("age_in_months = ");
                set.push_bind_unseparated(age);
            }
            if let Some(description) = &update.description {
                set.push("description = ");
                set.push_bind_unseparated(description.clone());
            }
            if let Some(image_urls) = &update.image_urls {
                set.push("image_urls = ");
                set.push_bind_unseparated(image_urls.clone());
            }
            if let Some(matched) = update.matched {
                set.push("matched = ");
                set.push_bind_unseparated(matched);
            }
            match update.pairing_count {
                Some(PairingCountChange::Set(count)) => {
                    set.push("pairing_count = ");
                    set.push_bind_unseparated(count);
                }
                Some(PairingCountChange::Adjust(delta)) => {
                    set.push("pairing_count = pairing_count + ");
                    set.push_bind_unseparated(delta);
                }
                None => {}
            }
            if let Some(is_deleted) = update.is_deleted {
                set.push("is_deleted = ");
                set.push_bind_unseparated(is_deleted);
            }
        }

        builder
            .push(" WHERE id = ANY(")
            .push_bind(update.ids.clone())
            .push(")");

        let result = builder
            .build()
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }
}

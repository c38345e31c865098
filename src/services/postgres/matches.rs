use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::Row;

use super::animals::animal_from_row;
use super::{map_sqlx_error, PgTx, PostgresClient};
use crate::models::{MatchDeleteFilter, MatchDetail, MatchRecord, NewMatch};
use crate::services::store::{MatchStore, StoreError};

const MATCH_COLUMNS: &str = "id, issuer_user_id, receiver_user_id, issuer_animal_id, \
     receiver_animal_id, message, resolved, created_at";

fn match_from_row(row: &PgRow) -> Result<MatchRecord, sqlx::Error> {
    Ok(MatchRecord {
        id: row.try_get("id")?,
        issuer_user_id: row.try_get("issuer_user_id")?,
        receiver_user_id: row.try_get("receiver_user_id")?,
        issuer_animal_id: row.try_get("issuer_animal_id")?,
        receiver_animal_id: row.try_get("receiver_animal_id")?,
        message: row.try_get("message")?,
        resolved: row.try_get("resolved")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl MatchStore<PgTx> for PostgresClient {
    async fn create(&self, tx: &mut PgTx, new_match: NewMatch) -> Result<MatchRecord, StoreError> {
        let query = format!(
            r#"
            INSERT INTO matches
                (issuer_user_id, receiver_user_id, issuer_animal_id, receiver_animal_id, message)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            MATCH_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(new_match.issuer_user_id)
            .bind(new_match.receiver_user_id)
            .bind(new_match.issuer_animal_id)
            .bind(new_match.receiver_animal_id)
            .bind(&new_match.message)
            .fetch_one(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(match_from_row(&row)?)
    }

    async fn get_by_id(
        &self,
        tx: &mut PgTx,
        id: i64,
        for_update: bool,
    ) -> Result<Option<MatchRecord>, StoreError> {
        let query = format!(
            "SELECT {} FROM matches WHERE id = $1{}",
            MATCH_COLUMNS,
            if for_update { " FOR UPDATE" } else { "" }
        );

        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        row.as_ref()
            .map(match_from_row)
            .transpose()
            .map_err(StoreError::from)
    }

    async fn list_for_user(
        &self,
        tx: &mut PgTx,
        user_id: i64,
    ) -> Result<Vec<MatchDetail>, StoreError> {
        let query = r#"
            SELECT
                m.id, m.message, m.resolved, m.created_at,
                m.issuer_user_id, m.receiver_user_id,

                ia.id AS ia_id, ia.owner_id AS ia_owner_id, ia.name AS ia_name,
                ia.sex AS ia_sex, ia.age_in_months AS ia_age_in_months,
                ia.description AS ia_description, ia.image_urls AS ia_image_urls,
                ia.matched AS ia_matched, ia.pairing_count AS ia_pairing_count,
                ia.is_deleted AS ia_is_deleted, ia.created_at AS ia_created_at,

                ra.id AS ra_id, ra.owner_id AS ra_owner_id, ra.name AS ra_name,
                ra.sex AS ra_sex, ra.age_in_months AS ra_age_in_months,
                ra.description AS ra_description, ra.image_urls AS ra_image_urls,
                ra.matched AS ra_matched, ra.pairing_count AS ra_pairing_count,
                ra.is_deleted AS ra_is_deleted, ra.created_at AS ra_created_at
            FROM matches m
                INNER JOIN animals ia ON m.issuer_animal_id = ia.id
                INNER JOIN animals ra ON m.receiver_animal_id = ra.id
            WHERE m.issuer_user_id = $1
               OR m.receiver_user_id = $1
            ORDER BY m.id DESC
        "#;

        let rows = sqlx::query(query)
            .bind(user_id)
            .fetch_all(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        let details: Result<Vec<MatchDetail>, sqlx::Error> = rows
            .iter()
            .map(|row| -> Result<MatchDetail, sqlx::Error> {
                Ok(MatchDetail {
                    id: row.try_get("id")?,
                    message: row.try_get("message")?,
                    resolved: row.try_get("resolved")?,
                    created_at: row.try_get("created_at")?,
                    issuer_user_id: row.try_get("issuer_user_id")?,
                    receiver_user_id: row.try_get("receiver_user_id")?,
                    issuer_animal: animal_from_row(row, "ia_")?,
                    receiver_animal: animal_from_row(row, "ra_")?,
                })
            })
            .collect();

        Ok(details?)
    }

    async fn mark_resolved(&self, tx: &mut PgTx, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE matches
            SET resolved = TRUE
            WHERE id = $1 AND resolved = FALSE
            "#,
        )
        .bind(id)
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, tx: &mut PgTx, filter: &MatchDeleteFilter) -> Result<u64, StoreError> {
        let result = match filter {
            MatchDeleteFilter::ById(id) => {
                sqlx::query("DELETE FROM matches WHERE id = $1")
                    .bind(*id)
                    .execute(&mut **tx)
                    .await
            }
            MatchDeleteFilter::UnresolvedForAnimals { animal_ids, except } => {
                sqlx::query(
                    r#"
                    DELETE FROM matches
                    WHERE resolved = FALSE
                      AND id <> $2
                      AND (issuer_animal_id = ANY($1) OR receiver_animal_id = ANY($1))
                    "#,
                )
                .bind(animal_ids)
                .bind(*except)
                .execute(&mut **tx)
                .await
            }
        }
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }
}

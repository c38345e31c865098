use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::core::error::EngineError;
use crate::core::scope::conclude;
use crate::models::{Animal, AnimalChanges, AnimalQuery, AnimalUpdate, NewAnimal};
use crate::services::{AnimalStore, TransactionScope};

/// Listing lifecycle for animals
#[async_trait]
pub trait AnimalService: Send + Sync {
    async fn create(&self, animal: NewAnimal) -> Result<Animal, EngineError>;

    async fn get(&self, id: i64) -> Result<Animal, EngineError>;

    async fn update(
        &self,
        owner_id: i64,
        id: i64,
        changes: AnimalChanges,
    ) -> Result<Animal, EngineError>;

    async fn delete(&self, owner_id: i64, id: i64) -> Result<(), EngineError>;
}

/// Owner-facing animal operations on top of an [`AnimalStore`]
pub struct AnimalRegistry<T, A> {
    trx: Arc<T>,
    animals: Arc<A>,
}

impl<T, A> AnimalRegistry<T, A>
where
    T: TransactionScope,
    A: AnimalStore<T::Tx>,
{
    pub fn new(trx: Arc<T>, animals: Arc<A>) -> Self {
        Self { trx, animals }
    }

    /// Lock one live animal and check it belongs to `owner_id`
    async fn lock_owned(
        &self,
        tx: &mut T::Tx,
        owner_id: i64,
        id: i64,
        context: &'static str,
    ) -> Result<Animal, EngineError> {
        let ids = [id];
        let animal = self
            .animals
            .get_by_ids(tx, AnimalQuery::locked(&ids))
            .await
            .map_err(EngineError::store(context))?
            .into_iter()
            .next()
            .ok_or(EngineError::AnimalNotFound)?;

        // Someone else's animal looks the same as a missing one
        if animal.owner_id != owner_id {
            return Err(EngineError::AnimalNotFound);
        }

        Ok(animal)
    }

    async fn update_in(
        &self,
        tx: &mut T::Tx,
        owner_id: i64,
        id: i64,
        changes: AnimalChanges,
    ) -> Result<Animal, EngineError> {
        let mut animal = self
            .lock_owned(tx, owner_id, id, "update animal: lock animal")
            .await?;

        if let Some(sex) = changes.sex {
            if animal.pairing_count > 0 && sex != animal.sex {
                return Err(EngineError::SexLocked);
            }
        }

        if changes.is_empty() {
            return Ok(animal);
        }

        self.animals
            .update(tx, &AnimalUpdate::from_changes(id, changes.clone()))
            .await
            .map_err(EngineError::store("update animal: write changes"))?;

        if let Some(name) = changes.name {
            animal.name = name;
        }
        if let Some(sex) = changes.sex {
            animal.sex = sex;
        }
        if let Some(age) = changes.age_in_months {
            animal.age_in_months = age;
        }
        if let Some(description) = changes.description {
            animal.description = description;
        }
        if let Some(image_urls) = changes.image_urls {
            animal.image_urls = image_urls;
        }

        Ok(animal)
    }

    async fn delete_in(&self, tx: &mut T::Tx, owner_id: i64, id: i64) -> Result<(), EngineError> {
        self.lock_owned(tx, owner_id, id, "delete animal: lock animal")
            .await?;

        let mut soft_delete = AnimalUpdate::for_ids(vec![id]);
        soft_delete.is_deleted = Some(true);
        self.animals
            .update(tx, &soft_delete)
            .await
            .map_err(EngineError::store("delete animal: mark deleted"))?;

        Ok(())
    }
}

#[async_trait]
impl<T, A> AnimalService for AnimalRegistry<T, A>
where
    T: TransactionScope + 'static,
    A: AnimalStore<T::Tx> + 'static,
{
    async fn create(&self, animal: NewAnimal) -> Result<Animal, EngineError> {
        let mut tx = self
            .trx
            .begin()
            .await
            .map_err(EngineError::store("create animal: begin transaction"))?;
        let result = self
            .animals
            .create(&mut tx, animal)
            .await
            .map_err(EngineError::store("create animal: insert animal"));
        let created = conclude(self.trx.as_ref(), tx, result, "create animal").await?;

        info!("Animal {} listed by user {}", created.id, created.owner_id);

        Ok(created)
    }

    async fn get(&self, id: i64) -> Result<Animal, EngineError> {
        let mut tx = self
            .trx
            .begin_read()
            .await
            .map_err(EngineError::store("get animal: begin transaction"))?;
        let ids = [id];
        let result = self
            .animals
            .get_by_ids(&mut tx, AnimalQuery::read(&ids))
            .await
            .map_err(EngineError::store("get animal"))
            .and_then(|rows| rows.into_iter().next().ok_or(EngineError::AnimalNotFound));

        conclude(self.trx.as_ref(), tx, result, "get animal").await
    }

    async fn update(
        &self,
        owner_id: i64,
        id: i64,
        changes: AnimalChanges,
    ) -> Result<Animal, EngineError> {
        let mut tx = self
            .trx
            .begin()
            .await
            .map_err(EngineError::store("update animal: begin transaction"))?;
        let result = self.update_in(&mut tx, owner_id, id, changes).await;
        let updated = conclude(self.trx.as_ref(), tx, result, "update animal").await?;

        info!("Animal {} updated by user {}", id, owner_id);

        Ok(updated)
    }

    async fn delete(&self, owner_id: i64, id: i64) -> Result<(), EngineError> {
        let mut tx = self
            .trx
            .begin()
            .await
            .map_err(EngineError::store("delete animal: begin transaction"))?;
        let result = self.delete_in(&mut tx, owner_id, id).await;
        conclude(self.trx.as_ref(), tx, result, "delete animal").await?;

        info!("Animal {} deleted by user {}", id, owner_id);

        Ok(())
    }
}

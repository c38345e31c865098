//! In-process backend for the animal and match stores.
//!
//! Committed state is an immutable snapshot. A write transaction takes the
//! single writer lock and works on a copy of the snapshot; commit publishes the
//! copy, anything else discards it. Write transactions are therefore fully
//! serialised, which trivially satisfies the row-lock discipline the engine
//! expects from a real database. Read transactions only clone the current
//! snapshot and never wait on a writer.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::models::{
    Animal, AnimalQuery, AnimalUpdate, MatchDeleteFilter, MatchDetail, MatchRecord, NewAnimal,
    NewMatch, PairingCountChange,
};
use crate::services::store::{AnimalStore, MatchStore, StoreError, TransactionScope};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    animals: BTreeMap<i64, Animal>,
    matches: BTreeMap<i64, MatchRecord>,
    next_animal_id: i64,
    next_match_id: i64,
}

/// Shared in-memory store; clones share the same state
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    committed: Arc<RwLock<Arc<MemoryState>>>,
    writer: Arc<Mutex<()>>,
}

/// Open transaction over a [`MemoryStore`]
pub struct MemoryTx {
    /// Held for the whole life of a write transaction; `None` when read-only
    writer: Option<OwnedMutexGuard<()>>,
    working: Arc<MemoryState>,
}

impl MemoryTx {
    fn state_mut(&mut self) -> Result<&mut MemoryState, StoreError> {
        if self.writer.is_none() {
            return Err(StoreError::InvalidInput(
                "write attempted in a read-only transaction".to_string(),
            ));
        }
        Ok(Arc::make_mut(&mut self.working))
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn snapshot(&self) -> Arc<MemoryState> {
        Arc::clone(&*self.committed.read().await)
    }

    /// Committed state of one animal, deleted or not
    pub async fn animal(&self, id: i64) -> Option<Animal> {
        self.snapshot().await.animals.get(&id).cloned()
    }

    /// Committed proposals in ascending id order
    pub async fn matches(&self) -> Vec<MatchRecord> {
        self.snapshot().await.matches.values().cloned().collect()
    }

    pub async fn match_by_id(&self, id: i64) -> Option<MatchRecord> {
        self.snapshot().await.matches.get(&id).cloned()
    }
}

#[async_trait]
impl TransactionScope for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, StoreError> {
        let writer = Arc::clone(&self.writer).lock_owned().await;
        let working = self.snapshot().await;
        Ok(MemoryTx {
            writer: Some(writer),
            working,
        })
    }

    async fn begin_read(&self) -> Result<MemoryTx, StoreError> {
        Ok(MemoryTx {
            writer: None,
            working: self.snapshot().await,
        })
    }

    async fn commit(&self, tx: MemoryTx) -> Result<(), StoreError> {
        let MemoryTx { writer, working } = tx;
        if writer.is_some() {
            *self.committed.write().await = working;
        }
        // The writer lock is released only after the new snapshot is visible
        drop(writer);
        Ok(())
    }

    async fn rollback(&self, tx: MemoryTx) -> Result<(), StoreError> {
        drop(tx);
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(true)
    }
}

#[async_trait]
impl AnimalStore<MemoryTx> for MemoryStore {
    async fn create(&self, tx: &mut MemoryTx, animal: NewAnimal) -> Result<Animal, StoreError> {
        let state = tx.state_mut()?;
        state.next_animal_id += 1;

        let created = Animal {
            id: state.next_animal_id,
            owner_id: animal.owner_id,
            name: animal.name,
            sex: animal.sex,
            age_in_months: animal.age_in_months,
            description: animal.description,
            image_urls: animal.image_urls,
            matched: false,
            pairing_count: 0,
            is_deleted: false,
            created_at: chrono::Utc::now(),
        };
        state.animals.insert(created.id, created.clone());

        Ok(created)
    }

    async fn get_by_ids(
        &self,
        tx: &mut MemoryTx,
        query: AnimalQuery<'_>,
    ) -> Result<Vec<Animal>, StoreError> {
        let ids: BTreeSet<i64> = query.ids.iter().copied().collect();

        Ok(ids
            .into_iter()
            .filter_map(|id| tx.working.animals.get(&id))
            .filter(|animal| query.include_deleted || !animal.is_deleted)
            .cloned()
            .collect())
    }

    async fn update(&self, tx: &mut MemoryTx, update: &AnimalUpdate) -> Result<u64, StoreError> {
        if update.ids.is_empty() || !update.has_changes() {
            return Ok(0);
        }

        let ids: BTreeSet<i64> = update.ids.iter().copied().collect();
        let animals = &mut tx.state_mut()?.animals;

        // Validate every row before touching any of them
        if let Some(change) = update.pairing_count {
            for id in &ids {
                if let Some(animal) = animals.get(id) {
                    let next = match change {
                        PairingCountChange::Set(count) => Some(count),
                        PairingCountChange::Adjust(delta) => animal.pairing_count.checked_add(delta),
                    };
                    if !matches!(next, Some(count) if count >= 0) {
                        return Err(StoreError::ConstraintViolation(format!(
                            "pairing_count of animal {} would become negative",
                            id
                        )));
                    }
                }
            }
        }

        let mut touched = 0;
        for id in &ids {
            let Some(animal) = animals.get_mut(id) else {
                continue;
            };

            if let Some(name) = &update.name {
                animal.name = name.clone();
            }
            if let Some(sex) = update.sex {
                animal.sex = sex;
            }
            if let Some(age) = update.age_in_months {
                animal.age_in_months = age;
            }
            if let Some(description) = &update.description {
                animal.description = description.clone();
            }
            if let Some(image_urls) = &update.image_urls {
                animal.image_urls = image_urls.clone();
            }
            if let Some(matched) = update.matched {
                animal.matched = matched;
            }
            match update.pairing_count {
                Some(PairingCountChange::Set(count)) => animal.pairing_count = count,
                Some(PairingCountChange::Adjust(delta)) => animal.pairing_count += delta,
                None => {}
            }
            if let Some(is_deleted) = update.is_deleted {
                animal.is_deleted = is_deleted;
            }
            touched += 1;
        }

        Ok(touched)
    }
}

#[async_trait]
impl MatchStore<MemoryTx> for MemoryStore {
    async fn create(
        &self,
        tx: &mut MemoryTx,
        new_match: NewMatch,
    ) -> Result<MatchRecord, StoreError> {
        let state = tx.state_mut()?;

        if new_match.issuer_animal_id == new_match.receiver_animal_id {
            return Err(StoreError::ConstraintViolation(
                "a match must reference two distinct animals".to_string(),
            ));
        }
        for id in [new_match.issuer_animal_id, new_match.receiver_animal_id] {
            if !state.animals.contains_key(&id) {
                return Err(StoreError::ConstraintViolation(format!(
                    "animal {} does not exist",
                    id
                )));
            }
        }

        state.next_match_id += 1;
        let record = MatchRecord {
            id: state.next_match_id,
            issuer_user_id: new_match.issuer_user_id,
            receiver_user_id: new_match.receiver_user_id,
            issuer_animal_id: new_match.issuer_animal_id,
            receiver_animal_id: new_match.receiver_animal_id,
            message: new_match.message,
            resolved: false,
            created_at: chrono::Utc::now(),
        };
        state.matches.insert(record.id, record.clone());

        Ok(record)
    }

    async fn get_by_id(
        &self,
        tx: &mut MemoryTx,
        id: i64,
        _for_update: bool,
    ) -> Result<Option<MatchRecord>, StoreError> {
        Ok(tx.working.matches.get(&id).cloned())
    }

    async fn list_for_user(
        &self,
        tx: &mut MemoryTx,
        user_id: i64,
    ) -> Result<Vec<MatchDetail>, StoreError> {
        let state = &tx.working;

        Ok(state
            .matches
            .values()
            .rev()
            .filter(|m| m.issuer_user_id == user_id || m.receiver_user_id == user_id)
            .filter_map(|m| {
                let issuer_animal = state.animals.get(&m.issuer_animal_id)?.clone();
                let receiver_animal = state.animals.get(&m.receiver_animal_id)?.clone();
                Some(MatchDetail {
                    id: m.id,
                    message: m.message.clone(),
                    resolved: m.resolved,
                    created_at: m.created_at,
                    issuer_user_id: m.issuer_user_id,
                    receiver_user_id: m.receiver_user_id,
                    issuer_animal,
                    receiver_animal,
                })
            })
            .collect())
    }

    async fn mark_resolved(&self, tx: &mut MemoryTx, id: i64) -> Result<bool, StoreError> {
        match tx.state_mut()?.matches.get_mut(&id) {
            Some(record) if !record.resolved => {
                record.resolved = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(
        &self,
        tx: &mut MemoryTx,
        filter: &MatchDeleteFilter,
    ) -> Result<u64, StoreError> {
        let matches = &mut tx.state_mut()?.matches;
        let before = matches.len();

        match filter {
            MatchDeleteFilter::ById(id) => {
                matches.remove(id);
            }
            MatchDeleteFilter::UnresolvedForAnimals { animal_ids, except } => {
                matches.retain(|id, record| {
                    let doomed = !record.resolved
                        && id != except
                        && animal_ids.iter().any(|a| record.references_animal(*a));
                    !doomed
                });
            }
        }

        Ok((before - matches.len()) as u64)
    }
}

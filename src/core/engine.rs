use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use crate::core::error::EngineError;
use crate::core::scope::{conclude, lock_order};
use crate::models::{
    Animal, AnimalQuery, AnimalUpdate, MatchDeleteFilter, MatchDetail, MatchRecord, NewMatch,
    PairingCountChange,
};
use crate::services::{AnimalStore, MatchStore, TransactionScope};

/// Input for proposing a pairing
#[derive(Debug, Clone)]
pub struct CreateMatchArgs {
    pub issuer_animal_id: i64,
    pub receiver_animal_id: i64,
    pub user_id: i64,
    pub message: String,
}

/// Match lifecycle operations exposed to the HTTP layer
#[async_trait]
pub trait MatchService: Send + Sync {
    async fn create(&self, args: CreateMatchArgs) -> Result<MatchRecord, EngineError>;

    async fn approve(&self, match_id: i64, acting_user: Option<i64>) -> Result<(), EngineError>;

    async fn reject(&self, match_id: i64, acting_user: Option<i64>) -> Result<(), EngineError>;

    async fn delete(&self, match_id: i64, user_id: i64) -> Result<(), EngineError>;

    async fn list(&self, user_id: i64) -> Result<Vec<MatchDetail>, EngineError>;

    async fn health_check(&self) -> bool;
}

/// Transactional match engine
///
/// Every mutating operation runs in one transaction. Animal rows are always
/// locked before proposal rows, and animals in ascending id order, so two
/// operations touching overlapping animals cannot deadlock each other.
pub struct MatchEngine<T, A, M> {
    trx: Arc<T>,
    animals: Arc<A>,
    matches: Arc<M>,
}

impl<T, A, M> MatchEngine<T, A, M>
where
    T: TransactionScope,
    A: AnimalStore<T::Tx>,
    M: MatchStore<T::Tx>,
{
    pub fn new(trx: Arc<T>, animals: Arc<A>, matches: Arc<M>) -> Self {
        Self {
            trx,
            animals,
            matches,
        }
    }

    async fn lock_animals(
        &self,
        tx: &mut T::Tx,
        ids: [i64; 2],
        include_deleted: bool,
        context: &'static str,
    ) -> Result<Vec<Animal>, EngineError> {
        let ordered = lock_order(&ids);
        let mut query = AnimalQuery::locked(&ordered);
        query.include_deleted = include_deleted;

        self.animals
            .get_by_ids(tx, query)
            .await
            .map_err(EngineError::store(context))
    }

    async fn create_in(
        &self,
        tx: &mut T::Tx,
        args: CreateMatchArgs,
    ) -> Result<MatchRecord, EngineError> {
        let animals = self
            .lock_animals(
                tx,
                [args.issuer_animal_id, args.receiver_animal_id],
                false,
                "create match: lock animals",
            )
            .await?;

        // Both ids must resolve to two distinct live animals
        if animals.len() != 2 {
            return Err(EngineError::AnimalNotFound);
        }
        let (first, second) = (&animals[0], &animals[1]);

        if first.matched || second.matched {
            return Err(EngineError::AlreadyMatched);
        }
        if first.owner_id == second.owner_id {
            return Err(EngineError::SameOwner);
        }
        if first.sex == second.sex {
            return Err(EngineError::SameSex);
        }

        let (issuer, receiver) = if first.owner_id == args.user_id {
            (first, second)
        } else if second.owner_id == args.user_id {
            (second, first)
        } else {
            return Err(EngineError::NotOwner);
        };

        let record = self
            .matches
            .create(
                tx,
                NewMatch {
                    issuer_user_id: issuer.owner_id,
                    receiver_user_id: receiver.owner_id,
                    issuer_animal_id: issuer.id,
                    receiver_animal_id: receiver.id,
                    message: args.message,
                },
            )
            .await
            .map_err(EngineError::store("create match: insert match"))?;

        let mut bump = AnimalUpdate::for_ids(vec![issuer.id, receiver.id]);
        bump.pairing_count = Some(PairingCountChange::Adjust(1));
        self.animals
            .update(tx, &bump)
            .await
            .map_err(EngineError::store("create match: increment pairing counts"))?;

        Ok(record)
    }

    async fn approve_in(
        &self,
        tx: &mut T::Tx,
        match_id: i64,
        acting_user: Option<i64>,
    ) -> Result<MatchRecord, EngineError> {
        // Unlocked peek to learn which animals to lock first
        let peek = self
            .matches
            .get_by_id(tx, match_id, false)
            .await
            .map_err(EngineError::store("approve match: get match"))?
            .ok_or(EngineError::MatchNotFound)?;

        let animals = self
            .lock_animals(tx, peek.animal_ids(), false, "approve match: lock animals")
            .await?;

        let record = self
            .matches
            .get_by_id(tx, match_id, true)
            .await
            .map_err(EngineError::store("approve match: lock match"))?
            .ok_or(EngineError::MatchNotFound)?;

        if record.resolved {
            return Err(EngineError::MatchAlreadyResolved);
        }
        if acting_user.is_some_and(|user| user != record.receiver_user_id) {
            return Err(EngineError::NotReceiver);
        }
        if animals.len() != 2 {
            return Err(EngineError::AnimalNotFound);
        }
        if animals.iter().any(|animal| animal.matched) {
            return Err(EngineError::AlreadyMatched);
        }

        let changed = self
            .matches
            .mark_resolved(tx, record.id)
            .await
            .map_err(EngineError::store("approve match: update match"))?;
        if !changed {
            return Err(EngineError::MatchAlreadyResolved);
        }

        let removed = self
            .matches
            .delete(
                tx,
                &MatchDeleteFilter::UnresolvedForAnimals {
                    animal_ids: record.animal_ids().to_vec(),
                    except: record.id,
                },
            )
            .await
            .map_err(EngineError::store("approve match: delete other matches"))?;
        debug!("Approving match {} removed {} sibling proposals", record.id, removed);

        let mut finalize = AnimalUpdate::for_ids(record.animal_ids().to_vec());
        finalize.matched = Some(true);
        finalize.pairing_count = Some(PairingCountChange::Set(1));
        self.animals
            .update(tx, &finalize)
            .await
            .map_err(EngineError::store("approve match: update animals"))?;

        Ok(record)
    }

    async fn reject_in(
        &self,
        tx: &mut T::Tx,
        match_id: i64,
        acting_user: Option<i64>,
    ) -> Result<MatchRecord, EngineError> {
        let record = self
            .matches
            .get_by_id(tx, match_id, true)
            .await
            .map_err(EngineError::store("reject match: lock match"))?
            .ok_or(EngineError::MatchNotFound)?;

        if record.resolved {
            return Err(EngineError::MatchAlreadyResolved);
        }
        if acting_user.is_some_and(|user| user != record.receiver_user_id) {
            return Err(EngineError::NotReceiver);
        }

        let changed = self
            .matches
            .mark_resolved(tx, record.id)
            .await
            .map_err(EngineError::store("reject match: update match"))?;
        if !changed {
            return Err(EngineError::MatchAlreadyResolved);
        }

        Ok(record)
    }

    async fn delete_in(
        &self,
        tx: &mut T::Tx,
        match_id: i64,
        user_id: i64,
    ) -> Result<MatchRecord, EngineError> {
        let peek = self
            .matches
            .get_by_id(tx, match_id, false)
            .await
            .map_err(EngineError::store("delete match: get match"))?
            .ok_or(EngineError::MatchNotFound)?;

        // Soft-deleted animals still carry the count this proposal added
        let animals = self
            .lock_animals(tx, peek.animal_ids(), true, "delete match: lock animals")
            .await?;

        let record = self
            .matches
            .get_by_id(tx, match_id, true)
            .await
            .map_err(EngineError::store("delete match: lock match"))?
            .ok_or(EngineError::MatchNotFound)?;

        if record.resolved {
            return Err(EngineError::MatchAlreadyResolved);
        }
        if record.issuer_user_id != user_id {
            return Err(EngineError::NotIssuer);
        }
        if animals.len() != 2 {
            return Err(EngineError::InvariantViolation(format!(
                "match {} references a missing animal",
                record.id
            )));
        }
        if let Some(animal) = animals.iter().find(|animal| animal.pairing_count < 1) {
            return Err(EngineError::InvariantViolation(format!(
                "pairing count of animal {} would drop below zero",
                animal.id
            )));
        }

        let removed = self
            .matches
            .delete(tx, &MatchDeleteFilter::ById(record.id))
            .await
            .map_err(EngineError::store("delete match: delete match"))?;
        if removed != 1 {
            return Err(EngineError::MatchNotFound);
        }

        let mut release = AnimalUpdate::for_ids(record.animal_ids().to_vec());
        release.pairing_count = Some(PairingCountChange::Adjust(-1));
        self.animals
            .update(tx, &release)
            .await
            .map_err(EngineError::store("delete match: decrement pairing counts"))?;

        Ok(record)
    }
}

#[async_trait]
impl<T, A, M> MatchService for MatchEngine<T, A, M>
where
    T: TransactionScope + 'static,
    A: AnimalStore<T::Tx> + 'static,
    M: MatchStore<T::Tx> + 'static,
{
    async fn create(&self, args: CreateMatchArgs) -> Result<MatchRecord, EngineError> {
        let mut tx = self
            .trx
            .begin()
            .await
            .map_err(EngineError::store("create match: begin transaction"))?;
        let result = self.create_in(&mut tx, args).await;
        let record = conclude(self.trx.as_ref(), tx, result, "create match").await?;

        info!(
            "Match {} created: animal {} (user {}) -> animal {} (user {})",
            record.id,
            record.issuer_animal_id,
            record.issuer_user_id,
            record.receiver_animal_id,
            record.receiver_user_id
        );

        Ok(record)
    }

    async fn approve(&self, match_id: i64, acting_user: Option<i64>) -> Result<(), EngineError> {
        let mut tx = self
            .trx
            .begin()
            .await
            .map_err(EngineError::store("approve match: begin transaction"))?;
        let result = self.approve_in(&mut tx, match_id, acting_user).await;
        let record = conclude(self.trx.as_ref(), tx, result, "approve match").await?;

        info!(
            "Match {} approved: animals {} and {} are now paired",
            record.id, record.issuer_animal_id, record.receiver_animal_id
        );

        Ok(())
    }

    async fn reject(&self, match_id: i64, acting_user: Option<i64>) -> Result<(), EngineError> {
        let mut tx = self
            .trx
            .begin()
            .await
            .map_err(EngineError::store("reject match: begin transaction"))?;
        let result = self.reject_in(&mut tx, match_id, acting_user).await;
        let record = conclude(self.trx.as_ref(), tx, result, "reject match").await?;

        info!("Match {} rejected", record.id);

        Ok(())
    }

    async fn delete(&self, match_id: i64, user_id: i64) -> Result<(), EngineError> {
        let mut tx = self
            .trx
            .begin()
            .await
            .map_err(EngineError::store("delete match: begin transaction"))?;
        let result = self.delete_in(&mut tx, match_id, user_id).await;
        let record = conclude(self.trx.as_ref(), tx, result, "delete match").await?;

        info!("Match {} withdrawn by user {}", record.id, user_id);

        Ok(())
    }

    async fn list(&self, user_id: i64) -> Result<Vec<MatchDetail>, EngineError> {
        let mut tx = self
            .trx
            .begin_read()
            .await
            .map_err(EngineError::store("list matches: begin transaction"))?;
        let result = self
            .matches
            .list_for_user(&mut tx, user_id)
            .await
            .map_err(EngineError::store("list matches"));
        let details = conclude(self.trx.as_ref(), tx, result, "list matches").await?;

        debug!("User {} has {} matches", user_id, details.len());

        Ok(details)
    }

    async fn health_check(&self) -> bool {
        match self.trx.health_check().await {
            Ok(healthy) => healthy,
            Err(e) => {
                tracing::warn!("Store health check failed: {}", e);
                false
            }
        }
    }
}

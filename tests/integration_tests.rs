// Integration tests for the match lifecycle on the in-memory backend

use pawmatch::core::{AnimalRegistry, AnimalService, CreateMatchArgs, EngineError, MatchEngine, MatchService};
use pawmatch::models::{Animal, NewAnimal, Sex};
use pawmatch::services::MemoryStore;
use std::sync::Arc;

type Engine = MatchEngine<MemoryStore, MemoryStore, MemoryStore>;

fn setup() -> (MemoryStore, Arc<Engine>, AnimalRegistry<MemoryStore, MemoryStore>) {
    let store = MemoryStore::new();
    let shared = Arc::new(store.clone());
    let engine = Arc::new(MatchEngine::new(shared.clone(), shared.clone(), shared.clone()));
    let registry = AnimalRegistry::new(shared.clone(), shared);
    (store, engine, registry)
}

async fn list_animal(registry: &AnimalRegistry<MemoryStore, MemoryStore>, owner_id: i64, sex: Sex) -> Animal {
    registry
        .create(NewAnimal {
            owner_id,
            name: format!("Pet of {}", owner_id),
            sex,
            age_in_months: 18,
            description: "good with kids".to_string(),
            image_urls: vec!["https://img.example/pet.jpg".to_string()],
        })
        .await
        .unwrap()
}

fn propose(issuer: &Animal, receiver: &Animal, user_id: i64) -> CreateMatchArgs {
    CreateMatchArgs {
        issuer_animal_id: issuer.id,
        receiver_animal_id: receiver.id,
        user_id,
        message: "shall we meet at the park?".to_string(),
    }
}

async fn fetch(store: &MemoryStore, animal: &Animal) -> Animal {
    store.animal(animal.id).await.unwrap()
}

#[tokio::test]
async fn test_integration_approval_collapses_competing_proposals() {
    let (store, engine, registry) = setup();

    let a = list_animal(&registry, 1, Sex::Male).await;
    let b = list_animal(&registry, 2, Sex::Female).await;
    let c = list_animal(&registry, 2, Sex::Female).await;

    let a_to_b = engine.create(propose(&a, &b, 1)).await.unwrap();
    assert_eq!(fetch(&store, &a).await.pairing_count, 1);
    assert_eq!(fetch(&store, &b).await.pairing_count, 1);

    let a_to_c = engine.create(propose(&a, &c, 1)).await.unwrap();
    assert_eq!(fetch(&store, &a).await.pairing_count, 2);
    assert_eq!(fetch(&store, &c).await.pairing_count, 1);

    engine.approve(a_to_b.id, Some(2)).await.unwrap();

    let (a, b, c) = (fetch(&store, &a).await, fetch(&store, &b).await, fetch(&store, &c).await);
    assert!(a.matched && b.matched);
    assert_eq!(a.pairing_count, 1);
    assert_eq!(b.pairing_count, 1);

    // C loses its proposal but keeps the count it was given
    assert!(!c.matched);
    assert_eq!(c.pairing_count, 1);

    assert!(store.match_by_id(a_to_c.id).await.is_none());
    let approved = store.match_by_id(a_to_b.id).await.unwrap();
    assert!(approved.resolved);

    // Second approval is a conflict and changes nothing
    assert!(matches!(
        engine.approve(a_to_b.id, Some(2)).await,
        Err(EngineError::MatchAlreadyResolved)
    ));
    assert_eq!(fetch(&store, &a).await, a);
    assert_eq!(store.matches().await.len(), 1);
}

#[tokio::test]
async fn test_integration_matched_animals_cannot_be_proposed_again() {
    let (_store, engine, registry) = setup();

    let a = list_animal(&registry, 1, Sex::Male).await;
    let b = list_animal(&registry, 2, Sex::Female).await;
    let d = list_animal(&registry, 3, Sex::Female).await;

    let record = engine.create(propose(&a, &b, 1)).await.unwrap();
    engine.approve(record.id, None).await.unwrap();

    assert!(matches!(
        engine.create(propose(&a, &d, 1)).await,
        Err(EngineError::AlreadyMatched)
    ));
    assert!(matches!(
        engine.create(propose(&d, &b, 3)).await,
        Err(EngineError::AlreadyMatched)
    ));
}

#[tokio::test]
async fn test_integration_cascade_keeps_resolved_history() {
    let (store, engine, registry) = setup();

    let a = list_animal(&registry, 1, Sex::Male).await;
    let b = list_animal(&registry, 2, Sex::Female).await;
    let c = list_animal(&registry, 3, Sex::Female).await;

    let rejected = engine.create(propose(&a, &c, 1)).await.unwrap();
    engine.reject(rejected.id, Some(3)).await.unwrap();

    let accepted = engine.create(propose(&a, &b, 1)).await.unwrap();
    engine.approve(accepted.id, Some(2)).await.unwrap();

    let remaining: Vec<i64> = store.matches().await.iter().map(|m| m.id).collect();
    assert_eq!(remaining, vec![rejected.id, accepted.id]);
}

#[tokio::test]
async fn test_integration_withdraw_then_repropose() {
    let (store, engine, registry) = setup();

    let a = list_animal(&registry, 1, Sex::Female).await;
    let b = list_animal(&registry, 2, Sex::Male).await;

    let first = engine.create(propose(&a, &b, 1)).await.unwrap();

    assert!(matches!(
        engine.delete(first.id, 2).await,
        Err(EngineError::NotIssuer)
    ));
    assert_eq!(fetch(&store, &a).await.pairing_count, 1);

    engine.delete(first.id, 1).await.unwrap();
    assert_eq!(fetch(&store, &a).await.pairing_count, 0);
    assert_eq!(fetch(&store, &b).await.pairing_count, 0);
    assert!(matches!(
        engine.delete(first.id, 1).await,
        Err(EngineError::MatchNotFound)
    ));

    let second = engine.create(propose(&a, &b, 1)).await.unwrap();
    assert_ne!(first.id, second.id);
    assert_eq!(fetch(&store, &b).await.pairing_count, 1);
}

#[tokio::test]
async fn test_integration_soft_deleted_animal_blocks_new_proposals() {
    let (store, engine, registry) = setup();

    let a = list_animal(&registry, 1, Sex::Female).await;
    let b = list_animal(&registry, 2, Sex::Male).await;
    let record = engine.create(propose(&a, &b, 1)).await.unwrap();

    registry.delete(2, b.id).await.unwrap();

    assert!(matches!(
        engine.create(propose(&a, &b, 1)).await,
        Err(EngineError::AnimalNotFound)
    ));
    assert!(matches!(
        engine.approve(record.id, Some(2)).await,
        Err(EngineError::AnimalNotFound)
    ));

    // The issuer can still withdraw and release the counts
    engine.delete(record.id, 1).await.unwrap();
    assert_eq!(fetch(&store, &a).await.pairing_count, 0);
    assert_eq!(fetch(&store, &b).await.pairing_count, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_integration_concurrent_creates_count_every_proposal() {
    let (store, engine, registry) = setup();

    let hub = list_animal(&registry, 1, Sex::Male).await;
    let mut partners = Vec::new();
    for owner in 2..12 {
        partners.push(list_animal(&registry, owner, Sex::Female).await);
    }

    let handles: Vec<_> = partners
        .iter()
        .map(|partner| {
            let engine = engine.clone();
            let args = propose(&hub, partner, 1);
            tokio::spawn(async move { engine.create(args).await })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(fetch(&store, &hub).await.pairing_count, 10);
    for partner in &partners {
        assert_eq!(fetch(&store, partner).await.pairing_count, 1);
    }
    assert_eq!(store.matches().await.len(), 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_integration_concurrent_approvals_pick_one_partner() {
    let (store, engine, registry) = setup();

    let hub = list_animal(&registry, 1, Sex::Male).await;
    let mut proposals = Vec::new();
    for owner in 2..8 {
        let partner = list_animal(&registry, owner, Sex::Female).await;
        let record = engine.create(propose(&hub, &partner, 1)).await.unwrap();
        proposals.push(record);
    }

    let handles: Vec<_> = proposals
        .iter()
        .map(|record| {
            let engine = engine.clone();
            let (id, receiver) = (record.id, record.receiver_user_id);
            tokio::spawn(async move { engine.approve(id, Some(receiver)).await })
        })
        .collect();

    let mut approved = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => approved += 1,
            Err(EngineError::MatchNotFound) | Err(EngineError::AlreadyMatched) => {}
            Err(other) => panic!("unexpected error: {}", other),
        }
    }

    assert_eq!(approved, 1);

    let remaining = store.matches().await;
    assert_eq!(remaining.len(), 1);
    assert!(remaining[0].resolved);

    let hub = fetch(&store, &hub).await;
    assert!(hub.matched);
    assert_eq!(hub.pairing_count, 1);
}

#[tokio::test]
async fn test_integration_list_orients_for_each_participant() {
    let (_store, engine, registry) = setup();

    let a = list_animal(&registry, 1, Sex::Male).await;
    let b = list_animal(&registry, 2, Sex::Female).await;
    let record = engine.create(propose(&a, &b, 1)).await.unwrap();

    let issuer_view = engine.list(1).await.unwrap();
    let receiver_view = engine.list(2).await.unwrap();
    assert_eq!(issuer_view.len(), 1);
    assert_eq!(receiver_view.len(), 1);
    assert_eq!(issuer_view[0].id, record.id);
    assert_eq!(receiver_view[0].issuer_animal.id, a.id);
    assert_eq!(receiver_view[0].receiver_animal.id, b.id);

    assert!(engine.list(99).await.unwrap().is_empty());
}

use nimbus_core::{Entity, Relationship, RelationshipClass, TargetFilter};
use nimbus_store::*;
use std::sync::Arc;

fn entity(key: &str, entity_type: &str) -> Entity {
    Entity::new(key, entity_type, &["Resource"])
}

fn provenance() -> Provenance {
    Provenance::step("test-step")
}

#[tokio::test]
async fn test_empty_state() {
    let state = InMemoryJobState::new();
    let stats = state.statistics().await;
    assert_eq!(stats.total_entities, 0);
    assert_eq!(stats.total_relationships, 0);
    assert!(state.get_upstream_entity("azure_account").await.is_none());
}

#[tokio::test]
async fn test_commit_and_find_entity() {
    let state = InMemoryJobState::new();
    state.commit_entity(entity("acct", "azure_account"), provenance()).await.unwrap();

    let found = state.find_entity_by_key("acct").await.unwrap();
    assert_eq!(found.entity_type, "azure_account");
    assert!(state.has_key("acct").await);
    assert_eq!(state.get_upstream_entity("azure_account").await.unwrap().key, "acct");
}

#[tokio::test]
async fn test_duplicate_entity_is_rejected() {
    let state = InMemoryJobState::new();
    state.commit_entity(entity("k1", "azure_user"), Provenance::step("fetch-users")).await.unwrap();

    let err = state
        .commit_entity(entity("k1", "azure_user"), Provenance::step("fetch-other"))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        JobStateError::DuplicateKey {
            key: "k1".to_string(),
            first_committed_by: "fetch-users".to_string(),
        }
    );
    assert_eq!(state.statistics().await.total_entities, 1);
}

#[tokio::test]
async fn test_dangling_direct_relationship_is_rejected() {
    let state = InMemoryJobState::new();
    let acct = entity("acct", "azure_account");
    let user = entity("user-1", "azure_user");
    state.commit_entity(acct.clone(), provenance()).await.unwrap();

    let rel = Relationship::direct(RelationshipClass::Has, &acct, &user);
    let err = state.commit_relationship(rel, provenance()).await.unwrap_err();

    match err {
        JobStateError::DanglingReference { missing_key, .. } => assert_eq!(missing_key, "user-1"),
        other => panic!("Expected DanglingReference, got {:?}", other),
    }
    assert_eq!(state.statistics().await.total_relationships, 0);
}

#[tokio::test]
async fn test_dangling_source_is_rejected_for_mapped() {
    let state = InMemoryJobState::new();
    let nsg = entity("nsg", "azure_security_group");
    let rel = Relationship::mapped(RelationshipClass::Allows, &nsg, TargetFilter::new("internet"));

    let err = state.commit_relationship(rel, provenance()).await.unwrap_err();
    assert!(matches!(err, JobStateError::DanglingReference { .. }));
}

#[tokio::test]
async fn test_mapped_relationship_needs_only_source() {
    let state = InMemoryJobState::new();
    let nsg = entity("nsg", "azure_security_group");
    state.commit_entity(nsg.clone(), provenance()).await.unwrap();

    let rel = Relationship::mapped(RelationshipClass::Allows, &nsg, TargetFilter::new("internet"));
    let outcome = state.commit_relationship(rel, provenance()).await.unwrap();

    assert_eq!(outcome, CommitOutcome::Committed);
    assert_eq!(state.statistics().await.mapped_relationships, 1);
}

#[tokio::test]
async fn test_identical_relationship_recommit_is_idempotent() {
    let state = InMemoryJobState::new();
    let acct = entity("acct", "azure_account");
    let user = entity("user-1", "azure_user");
    state.commit_entity(acct.clone(), provenance()).await.unwrap();
    state.commit_entity(user.clone(), provenance()).await.unwrap();

    let rel = Relationship::direct(RelationshipClass::Has, &acct, &user);
    assert_eq!(state.commit_relationship(rel.clone(), provenance()).await.unwrap(), CommitOutcome::Committed);
    assert_eq!(
        state.commit_relationship(rel.clone(), provenance()).await.unwrap(),
        CommitOutcome::AlreadyPresent
    );

    let conflicting = rel.with_property("note", "different");
    let err = state.commit_relationship(conflicting, provenance()).await.unwrap_err();
    assert!(matches!(err, JobStateError::DuplicateRelationship { .. }));
    assert!(err.to_string().starts_with("Relationship key"));
    assert_eq!(state.statistics().await.total_relationships, 1);
}

#[tokio::test]
async fn test_iterate_entities_of_type_in_commit_order() {
    let state: Arc<dyn JobState> = Arc::new(InMemoryJobState::new());
    for key in ["u3", "u1", "u2"] {
        state.commit_entity(entity(key, "azure_user"), provenance()).await.unwrap();
    }
    state.commit_entity(entity("g1", "azure_user_group"), provenance()).await.unwrap();

    let mut seen = Vec::new();
    let visited = state
        .iterate_entities_of_type("azure_user", |e| {
            seen.push(e.key);
            async { Ok::<(), JobStateError>(()) }
        })
        .await
        .unwrap();

    assert_eq!(visited, 3);
    assert_eq!(seen, vec!["u3", "u1", "u2"]);
}

#[tokio::test]
async fn test_iterate_stops_on_callback_error() {
    let state: Arc<dyn JobState> = Arc::new(InMemoryJobState::new());
    state.commit_entity(entity("u1", "azure_user"), provenance()).await.unwrap();
    state.commit_entity(entity("u2", "azure_user"), provenance()).await.unwrap();

    let result = state
        .iterate_entities_of_type("azure_user", |_| async { Err::<(), &str>("stop") })
        .await;
    assert_eq!(result, Err("stop"));
}

#[tokio::test]
async fn test_concurrent_commits_from_parallel_tasks() {
    let state = Arc::new(InMemoryJobState::new());
    let mut handles = Vec::new();
    for task in 0..8 {
        let state = Arc::clone(&state);
        handles.push(tokio::spawn(async move {
            for i in 0..25 {
                let key = format!("t{}-e{}", task, i);
                state.commit_entity(entity(&key, "azure_subnet"), provenance()).await.unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let stats = state.statistics().await;
    assert_eq!(stats.total_entities, 200);
    assert_eq!(stats.entities_by_type.get("azure_subnet"), Some(&200));
}

#[tokio::test]
async fn test_key_value_data() {
    let state = InMemoryJobState::new();
    state
        .set_data("subscription", serde_json::json!({"id": "sub-1"}), provenance())
        .await;

    assert_eq!(state.get_data("subscription").await.unwrap()["id"], "sub-1");
    assert!(state.get_data("missing").await.is_none());
}

#[tokio::test]
async fn test_relationships_from() {
    let state = InMemoryJobState::new();
    let acct = entity("acct", "azure_account");
    let u1 = entity("u1", "azure_user");
    let u2 = entity("u2", "azure_user");
    for e in [&acct, &u1, &u2] {
        state.commit_entity(e.clone(), provenance()).await.unwrap();
    }
    state
        .commit_relationship(Relationship::direct(RelationshipClass::Has, &acct, &u1), provenance())
        .await
        .unwrap();
    state
        .commit_relationship(Relationship::direct(RelationshipClass::Has, &acct, &u2), provenance())
        .await
        .unwrap();

    let rels = state.relationships_from("acct").await;
    assert_eq!(rels.len(), 2);
    assert!(state.relationships_from("u1").await.is_empty());
    assert!(state.find_relationship_by_key("acct|has|u2").await.is_some());
}

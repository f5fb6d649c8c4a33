//! Version Tracking Tests
//!
//! Within one batch, a later operation on a versioned resource runs against
//! the version produced by the earlier operation, not the version the
//! client originally sent.

use std::sync::Arc;

use jsonapi_atomic::memory::{InMemoryProcessor, InMemoryStore, InMemoryTransactionFactory};
use jsonapi_atomic::{
    AtomicError, AtomicOperationsProcessor, Operation, ResourceGraph, ResourceIdentity,
    ResourceObject, ResourceType,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;

fn setup() -> (Arc<InMemoryStore>, AtomicOperationsProcessor) {
    let graph = Arc::new(
        ResourceGraph::builder()
            .add(ResourceType::new("dogs").versioned())
            .build()
            .unwrap(),
    );
    let store = Arc::new(InMemoryStore::new(Arc::clone(&graph)));
    store
        .insert(ResourceObject::new(ResourceIdentity::with_id("dogs", "1")))
        .unwrap();

    let processor = AtomicOperationsProcessor::new(
        graph,
        Arc::new(InMemoryProcessor::registry(Arc::clone(&store))),
        Arc::new(InMemoryTransactionFactory::new(Arc::clone(&store))),
    );
    (store, processor)
}

fn rename(version: &str, name: &str) -> Operation {
    Operation::update(
        ResourceObject::new(ResourceIdentity::with_id("dogs", "1").version(version))
            .with_attribute("name", json!(name)),
    )
}

/// Test: the client's version is superseded by the one captured earlier.
#[tokio::test]
async fn test_later_operations_use_captured_version() {
    let (store, processor) = setup();

    let results = processor
        .process(
            vec![rename("1", "A"), rename("1", "B"), rename("1", "C")],
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let versions: Vec<_> = results
        .iter()
        .map(|r| r.data.as_ref().unwrap().identity.version.clone())
        .collect();
    assert_eq!(versions, vec![Some("2".into()), Some("3".into()), Some("4".into())]);

    let stored = store.get("dogs", "1").unwrap();
    assert_eq!(stored.attributes["name"], json!("C"));
    assert_eq!(stored.identity.version.as_deref(), Some("4"));
}

/// Test: a delete after an update uses the updated version.
#[tokio::test]
async fn test_delete_after_update() {
    let (store, processor) = setup();

    processor
        .process(
            vec![
                rename("1", "A"),
                Operation::delete(ResourceIdentity::with_id("dogs", "1").version("1")),
            ],
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(store.get("dogs", "1").is_none());
}

/// Test: a stale version sent by the client still fails.
#[tokio::test]
async fn test_stale_client_version() {
    let (store, processor) = setup();

    let err = processor
        .process(vec![rename("7", "A")], &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        AtomicError::Api(err) => {
            assert_eq!(err.status_code(), 412);
            assert_eq!(err.errors()[0].pointer(), Some("/atomic:operations[0]/data"));
        }
        other => panic!("Expected 412, got {:?}", other),
    }
    assert_eq!(store.get("dogs", "1").unwrap().identity.version.as_deref(), Some("1"));
}

/// Test: versions do not leak from one batch into the next.
#[tokio::test]
async fn test_versions_are_request_scoped() {
    let (_store, processor) = setup();
    let cancel = CancellationToken::new();

    processor.process(vec![rename("1", "A")], &cancel).await.unwrap();

    let err = processor
        .process(vec![rename("1", "B")], &cancel)
        .await
        .unwrap_err();
    assert_eq!(err.api_error().unwrap().status_code(), 412);
}

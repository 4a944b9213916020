//! Index operation integration tests.
//!
//! Runs task-driven workflows against the in-memory engine:
//! - Duplication with settings and multi-chunk document copies
//! - Renaming through create, swap and delete
//! - Task outcomes for failed and held tasks

// Integration tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use searchdeck::client::{InMemoryClient, TaskStatus};
use searchdeck::services::index_operations::default_copy_uid;
use searchdeck::services::{IndexOperations, TaskOutcome};
use searchdeck::{Document, Error, SearchClient, TaskProcessor};
use serde_json::json;
use std::time::Duration;

// ============================================================================
// Test Helpers
// ============================================================================

fn documents(n: usize) -> Vec<Document> {
    (0..n)
        .map(|i| {
            json!({"sku": format!("sku-{i:05}"), "price": i})
                .as_object()
                .cloned()
                .unwrap()
        })
        .collect()
}

fn fast_processor(client: &InMemoryClient) -> TaskProcessor<'_, InMemoryClient> {
    TaskProcessor::new(client)
        .with_timeout(Duration::from_millis(50))
        .with_interval(Duration::from_millis(5))
}

// ============================================================================
// Duplication
// ============================================================================

#[tokio::test]
async fn test_duplicate_large_index_in_chunks() {
    let client = InMemoryClient::new().with_index("products", Some("sku"), documents(6_000));
    client
        .update_settings("products", &json!({"filterableAttributes": ["price"]}))
        .await
        .unwrap();
    let operations = IndexOperations::new(TaskProcessor::new(&client));

    let result = operations.duplicate_index("products", None).await.unwrap();

    assert_eq!(result.index_uid, default_copy_uid("products"));
    assert_eq!(result.documents, 6_000);
    assert_eq!(client.documents("products-copy"), client.documents("products"));
    assert_eq!(
        client.get_settings("products-copy").await.unwrap(),
        json!({"filterableAttributes": ["price"]})
    );
}

#[tokio::test]
async fn test_duplicate_missing_source() {
    let client = InMemoryClient::new();
    let operations = IndexOperations::new(TaskProcessor::new(&client));

    let err = operations.duplicate_index("ghost", None).await.unwrap_err();

    assert!(matches!(err, Error::Api { status: 404, .. }));
    assert!(client.index_uids().is_empty());
}

#[tokio::test]
async fn test_duplicate_times_out_when_tasks_hang() {
    let client = InMemoryClient::new().with_index("products", Some("sku"), documents(3));
    client.hold_tasks(true);
    let operations = IndexOperations::new(fast_processor(&client));

    let err = operations.duplicate_index("products", Some("backup")).await.unwrap_err();

    assert!(matches!(err, Error::Timeout { .. }));
}

// ============================================================================
// Renaming
// ============================================================================

#[tokio::test]
async fn test_rename_default_target() {
    let client = InMemoryClient::new()
        .with_index("products", Some("sku"), documents(4))
        .with_index("orders", Some("id"), Vec::new());
    let operations = IndexOperations::new(TaskProcessor::new(&client));

    let result = operations.rename_index("products", None).await.unwrap();

    assert_eq!(result.index_uid, "products-new");
    assert_eq!(
        client.index_uids(),
        vec!["orders".to_string(), "products-new".to_string()]
    );
    assert_eq!(client.documents("products-new").len(), 4);
    let info = client.get_index("products-new").await.unwrap();
    assert_eq!(info.primary_key.as_deref(), Some("sku"));
}

#[tokio::test]
async fn test_rename_onto_existing_index_fails_before_swap() {
    let client = InMemoryClient::new()
        .with_index("products", Some("sku"), documents(2))
        .with_index("archive", None, Vec::new());
    let operations = IndexOperations::new(TaskProcessor::new(&client));

    let err = operations.rename_index("products", Some("archive")).await.unwrap_err();

    assert!(matches!(err, Error::TaskFailed { .. }));
    assert_eq!(client.documents("products").len(), 2);
}

#[tokio::test]
async fn test_empty_target_rejected() {
    let client = InMemoryClient::new().with_index("products", None, Vec::new());
    let operations = IndexOperations::new(TaskProcessor::new(&client));

    let err = operations.duplicate_index("products", Some("  ")).await.unwrap_err();

    assert!(matches!(err, Error::InvalidInput(_)));
}

// ============================================================================
// Task Outcomes
// ============================================================================

#[tokio::test]
async fn test_failed_task_outcome() {
    let client = InMemoryClient::new();
    let processor = TaskProcessor::new(&client);

    let outcome = processor.process(client.delete_index("ghost")).await.unwrap();

    assert!(!outcome.is_success());
    if let TaskOutcome::Failed(task) = outcome {
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.error.unwrap().code, "index_not_found");
    } else {
        unreachable!("expected a failed task");
    }
}

#[tokio::test]
async fn test_timed_out_outcome_keeps_uid() {
    let client = InMemoryClient::new();
    client.hold_tasks(true);
    let processor = fast_processor(&client);

    let outcome = processor
        .process(client.create_index("products", None))
        .await
        .unwrap();

    assert!(matches!(outcome, TaskOutcome::TimedOut(_)));
    assert_eq!(outcome.task_uid(), 0);
    assert!(matches!(
        outcome.into_result(Duration::from_millis(50)),
        Err(Error::Timeout { uid: 0, .. })
    ));
}

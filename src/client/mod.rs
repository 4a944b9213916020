//! Search engine client.
//!
//! [`SearchClient`] is the seam between the data-flow code (collections,
//! export, index operations) and the engine's HTTP API. Two implementations
//! ship with the crate:
//!
//! | Client | Backing |
//! |--------|---------|
//! | [`HttpClient`] | Meilisearch-compatible REST API over reqwest |
//! | [`InMemoryClient`] | Process-local maps, for tests and dry runs |

mod http;
mod memory;

pub use http::HttpClient;
pub use memory::InMemoryClient;

use crate::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;

/// A document as stored by the engine: a JSON object.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Parameters for fetching a page of documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentsQuery {
    /// Number of documents to skip.
    pub offset: usize,
    /// Maximum number of documents to return.
    pub limit: usize,
    /// Attributes to return; `None` returns every attribute.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
    /// Filter expression.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

impl DocumentsQuery {
    /// Creates a query for one page.
    #[must_use]
    pub const fn new(offset: usize, limit: usize) -> Self {
        Self {
            offset,
            limit,
            fields: None,
            filter: None,
        }
    }

    /// Restricts the returned attributes.
    #[must_use]
    pub fn with_fields(mut self, fields: Vec<String>) -> Self {
        self.fields = Some(fields);
        self
    }

    /// Sets the filter expression. An empty expression clears it.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        let filter = filter.into();
        self.filter = if filter.is_empty() { None } else { Some(filter) };
        self
    }
}

/// A page of documents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentsPage {
    /// Documents in engine order.
    pub results: Vec<Document>,
    /// Offset echoed by the engine.
    pub offset: usize,
    /// Limit echoed by the engine.
    pub limit: usize,
    /// Total number of matching documents.
    pub total: usize,
}

/// Lifecycle state of a server-side task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskStatus {
    /// Waiting in the queue.
    Enqueued,
    /// Being processed.
    Processing,
    /// Completed successfully.
    Succeeded,
    /// Completed with an error.
    Failed,
    /// Canceled before completion.
    Canceled,
}

impl TaskStatus {
    /// Returns true once the task will not change state again.
    #[must_use]
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }

    /// Returns the wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Enqueued => "enqueued",
            Self::Processing => "processing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary returned when a write request is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueuedTask {
    /// Identifier to poll with [`SearchClient::get_task`].
    pub task_uid: u64,
    /// Index the task applies to.
    #[serde(default)]
    pub index_uid: Option<String>,
    /// Status at enqueue time.
    pub status: TaskStatus,
    /// Task kind, e.g. `documentAdditionOrUpdate`.
    #[serde(rename = "type")]
    pub task_type: String,
    /// RFC 3339 enqueue time.
    #[serde(default)]
    pub enqueued_at: Option<String>,
}

/// Error attached to a failed task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskError {
    /// Human-readable message.
    pub message: String,
    /// Engine error code.
    pub code: String,
    /// Error category.
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
}

/// Full state of a server-side task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Task identifier.
    pub uid: u64,
    /// Index the task applies to.
    #[serde(default)]
    pub index_uid: Option<String>,
    /// Current status.
    pub status: TaskStatus,
    /// Task kind.
    #[serde(rename = "type")]
    pub task_type: String,
    /// Error, when the task failed.
    #[serde(default)]
    pub error: Option<TaskError>,
    /// ISO 8601 processing duration, e.g. `PT0.035S`.
    #[serde(default)]
    pub duration: Option<String>,
    /// RFC 3339 enqueue time.
    #[serde(default)]
    pub enqueued_at: Option<String>,
    /// RFC 3339 start time.
    #[serde(default)]
    pub started_at: Option<String>,
    /// RFC 3339 completion time.
    #[serde(default)]
    pub finished_at: Option<String>,
}

/// Index metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexInfo {
    /// Index identifier.
    pub uid: String,
    /// Primary key attribute, once known.
    #[serde(default)]
    pub primary_key: Option<String>,
    /// RFC 3339 creation time.
    #[serde(default)]
    pub created_at: Option<String>,
    /// RFC 3339 last update time.
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Index settings, passed through as raw JSON.
pub type Settings = serde_json::Value;

/// Operations the toolkit needs from a search engine.
///
/// Write operations are asynchronous on the engine side: they return an
/// [`EnqueuedTask`] and the caller polls [`SearchClient::get_task`] (see
/// [`TaskProcessor`](crate::services::TaskProcessor)).
pub trait SearchClient: Send + Sync {
    /// Fetches one page of documents.
    fn get_documents(
        &self,
        index_uid: &str,
        query: &DocumentsQuery,
    ) -> impl Future<Output = Result<DocumentsPage>> + Send;

    /// Adds or replaces documents.
    fn add_documents(
        &self,
        index_uid: &str,
        documents: &[Document],
        primary_key: Option<&str>,
    ) -> impl Future<Output = Result<EnqueuedTask>> + Send;

    /// Fetches the state of a task.
    fn get_task(&self, task_uid: u64) -> impl Future<Output = Result<Task>> + Send;

    /// Fetches index metadata.
    fn get_index(&self, index_uid: &str) -> impl Future<Output = Result<IndexInfo>> + Send;

    /// Creates an index.
    fn create_index(
        &self,
        index_uid: &str,
        primary_key: Option<&str>,
    ) -> impl Future<Output = Result<EnqueuedTask>> + Send;

    /// Deletes an index.
    fn delete_index(&self, index_uid: &str) -> impl Future<Output = Result<EnqueuedTask>> + Send;

    /// Atomically swaps the contents of two indexes.
    fn swap_indexes(
        &self,
        first: &str,
        second: &str,
    ) -> impl Future<Output = Result<EnqueuedTask>> + Send;

    /// Fetches index settings.
    fn get_settings(&self, index_uid: &str) -> impl Future<Output = Result<Settings>> + Send;

    /// Replaces index settings.
    fn update_settings(
        &self,
        index_uid: &str,
        settings: &Settings,
    ) -> impl Future<Output = Result<EnqueuedTask>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_status_wire_names() {
        let status: TaskStatus = serde_json::from_str("\"succeeded\"").unwrap();
        assert_eq!(status, TaskStatus::Succeeded);
        assert_eq!(serde_json::to_string(&TaskStatus::Canceled).unwrap(), "\"canceled\"");
        assert!(TaskStatus::Failed.is_finished());
        assert!(!TaskStatus::Processing.is_finished());
    }

    #[test]
    fn test_task_deserializes_engine_payload() {
        let json = r#"{
            "uid": 12,
            "indexUid": "movies",
            "status": "failed",
            "type": "indexCreation",
            "error": {"message": "Index `movies` already exists.", "code": "index_already_exists", "type": "invalid_request"},
            "duration": "PT0.001S",
            "enqueuedAt": "2024-01-01T00:00:00Z",
            "startedAt": "2024-01-01T00:00:00Z",
            "finishedAt": "2024-01-01T00:00:01Z"
        }"#;

        let task: Task = serde_json::from_str(json).unwrap();

        assert_eq!(task.uid, 12);
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.task_type, "indexCreation");
        assert_eq!(task.error.unwrap().code, "index_already_exists");
    }

    #[test]
    fn test_documents_query_skips_empty_options() {
        let query = DocumentsQuery::new(20, 10).with_filter("");
        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(json, serde_json::json!({"offset": 20, "limit": 10}));

        let query = DocumentsQuery::new(0, 5)
            .with_fields(vec!["id".to_string()])
            .with_filter("genre = \"drama\"");
        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(json["fields"], serde_json::json!(["id"]));
        assert_eq!(json["filter"], "genre = \"drama\"");
    }
}

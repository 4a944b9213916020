//! In-memory engine for tests and dry runs.
//!
//! Write operations are applied synchronously and recorded as tasks, so the
//! task polling path is exercised exactly as against a real engine. Filter
//! expressions are accepted but not evaluated.

use super::{
    Document, DocumentsPage, DocumentsQuery, EnqueuedTask, IndexInfo, SearchClient, Settings, Task,
    TaskError, TaskStatus,
};
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

#[derive(Debug, Clone)]
struct StoredIndex {
    primary_key: Option<String>,
    documents: Vec<Document>,
    settings: Settings,
    created_at: String,
    updated_at: String,
}

impl StoredIndex {
    fn new(primary_key: Option<String>) -> Self {
        let now = now();
        Self {
            primary_key,
            documents: Vec::new(),
            settings: serde_json::json!({}),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    fn info(&self, uid: &str) -> IndexInfo {
        IndexInfo {
            uid: uid.to_string(),
            primary_key: self.primary_key.clone(),
            created_at: Some(self.created_at.clone()),
            updated_at: Some(self.updated_at.clone()),
        }
    }

    /// Adds documents, replacing those with an equal primary key value.
    fn upsert(&mut self, documents: &[Document], primary_key: Option<&str>) {
        if self.primary_key.is_none() {
            self.primary_key = primary_key
                .map(ToString::to_string)
                .or_else(|| documents.first().and_then(infer_primary_key));
        }

        for document in documents {
            let key = self
                .primary_key
                .as_deref()
                .and_then(|pk| document.get(pk).cloned());
            let existing = key.as_ref().and_then(|key| {
                self.primary_key.as_deref().and_then(|pk| {
                    self.documents
                        .iter()
                        .position(|d| d.get(pk) == Some(key))
                })
            });
            match existing {
                Some(index) => self.documents[index] = document.clone(),
                None => self.documents.push(document.clone()),
            }
        }
        self.updated_at = now();
    }
}

/// Picks the first attribute whose name ends in `id`, as the engine does.
fn infer_primary_key(document: &Document) -> Option<String> {
    document
        .keys()
        .find(|k| k.to_ascii_lowercase().ends_with("id"))
        .cloned()
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn index_not_found(uid: &str) -> Error {
    Error::Api {
        status: 404,
        code: Some("index_not_found".to_string()),
        message: format!("Index `{uid}` not found."),
    }
}

/// Process-local engine.
///
/// # Example
///
/// ```rust,ignore
/// use searchdeck::client::InMemoryClient;
///
/// let client = InMemoryClient::new().with_index("movies", Some("id"), documents);
/// let page = client.get_documents("movies", &DocumentsQuery::new(0, 20)).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryClient {
    indexes: RwLock<HashMap<String, StoredIndex>>,
    tasks: RwLock<Vec<Task>>,
    hold_tasks: AtomicBool,
}

impl InMemoryClient {
    /// Creates an engine without indexes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an index with documents.
    #[must_use]
    pub fn with_index(self, uid: &str, primary_key: Option<&str>, documents: Vec<Document>) -> Self {
        if let Ok(mut indexes) = self.indexes.write() {
            let mut index = StoredIndex::new(primary_key.map(ToString::to_string));
            index.upsert(&documents, primary_key);
            indexes.insert(uid.to_string(), index);
        }
        self
    }

    /// When set, new tasks stay `enqueued` forever. Writes still apply.
    pub fn hold_tasks(&self, hold: bool) {
        self.hold_tasks.store(hold, Ordering::SeqCst);
    }

    /// Returns the uids of existing indexes, sorted.
    #[must_use]
    pub fn index_uids(&self) -> Vec<String> {
        let mut uids: Vec<String> = self
            .indexes
            .read()
            .map(|i| i.keys().cloned().collect())
            .unwrap_or_default();
        uids.sort();
        uids
    }

    /// Returns every document of an index.
    #[must_use]
    pub fn documents(&self, uid: &str) -> Vec<Document> {
        self.indexes
            .read()
            .ok()
            .and_then(|i| i.get(uid).map(|index| index.documents.clone()))
            .unwrap_or_default()
    }

    /// Returns the number of recorded tasks.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.tasks.read().map(|t| t.len()).unwrap_or(0)
    }

    fn lock_error(operation: &str) -> Error {
        Error::operation(operation, "lock poisoned")
    }

    /// Records a task for an already-applied write.
    fn record(&self, index_uid: Option<&str>, task_type: &str, error: Option<TaskError>) -> Result<EnqueuedTask> {
        let mut tasks = self.tasks.write().map_err(|_| Self::lock_error("record_task"))?;
        let uid = tasks.len() as u64;
        let enqueued_at = now();
        let status = if self.hold_tasks.load(Ordering::SeqCst) {
            TaskStatus::Enqueued
        } else if error.is_some() {
            TaskStatus::Failed
        } else {
            TaskStatus::Succeeded
        };
        let finished = status.is_finished().then(now);

        tasks.push(Task {
            uid,
            index_uid: index_uid.map(ToString::to_string),
            status,
            task_type: task_type.to_string(),
            error,
            duration: finished.as_ref().map(|_| "PT0S".to_string()),
            enqueued_at: Some(enqueued_at.clone()),
            started_at: finished.clone(),
            finished_at: finished,
        });

        Ok(EnqueuedTask {
            task_uid: uid,
            index_uid: index_uid.map(ToString::to_string),
            status: TaskStatus::Enqueued,
            task_type: task_type.to_string(),
            enqueued_at: Some(enqueued_at),
        })
    }

    fn project(document: &Document, fields: Option<&[String]>) -> Document {
        match fields {
            Some(fields) if !fields.iter().any(|f| f == "*") => document
                .iter()
                .filter(|(k, _)| fields.contains(k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            _ => document.clone(),
        }
    }
}

impl SearchClient for InMemoryClient {
    async fn get_documents(&self, index_uid: &str, query: &DocumentsQuery) -> Result<DocumentsPage> {
        let indexes = self.indexes.read().map_err(|_| Self::lock_error("get_documents"))?;
        let index = indexes.get(index_uid).ok_or_else(|| index_not_found(index_uid))?;

        let results = index
            .documents
            .iter()
            .skip(query.offset)
            .take(query.limit)
            .map(|d| Self::project(d, query.fields.as_deref()))
            .collect();

        Ok(DocumentsPage {
            results,
            offset: query.offset,
            limit: query.limit,
            total: index.documents.len(),
        })
    }

    async fn add_documents(
        &self,
        index_uid: &str,
        documents: &[Document],
        primary_key: Option<&str>,
    ) -> Result<EnqueuedTask> {
        {
            let mut indexes = self.indexes.write().map_err(|_| Self::lock_error("add_documents"))?;
            indexes
                .entry(index_uid.to_string())
                .or_insert_with(|| StoredIndex::new(None))
                .upsert(documents, primary_key);
        }
        self.record(Some(index_uid), "documentAdditionOrUpdate", None)
    }

    async fn get_task(&self, task_uid: u64) -> Result<Task> {
        let tasks = self.tasks.read().map_err(|_| Self::lock_error("get_task"))?;
        usize::try_from(task_uid)
            .ok()
            .and_then(|i| tasks.get(i))
            .cloned()
            .ok_or_else(|| Error::Api {
                status: 404,
                code: Some("task_not_found".to_string()),
                message: format!("Task `{task_uid}` not found."),
            })
    }

    async fn get_index(&self, index_uid: &str) -> Result<IndexInfo> {
        let indexes = self.indexes.read().map_err(|_| Self::lock_error("get_index"))?;
        indexes
            .get(index_uid)
            .map(|index| index.info(index_uid))
            .ok_or_else(|| index_not_found(index_uid))
    }

    async fn create_index(&self, index_uid: &str, primary_key: Option<&str>) -> Result<EnqueuedTask> {
        let error = {
            let mut indexes = self.indexes.write().map_err(|_| Self::lock_error("create_index"))?;
            if indexes.contains_key(index_uid) {
                Some(TaskError {
                    message: format!("Index `{index_uid}` already exists."),
                    code: "index_already_exists".to_string(),
                    error_type: Some("invalid_request".to_string()),
                })
            } else {
                indexes.insert(
                    index_uid.to_string(),
                    StoredIndex::new(primary_key.map(ToString::to_string)),
                );
                None
            }
        };
        self.record(Some(index_uid), "indexCreation", error)
    }

    async fn delete_index(&self, index_uid: &str) -> Result<EnqueuedTask> {
        let error = {
            let mut indexes = self.indexes.write().map_err(|_| Self::lock_error("delete_index"))?;
            indexes.remove(index_uid).is_none().then(|| TaskError {
                message: format!("Index `{index_uid}` not found."),
                code: "index_not_found".to_string(),
                error_type: Some("invalid_request".to_string()),
            })
        };
        self.record(Some(index_uid), "indexDeletion", error)
    }

    async fn swap_indexes(&self, first: &str, second: &str) -> Result<EnqueuedTask> {
        let error = {
            let mut indexes = self.indexes.write().map_err(|_| Self::lock_error("swap_indexes"))?;
            match (indexes.remove(first), indexes.remove(second)) {
                (Some(a), Some(b)) => {
                    indexes.insert(first.to_string(), b);
                    indexes.insert(second.to_string(), a);
                    None
                },
                (a, b) => {
                    let missing = if a.is_none() { first } else { second };
                    if let Some(a) = a {
                        indexes.insert(first.to_string(), a);
                    }
                    if let Some(b) = b {
                        indexes.insert(second.to_string(), b);
                    }
                    Some(TaskError {
                        message: format!("Index `{missing}` not found."),
                        code: "index_not_found".to_string(),
                        error_type: Some("invalid_request".to_string()),
                    })
                },
            }
        };
        self.record(None, "indexSwap", error)
    }

    async fn get_settings(&self, index_uid: &str) -> Result<Settings> {
        let indexes = self.indexes.read().map_err(|_| Self::lock_error("get_settings"))?;
        indexes
            .get(index_uid)
            .map(|index| index.settings.clone())
            .ok_or_else(|| index_not_found(index_uid))
    }

    async fn update_settings(&self, index_uid: &str, settings: &Settings) -> Result<EnqueuedTask> {
        let error = {
            let mut indexes = self.indexes.write().map_err(|_| Self::lock_error("update_settings"))?;
            match indexes.get_mut(index_uid) {
                Some(index) => {
                    index.settings = settings.clone();
                    index.updated_at = now();
                    None
                },
                None => Some(TaskError {
                    message: format!("Index `{index_uid}` not found."),
                    code: "index_not_found".to_string(),
                    error_type: Some("invalid_request".to_string()),
                }),
            }
        };
        self.record(Some(index_uid), "settingsUpdate", error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_get_documents_pages_and_projects() {
        let client = InMemoryClient::new().with_index(
            "movies",
            Some("id"),
            (0..5).map(|i| doc(json!({"id": i, "title": format!("m{i}")}))).collect(),
        );

        let page = client
            .get_documents(
                "movies",
                &DocumentsQuery::new(3, 10).with_fields(vec!["id".to_string()]),
            )
            .await
            .unwrap();

        assert_eq!(page.total, 5);
        assert_eq!(page.results, vec![doc(json!({"id": 3})), doc(json!({"id": 4}))]);
    }

    #[tokio::test]
    async fn test_add_documents_upserts_by_primary_key() {
        let client = InMemoryClient::new();

        client
            .add_documents("movies", &[doc(json!({"movie_id": 1, "title": "a"}))], None)
            .await
            .unwrap();
        client
            .add_documents("movies", &[doc(json!({"movie_id": 1, "title": "b"}))], None)
            .await
            .unwrap();

        let documents = client.documents("movies");
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0]["title"], "b");
        let info = client.get_index("movies").await.unwrap();
        assert_eq!(info.primary_key.as_deref(), Some("movie_id"));
    }

    #[tokio::test]
    async fn test_duplicate_index_creation_fails_task() {
        let client = InMemoryClient::new().with_index("movies", None, Vec::new());

        let enqueued = client.create_index("movies", None).await.unwrap();
        let task = client.get_task(enqueued.task_uid).await.unwrap();

        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.error.unwrap().code, "index_already_exists");
    }

    #[tokio::test]
    async fn test_swap_exchanges_contents() {
        let client = InMemoryClient::new()
            .with_index("a", Some("id"), vec![doc(json!({"id": "a"}))])
            .with_index("b", Some("id"), vec![doc(json!({"id": "b"}))]);

        client.swap_indexes("a", "b").await.unwrap();

        assert_eq!(client.documents("a")[0]["id"], "b");
        assert_eq!(client.documents("b")[0]["id"], "a");
    }

    #[tokio::test]
    async fn test_held_tasks_stay_enqueued() {
        let client = InMemoryClient::new();
        client.hold_tasks(true);

        let enqueued = client.create_index("movies", None).await.unwrap();
        let task = client.get_task(enqueued.task_uid).await.unwrap();

        assert_eq!(task.status, TaskStatus::Enqueued);
        assert_eq!(client.index_uids(), vec!["movies".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_index_is_api_error() {
        let client = InMemoryClient::new();
        let err = client.get_index("nope").await.unwrap_err();
        assert!(matches!(err, Error::Api { status: 404, .. }));
    }
}

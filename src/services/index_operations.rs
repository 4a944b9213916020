//! Index duplication and renaming.
//!
//! Both operations are sequences of engine tasks. Each step waits for its
//! task and any step that does not succeed aborts the operation.
//!
//! | Operation | Steps |
//! |-----------|-------|
//! | duplicate | create target, copy settings, copy documents in chunks |
//! | rename | create target, swap source and target, delete source |

use crate::client::{SearchClient, TaskStatus};
use crate::collections::process_by_chunks;
use crate::io::{ExportOptions, export_documents};
use crate::services::TaskProcessor;
use crate::services::tasks::task_failed;
use crate::{Error, Result};
use std::sync::Mutex;
use std::time::Duration;

/// Page size used to read the source index while duplicating.
pub const DUPLICATE_BATCH_SIZE: usize = 5000;

/// Documents per `add_documents` request while duplicating.
pub const DUPLICATE_CHUNK_SIZE: usize = 5000;

/// Time allowed per document task while duplicating.
pub const DOCUMENT_TASK_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Default target of [`IndexOperations::duplicate_index`].
#[must_use]
pub fn default_copy_uid(index_uid: &str) -> String {
    format!("{index_uid}-copy")
}

/// Default target of [`IndexOperations::rename_index`].
#[must_use]
pub fn default_rename_uid(index_uid: &str) -> String {
    format!("{index_uid}-new")
}

/// Outcome of a completed index operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexOperationResult {
    /// Uid of the index that now holds the data.
    pub index_uid: String,
    /// Number of documents copied; zero for renames.
    pub documents: usize,
}

/// Orchestrates multi-task index operations.
pub struct IndexOperations<'a, C> {
    processor: TaskProcessor<'a, C>,
}

impl<'a, C: SearchClient> IndexOperations<'a, C> {
    /// Creates the service. `processor` decides polling and per-step timeouts.
    #[must_use]
    pub const fn new(processor: TaskProcessor<'a, C>) -> Self {
        Self { processor }
    }

    fn check_target(source: &str, target: &str) -> Result<()> {
        if target.trim().is_empty() {
            return Err(Error::InvalidInput("target index uid is empty".to_string()));
        }
        if source == target {
            return Err(Error::InvalidInput(format!(
                "target index must differ from source `{source}`"
            )));
        }
        Ok(())
    }

    /// Copies `source` into a new index.
    ///
    /// The target defaults to `{source}-copy` and is created with the source
    /// primary key and settings before documents are copied.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] for a bad target, [`Error::TaskFailed`] or
    /// [`Error::Timeout`] when a step does not succeed, and request errors.
    #[tracing::instrument(skip(self))]
    pub async fn duplicate_index(&self, source: &str, target: Option<&str>) -> Result<IndexOperationResult> {
        let target = target.map_or_else(|| default_copy_uid(source), ToString::to_string);
        Self::check_target(source, &target)?;
        let client = self.processor.client();

        let info = client.get_index(source).await?;
        self.processor
            .process_ok(client.create_index(&target, info.primary_key.as_deref()))
            .await?;

        let settings = client.get_settings(source).await?;
        self.processor
            .process_ok(client.update_settings(&target, &settings))
            .await?;

        let exporter = export_documents(
            client,
            source,
            &ExportOptions::default().with_batch_size(DUPLICATE_BATCH_SIZE),
        );
        let enqueued_uids = Mutex::new(Vec::new());
        let uids = &enqueued_uids;
        let target_uid = target.as_str();
        let documents = process_by_chunks(
            exporter.stream(),
            move |chunk| async move {
                let enqueued = client.add_documents(target_uid, &chunk, None).await?;
                uids.lock()
                    .map_err(|_| Error::operation("duplicate_index", "lock poisoned"))?
                    .push(enqueued.task_uid);
                Ok(())
            },
            DUPLICATE_CHUNK_SIZE,
        )
        .await?;
        let task_uids = enqueued_uids
            .into_inner()
            .map_err(|_| Error::operation("duplicate_index", "lock poisoned"))?;

        let timeout =
            DOCUMENT_TASK_TIMEOUT.saturating_mul(u32::try_from(task_uids.len()).unwrap_or(u32::MAX));
        let tasks = self.processor.wait_for_tasks(&task_uids, timeout).await?;
        if let Some(task) = tasks.iter().find(|t| t.status != TaskStatus::Succeeded) {
            tracing::warn!(source, target = %target, task_uid = task.uid, "document copy failed");
            return Err(task_failed(task));
        }

        tracing::info!(source, target = %target, documents, "index duplicated");
        Ok(IndexOperationResult {
            index_uid: target,
            documents,
        })
    }

    /// Renames `source` by swapping it into a new index.
    ///
    /// The target defaults to `{source}-new`. After the swap the old uid is
    /// deleted.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] for a bad target, [`Error::TaskFailed`] or
    /// [`Error::Timeout`] when a step does not succeed, and request errors.
    #[tracing::instrument(skip(self))]
    pub async fn rename_index(&self, source: &str, target: Option<&str>) -> Result<IndexOperationResult> {
        let target = target.map_or_else(|| default_rename_uid(source), ToString::to_string);
        Self::check_target(source, &target)?;
        let client = self.processor.client();

        let info = client.get_index(source).await?;
        self.processor
            .process_ok(client.create_index(&target, info.primary_key.as_deref()))
            .await?;
        self.processor
            .process_ok(client.swap_indexes(source, &target))
            .await?;
        self.processor
            .process_ok(client.delete_index(source))
            .await?;

        tracing::info!(source, target = %target, "index renamed");
        Ok(IndexOperationResult {
            index_uid: target,
            documents: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{Document, InMemoryClient};
    use serde_json::json;

    fn seeded(n: usize) -> InMemoryClient {
        let documents: Vec<Document> = (0..n)
            .map(|i| json!({"id": i}).as_object().cloned().unwrap())
            .collect();
        InMemoryClient::new().with_index("movies", Some("id"), documents)
    }

    #[test]
    fn test_default_targets() {
        assert_eq!(default_copy_uid("movies"), "movies-copy");
        assert_eq!(default_rename_uid("movies"), "movies-new");
    }

    #[tokio::test]
    async fn test_duplicate_copies_documents_and_key() {
        let client = seeded(3);
        let operations = IndexOperations::new(TaskProcessor::new(&client));

        let result = operations.duplicate_index("movies", None).await.unwrap();

        assert_eq!(result.index_uid, "movies-copy");
        assert_eq!(result.documents, 3);
        assert_eq!(client.documents("movies-copy"), client.documents("movies"));
        let info = client.get_index("movies-copy").await.unwrap();
        assert_eq!(info.primary_key.as_deref(), Some("id"));
    }

    #[tokio::test]
    async fn test_duplicate_into_existing_index_fails() {
        let client = seeded(1).with_index("taken", None, Vec::new());
        let operations = IndexOperations::new(TaskProcessor::new(&client));

        let err = operations.duplicate_index("movies", Some("taken")).await.unwrap_err();

        assert!(matches!(err, Error::TaskFailed { .. }));
    }

    #[tokio::test]
    async fn test_rename_moves_index() {
        let client = seeded(2);
        let operations = IndexOperations::new(TaskProcessor::new(&client));

        let result = operations.rename_index("movies", Some("films")).await.unwrap();

        assert_eq!(result.index_uid, "films");
        assert_eq!(client.index_uids(), vec!["films".to_string()]);
        assert_eq!(client.documents("films").len(), 2);
    }

    #[tokio::test]
    async fn test_same_target_is_rejected() {
        let client = seeded(1);
        let operations = IndexOperations::new(TaskProcessor::new(&client));

        let err = operations.rename_index("movies", Some("movies")).await.unwrap_err();

        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(client.task_count(), 0);
    }
}

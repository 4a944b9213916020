//! Document import service.
//!
//! Reads documents from an [`ImportSource`], pushes them to the engine in
//! chunks and waits for the resulting tasks.

use crate::client::{SearchClient, Task, TaskStatus};
use crate::collections::{DEFAULT_CHUNK_SIZE, process_by_chunks};
use crate::io::formats::create_import_source;
use crate::io::traits::{ImportSource, SourceIter};
use crate::services::TaskProcessor;
use crate::services::tasks::task_failed;
use crate::{Error, Result};
use std::io::BufRead;
use std::path::Path;
use std::sync::Mutex;

/// Options for document import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOptions {
    /// Documents per `add_documents` request.
    pub chunk_size: usize,
    /// Primary key to declare on the first request.
    pub primary_key: Option<String>,
    /// Wait for every enqueued task before returning.
    pub wait: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            primary_key: None,
            wait: true,
        }
    }
}

impl ImportOptions {
    /// Sets the chunk size.
    #[must_use]
    pub const fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Sets the primary key.
    #[must_use]
    pub fn with_primary_key(mut self, primary_key: impl Into<String>) -> Self {
        self.primary_key = Some(primary_key.into());
        self
    }

    /// Enables or disables waiting for tasks.
    #[must_use]
    pub const fn with_wait(mut self, wait: bool) -> Self {
        self.wait = wait;
        self
    }
}

/// Result of an import operation.
#[derive(Debug, Clone, Default)]
pub struct ImportResult {
    /// Number of documents sent.
    pub imported: usize,
    /// Tasks enqueued, one per chunk.
    pub task_uids: Vec<u64>,
    /// Finished tasks, when waiting was requested.
    pub tasks: Vec<Task>,
}

impl ImportResult {
    /// Returns whether any document was sent.
    #[must_use]
    pub const fn has_imports(&self) -> bool {
        self.imported > 0
    }
}

/// Service for importing documents into an index.
pub struct ImportService<'a, C> {
    processor: TaskProcessor<'a, C>,
}

impl<'a, C: SearchClient> ImportService<'a, C> {
    /// Creates an import service waiting with `processor`.
    #[must_use]
    pub const fn new(processor: TaskProcessor<'a, C>) -> Self {
        Self { processor }
    }

    /// Imports documents from a file. JSON arrays and NDJSON are accepted.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the import fails.
    pub async fn import_from_file(
        &self,
        index_uid: &str,
        path: &Path,
        options: &ImportOptions,
    ) -> Result<ImportResult> {
        let file = std::fs::File::open(path).map_err(|e| Error::OperationFailed {
            operation: "open_import_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;
        self.import_from_reader(index_uid, std::io::BufReader::new(file), options)
            .await
    }

    /// Imports documents from a reader.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails or the import fails.
    pub async fn import_from_reader<R: BufRead + 'static>(
        &self,
        index_uid: &str,
        reader: R,
        options: &ImportOptions,
    ) -> Result<ImportResult> {
        let mut source = create_import_source(reader);
        self.import_from_source(index_uid, source.as_mut(), options)
            .await
    }

    /// Imports every document of `source`.
    ///
    /// Documents are sent in chunks of [`ImportOptions::chunk_size`]. With
    /// [`ImportOptions::wait`], every task must succeed within the processor
    /// timeout per task.
    ///
    /// # Errors
    ///
    /// Source errors, request errors, [`Error::TaskFailed`] for the first
    /// task that did not succeed, and [`Error::Timeout`].
    #[tracing::instrument(skip(self, source, options), fields(chunk_size = options.chunk_size))]
    pub async fn import_from_source(
        &self,
        index_uid: &str,
        source: &mut dyn ImportSource,
        options: &ImportOptions,
    ) -> Result<ImportResult> {
        let client = self.processor.client();
        let primary_key = options.primary_key.as_deref();
        let mut result = ImportResult::default();
        let enqueued_uids = Mutex::new(Vec::new());
        let uids = &enqueued_uids;

        let documents = futures::stream::iter(SourceIter::new(source));
        result.imported = process_by_chunks(
            documents,
            move |chunk| async move {
                let enqueued = client.add_documents(index_uid, &chunk, primary_key).await?;
                uids.lock()
                    .map_err(|_| Error::operation("import_documents", "lock poisoned"))?
                    .push(enqueued.task_uid);
                Ok(())
            },
            options.chunk_size,
        )
        .await?;
        result.task_uids = enqueued_uids
            .into_inner()
            .map_err(|_| Error::operation("import_documents", "lock poisoned"))?;

        if options.wait && !result.task_uids.is_empty() {
            let timeout = self.processor.timeout().saturating_mul(
                u32::try_from(result.task_uids.len()).unwrap_or(u32::MAX),
            );
            result.tasks = self.processor.wait_for_tasks(&result.task_uids, timeout).await?;
            if let Some(task) = result.tasks.iter().find(|t| t.status != TaskStatus::Succeeded) {
                return Err(task_failed(task));
            }
        }

        tracing::info!(imported = result.imported, tasks = result.task_uids.len(), "import complete");
        Ok(result)
    }
}

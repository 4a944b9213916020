//! Document export service.
//!
//! Streams every document of an index through a [`LazyCollection`] and
//! writes it to a sink, a string or a file.

use crate::client::{Document, DocumentsQuery, SearchClient};
use crate::collections::{LazyCollection, LazyCollectionOptions, Page, Retriever};
use crate::io::formats::{Format, create_export_sink};
use crate::io::traits::ExportSink;
use crate::{Error, Result};
use futures::{Stream, TryStreamExt};
use std::future::Future;
use std::io::Write;
use std::path::Path;

/// Default page size when exporting.
pub const DEFAULT_EXPORT_BATCH_SIZE: usize = 1000;

/// Options for document export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    /// Documents requested per page.
    pub batch_size: usize,
    /// Maximum number of documents to export.
    pub limit: Option<usize>,
    /// Attributes to export; `None` exports all of them.
    pub fields: Option<Vec<String>>,
    /// Filter expression restricting the exported documents.
    pub filter: Option<String>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_EXPORT_BATCH_SIZE,
            limit: None,
            fields: None,
            filter: None,
        }
    }
}

impl ExportOptions {
    /// Sets the page size.
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Caps the number of exported documents.
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Restricts the exported attributes.
    #[must_use]
    pub fn with_fields(mut self, fields: Vec<String>) -> Self {
        self.fields = Some(fields);
        self
    }

    /// Sets the filter expression. An empty expression clears it.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        let filter = filter.into();
        self.filter = (!filter.is_empty()).then_some(filter);
        self
    }
}

/// Result of an export operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportResult {
    /// Number of documents exported.
    pub exported: usize,
    /// Format used for export.
    pub format: Format,
    /// Output path, for file exports.
    pub output_path: Option<String>,
}

impl ExportResult {
    /// Creates an empty result.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self {
            exported: 0,
            format,
            output_path: None,
        }
    }

    /// Returns whether any document was exported.
    #[must_use]
    pub const fn has_exports(&self) -> bool {
        self.exported > 0
    }
}

/// Retrieves pages of documents from one index.
pub struct DocumentRetriever<'a, C> {
    client: &'a C,
    index_uid: String,
    fields: Option<Vec<String>>,
    filter: Option<String>,
}

impl<'a, C: SearchClient> DocumentRetriever<'a, C> {
    /// Creates a retriever over `index_uid`.
    #[must_use]
    pub fn new(client: &'a C, index_uid: impl Into<String>, options: &ExportOptions) -> Self {
        Self {
            client,
            index_uid: index_uid.into(),
            fields: options.fields.clone(),
            filter: options.filter.clone(),
        }
    }

    fn query(&self, offset: usize, limit: usize) -> DocumentsQuery {
        DocumentsQuery {
            offset,
            limit,
            fields: self.fields.clone(),
            filter: self.filter.clone(),
        }
    }
}

impl<C: SearchClient> Retriever<Document> for DocumentRetriever<'_, C> {
    fn retrieve(
        &self,
        offset: usize,
        limit: usize,
    ) -> impl Future<Output = Result<Page<Document>>> + Send {
        let query = self.query(offset, limit);
        async move {
            let page = self.client.get_documents(&self.index_uid, &query).await?;
            Ok(Page::new(page.results, page.offset, page.limit))
        }
    }
}

/// Exports the documents of one index.
///
/// Every output method starts a fresh pass over the index.
pub struct Exporter<'a, C> {
    collection: LazyCollection<Document, DocumentRetriever<'a, C>>,
}

/// Creates an [`Exporter`] for `index_uid`.
///
/// # Example
///
/// ```rust,ignore
/// let exporter = export_documents(&client, "movies", &ExportOptions::default());
/// std::fs::write("movies.ndjson", exporter.to_ndjson().await?)?;
/// ```
#[must_use]
pub fn export_documents<'a, C: SearchClient>(
    client: &'a C,
    index_uid: &str,
    options: &ExportOptions,
) -> Exporter<'a, C> {
    let mut collection_options = LazyCollectionOptions::default().with_batch_size(options.batch_size);
    if let Some(limit) = options.limit {
        collection_options = collection_options.with_max_items(limit);
    }
    Exporter {
        collection: LazyCollection::new(
            DocumentRetriever::new(client, index_uid, options),
            collection_options,
        ),
    }
}

impl<C: SearchClient> Exporter<'_, C> {
    /// Streams the documents.
    pub fn stream(&self) -> impl Stream<Item = Result<Document>> + '_ {
        self.collection.stream()
    }

    /// Collects every document.
    ///
    /// # Errors
    ///
    /// Returns the first retrieval error.
    pub async fn to_vec(&self) -> Result<Vec<Document>> {
        self.collection.to_array().await
    }

    /// Renders a pretty-printed JSON array with two-space indentation.
    ///
    /// # Errors
    ///
    /// Returns the first retrieval or serialization error.
    pub async fn to_json(&self) -> Result<String> {
        self.render(Format::Json).await
    }

    /// Renders one compact JSON object per line.
    ///
    /// # Errors
    ///
    /// Returns the first retrieval or serialization error.
    pub async fn to_ndjson(&self) -> Result<String> {
        self.render(Format::Ndjson).await
    }

    async fn render(&self, format: Format) -> Result<String> {
        let mut buffer = Vec::new();
        {
            let mut sink = create_export_sink(&mut buffer, format);
            self.write_to(sink.as_mut(), format).await?;
            sink.finalize()?;
        }
        String::from_utf8(buffer).map_err(|e| Error::operation("render_export", e))
    }

    /// Writes every document to `sink`. Does not finalize it.
    ///
    /// # Errors
    ///
    /// Returns the first retrieval or sink error.
    #[tracing::instrument(skip(self, sink))]
    pub async fn write_to(&self, sink: &mut dyn ExportSink, format: Format) -> Result<ExportResult> {
        let mut result = ExportResult::new(format);
        let mut documents = std::pin::pin!(self.stream());
        while let Some(document) = documents.try_next().await? {
            sink.write(&document)?;
            result.exported += 1;
        }
        metrics::counter!("documents_exported_total").increment(result.exported as u64);
        tracing::info!(exported = result.exported, "export complete");
        Ok(result)
    }

    /// Writes every document to `writer` and finalizes the output.
    ///
    /// # Errors
    ///
    /// Returns the first retrieval, serialization or I/O error.
    pub async fn export_to_writer<W: Write + Send>(
        &self,
        writer: W,
        format: Format,
    ) -> Result<ExportResult> {
        let mut sink = create_export_sink(writer, format);
        let result = self.write_to(sink.as_mut(), format).await?;
        sink.finalize()?;
        Ok(result)
    }

    /// Writes every document to a file.
    ///
    /// Without an explicit `format`, it is detected from the extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the format cannot be determined, or the file cannot
    /// be written.
    pub async fn export_to_file(&self, path: &Path, format: Option<Format>) -> Result<ExportResult> {
        let format = match format {
            Some(format) => format,
            None => Format::from_path(path)?,
        };
        let file = std::fs::File::create(path).map_err(|e| Error::OperationFailed {
            operation: "create_export_file".to_string(),
            cause: e.to_string(),
        })?;

        let mut result = self
            .export_to_writer(std::io::BufWriter::new(file), format)
            .await?;
        result.output_path = Some(path.display().to_string());
        Ok(result)
    }
}

//! Document import/export.
//!
//! # Architecture
//!
//! - **Format adapters** implement [`ImportSource`] and [`ExportSink`]
//! - **Export** pages through an index with a
//!   [`LazyCollection`](crate::LazyCollection) and feeds a sink
//! - **Import** drains a source in chunks and tracks the enqueued tasks
//!
//! # Supported Formats
//!
//! | Format | Import | Export | Notes |
//! |--------|--------|--------|-------|
//! | JSON | ✓ | ✓ | Array; pretty-printed with two-space indent on export |
//! | NDJSON | ✓ | ✓ | One compact object per line |
//!
//! # Examples
//!
//! ```rust,ignore
//! use searchdeck::io::{ExportOptions, Format, export_documents};
//!
//! let exporter = export_documents(&client, "movies", &ExportOptions::default());
//! let result = exporter.export_to_file(Path::new("movies.ndjson"), None).await?;
//! println!("Exported {} documents", result.exported);
//! ```

pub mod formats;
pub mod services;
pub mod traits;

pub use formats::Format;
pub use services::export::{
    DEFAULT_EXPORT_BATCH_SIZE, DocumentRetriever, ExportOptions, ExportResult, Exporter,
    export_documents,
};
pub use services::import::{ImportOptions, ImportResult, ImportService};
pub use traits::{ExportSink, ImportSource, SourceIter};

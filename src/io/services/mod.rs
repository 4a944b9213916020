//! Import and export service implementations.
//!
//! Orchestrates format adapters, paginated retrieval and task tracking.

pub mod export;
pub mod import;

pub use export::{DocumentRetriever, ExportOptions, ExportResult, Exporter, export_documents};
pub use import::{ImportOptions, ImportResult, ImportService};

//! # Searchdeck
//!
//! Administration toolkit for Meilisearch-compatible search engines.
//!
//! Searchdeck wraps a search engine's HTTP API with the data-flow pieces an
//! admin console needs: demand-driven pagination over documents, a facet
//! filter model that compiles to filter expressions, bulk export and import,
//! and tracking of long-running server-side tasks.
//!
//! ## Features
//!
//! - Lazy paginated collections with bounded lookahead and exact item caps
//! - Tri-state facet filters, numeric ranges and geo bounding boxes
//! - JSON and NDJSON document export, chunked document import
//! - Task polling with timeouts, index duplication and renaming
//! - Tenant token construction for scoped search keys
//!
//! ## Example
//!
//! ```rust,ignore
//! use searchdeck::{AppliedFilters, LazyCollection, LazyCollectionOptions};
//!
//! let mut filters = AppliedFilters::new();
//! filters.apply_string_filter("genre", "drama");
//! filters.apply_range_filter("year", (1990.0, 1999.0));
//! assert_eq!(filters.to_string(), r#"genre IN ["drama"] AND year 1990 TO 1999"#);
//!
//! let collection = LazyCollection::new(retriever, LazyCollectionOptions::default());
//! let documents = collection.to_array().await?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

pub mod client;
pub mod collections;
pub mod config;
pub mod filters;
pub mod io;
pub mod observability;
pub mod services;
pub mod utils;

pub use client::{Document, DocumentsPage, DocumentsQuery, EnqueuedTask, SearchClient, Task};
pub use collections::{LazyCollection, LazyCollectionOptions, Page, Retriever, process_by_chunks};
pub use config::AppConfig;
pub use filters::{AppliedFilters, FilterSyntax, GeoBoundingBox, MeilisearchSyntax, StringFilterStatus};
pub use services::{TaskOutcome, TaskProcessor, TaskStatus};

/// Error type for searchdeck operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Malformed durations, unknown formats, bad CLI arguments |
/// | `OperationFailed` | I/O errors, serialization failures, transport errors |
/// | `Api` | The search engine answered with a non-success HTTP status |
/// | `TaskFailed` | A task reached `failed` or `canceled` during an index operation |
/// | `Timeout` | Waiting for tasks exceeded the configured timeout |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    ///
    /// Raised when:
    /// - Filesystem I/O errors occur
    /// - JSON encoding or decoding fails
    /// - The HTTP transport cannot reach the search engine
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// The search engine rejected a request.
    #[error("search engine error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Engine error code (e.g. `index_not_found`), when provided.
        code: Option<String>,
        /// Human-readable message.
        message: String,
    },

    /// A server-side task did not succeed.
    #[error("task {uid} ended as {status}: {reason}")]
    TaskFailed {
        /// Task identifier.
        uid: u64,
        /// Final task status.
        status: String,
        /// Failure reason reported by the engine, or the operation name.
        reason: String,
    },

    /// Waiting for a server-side task exceeded its timeout.
    #[error("timed out after {elapsed_ms}ms waiting for task {uid}")]
    Timeout {
        /// Task identifier.
        uid: u64,
        /// Time spent waiting.
        elapsed_ms: u64,
    },
}

impl Error {
    /// Shorthand for [`Error::OperationFailed`].
    pub fn operation(operation: &str, cause: impl ToString) -> Self {
        Self::OperationFailed {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }
}

/// Result type alias for searchdeck operations.
pub type Result<T> = std::result::Result<T, Error>;

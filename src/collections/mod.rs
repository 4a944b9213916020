//! Demand-driven collections over paginated sources.
//!
//! [`LazyCollection`] turns an `(offset, limit)` page API into a stream that
//! only fetches the next page once the current one has been consumed.
//! [`process_by_chunks`] drains such a stream into fixed-size batches.

mod chunks;
mod lazy;

pub use chunks::{DEFAULT_CHUNK_SIZE, process_by_chunks};
pub use lazy::{DEFAULT_BATCH_SIZE, LazyCollection, LazyCollectionOptions, Page, Retriever};

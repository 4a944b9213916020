//! Chunked draining of item streams.

use crate::Result;
use futures::{Stream, TryStreamExt};
use std::future::Future;

/// Default number of items per flushed chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Drains `items` into chunks of `chunk_size` and hands each one to `flush`.
///
/// Full chunks are flushed as soon as they fill up; a trailing partial chunk
/// is flushed once the stream ends. An empty stream never calls `flush`.
///
/// Returns the number of items flushed.
///
/// # Errors
///
/// Stops at the first stream or flush error and returns it. Items already
/// buffered for the current chunk are dropped.
///
/// # Example
///
/// ```rust,ignore
/// let copied = process_by_chunks(collection.stream(), |documents| async move {
///     target.add_documents("movies", &documents, None).await.map(|_| ())
/// }, 5000).await?;
/// ```
pub async fn process_by_chunks<T, S, F, Fut>(items: S, mut flush: F, chunk_size: usize) -> Result<usize>
where
    S: Stream<Item = Result<T>>,
    F: FnMut(Vec<T>) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let chunk_size = chunk_size.max(1);
    let mut items = std::pin::pin!(items);
    let mut chunk = Vec::with_capacity(chunk_size);
    let mut flushed = 0;
    let mut chunks = 0_usize;

    while let Some(item) = items.try_next().await? {
        chunk.push(item);
        if chunk.len() == chunk_size {
            let full = std::mem::replace(&mut chunk, Vec::with_capacity(chunk_size));
            flushed += full.len();
            chunks += 1;
            tracing::debug!(chunk = chunks, size = chunk_size, "flushing chunk");
            flush(full).await?;
            metrics::counter!("chunks_flushed_total").increment(1);
        }
    }

    if !chunk.is_empty() {
        flushed += chunk.len();
        chunks += 1;
        tracing::debug!(chunk = chunks, size = chunk.len(), "flushing final chunk");
        flush(chunk).await?;
        metrics::counter!("chunks_flushed_total").increment(1);
    }

    Ok(flushed)
}

//! Lazy paginated collection.
//!
//! A [`LazyCollection`] is a restartable sequence backed by a [`Retriever`].
//! Every call to [`LazyCollection::stream`] starts a fresh cursor, so the
//! collection itself holds no iteration state and several streams over the
//! same collection never interfere.
//!
//! # Termination
//!
//! ```text
//! page exhausted ──► previous page short? ──yes──► end
//!        │                    │ no
//!        │                    ▼
//!        │          cap reached? ──yes──► end
//!        │                    │ no
//!        │                    ▼
//!        │          fetch (next_offset, previous limit)
//!        ▼                    │
//! consumed == max_items? ◄────┘ ──yes──► end
//!        │ no
//!        ▼
//!   yield next item
//! ```

use crate::Result;
use futures::{Stream, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::future::Future;
use std::marker::PhantomData;

/// Default number of items requested per page.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// A page of items returned by a [`Retriever`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items in source order.
    pub items: Vec<T>,
    /// Offset echoed back by the source.
    pub offset: usize,
    /// Limit echoed back by the source; becomes the limit of the next request.
    pub limit: usize,
}

impl<T> Page<T> {
    /// Creates a page.
    #[must_use]
    pub const fn new(items: Vec<T>, offset: usize, limit: usize) -> Self {
        Self {
            items,
            offset,
            limit,
        }
    }

    /// Returns true if the page holds fewer items than its limit.
    ///
    /// A short page is the authoritative end-of-data signal.
    #[must_use]
    pub fn is_short(&self) -> bool {
        self.items.len() < self.limit
    }
}

/// Source of pages for a [`LazyCollection`].
///
/// Implementations must answer the same `(offset, limit)` pair identically
/// within one iteration; no caching or deduplication happens on top.
///
/// Any `Fn(usize, usize) -> impl Future<Output = Result<Page<T>>>` closure is
/// a retriever.
pub trait Retriever<T> {
    /// Fetches up to `limit` items starting at `offset`.
    ///
    /// # Errors
    ///
    /// Errors propagate unchanged to the consumer of the current stream.
    fn retrieve(&self, offset: usize, limit: usize)
    -> impl Future<Output = Result<Page<T>>> + Send;
}

impl<T, F, Fut> Retriever<T> for F
where
    F: Fn(usize, usize) -> Fut,
    Fut: Future<Output = Result<Page<T>>> + Send,
{
    fn retrieve(
        &self,
        offset: usize,
        limit: usize,
    ) -> impl Future<Output = Result<Page<T>>> + Send {
        self(offset, limit)
    }
}

/// Options for a [`LazyCollection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LazyCollectionOptions {
    /// Limit of the first request (default: 10).
    pub batch_size: usize,
    /// Exact cap on yielded items; `None` means unbounded.
    pub max_items: Option<usize>,
}

impl Default for LazyCollectionOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_items: None,
        }
    }
}

impl LazyCollectionOptions {
    /// Sets the batch size. Zero is raised to one.
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = if batch_size == 0 { 1 } else { batch_size };
        self
    }

    /// Caps the number of yielded items.
    #[must_use]
    pub const fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = Some(max_items);
        self
    }
}

/// Restartable, demand-driven sequence backed by a page-fetching function.
///
/// # Example
///
/// ```rust,ignore
/// use futures::TryStreamExt;
/// use searchdeck::{LazyCollection, LazyCollectionOptions, Page};
///
/// let collection = LazyCollection::new(
///     |offset, limit| async move { Ok(Page::new(fetch(offset, limit).await, offset, limit)) },
///     LazyCollectionOptions::default().with_batch_size(100),
/// );
///
/// let mut stream = std::pin::pin!(collection.stream());
/// while let Some(document) = stream.try_next().await? {
///     // ...
/// }
/// ```
pub struct LazyCollection<T, R> {
    retriever: R,
    options: LazyCollectionOptions,
    _item: PhantomData<fn() -> T>,
}

impl<T, R> LazyCollection<T, R>
where
    R: Retriever<T>,
{
    /// Creates a collection over `retriever`.
    #[must_use]
    pub const fn new(retriever: R, options: LazyCollectionOptions) -> Self {
        Self {
            retriever,
            options,
            _item: PhantomData,
        }
    }

    /// Returns the collection options.
    #[must_use]
    pub const fn options(&self) -> &LazyCollectionOptions {
        &self.options
    }

    /// Returns the underlying retriever.
    #[must_use]
    pub const fn retriever(&self) -> &R {
        &self.retriever
    }

    /// Starts a new iteration.
    ///
    /// Pages are requested strictly one at a time in increasing offset order.
    /// A retriever error is yielded once and ends the stream.
    pub fn stream(&self) -> impl Stream<Item = Result<T>> + '_ {
        let cursor = Cursor::new(&self.retriever, self.options);
        futures::stream::try_unfold(cursor, |mut cursor| async move {
            let item = cursor.next_item().await?;
            Ok(item.map(|item| (item, cursor)))
        })
    }

    /// Drains a fresh iteration into a vector, preserving source order.
    ///
    /// # Errors
    ///
    /// Returns the first retriever error.
    pub async fn to_array(&self) -> Result<Vec<T>> {
        self.stream().try_collect().await
    }
}

/// Per-iteration state. Never stored on the collection.
struct Cursor<'a, T, R> {
    retriever: &'a R,
    options: LazyCollectionOptions,
    buffer: VecDeque<T>,
    current_offset: usize,
    next_offset: usize,
    current_index: usize,
    limit: Option<usize>,
    is_last_batch: bool,
}

impl<'a, T, R> Cursor<'a, T, R>
where
    R: Retriever<T>,
{
    const fn new(retriever: &'a R, options: LazyCollectionOptions) -> Self {
        Self {
            retriever,
            options,
            buffer: VecDeque::new(),
            current_offset: 0,
            next_offset: 0,
            current_index: 0,
            limit: None,
            is_last_batch: false,
        }
    }

    fn cap_reached(&self, consumed: usize) -> bool {
        self.options.max_items == Some(consumed)
    }

    async fn next_item(&mut self) -> Result<Option<T>> {
        if self.buffer.is_empty() {
            // Everything up to next_offset has been yielded at this point.
            if self.is_last_batch || self.cap_reached(self.next_offset) {
                return Ok(None);
            }
            self.fetch().await?;
        }

        let total_items = self.current_offset + self.current_index;
        if self.cap_reached(total_items) {
            return Ok(None);
        }

        // An empty page after a full one ends the sequence.
        let Some(item) = self.buffer.pop_front() else {
            return Ok(None);
        };
        self.current_index += 1;
        Ok(Some(item))
    }

    async fn fetch(&mut self) -> Result<()> {
        let limit = self.limit.unwrap_or(self.options.batch_size);
        self.current_offset = self.next_offset;

        let page = self.retriever.retrieve(self.current_offset, limit).await?;
        let received = page.items.len();

        tracing::debug!(
            offset = self.current_offset,
            limit,
            received,
            echoed_limit = page.limit,
            "fetched page"
        );
        metrics::counter!("lazy_collection_pages_fetched_total").increment(1);

        self.next_offset += received;
        self.current_index = 0;
        self.is_last_batch = page.is_short();
        self.limit = Some(page.limit);
        self.buffer = page.items.into();
        Ok(())
    }
}

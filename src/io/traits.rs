//! Core traits for document import/export.
//!
//! Format adapters implement [`ImportSource`] and [`ExportSink`]; the export
//! and import services only talk to these traits.

use crate::Result;
use crate::client::Document;

/// Source of documents to import.
///
/// Sources should read incrementally where the format allows it, so large
/// files are not loaded into memory at once.
pub trait ImportSource {
    /// Reads the next document.
    ///
    /// Returns `Ok(None)` when the source is exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails or I/O errors occur.
    fn next(&mut self) -> Result<Option<Document>>;

    /// Returns an estimate of the number of documents, if known.
    fn size_hint(&self) -> Option<usize> {
        None
    }
}

/// Sink for exported documents.
///
/// # Lifecycle
///
/// 1. Create the sink over an output destination
/// 2. Call `write()` for each document
/// 3. Call `finalize()` to write footers and flush
pub trait ExportSink {
    /// Writes a single document.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or I/O fails.
    fn write(&mut self, document: &Document) -> Result<()>;

    /// Finalizes the export. Consumes the sink.
    ///
    /// # Errors
    ///
    /// Returns an error if I/O fails.
    fn finalize(self: Box<Self>) -> Result<()>;
}

/// Adapts an [`ImportSource`] into an iterator.
pub struct SourceIter<'a> {
    source: &'a mut dyn ImportSource,
    done: bool,
}

impl<'a> SourceIter<'a> {
    /// Wraps `source`.
    pub fn new(source: &'a mut dyn ImportSource) -> Self {
        Self {
            source,
            done: false,
        }
    }
}

impl Iterator for SourceIter<'_> {
    type Item = Result<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.source.next().transpose();
        // Stop after the first error or the end of the source.
        if !matches!(item, Some(Ok(_))) {
            self.done = true;
        }
        item
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.source.size_hint())
    }
}

//! JSON format adapters.
//!
//! Import accepts both a JSON array of objects and newline-delimited JSON.
//! Export writes either a pretty-printed array (two-space indent) or NDJSON.

use crate::client::Document;
use crate::io::traits::{ExportSink, ImportSource};
use crate::{Error, Result};
use std::collections::VecDeque;
use std::io::{BufRead, Write};

fn read_error(e: &std::io::Error) -> Error {
    Error::operation("read_json", e)
}

fn write_error(e: impl ToString) -> Error {
    Error::operation("write_json", e)
}

/// JSON import source.
///
/// Detects the layout from the first non-blank line:
/// - **Array**: the whole input is parsed as `[{...}, {...}]`
/// - **NDJSON**: one object per line, blank lines skipped
pub struct JsonImportSource<R: BufRead> {
    reader: R,
    /// Documents parsed but not yet returned.
    buffer: VecDeque<Document>,
    started: bool,
    array_mode: bool,
    /// Line number for error reporting.
    line_number: usize,
}

impl<R: BufRead> JsonImportSource<R> {
    /// Creates a new JSON import source.
    #[must_use]
    pub const fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: VecDeque::new(),
            started: false,
            array_mode: false,
            line_number: 0,
        }
    }

    /// Reads the next non-blank line. `None` at end of input.
    fn next_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        loop {
            line.clear();
            let bytes_read = self.reader.read_line(&mut line).map_err(|e| read_error(&e))?;
            if bytes_read == 0 {
                return Ok(None);
            }
            self.line_number += 1;
            if !line.trim().is_empty() {
                return Ok(Some(line));
            }
        }
    }

    fn parse_line(&self, line: &str) -> Result<Document> {
        serde_json::from_str(line.trim()).map_err(|e| {
            Error::InvalidInput(format!(
                "Line {}: expected a JSON object: {e}",
                self.line_number
            ))
        })
    }

    /// Returns false for empty input.
    fn detect_format(&mut self) -> Result<bool> {
        self.started = true;
        let Some(first_line) = self.next_line()? else {
            return Ok(false);
        };

        if first_line.trim_start().starts_with('[') {
            self.array_mode = true;
            let mut remaining = String::new();
            self.reader
                .read_to_string(&mut remaining)
                .map_err(|e| read_error(&e))?;
            let documents: Vec<Document> = serde_json::from_str(&format!("{first_line}{remaining}"))
                .map_err(|e| Error::InvalidInput(format!("Failed to parse JSON array: {e}")))?;
            self.buffer = documents.into();
        } else {
            let document = self.parse_line(&first_line)?;
            self.buffer.push_back(document);
        }
        Ok(true)
    }
}

impl<R: BufRead> ImportSource for JsonImportSource<R> {
    fn next(&mut self) -> Result<Option<Document>> {
        if !self.started && !self.detect_format()? {
            return Ok(None);
        }

        if let Some(document) = self.buffer.pop_front() {
            return Ok(Some(document));
        }
        if self.array_mode {
            return Ok(None);
        }

        match self.next_line()? {
            Some(line) => self.parse_line(&line).map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        self.array_mode.then_some(self.buffer.len())
    }
}

/// Pretty-printed JSON array sink.
///
/// Output is identical to pretty-printing the collected array at once, but
/// documents are written as they arrive.
pub struct JsonArrayExportSink<W: Write> {
    writer: W,
    /// Number of documents written.
    count: usize,
}

impl<W: Write> JsonArrayExportSink<W> {
    /// Creates a new array sink.
    #[must_use]
    pub const fn new(writer: W) -> Self {
        Self { writer, count: 0 }
    }
}

impl<W: Write + Send> ExportSink for JsonArrayExportSink<W> {
    fn write(&mut self, document: &Document) -> Result<()> {
        let pretty = serde_json::to_string_pretty(document).map_err(write_error)?;
        let separator = if self.count == 0 { "[\n" } else { ",\n" };
        self.writer
            .write_all(separator.as_bytes())
            .map_err(write_error)?;

        // JSON strings never hold raw newlines, so indenting per line is safe.
        for (i, line) in pretty.lines().enumerate() {
            if i > 0 {
                self.writer.write_all(b"\n").map_err(write_error)?;
            }
            write!(self.writer, "  {line}").map_err(write_error)?;
        }
        self.count += 1;
        Ok(())
    }

    fn finalize(mut self: Box<Self>) -> Result<()> {
        let footer: &[u8] = if self.count == 0 { b"[]" } else { b"\n]" };
        self.writer.write_all(footer).map_err(write_error)?;
        self.writer
            .flush()
            .map_err(|e| Error::operation("flush_json", e))
    }
}

/// Newline-delimited JSON sink.
pub struct NdjsonExportSink<W: Write> {
    writer: W,
}

impl<W: Write> NdjsonExportSink<W> {
    /// Creates a new NDJSON sink.
    #[must_use]
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write + Send> ExportSink for NdjsonExportSink<W> {
    fn write(&mut self, document: &Document) -> Result<()> {
        serde_json::to_writer(&mut self.writer, document).map_err(write_error)?;
        writeln!(self.writer).map_err(write_error)
    }

    fn finalize(mut self: Box<Self>) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| Error::operation("flush_json", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn collect(input: &str) -> Result<Vec<Document>> {
        let mut source = JsonImportSource::new(Cursor::new(input.to_string()));
        let mut documents = Vec::new();
        while let Some(document) = source.next()? {
            documents.push(document);
        }
        Ok(documents)
    }

    #[test]
    fn test_import_ndjson() {
        let input = "{\"id\": 1, \"title\": \"Alien\"}\n\n{\"id\": 2, \"tags\": [\"a\"]}\n";

        let documents = collect(input).unwrap();

        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0]["title"], "Alien");
        assert_eq!(documents[1]["tags"], json!(["a"]));
    }

    #[test]
    fn test_import_array() {
        let input = r#"[
            {"id": 1},
            {"id": 2}
        ]"#;

        let mut source = JsonImportSource::new(Cursor::new(input));
        assert_eq!(source.next().unwrap().unwrap()["id"], 1);
        assert_eq!(source.size_hint(), Some(1));
        assert_eq!(source.next().unwrap().unwrap()["id"], 2);
        assert!(source.next().unwrap().is_none());
    }

    #[test]
    fn test_import_empty_input() {
        assert!(collect("").unwrap().is_empty());
        assert!(collect("\n  \n").unwrap().is_empty());
    }

    #[test]
    fn test_import_reports_line_number() {
        let err = collect("{\"id\": 1}\n\n42\n").unwrap_err();
        assert!(err.to_string().contains("Line 3"));
    }

    #[test]
    fn test_array_sink_matches_pretty_print() {
        let documents = vec![
            doc(json!({"id": 1, "nested": {"tags": ["a", "b"]}})),
            doc(json!({"id": 2, "empty": {}})),
        ];
        let mut output = Vec::new();
        {
            let mut sink = Box::new(JsonArrayExportSink::new(&mut output));
            for document in &documents {
                sink.write(document).unwrap();
            }
            sink.finalize().unwrap();
        }

        assert_eq!(
            String::from_utf8(output).unwrap(),
            serde_json::to_string_pretty(&documents).unwrap()
        );
    }

    #[test]
    fn test_array_sink_empty() {
        let mut output = Vec::new();
        Box::new(JsonArrayExportSink::new(&mut output)).finalize().unwrap();
        assert_eq!(output, b"[]");
    }

    #[test]
    fn test_ndjson_sink() {
        let mut output = Vec::new();
        {
            let mut sink = Box::new(NdjsonExportSink::new(&mut output));
            sink.write(&doc(json!({"id": 1}))).unwrap();
            sink.write(&doc(json!({"id": 2}))).unwrap();
            sink.finalize().unwrap();
        }
        assert_eq!(String::from_utf8(output).unwrap(), "{\"id\":1}\n{\"id\":2}\n");
    }
}

//! Streaming JSON and JSONL output for image records.
//!
//! JSON output is a single array written incrementally, so records can be
//! emitted as workers produce them without buffering the whole scan.

use serde::Serialize;
use std::io::{self, Write};

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One JSON array
    Json,
    /// One JSON object per line (newline-delimited JSON)
    JsonLines,
}

impl OutputFormat {
    /// Parse format from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "jsonl" | "jsonlines" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }
}

/// Serializes items one at a time in the chosen format.
///
/// Call [`OutputWriter::finish`] when done: it closes the JSON array and
/// flushes.
pub struct OutputWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    pretty: bool,
    items_written: usize,
}

impl<W: Write> OutputWriter<W> {
    /// Create a new output writer. `pretty` only affects JSON format.
    pub fn new(writer: W, format: OutputFormat, pretty: bool) -> Self {
        Self {
            writer,
            format,
            pretty,
            items_written: 0,
        }
    }

    /// Write a single item.
    pub fn write<T: Serialize>(&mut self, item: &T) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => {
                let sep: &[u8] = match (self.items_written, self.pretty) {
                    (0, true) => b"[\n",
                    (0, false) => b"[",
                    (_, true) => b",\n",
                    (_, false) => b",",
                };
                self.writer.write_all(sep)?;
                if self.pretty {
                    serde_json::to_writer_pretty(&mut self.writer, item)
                        .map_err(io::Error::other)?;
                } else {
                    serde_json::to_writer(&mut self.writer, item).map_err(io::Error::other)?;
                }
            }
            OutputFormat::JsonLines => {
                // JSONL is never pretty-printed (one object per line)
                serde_json::to_writer(&mut self.writer, item).map_err(io::Error::other)?;
                writeln!(self.writer)?;
            }
        }
        self.items_written += 1;
        Ok(())
    }

    /// Write multiple items.
    pub fn write_all<T: Serialize>(&mut self, items: &[T]) -> io::Result<()> {
        for item in items {
            self.write(item)?;
        }
        Ok(())
    }

    /// Get the number of items written.
    pub fn items_written(&self) -> usize {
        self.items_written
    }

    /// Terminate the output and flush. An empty JSON output is `[]`.
    pub fn finish(mut self) -> io::Result<W> {
        if self.format == OutputFormat::Json {
            let tail: &[u8] = match (self.items_written, self.pretty) {
                (0, _) => b"[]\n",
                (_, true) => b"\n]\n",
                (_, false) => b"]\n",
            };
            self.writer.write_all(tail)?;
        }
        self.writer.flush()?;
        Ok(self.writer)
    }
}

//! Append-only results log.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::SinkError;
use crate::pipeline::types::OutputRecord;

/// Destination for output records. Records are only ever appended.
pub trait RecordSink {
    fn append(&mut self, record: &OutputRecord) -> Result<(), SinkError>;
}

/// Newline-delimited JSON, flushed after every record so completed lines
/// survive a later fatal error.
pub struct JsonlSink<W: Write> {
    writer: W,
    written: usize,
}

impl JsonlSink<BufWriter<File>> {
    /// Create (or truncate) the results file at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> JsonlSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Number of records written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> RecordSink for JsonlSink<W> {
    fn append(&mut self, record: &OutputRecord) -> Result<(), SinkError> {
        let line = serde_json::to_string(record)?;
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.written += 1;
        Ok(())
    }
}

/// In-memory sink.
impl RecordSink for Vec<OutputRecord> {
    fn append(&mut self, record: &OutputRecord) -> Result<(), SinkError> {
        self.push(record.clone());
        Ok(())
    }
}

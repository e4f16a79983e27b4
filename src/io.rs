//! Event sources and sinks which the selection reads from and writes to
//!
//! The selection itself only sees the [`EventSource`] and [`EventSink`]
//! traits. Datasets on disk are stored as JSON lines, one event record per
//! line, and survivors are written back in the very same format.

use crate::event::EventRecord;
use std::{
    fs::File,
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::warn;

/// Failure to read events
#[derive(Debug, Error)]
pub enum SourceError {
    /// The dataset could not be opened
    #[error("cannot open event source {}: {source}", path.display())]
    Open {
        /// Location of the dataset
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The dataset could not be read
    #[error("cannot read event source: {0}")]
    Read(#[from] io::Error),
}

/// Failure to persist events
#[derive(Debug, Error)]
pub enum SinkError {
    /// The output could not be created
    #[error("cannot create event sink {}: {source}", path.display())]
    Create {
        /// Location of the output
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// An event could not be encoded
    #[error("cannot encode event record: {0}")]
    Encode(#[from] serde_json::Error),

    /// The output could not be written
    #[error("cannot write event sink: {0}")]
    Write(#[from] io::Error),
}

/// Finite, ordered, single-pass sequence of events
pub trait EventSource {
    /// Fetch the next event, if any is left
    fn next_event(&mut self) -> Result<Option<EventRecord>, SourceError>;

    /// Number of entries which were skipped because they could not be decoded
    fn unreadable(&self) -> usize {
        0
    }
}

/// Destination of the events which survive the selection
pub trait EventSink {
    /// Persist one event, after those which were previously written
    fn write_event(&mut self, record: &EventRecord) -> Result<(), SinkError>;

    /// Make sure that everything written so far is persisted
    fn finish(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Reads events from JSON lines
pub struct JsonLinesSource<R> {
    reader: R,
    line: String,
    line_number: usize,
    unreadable: usize,
}
//
impl JsonLinesSource<BufReader<File>> {
    /// Open a dataset on disk
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| SourceError::Open {
            path: path.to_owned(),
            source,
        })?;
        Ok(Self::new(BufReader::new(file)))
    }
}
//
impl<R: BufRead> JsonLinesSource<R> {
    /// Read events from any buffered reader
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            line_number: 0,
            unreadable: 0,
        }
    }
}
//
impl<R: BufRead> EventSource for JsonLinesSource<R> {
    fn next_event(&mut self) -> Result<Option<EventRecord>, SourceError> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                return Ok(None);
            }
            self.line_number += 1;
            let line = self.line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(record) => return Ok(Some(record)),
                Err(error) => {
                    warn!(line = self.line_number, %error, "Skipping unreadable event record");
                    self.unreadable += 1;
                }
            }
        }
    }

    fn unreadable(&self) -> usize {
        self.unreadable
    }
}

/// Writes events as JSON lines
pub struct JsonLinesSink<W: Write> {
    writer: W,
}
//
impl JsonLinesSink<BufWriter<File>> {
    /// Create (or truncate) an output dataset on disk
    pub fn create(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| SinkError::Create {
            path: path.to_owned(),
            source,
        })?;
        Ok(Self::new(BufWriter::new(file)))
    }
}
//
impl<W: Write> JsonLinesSink<W> {
    /// Write events into any writer
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Recover the underlying writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}
//
impl<W: Write> EventSink for JsonLinesSink<W> {
    fn write_event(&mut self, record: &EventRecord) -> Result<(), SinkError> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Serves events from memory
pub struct MemorySource<I> {
    events: I,
}
//
impl<I: Iterator<Item = EventRecord>> MemorySource<I> {
    /// Serve the events of some collection, in order
    pub fn new(events: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            events: events.into_iter(),
        }
    }
}
//
impl<I: Iterator<Item = EventRecord>> EventSource for MemorySource<I> {
    fn next_event(&mut self) -> Result<Option<EventRecord>, SourceError> {
        Ok(self.events.next())
    }
}

/// Collects events in memory
impl EventSink for Vec<EventRecord> {
    fn write_event(&mut self, record: &EventRecord) -> Result<(), SinkError> {
        self.push(record.clone());
        Ok(())
    }
}

//! YAML encoding of tape entries and the sinks they are appended to.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

/// Destination for serialized tape text.
///
/// Each call must be a single atomic append so entries written by
/// concurrent requests never interleave. The recorder calls it from tokio's
/// blocking pool, so implementations are free to block.
pub trait TextSink: Send + Sync {
    /// Append `text` to the sink.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying output cannot be written.
    fn write_text(&self, text: &str) -> io::Result<()>;
}

/// Mutex-guarded sink over any [`Write`] implementation.
pub struct WriterSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    /// Wrap `writer`.
    pub fn new(writer: W) -> Self {
        Self { writer: Mutex::new(writer) }
    }
}

impl WriterSink<io::Stdout> {
    /// Sink writing to the process's standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl WriterSink<File> {
    /// Sink appending to the file at `path`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn append_to(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(file))
    }
}

impl<W: Write + Send> TextSink for WriterSink<W> {
    fn write_text(&self, text: &str) -> io::Result<()> {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.write_all(text.as_bytes())?;
        writer.flush()
    }
}

/// In-memory sink; clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    buffer: Arc<Mutex<String>>,
}

impl MemorySink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far.
    #[must_use]
    pub fn contents(&self) -> String {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl TextSink for MemorySink {
    fn write_text(&self, text: &str) -> io::Result<()> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner).push_str(text);
        Ok(())
    }
}

/// Formats values as block-style YAML and forwards them to a [`TextSink`].
pub struct TapeSerializer {
    sink: Arc<dyn TextSink>,
}

impl TapeSerializer {
    /// Create a serializer writing to `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn TextSink>) -> Self {
        Self { sink }
    }

    /// Encode `data` and append it to the sink in one write.
    ///
    /// # Errors
    ///
    /// Returns an error if `data` cannot be encoded or the sink rejects it.
    pub fn write<T: Serialize + ?Sized>(&self, data: &T) -> Result<(), SerializeError> {
        let yaml = serde_yaml::to_string(data)?;
        self.sink.write_text(&yaml)?;
        Ok(())
    }
}

/// Failure to encode or append a tape entry.
#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    /// The value could not be encoded as YAML.
    #[error("failed to encode tape entry: {0}")]
    Encode(#[from] serde_yaml::Error),
    /// The sink could not be written.
    #[error("failed to write tape entry: {0}")]
    Sink(#[from] io::Error),
}

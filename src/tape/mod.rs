//! Tape format: capture, encoding and loading of recorded HTTP exchanges.

pub mod capture;
pub mod classify;
pub mod format;
pub mod loader;
pub mod serializer;

pub use capture::{CaptureConfig, CaptureError, CaptureWriter, InboundRequest, UpstreamResponse};
pub use classify::{classify, BodyContent, ClassifyError};
pub use format::{Exchange, FileContent, Headers, RequestRecord, ResponseRecord, Tape};
pub use loader::{parse_tape, read_tape, TapeError};
pub use serializer::{MemorySink, TapeSerializer, TextSink, WriterSink};

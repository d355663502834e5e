//! Reads tapes back from YAML.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use super::format::{Tape, BINARY_TAG};

/// YAML's core binary tag. The parser resolves it to a global tag that never
/// reaches a deserializer, so it is rewritten to [`BINARY_TAG`] first.
const CORE_BINARY_TAG: &str = "!!binary";

/// Errors raised while loading a tape.
#[derive(Debug, thiserror::Error)]
pub enum TapeError {
    /// The tape file could not be read.
    #[error("failed to read tape file {}: {source}", path.display())]
    Read {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The document is not a valid tape.
    #[error("failed to parse tape: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Parse tape text into its ordered exchanges.
///
/// An empty document is an empty tape.
///
/// # Errors
///
/// Returns [`TapeError::Parse`] if the text is not a sequence of exchanges.
pub fn parse_tape(text: &str) -> Result<Tape, TapeError> {
    if text.trim().is_empty() {
        return Ok(Tape::new());
    }
    Ok(serde_yaml::from_str(&localize_binary_tags(text))?)
}

/// Rewrite `!!binary` node tags to the local `!binary` form.
///
/// Only standalone tokens preceded by a space are touched.
fn localize_binary_tags(text: &str) -> Cow<'_, str> {
    if !text.contains(CORE_BINARY_TAG) {
        return Cow::Borrowed(text);
    }
    let mut localized = String::with_capacity(text.len());
    let mut copied = 0;
    for (start, _) in text.match_indices(CORE_BINARY_TAG) {
        let end = start + CORE_BINARY_TAG.len();
        let after_space = text[..start].ends_with(' ');
        let ends_token = !text[end..].starts_with(|c: char| !c.is_whitespace());
        if after_space && ends_token {
            localized.push_str(&text[copied..start]);
            localized.push_str(BINARY_TAG);
            copied = end;
        }
    }
    localized.push_str(&text[copied..]);
    Cow::Owned(localized)
}

/// Read and parse the tape file at `path`.
///
/// # Errors
///
/// Returns [`TapeError::Read`] if the file cannot be read, or
/// [`TapeError::Parse`] if its contents are not a valid tape.
pub fn read_tape(path: &Path) -> Result<Tape, TapeError> {
    let text = std::fs::read_to_string(path)
        .map_err(|source| TapeError::Read { path: path.to_path_buf(), source })?;
    parse_tape(&text)
}

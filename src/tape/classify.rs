//! Decides whether a message body is recorded as JSON or as text.

use std::collections::BTreeMap;

use super::format::{header_value, FileContent, Headers};

const JSON_CONTENT_TYPE: &str = "application/json";

/// Errors raised while classifying a message body.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    /// The message declared a JSON content type but the body does not parse.
    #[error("body declared as application/json is not valid JSON: {0}")]
    MalformedJsonBody(#[source] serde_json::Error),
    /// The body is not valid UTF-8 and cannot be stored as text.
    #[error("body is not valid UTF-8: {0}")]
    NonUtf8Body(#[source] std::string::FromUtf8Error),
}

/// The shape of a message body.
#[derive(Debug, Clone, PartialEq)]
pub enum BodyContent {
    /// No body.
    Empty,
    /// Body parsed from a JSON content type.
    Json(serde_json::Value),
    /// Body kept as UTF-8 text.
    Text(String),
    /// Url-encoded form fields.
    Form(BTreeMap<String, String>),
    /// Multipart upload with optional plain form fields.
    Multipart {
        /// Uploaded files keyed by field, then by file name.
        files: BTreeMap<String, BTreeMap<String, FileContent>>,
        /// Accompanying form fields.
        form: Option<BTreeMap<String, String>>,
    },
}

impl BodyContent {
    /// Split into the `(text, json)` pair stored on a tape record.
    ///
    /// Form and multipart bodies have no text/json representation.
    #[must_use]
    pub fn into_text_and_json(self) -> (Option<String>, Option<serde_json::Value>) {
        match self {
            Self::Json(value) => (None, Some(value)),
            Self::Text(text) => (Some(text), None),
            Self::Empty | Self::Form(_) | Self::Multipart { .. } => (None, None),
        }
    }
}

/// Classify `body` using the `Content-Type` found in `headers`.
///
/// An empty body is [`BodyContent::Empty`]. A content type containing
/// `application/json` yields [`BodyContent::Json`], anything else
/// [`BodyContent::Text`].
///
/// # Errors
///
/// Returns [`ClassifyError::NonUtf8Body`] if the body is not UTF-8 and
/// [`ClassifyError::MalformedJsonBody`] if a JSON body does not parse.
pub fn classify(body: &[u8], headers: &Headers) -> Result<BodyContent, ClassifyError> {
    if body.is_empty() {
        return Ok(BodyContent::Empty);
    }
    let text = String::from_utf8(body.to_vec()).map_err(ClassifyError::NonUtf8Body)?;
    let is_json =
        header_value(headers, "Content-Type").is_some_and(|value| value.contains(JSON_CONTENT_TYPE));
    if is_json {
        let value = serde_json::from_str(&text).map_err(ClassifyError::MalformedJsonBody)?;
        return Ok(BodyContent::Json(value));
    }
    Ok(BodyContent::Text(text))
}

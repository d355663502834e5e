//! Tape data structures shared by the recorder and the player.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::de;
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value;

/// Header mapping as stored on a tape. Ordered by name so tapes diff cleanly.
pub type Headers = BTreeMap<String, String>;

/// A tape: the ordered list of recorded exchanges.
pub type Tape = Vec<Exchange>;

/// One request/response pair captured by the recorder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Exchange {
    /// The inbound request as the proxy received it.
    pub request: RequestRecord,
    /// The upstream response as relayed to the caller.
    pub response: ResponseRecord,
}

/// Recorded request half of an [`Exchange`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RequestRecord {
    /// Request path including the query string.
    pub path: String,
    /// HTTP method, verbatim (extension methods included).
    pub method: String,
    /// Request headers, `None` when header recording is disabled.
    #[serde(default)]
    pub headers: Option<Headers>,
    /// Body decoded as text, when it was not declared as JSON.
    #[serde(default)]
    pub text: Option<String>,
    /// Body parsed as JSON, when the content type declared it.
    #[serde(default)]
    pub json: Option<serde_json::Value>,
    /// Url-encoded form fields. Only present in hand-written or legacy tapes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form: Option<BTreeMap<String, String>>,
    /// Multipart uploads keyed by field, then by file name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<BTreeMap<String, BTreeMap<String, FileContent>>>,
}

/// Recorded response half of an [`Exchange`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResponseRecord {
    /// HTTP status code.
    pub code: u16,
    /// Response headers, `None` when header recording is disabled.
    #[serde(default)]
    pub headers: Option<Headers>,
    /// Body decoded as text, when it was not declared as JSON.
    #[serde(default)]
    pub text: Option<String>,
    /// Body parsed as JSON, when the content type declared it.
    #[serde(default)]
    pub json: Option<serde_json::Value>,
}

/// Local YAML tag marking base64-encoded file content.
pub(crate) const BINARY_TAG: &str = "!binary";

/// Raw bytes of an uploaded file.
///
/// Tapes may spell the content as a plain string, a sequence of byte values,
/// or base64 text tagged `!binary`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct FileContent(pub Vec<u8>);

impl FileContent {
    /// Borrow the raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl<'de> Deserialize<'de> for FileContent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::String(text) => Ok(FileContent(text.into_bytes())),
            Value::Sequence(items) => items
                .into_iter()
                .map(|item| u8::deserialize(item).map_err(de::Error::custom))
                .collect::<Result<Vec<u8>, D::Error>>()
                .map(FileContent),
            Value::Tagged(tagged) if tagged.tag == BINARY_TAG => match tagged.value {
                Value::String(encoded) => decode_base64(&encoded).map(FileContent).map_err(|err| {
                    de::Error::custom(format_args!("invalid base64 in binary file content: {err}"))
                }),
                _ => Err(de::Error::custom("binary file content must be a base64 string")),
            },
            _ => Err(de::Error::custom("expected a string, a sequence of bytes or a !binary scalar")),
        }
    }
}

/// Base64 as YAML emits it: line-wrapped, so whitespace is ignored.
fn decode_base64(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD.decode(compact)
}

/// Case-insensitive header lookup.
#[must_use]
pub fn header_value<'a>(headers: &'a Headers, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Rewrite a header name into `Http-Header-Case`.
#[must_use]
pub fn canonical_header_name(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => {
                    first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

//! Builds tape entries from proxied exchanges.

use std::collections::BTreeSet;

use super::classify::{classify, ClassifyError};
use super::format::{Exchange, Headers, RequestRecord, ResponseRecord};
use super::serializer::{SerializeError, TapeSerializer};

/// Controls what the [`CaptureWriter`] records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureConfig {
    omit_headers: bool,
    skip_methods: BTreeSet<String>,
}

impl CaptureConfig {
    /// Create a config. Method names are compared case-insensitively.
    pub fn new<I, S>(omit_headers: bool, skip_methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            omit_headers,
            skip_methods: skip_methods.into_iter().map(|m| m.as_ref().to_ascii_uppercase()).collect(),
        }
    }

    /// Whether headers are left out of recorded entries.
    #[must_use]
    pub fn omit_headers(&self) -> bool {
        self.omit_headers
    }

    /// Whether exchanges using `method` are not recorded.
    #[must_use]
    pub fn skips(&self, method: &str) -> bool {
        self.skip_methods.contains(&method.to_ascii_uppercase())
    }
}

/// An inbound request as seen by the proxy.
#[derive(Debug, Clone, Copy)]
pub struct InboundRequest<'a> {
    /// Path and query string.
    pub path: &'a str,
    /// HTTP method.
    pub method: &'a str,
    /// Request headers.
    pub headers: &'a Headers,
    /// Raw request body.
    pub body: &'a [u8],
}

/// The upstream response being relayed.
#[derive(Debug, Clone, Copy)]
pub struct UpstreamResponse<'a> {
    /// HTTP status code.
    pub code: u16,
    /// Response headers.
    pub headers: &'a Headers,
    /// Raw response body.
    pub body: &'a [u8],
}

/// Failure to record an exchange. Never affects the relayed response.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// A body could not be classified.
    #[error(transparent)]
    Classify(#[from] ClassifyError),
    /// The entry could not be encoded or written.
    #[error(transparent)]
    Serialize(#[from] SerializeError),
}

/// Turns each proxied exchange into one appended tape entry.
pub struct CaptureWriter {
    serializer: TapeSerializer,
    config: CaptureConfig,
}

impl CaptureWriter {
    /// Create a writer emitting entries through `serializer`.
    #[must_use]
    pub fn new(serializer: TapeSerializer, config: CaptureConfig) -> Self {
        Self { serializer, config }
    }

    /// Record one exchange.
    ///
    /// Returns `Ok(false)` without writing anything when the request method
    /// is in the skip set, `Ok(true)` after exactly one append otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if a body cannot be classified or the entry cannot be
    /// written. Nothing is appended in that case.
    pub fn write(
        &self,
        request: &InboundRequest<'_>,
        response: &UpstreamResponse<'_>,
    ) -> Result<bool, CaptureError> {
        if self.config.skips(request.method) {
            return Ok(false);
        }
        let exchange = self.exchange(request, response)?;
        self.serializer.write(std::slice::from_ref(&exchange))?;
        Ok(true)
    }

    fn exchange(
        &self,
        request: &InboundRequest<'_>,
        response: &UpstreamResponse<'_>,
    ) -> Result<Exchange, ClassifyError> {
        let (text, json) = classify(request.body, request.headers)?.into_text_and_json();
        let request_record = RequestRecord {
            path: request.path.to_string(),
            method: request.method.to_string(),
            headers: self.recorded_headers(request.headers),
            text,
            json,
            form: None,
            files: None,
        };

        let (text, json) = classify(response.body, response.headers)?.into_text_and_json();
        let response_record = ResponseRecord {
            code: response.code,
            headers: self.recorded_headers(response.headers),
            text,
            json,
        };

        Ok(Exchange { request: request_record, response: response_record })
    }

    fn recorded_headers(&self, headers: &Headers) -> Option<Headers> {
        (!self.config.omit_headers).then(|| headers.clone())
    }
}

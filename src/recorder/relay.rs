//! Forwards inbound requests upstream, relays the reply and records the exchange.

use std::sync::Arc;

use axum::body::{to_bytes, Body, Bytes};
use axum::extract::{Request, State};
use axum::http::header::{ACCEPT_ENCODING, ACCESS_CONTROL_ALLOW_ORIGIN, HOST, TRANSFER_ENCODING};
use axum::http::uri::PathAndQuery;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;
use tracing::{debug, warn};

use super::error::RelayError;
use crate::tape::format::canonical_header_name;
use crate::tape::{CaptureWriter, Headers, InboundRequest, UpstreamResponse};

/// State shared by every relayed request. Read-only apart from the sink.
pub(crate) struct RelayState {
    client: reqwest::Client,
    target: String,
    capture: CaptureWriter,
}

impl RelayState {
    pub(crate) fn new(client: reqwest::Client, target: &str, capture: CaptureWriter) -> Self {
        Self { client, target: target.trim_end_matches('/').to_string(), capture }
    }

    /// Blocking: the sink write happens on the calling thread.
    fn record(&self, request: &InboundRequest<'_>, response: &UpstreamResponse<'_>) {
        match self.capture.write(request, response) {
            Ok(true) => debug!(method = request.method, path = request.path, "recorded exchange"),
            Ok(false) => debug!(method = request.method, path = request.path, "method skipped"),
            Err(err) => warn!(
                method = request.method,
                path = request.path,
                error = %err,
                "failed to record exchange"
            ),
        }
    }
}

/// Catch-all handler: every path and method ends up here.
pub(crate) async fn relay(
    State(state): State<Arc<RelayState>>,
    request: Request,
) -> Result<Response, RelayError> {
    let (parts, body) = request.into_parts();
    let body = to_bytes(body, usize::MAX).await.map_err(RelayError::ReadBody)?;
    let path = parts.uri.path_and_query().map_or("/", PathAndQuery::as_str);
    let url = format!("{}{path}", state.target);
    debug!(method = %parts.method, %url, "forwarding request");

    let mut outbound =
        state.client.request(parts.method.clone(), &url).headers(forwarded_headers(&parts.headers));
    if !body.is_empty() {
        outbound = outbound.body(body.clone());
    }
    // Any HTTP status is a response to relay; only transport failures are errors.
    let upstream = match outbound.send().await {
        Ok(upstream) => upstream,
        Err(source) => return Err(RelayError::UpstreamUnreachable { url, source }),
    };
    let status = upstream.status();
    let upstream_headers = upstream.headers().clone();
    let upstream_body = match upstream.bytes().await {
        Ok(bytes) => bytes,
        Err(source) => return Err(RelayError::UpstreamBody { url, source }),
    };

    let method = parts.method.to_string();
    let path = path.to_owned();
    let request_headers = tape_headers(&parts.headers);
    let response_headers = tape_headers(&upstream_headers);
    let response_body = upstream_body.clone();
    // Sinks do blocking I/O; keep it off the worker serving other requests.
    let recorded = tokio::task::spawn_blocking(move || {
        state.record(
            &InboundRequest { path: &path, method: &method, headers: &request_headers, body: &body },
            &UpstreamResponse {
                code: status.as_u16(),
                headers: &response_headers,
                body: &response_body,
            },
        );
    })
    .await;
    if let Err(err) = recorded {
        warn!(%url, error = %err, "recording task failed");
    }

    Ok(reply(status, &upstream_headers, upstream_body))
}

/// Inbound headers minus `Host`, which the client derives from the target,
/// and `Accept-Encoding`, which the client negotiates itself so compressed
/// replies arrive decoded.
fn forwarded_headers(headers: &HeaderMap) -> HeaderMap {
    let mut forwarded = headers.clone();
    forwarded.remove(HOST);
    forwarded.remove(ACCEPT_ENCODING);
    forwarded
}

/// Build the caller's reply from the upstream response.
///
/// `Transfer-Encoding` is dropped so framing follows the buffered body, and
/// the CORS header is set last so it always wins.
fn reply(status: StatusCode, headers: &HeaderMap, body: Bytes) -> Response {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    let reply_headers = response.headers_mut();
    for (name, value) in headers {
        if name != TRANSFER_ENCODING {
            reply_headers.append(name.clone(), value.clone());
        }
    }
    reply_headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    response
}

/// Flatten a header map for the tape: canonical names, repeated values
/// joined with `", "`.
fn tape_headers(headers: &HeaderMap) -> Headers {
    let mut flat = Headers::new();
    for name in headers.keys() {
        let value = headers
            .get_all(name)
            .iter()
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
            .collect::<Vec<_>>()
            .join(", ");
        flat.insert(canonical_header_name(name.as_str()), value);
    }
    flat
}

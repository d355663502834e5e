//! Recorder errors.

use std::net::SocketAddr;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

/// Failure to relay a single request. No tape entry is written.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The inbound request body could not be read.
    #[error("failed to read request body: {0}")]
    ReadBody(#[source] axum::Error),
    /// The upstream could not be reached at all.
    #[error("upstream {url} unreachable: {source}")]
    UpstreamUnreachable {
        /// URL the request was forwarded to.
        url: String,
        /// Transport failure reported by the client.
        #[source]
        source: reqwest::Error,
    },
    /// The upstream answered but its body could not be read.
    #[error("failed to read upstream body from {url}: {source}")]
    UpstreamBody {
        /// URL the request was forwarded to.
        url: String,
        /// Transport failure reported by the client.
        #[source]
        source: reqwest::Error,
    },
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        error!(error = %self, "relay failed");
        let status = match self {
            Self::ReadBody(_) => StatusCode::BAD_REQUEST,
            Self::UpstreamUnreachable { .. } | Self::UpstreamBody { .. } => StatusCode::BAD_GATEWAY,
        };
        (status, self.to_string()).into_response()
    }
}

/// Failure to start or stop a recorder.
#[derive(Debug, thiserror::Error)]
pub enum RecorderError {
    /// The upstream HTTP client could not be built.
    #[error("failed to build upstream client: {0}")]
    Client(#[source] reqwest::Error),
    /// The listening socket could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address that was requested.
        addr: SocketAddr,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The server stopped with an I/O error.
    #[error("recorder server failed: {0}")]
    Serve(#[source] std::io::Error),
    /// The server task panicked or was cancelled.
    #[error("recorder task failed: {0}")]
    Task(#[source] tokio::task::JoinError),
}

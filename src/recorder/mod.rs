//! Recording proxy: relays every request to an upstream and tapes the exchange.

pub mod error;
mod relay;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use error::{RecorderError, RelayError};
use relay::{relay, RelayState};

use crate::tape::{CaptureConfig, CaptureWriter, TapeSerializer, TextSink};

/// Settings for one recorder instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecorderConfig {
    /// Interface to listen on.
    pub bind_addr: IpAddr,
    /// Port to listen on; `0` picks an ephemeral port.
    pub port: u16,
    /// Upstream base URL including the scheme, e.g. `http://api.test`.
    pub target: String,
    /// Leave headers out of recorded entries.
    pub omit_headers: bool,
    /// Methods whose exchanges are relayed but not recorded.
    pub skip_methods: Vec<String>,
}

impl RecorderConfig {
    /// Config proxying to `target` on all interfaces, ephemeral port.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 0,
            target: target.into(),
            omit_headers: false,
            skip_methods: Vec::new(),
        }
    }

    /// Set the listening port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the listening interface.
    #[must_use]
    pub fn with_bind_addr(mut self, bind_addr: IpAddr) -> Self {
        self.bind_addr = bind_addr;
        self
    }

    /// Enable or disable header omission.
    #[must_use]
    pub fn with_omit_headers(mut self, omit_headers: bool) -> Self {
        self.omit_headers = omit_headers;
        self
    }

    /// Set the methods excluded from recording.
    #[must_use]
    pub fn with_skip_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_methods = methods.into_iter().map(Into::into).collect();
        self
    }

    /// The capture settings derived from this config.
    #[must_use]
    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig::new(self.omit_headers, &self.skip_methods)
    }
}

/// Entry point for starting recorder instances.
pub struct Recorder;

impl Recorder {
    /// Bind the listener and start proxying in a background task.
    ///
    /// Entries are appended to `sink` as exchanges complete.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the address
    /// cannot be bound.
    pub async fn start(
        config: RecorderConfig,
        sink: Arc<dyn TextSink>,
    ) -> Result<RecorderHandle, RecorderError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(RecorderError::Client)?;
        let capture = CaptureWriter::new(TapeSerializer::new(sink), config.capture_config());
        let state = Arc::new(RelayState::new(client, &config.target, capture));

        let addr = SocketAddr::new(config.bind_addr, config.port);
        let listener =
            TcpListener::bind(addr).await.map_err(|source| RecorderError::Bind { addr, source })?;
        let local_addr =
            listener.local_addr().map_err(|source| RecorderError::Bind { addr, source })?;

        let app = Router::new().fallback(relay).with_state(state).layer(TraceLayer::new_for_http());
        let (shutdown, signal) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = signal.await;
                })
                .await
        });

        info!(%local_addr, target = %config.target, "recorder listening");
        Ok(RecorderHandle { local_addr, shutdown: Some(shutdown), task: Some(task) })
    }
}

/// A running recorder. Dropping the handle signals shutdown without waiting.
pub struct RecorderHandle {
    local_addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<std::io::Result<()>>>,
}

impl RecorderHandle {
    /// Address the listener is bound to.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// URL callers should send requests to.
    #[must_use]
    pub fn base_url(&self) -> String {
        let ip = match self.local_addr.ip() {
            IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
            ip => ip,
        };
        format!("http://{}", SocketAddr::new(ip, self.local_addr.port()))
    }

    /// Stop accepting connections and wait for in-flight requests to finish.
    ///
    /// # Errors
    ///
    /// Returns an error if the server failed while running.
    pub async fn stop(mut self) -> Result<(), RecorderError> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            task.await.map_err(RecorderError::Task)?.map_err(RecorderError::Serve)?;
        }
        info!(local_addr = %self.local_addr, "recorder stopped");
        Ok(())
    }
}

impl Drop for RecorderHandle {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

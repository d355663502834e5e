//! `httpvcr record` command.

use std::sync::Arc;

use tracing::info;

use crate::cli::RecordArgs;
use crate::recorder::{Recorder, RecorderConfig};
use crate::tape::{TextSink, WriterSink};

/// Execute the `record` command: proxy until interrupted with Ctrl-C.
///
/// # Errors
///
/// Returns an error string if the output file cannot be opened, the proxy
/// cannot start, or it fails while running.
pub fn run(args: &RecordArgs) -> Result<(), String> {
    let sink: Arc<dyn TextSink> = match &args.output {
        Some(path) => Arc::new(
            WriterSink::append_to(path)
                .map_err(|e| format!("Failed to open tape file {}: {e}", path.display()))?,
        ),
        None => Arc::new(WriterSink::stdout()),
    };
    let config = RecorderConfig::new(&args.target)
        .with_port(args.port)
        .with_omit_headers(args.omit_headers)
        .with_skip_methods(&args.skip_methods);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to start runtime: {e}"))?;

    runtime.block_on(async move {
        let handle = Recorder::start(config, sink).await.map_err(|e| e.to_string())?;
        tokio::signal::ctrl_c().await.map_err(|e| format!("Failed to wait for Ctrl-C: {e}"))?;
        info!("interrupted, shutting down");
        handle.stop().await.map_err(|e| e.to_string())
    })
}

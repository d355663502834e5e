//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI parser for `httpvcr`.
#[derive(Debug, Parser)]
#[command(name = "httpvcr", version, about = "Record HTTP traffic to tapes and inspect them")]
pub struct Cli {
    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a recording proxy in front of an upstream server.
    Record(RecordArgs),
    /// Print a one-line summary of every exchange in a tape.
    Inspect {
        /// Tape file to read.
        tape: PathBuf,
    },
}

/// Arguments for `httpvcr record`.
#[derive(Debug, Args)]
pub struct RecordArgs {
    /// Port the proxy listens on.
    pub port: u16,
    /// Upstream base URL including the scheme, e.g. `http://localhost:8080`.
    #[arg(env = "HTTPVCR_TARGET")]
    pub target: String,
    /// Leave headers out of recorded exchanges.
    #[arg(long)]
    pub omit_headers: bool,
    /// Relay but do not record requests with this method. Repeatable.
    #[arg(long = "skip-method", value_name = "METHOD")]
    pub skip_methods: Vec<String>,
    /// Append the tape to this file instead of standard output.
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

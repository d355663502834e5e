//! Record/replay fixtures for HTTP integration tests.
//!
//! The [`recorder`] runs a forwarding proxy that appends every exchange to a
//! YAML tape; the [`player`] installs a tape's exchanges as rules on a mock
//! server.

pub mod cli;
pub mod commands;
pub mod player;
pub mod ports;
pub mod recorder;
pub mod tape;

use clap::Parser;

/// Run the CLI with the provided arguments.
///
/// # Errors
///
/// Returns an error string when argument parsing fails or command execution fails.
pub fn run<I, T>(args: I) -> Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = match cli::Cli::try_parse_from(args) {
        Ok(cli) => cli,
        // --help and --version are not failures.
        Err(err) if !err.use_stderr() => return err.print().map_err(|e| e.to_string()),
        Err(err) => return Err(err.to_string()),
    };
    commands::dispatch(&cli.command)
}

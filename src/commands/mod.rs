//! Command dispatch and handlers.

pub mod inspect;
pub mod record;

use crate::cli::Command;

/// Dispatch a parsed command to its handler.
///
/// # Errors
///
/// Returns an error string if the selected command handler fails.
pub fn dispatch(command: &Command) -> Result<(), String> {
    match command {
        Command::Record(args) => record::run(args),
        Command::Inspect { tape } => inspect::run(tape),
    }
}

//! `httpvcr inspect` command.

use std::path::Path;

use crate::tape::{read_tape, Exchange};

/// Execute the `inspect` command.
///
/// # Errors
///
/// Returns an error string if the tape cannot be read or parsed.
pub fn run(path: &Path) -> Result<(), String> {
    let tape = read_tape(path).map_err(|e| e.to_string())?;
    if tape.is_empty() {
        println!("No exchanges recorded in {}", path.display());
        return Ok(());
    }
    for line in summarize(&tape) {
        println!("{line}");
    }
    Ok(())
}

fn summarize(tape: &[Exchange]) -> Vec<String> {
    tape.iter()
        .enumerate()
        .map(|(i, exchange)| {
            format!(
                "{i:>3}  {} {} -> {}",
                exchange.request.method, exchange.request.path, exchange.response.code
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tape::{RequestRecord, ResponseRecord};

    #[test]
    fn summarize_lists_exchanges_in_order() {
        let tape = vec![
            Exchange {
                request: RequestRecord {
                    path: "/widgets".into(),
                    method: "GET".into(),
                    ..RequestRecord::default()
                },
                response: ResponseRecord { code: 200, ..ResponseRecord::default() },
            },
            Exchange {
                request: RequestRecord {
                    path: "/users".into(),
                    method: "POST".into(),
                    ..RequestRecord::default()
                },
                response: ResponseRecord { code: 201, ..ResponseRecord::default() },
            },
        ];
        assert_eq!(summarize(&tape), ["  0  GET /widgets -> 200", "  1  POST /users -> 201"]);
    }

    #[test]
    fn run_fails_on_missing_tape() {
        let path = std::env::temp_dir().join("httpvcr_inspect_missing.yaml");
        assert!(run(&path).is_err());
    }
}

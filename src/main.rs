//! Main entry point for the `pxp` CLI.

use prompt_expander::cli;
use std::process::ExitCode;

fn main() -> ExitCode {
    match cli::run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            if !e.is_user_error() {
                eprintln!("  Run with --verbose for details.");
            }
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1))
        },
    }
}

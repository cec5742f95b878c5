//! Binary entrypoint for the `tracelink` CLI.

use std::process::ExitCode;

fn main() -> ExitCode {
    // Best-effort .env loading for GITHUB_TOKEN / TRACELINK_WEBHOOK.
    let _ = dotenvy::dotenv();
    match tracelink::run(std::env::args()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

//! `nsm-watch` binary.

use std::process::ExitCode;

use nsm_watch::{SystemConfigLoader, SystemShutdownSignal};

#[expect(
    clippy::print_stderr,
    reason = "telemetry may not be installed when startup fails"
)]
fn main() -> ExitCode {
    match nsm_watch::run(&SystemConfigLoader, &SystemShutdownSignal) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("nsm-watch: {error}");
            ExitCode::FAILURE
        }
    }
}

//! subseek - Fetch missing subtitles by content fingerprint
//!
//! Entry point for the subseek CLI application.

use clap::Parser;
use subseek::{cli::Cli, error::ExitCode};

fn main() {
    let cli = Cli::parse();

    match subseek::run_app(cli) {
        Ok(code) => std::process::exit(code.as_i32()),
        Err(err) => {
            let exit_code = ExitCode::GeneralError;
            eprintln!("[{}] Error: {:#}", exit_code.code_prefix(), err);
            std::process::exit(exit_code.as_i32());
        }
    }
}

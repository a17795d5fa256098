//! Guardian - policy gatekeeper for autonomous coding-agent tool calls
//!
//! Thin binary entry point that delegates to the CLI dispatcher.

use clap::Parser;
use guardian::cli::Cli;

fn main() -> std::process::ExitCode {
    guardian::logging::init();

    let cli = Cli::parse();
    match guardian::cli::run(cli) {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:?}");
            std::process::ExitCode::FAILURE
        }
    }
}

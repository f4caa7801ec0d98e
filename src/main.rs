//! # gitcache CLI
//!
//! This is the binary entry point for the `gitcache` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Executing the appropriate command based on the parsed arguments.
//! - Translating the crate's error taxonomy into the process exit codes of
//!   spec section 6, since the underlying `gitcache::error::Error` carries
//!   more structure than a generic `anyhow` failure.
//!
//! The core application logic is defined in the `lib.rs` library crate, so
//! the binary stays a thin wrapper around the reusable library functionality.

mod cli;
mod commands;

use clap::Parser;

fn main() {
    let cli = cli::Cli::parse();
    match cli.execute() {
        Ok(()) => {}
        Err(e) => {
            let exit_code = e
                .downcast_ref::<gitcache::error::Error>()
                .map(|err| err.exit_code())
                .unwrap_or(gitcache::exit_codes::GENERIC_FAILURE);
            eprintln!("error: {e:#}");
            std::process::exit(exit_code);
        }
    }
}

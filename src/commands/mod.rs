//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the
//! `gitcache` command-line tool. Each subcommand is defined in its own file
//! to keep the logic separated and maintainable.
//!
//! ## Structure
//!
//! Each command module typically contains:
//! - An `Args` struct that defines the command-specific arguments and
//!   options, derived using `clap`.
//! - An `execute` function that takes the parsed `Config` and `Args` and
//!   performs the command's logic, delegating the actual work to
//!   `gitcache::orchestrator`.

pub mod clean;
pub mod clone;
pub mod completions;
pub mod list;
pub mod status;
pub mod sync;

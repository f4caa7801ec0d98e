//! # CLI Argument Parsing and Command Dispatch
//!
//! This module defines the command-line interface for the `gitcache` tool
//! using the `clap` library. It is responsible for:
//!
//! - Defining the top-level CLI structure, including global arguments like
//!   `--color` and `--log-level`.
//! - Defining the available subcommands (`clone`, `status`, `list`, `sync`,
//!   `clean`, `completions`).
//! - Parsing the command-line arguments provided by the user.
//! - Dispatching to the appropriate command implementation based on the
//!   parsed arguments.
//!
//! Each subcommand is implemented in its own module under `src/commands/` to
//! keep the code organized and maintainable.

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use log::LevelFilter;

use crate::commands;

/// gitcache - A caching front-end for repository cloning
#[derive(Parser, Debug)]
#[command(name = "gitcache")]
#[command(
    version,
    about,
    long_about = "gitcache - A caching front-end for repository cloning"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    log_level: String,

    /// Increase output verbosity (can be repeated: --verbose --verbose)
    ///
    /// Overrides --log-level when specified:
    ///   --verbose       = debug level
    ///   --verbose -v    = trace level (combines with command -v flags)
    #[arg(long, global = true, action = ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Suppress output except errors
    ///
    /// Overrides --log-level to show only error messages.
    /// Use for scripting or quiet operation.
    #[arg(long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Override the bare-cache root directory (also settable via GIT_CACHE_ROOT)
    #[arg(long, global = true, value_name = "DIR")]
    cache_root: Option<std::path::PathBuf>,

    /// Override the checkout root directory (also settable via GIT_CHECKOUT_ROOT)
    #[arg(long, global = true, value_name = "DIR")]
    checkout_root: Option<std::path::PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Clone a repository through the cache, building read-only and
    /// modifiable checkouts backed by a shared bare object store
    Clone(commands::clone::CloneArgs),

    /// Show the cached state of a single repository identity
    Status(commands::status::StatusArgs),

    /// List every repository currently in the cache
    List(commands::list::ListArgs),

    /// Refresh every cached repository's objects from its origin
    Sync(commands::sync::SyncArgs),

    /// Remove cached repositories and their checkouts
    Clean(commands::clean::CleanArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the parsed CLI command
    pub fn execute(self) -> Result<()> {
        self.init_logger()?;

        let config = gitcache::config::Config::from_env(
            self.cache_root.clone(),
            self.checkout_root.clone(),
        );

        match self.command {
            Commands::Clone(args) => commands::clone::execute(config, args),
            Commands::Status(args) => commands::status::execute(config, args),
            Commands::List(args) => commands::list::execute(config, args),
            Commands::Sync(args) => commands::sync::execute(config, args),
            Commands::Clean(args) => commands::clean::execute(config, args),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }

    /// Initialize the logger with the specified log level and color settings
    fn init_logger(&self) -> Result<()> {
        let log_level = self.parse_log_level()?;
        let use_color = self.should_use_color();

        env_logger::Builder::from_default_env()
            .filter_level(log_level)
            .write_style(if use_color {
                env_logger::WriteStyle::Auto
            } else {
                env_logger::WriteStyle::Never
            })
            .format_timestamp(None)
            .format_module_path(false)
            .format_target(false)
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

        Ok(())
    }

    /// Parse the log level, considering --verbose and --quiet flags
    ///
    /// Priority order:
    /// 1. --quiet (always sets to Error level)
    /// 2. --verbose (sets Debug for 1, Trace for 2+)
    /// 3. --log-level (explicit level)
    fn parse_log_level(&self) -> Result<LevelFilter> {
        if self.quiet {
            return Ok(LevelFilter::Error);
        }

        if self.verbose > 0 {
            return Ok(match self.verbose {
                1 => LevelFilter::Debug,
                _ => LevelFilter::Trace,
            });
        }

        match self.log_level.to_lowercase().as_str() {
            "error" => Ok(LevelFilter::Error),
            "warn" => Ok(LevelFilter::Warn),
            "info" => Ok(LevelFilter::Info),
            "debug" => Ok(LevelFilter::Debug),
            "trace" => Ok(LevelFilter::Trace),
            "off" => Ok(LevelFilter::Off),
            _ => Err(anyhow::anyhow!(
                "Invalid log level: '{}'. Valid options are: error, warn, info, debug, trace, off",
                self.log_level
            )),
        }
    }

    /// Determine whether to use color output based on the color setting
    fn should_use_color(&self) -> bool {
        match self.color.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            "auto" => console::Term::stdout().features().colors_supported(),
            _ => {
                eprintln!(
                    "Warning: Invalid color option '{}', using 'auto'. Valid options are: always, never, auto",
                    self.color
                );
                console::Term::stdout().features().colors_supported()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_cli(command: Commands) -> Cli {
        Cli {
            command,
            color: "auto".to_string(),
            log_level: "info".to_string(),
            verbose: 0,
            quiet: false,
            cache_root: None,
            checkout_root: None,
        }
    }

    fn status_command() -> Commands {
        Commands::Status(commands::status::StatusArgs {
            url: "https://github.com/octocat/Hello-World".to_string(),
            json: false,
        })
    }

    #[test]
    fn test_parse_log_level_with_verbose() {
        let mut cli = base_cli(status_command());
        cli.verbose = 1;
        assert_eq!(cli.parse_log_level().unwrap(), LevelFilter::Debug);
    }

    #[test]
    fn test_parse_log_level_with_verbose_twice() {
        let mut cli = base_cli(status_command());
        cli.verbose = 2;
        assert_eq!(cli.parse_log_level().unwrap(), LevelFilter::Trace);
    }

    #[test]
    fn test_parse_log_level_with_quiet() {
        let mut cli = base_cli(status_command());
        cli.log_level = "debug".to_string();
        cli.quiet = true;
        assert_eq!(cli.parse_log_level().unwrap(), LevelFilter::Error);
    }

    #[test]
    fn test_parse_log_level_default() {
        let mut cli = base_cli(status_command());
        cli.log_level = "warn".to_string();
        assert_eq!(cli.parse_log_level().unwrap(), LevelFilter::Warn);
    }

    #[test]
    fn test_parse_log_level_rejects_unknown() {
        let mut cli = base_cli(status_command());
        cli.log_level = "bogus".to_string();
        assert!(cli.parse_log_level().is_err());
    }

    #[test]
    fn test_execute_status_command_on_empty_cache() {
        let cli = base_cli(status_command());
        let result = cli.execute();
        assert!(result.is_ok());
    }
}

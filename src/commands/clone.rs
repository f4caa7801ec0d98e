//! # Clone Command Implementation
//!
//! Parses the `clone` subcommand's flags into `orchestrator::CloneOptions`
//! and runs the full pipeline of spec section 2, reporting the resulting
//! `RepoRecord` to the terminal.

use anyhow::Result;
use clap::Args;
use log::info;

use gitcache::config::Config;
use gitcache::orchestrator::{self, CloneOptions, RequestContext};
use gitcache::record::Strategy;
use gitcache::runner::DefaultGitOperations;

/// Clone a repository through the cache
#[derive(Args, Debug)]
pub struct CloneArgs {
    /// Repository URL (HTTPS, SSH, or scp-like)
    pub url: String,

    /// Checkout strategy
    #[arg(long, value_name = "STRATEGY", default_value = "full")]
    pub strategy: String,

    /// History depth, only meaningful with --strategy shallow
    #[arg(long, value_name = "N")]
    pub depth: Option<u32>,

    /// Force removal of a non-empty existing checkout directory
    #[arg(long)]
    pub force: bool,

    /// Initialize and update submodules after building the modifiable checkout
    #[arg(long)]
    pub recursive: bool,

    /// Destination namespace (organization) for the created fork
    #[arg(long, value_name = "NAME")]
    pub org: Option<String>,

    /// Make the fork private after creation
    #[arg(long)]
    pub private: bool,

    /// Skip fork reconciliation even when the host is a known provider
    #[arg(long)]
    pub no_fork: bool,
}

pub fn execute(config: Config, args: CloneArgs) -> Result<()> {
    let strategy = Strategy::parse(&args.strategy, args.depth).map_err(anyhow::Error::from)?;

    let ctx = RequestContext::new(config);
    let git = DefaultGitOperations::new();
    let opts = CloneOptions {
        url: args.url.clone(),
        strategy,
        force: args.force,
        recursive: args.recursive,
        org: args.org,
        private: args.private,
        fork: !args.no_fork,
    };

    let record = orchestrator::clone(&ctx, &git, &opts)?;

    info!(
        "cloned {}/{} (strategy={})",
        record.identity.owner, record.identity.name, record.strategy
    );
    println!("cache:      {}", record.cache_path.display());
    println!("readonly:   {}", record.readonly_path.display());
    println!("modifiable: {}", record.modifiable_path.display());
    if let Some(fork_url) = &record.fork_url {
        println!("fork:       {fork_url}");
    }

    Ok(())
}

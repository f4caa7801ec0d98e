//! # Sync Command Implementation
//!
//! Fans out a full-ref fetch across every cached identity on a bounded
//! worker pool, skipping any whose lock is already held (spec sections 4.9
//! and 4.10).

use anyhow::Result;
use clap::Args;
use log::{error, info, warn};

use gitcache::config::Config;
use gitcache::orchestrator::{self, RequestContext};
use gitcache::runner::DefaultGitOperations;

/// Refresh every cached repository's objects from its origin
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Maximum number of repositories to refresh concurrently
    #[arg(long, value_name = "N", default_value_t = 4)]
    pub jobs: usize,
}

pub fn execute(config: Config, args: SyncArgs) -> Result<()> {
    let ctx = RequestContext::new(config);
    let git = DefaultGitOperations::new();

    let results = orchestrator::sync(&ctx, &git, args.jobs)?;

    let mut failed = 0;
    for (path, result) in &results {
        match result {
            Ok(()) => info!("synced {}", path.display()),
            Err(e) => {
                failed += 1;
                error!("failed to sync {}: {e}", path.display());
            }
        }
    }

    println!("synced {} repositories ({} failed)", results.len() - failed, failed);
    if failed > 0 {
        warn!("{failed} repositories failed to sync; see log for details");
    }

    Ok(())
}

//! # Clean Command Implementation
//!
//! Removes cached repositories whose checkouts are absent (spec section
//! 4.10), verifying under lock that no checkout still references the
//! target cache via alternates (invariant P6).

use anyhow::Result;
use clap::Args;
use log::info;

use gitcache::config::Config;
use gitcache::orchestrator::{self, RequestContext};

/// Remove cached repositories and their checkouts
#[derive(Args, Debug)]
pub struct CleanArgs {
    /// Restrict removal to the identity whose owner or name matches
    #[arg(long, value_name = "OWNER_OR_NAME")]
    pub filter: Option<String>,

    /// Remove a cache even if its checkouts are still present
    #[arg(long)]
    pub force: bool,
}

pub fn execute(config: Config, args: CleanArgs) -> Result<()> {
    let ctx = RequestContext::new(config);
    let removed = orchestrator::clean(&ctx, args.filter.as_deref(), args.force)?;

    if removed.is_empty() {
        println!("nothing to clean");
        return Ok(());
    }

    for path in &removed {
        info!("removed {}", path.display());
        println!("removed {}", path.display());
    }

    Ok(())
}

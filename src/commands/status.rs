//! # Status Command Implementation
//!
//! Reports the cached state of a single repository identity without taking
//! any lock (spec section 4.9).

use anyhow::Result;
use clap::Args;

use gitcache::config::Config;
use gitcache::orchestrator::{self, RequestContext};

/// Show the cached state of a single repository identity
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Repository URL (HTTPS, SSH, or scp-like)
    pub url: String,

    /// Emit machine-readable JSON instead of a text summary
    #[arg(long)]
    pub json: bool,
}

pub fn execute(config: Config, args: StatusArgs) -> Result<()> {
    let ctx = RequestContext::new(config);
    let record = orchestrator::status(&ctx, &args.url)?;

    match record {
        None => {
            if args.json {
                println!("null");
            } else {
                println!("not cached: {}", args.url);
            }
        }
        Some(record) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&record)?);
            } else {
                println!("identity:   {}/{}/{}", record.identity.host, record.identity.owner, record.identity.name);
                println!("cache:      {}", record.cache_path.display());
                println!("readonly:   {}", record.readonly_path.display());
                println!("modifiable: {}", record.modifiable_path.display());
                match record.last_sync {
                    Some(ts) => println!("last sync:  {ts}"),
                    None => println!("last sync:  never"),
                }
                if let Some(fork_url) = &record.fork_url {
                    println!("fork:       {fork_url}");
                }
            }
        }
    }

    Ok(())
}

//! Example demonstrating how the library crate's pipeline is driven from
//! outside the CLI binary.
//!
//! Run with: cargo run --example repository_usage (after adding a matching
//! `[[example]]` entry to Cargo.toml)

use gitcache::config::Config;
use gitcache::orchestrator::{self, CloneOptions, RequestContext};
use gitcache::record::Strategy;
use gitcache::runner::DefaultGitOperations;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env(None, None);
    let ctx = RequestContext::new(config);
    let git = DefaultGitOperations::new();

    let opts = CloneOptions {
        url: "https://github.com/octocat/Hello-World.git".to_string(),
        strategy: Strategy::Blobless,
        force: false,
        recursive: false,
        org: None,
        private: false,
        fork: false,
    };

    match orchestrator::clone(&ctx, &git, &opts) {
        Ok(record) => {
            println!("cache:      {}", record.cache_path.display());
            println!("readonly:   {}", record.readonly_path.display());
            println!("modifiable: {}", record.modifiable_path.display());
        }
        Err(e) => {
            println!("clone failed: {e}");
        }
    }

    println!("\ncached repositories:");
    for entry in orchestrator::list(&ctx)? {
        println!(
            "  - {}/{}/{}",
            entry.record.identity.host, entry.record.identity.owner, entry.record.identity.name
        );
    }

    Ok(())
}

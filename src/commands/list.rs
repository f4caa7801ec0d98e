//! # List Command Implementation
//!
//! Enumerates every repository currently in the cache (spec section 4.10)
//! by delegating to `orchestrator::list`, which walks `cache_root` via the
//! Inventory module. Takes no lock.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use gitcache::config::Config;
use gitcache::orchestrator::{self, RequestContext};
use gitcache::output::{self, OutputConfig};

/// List every repository currently in the cache
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Emit machine-readable JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct ListRow {
    host: String,
    owner: String,
    name: String,
    size_bytes: u64,
    ref_count: usize,
    last_sync: Option<chrono::DateTime<chrono::Utc>>,
    readonly_present: bool,
    modifiable_present: bool,
}

pub fn execute(config: Config, args: ListArgs) -> Result<()> {
    let ctx = RequestContext::new(config);
    let entries = orchestrator::list(&ctx)?;

    if args.json {
        let rows: Vec<ListRow> = entries
            .iter()
            .map(|e| ListRow {
                host: e.record.identity.host.clone(),
                owner: e.record.identity.owner.clone(),
                name: e.record.identity.name.clone(),
                size_bytes: e.size_bytes,
                ref_count: e.ref_count,
                last_sync: e.record.last_sync,
                readonly_present: e.readonly_present,
                modifiable_present: e.modifiable_present,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("no repositories cached");
        return Ok(());
    }

    let output = OutputConfig::default();

    println!(
        "{:<14} {:<20} {:<24} {:>10} {:>6} {:<20} {:<4} {:<4}",
        "HOST", "OWNER", "NAME", "SIZE", "REFS", "LAST SYNC", "RO", "MOD"
    );
    for entry in entries {
        let last_sync = entry
            .record
            .last_sync
            .map(|ts| ts.to_rfc3339())
            .unwrap_or_else(|| "never".to_string());
        println!(
            "{:<14} {:<20} {:<24} {:>10} {:>6} {:<20} {:<4} {:<4}",
            entry.record.identity.host,
            entry.record.identity.owner,
            entry.record.identity.name,
            human_size(entry.size_bytes),
            entry.ref_count,
            last_sync,
            presence(&output, entry.readonly_present),
            presence(&output, entry.modifiable_present),
        );
    }

    Ok(())
}

fn presence(output: &OutputConfig, present: bool) -> &'static str {
    if present {
        output::emoji(output, "✓", "yes")
    } else {
        output::emoji(output, "·", "no")
    }
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes}B")
    } else {
        format!("{size:.1}{}", UNITS[unit])
    }
}

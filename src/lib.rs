//! # gitcache
//!
//! A caching front-end for repository cloning. `gitcache clone <url>`
//! replaces a direct `git clone` with a three-tier local layout backed by a
//! single shared bare object store: one bare cache per upstream identity,
//! a read-only checkout for browsing, and a modifiable checkout pre-wired
//! for a fork-based contribution workflow.
//!
//! ## Core Concepts
//!
//! The library is built around the pipeline each module implements:
//!
//! - **Identity (`identity`, `record`)**: Normalizes repository URLs across
//!   transport forms into a canonical `(host, owner, name)` triple and
//!   classifies the hosting provider.
//! - **Path Planner (`planner`)**: Derives the cache, read-only-checkout,
//!   modifiable-checkout, and lock paths for an identity.
//! - **Lock Manager (`lock`)**: Process-safe exclusive locks with
//!   stale-holder detection and bounded, jittered-backoff waiting.
//! - **Repo Runner (`runner`)**: The sole gateway to the external `git`
//!   binary, with retry-on-transient-failure and typed error classification.
//! - **Cache Engine (`cache_engine`)**: Creates or updates the bare cache
//!   atomically, quarantining corrupt caches and restoring backups on
//!   failure.
//! - **Checkout Builder (`checkout`)**: Materializes object-sharing working
//!   trees from the bare cache under a chosen strategy.
//! - **Provider Client (`provider`)**: Talks to the hosting provider's REST
//!   API for fork creation, visibility changes, and metadata lookup.
//! - **Remote Programmer (`remotes`)**: Wires the fixed remote set on a
//!   modifiable checkout.
//! - **Orchestrator (`orchestrator`)**: Sequences the pipeline for `clone`
//!   and dispatches `status`/`list`/`sync`/`clean`.
//! - **Inventory & Maintenance (`inventory`)**: Enumerates cached
//!   repositories by filesystem scan for `list`/`sync`/`clean`.
//!
//! Supporting the core: `config` (immutable per-request configuration
//! snapshot), `defaults` (named constants and default path resolution),
//! `error` (the error taxonomy and exit-code mapping), and `output`
//! (terminal color/emoji policy).
//!
//! ## Execution Flow
//!
//! `orchestrator::clone` runs: URL Parser -> Path Planner -> Lock Manager
//! (acquire) -> Cache Engine -> Provider Client (if forking) -> Checkout
//! Builder (read-only, then modifiable) -> Remote Programmer -> Lock
//! Manager (release). A failure at any stage triggers the compensation
//! defined for that stage rather than leaving a half-populated cache or
//! checkout visible under its canonical name.

pub mod cache_engine;
pub mod checkout;
pub mod config;
pub mod defaults;
pub mod error;
pub mod identity;
pub mod inventory;
pub mod lock;
pub mod orchestrator;
pub mod output;
pub mod planner;
pub mod provider;
pub mod record;
pub mod remotes;
pub mod runner;

/// Process exit codes, matched against the taxonomy in `error::Error::exit_code`.
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERIC_FAILURE: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NETWORK_FAILURE: i32 = 3;
    pub const PROVIDER_AUTH: i32 = 4;
    pub const LOCK_TIMEOUT: i32 = 5;
    pub const DISK_FULL: i32 = 6;
}

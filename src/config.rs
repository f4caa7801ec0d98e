//! # Configuration
//!
//! An immutable per-request snapshot of environment-derived configuration,
//! captured once at startup (spec sections 5 and 9, "Global configuration").
//! No ambient mutable state: every module that needs a root path or
//! credential receives it from a `Config` value passed down from the
//! Orchestrator, never re-reading the environment mid-request.

use std::path::PathBuf;

use crate::defaults;

/// Immutable configuration snapshot for one command invocation.
#[derive(Debug, Clone)]
pub struct Config {
    pub cache_root: PathBuf,
    pub checkout_root: PathBuf,
    pub fork_namespace: String,
    pub github_token: Option<String>,
    /// SSH URL of a configured local mirror, used for the `mirror-local`
    /// remote (spec section 4.8). Not part of the spec's named environment
    /// inputs, but the remote table requires it be "configured" from
    /// somewhere; `GIT_LOCAL_MIRROR_URL` is this system's source for it.
    pub local_mirror_url: Option<String>,
}

impl Config {
    /// Builds a `Config` from environment variables, applying CLI flag
    /// overrides where the caller supplied them.
    pub fn from_env(
        cache_root_override: Option<PathBuf>,
        checkout_root_override: Option<PathBuf>,
    ) -> Self {
        let cache_root = cache_root_override
            .or_else(|| std::env::var_os("GIT_CACHE_ROOT").map(PathBuf::from))
            .unwrap_or_else(defaults::default_cache_root);

        let checkout_root = checkout_root_override
            .or_else(|| std::env::var_os("GIT_CHECKOUT_ROOT").map(PathBuf::from))
            .unwrap_or_else(defaults::default_checkout_root);

        let github_token = std::env::var("GITHUB_TOKEN").ok();
        let local_mirror_url = std::env::var("GIT_LOCAL_MIRROR_URL").ok();

        Self {
            cache_root,
            checkout_root,
            fork_namespace: defaults::default_fork_namespace(),
            github_token,
            local_mirror_url,
        }
    }
}

//! Named constants and default path resolution for gitcache.
//!
//! Centralizes the numeric constants spec sections 4.3-4.7 call out by name
//! (`STALE_THRESHOLD`, `MAX_RETRIES`, `MIN_FREE_MB`, `MAX_RATELIMIT_WAIT`,
//! backoff timings) alongside default root-path resolution, so commands and
//! core modules agree on a single source of truth.

use std::path::PathBuf;
use std::time::Duration;

/// Host considered the `github` provider class (spec section 4.1).
pub const GITHUB_HOST: &str = "github.com";

/// Lock file considered stale (and its PID eligible for liveness checking)
/// after this many seconds without renewal (spec section 4.3).
pub const STALE_THRESHOLD: Duration = Duration::from_secs(300);

/// Jittered backoff floor/ceiling while waiting to acquire a lock (spec
/// section 4.3).
pub const LOCK_BACKOFF_MIN: Duration = Duration::from_millis(10);
pub const LOCK_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Default overall timeout for a single `acquire` call.
pub const LOCK_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum retry attempts for a `NETWORK_TRANSIENT` git invocation (spec
/// section 4.4).
pub const MAX_RETRIES: u32 = 3;

/// Exponential backoff start/cap for git retries (spec section 4.4).
pub const GIT_BACKOFF_START: Duration = Duration::from_secs(1);
pub const GIT_BACKOFF_MAX: Duration = Duration::from_secs(16);

/// Operations running longer than this get a progress spinner (spec section
/// 4.4).
pub const SPINNER_THRESHOLD: Duration = Duration::from_secs(2);

/// Minimum free space required on the cache filesystem before a fresh clone
/// (spec section 4.5).
pub const MIN_FREE_MB: u64 = 100;

/// Upper bound on how long the Provider Client will sleep through a rate
/// limit window before surfacing `PROVIDER_RATE_LIMIT` (spec section 4.7).
pub const MAX_RATELIMIT_WAIT: Duration = Duration::from_secs(60);

/// Per-request network timeout (spec section 5).
pub const NETWORK_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-clone overall timeout (spec section 5).
pub const CLONE_TIMEOUT: Duration = Duration::from_secs(300);

/// Name of the sidecar file recording the last successful sync (spec section
/// 6).
pub const SYNC_MARKER_FILE: &str = ".gitcache-sync";

/// Returns the default cache root directory.
///
/// Uses the platform-appropriate cache directory:
/// - Linux: `~/.cache/gitcache` (XDG Base Directory)
/// - macOS: `~/Library/Caches/gitcache`
/// - Windows: `{FOLDERID_LocalAppData}\gitcache`
///
/// Falls back to `.gitcache-cache` in the current directory if the platform
/// cache directory cannot be determined. Overridden by `GIT_CACHE_ROOT`.
pub fn default_cache_root() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".gitcache-cache"))
        .join("gitcache")
}

/// Returns the default checkout root: the current working directory.
///
/// Overridden by `GIT_CHECKOUT_ROOT`.
pub fn default_checkout_root() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Default namespace under which modifiable checkouts are nested when none
/// is supplied (falls back to the local username, else `"me"`).
pub fn default_fork_namespace() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "me".to_string())
}

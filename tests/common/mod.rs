//! Shared test utilities for gitcache's integration tests.
//!
//! Provides a `TestFixture` that isolates `GIT_CACHE_ROOT`/`GIT_CHECKOUT_ROOT`
//! into a fresh temp directory per test, and a `command()` helper that builds
//! an `assert_cmd::Command` for the `gitcache` binary pointed at it.

use std::path::{Path, PathBuf};

use assert_fs::prelude::*;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    pub use super::TestFixture;
}

/// A test fixture providing isolated cache/checkout roots under a temp
/// directory, so integration tests never touch the real `GIT_CACHE_ROOT`.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    /// Create a new test fixture with empty `cache/` and `checkout/`
    /// subdirectories under a fresh temp directory.
    pub fn new() -> Self {
        let temp_dir = assert_fs::TempDir::new().expect("failed to create temp directory");
        temp_dir
            .child("cache")
            .create_dir_all()
            .expect("failed to create cache root");
        temp_dir
            .child("checkout")
            .create_dir_all()
            .expect("failed to create checkout root");
        Self { temp_dir }
    }

    /// The fixture's root temp directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// The isolated `GIT_CACHE_ROOT` for this fixture.
    pub fn cache_root(&self) -> PathBuf {
        self.temp_dir.path().join("cache")
    }

    /// The isolated `GIT_CHECKOUT_ROOT` for this fixture.
    pub fn checkout_root(&self) -> PathBuf {
        self.temp_dir.path().join("checkout")
    }

    /// Builds a command for the `gitcache` binary with `GIT_CACHE_ROOT` and
    /// `GIT_CHECKOUT_ROOT` pointed at this fixture's isolated directories,
    /// and `GITHUB_TOKEN` cleared so provider calls are never attempted.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::Command::cargo_bin("gitcache").expect("gitcache binary not found");
        cmd.env("GIT_CACHE_ROOT", self.cache_root())
            .env("GIT_CHECKOUT_ROOT", self.checkout_root())
            .env_remove("GITHUB_TOKEN")
            .current_dir(self.path());
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_creates_isolated_roots() {
        let fixture = TestFixture::new();
        assert!(fixture.cache_root().exists());
        assert!(fixture.checkout_root().exists());
    }
}

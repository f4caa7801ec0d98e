//! End-to-end tests driving the `gitcache` binary directly, exercising the
//! CLI surface without touching the network (every scenario here either
//! fails before any git/HTTP call or observes an empty cache).

mod common;
use common::prelude::*;

#[test]
fn status_on_empty_cache_reports_not_cached() {
    let fixture = TestFixture::new();
    fixture
        .command()
        .args(["status", "https://github.com/octocat/Hello-World"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not cached"));
}

#[test]
fn status_json_on_empty_cache_prints_null() {
    let fixture = TestFixture::new();
    fixture
        .command()
        .args(["status", "https://github.com/octocat/Hello-World", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("null"));
}

#[test]
fn list_on_empty_cache_root_reports_nothing_cached() {
    let fixture = TestFixture::new();
    fixture
        .command()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("no repositories cached"));
}

#[test]
fn list_json_on_empty_cache_root_is_an_empty_array() {
    let fixture = TestFixture::new();
    fixture
        .command()
        .args(["list", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[]"));
}

#[test]
fn clean_on_empty_cache_reports_nothing_to_clean() {
    let fixture = TestFixture::new();
    fixture
        .command()
        .arg("clean")
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing to clean"));
}

#[test]
fn sync_on_empty_cache_reports_zero_synced() {
    let fixture = TestFixture::new();
    fixture
        .command()
        .arg("sync")
        .assert()
        .success()
        .stdout(predicate::str::contains("synced 0 repositories"));
}

#[test]
fn clone_with_invalid_url_exits_with_generic_failure() {
    let fixture = TestFixture::new();
    fixture
        .command()
        .args(["clone", "not a url"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("invalid repository URL"));
}

#[test]
fn clone_with_unknown_strategy_exits_with_usage_error() {
    let fixture = TestFixture::new();
    fixture
        .command()
        .args([
            "clone",
            "https://github.com/octocat/Hello-World.git",
            "--strategy",
            "bogus",
        ])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn status_with_invalid_url_exits_with_generic_failure() {
    let fixture = TestFixture::new();
    fixture
        .command()
        .args(["status", "not a url"])
        .assert()
        .failure()
        .code(1);
}

#[test]
fn completions_bash_includes_program_name() {
    let fixture = TestFixture::new();
    fixture
        .command()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("gitcache"));
}

#[test]
fn missing_subcommand_exits_with_usage_error() {
    let fixture = TestFixture::new();
    fixture.command().assert().failure().code(2);
}

#[test]
fn quiet_and_verbose_flags_conflict() {
    let fixture = TestFixture::new();
    fixture
        .command()
        .args(["--quiet", "--verbose", "list"])
        .assert()
        .failure()
        .code(2);
}

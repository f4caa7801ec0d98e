//! # Provider Client
//!
//! HTTP client for the hosting provider (GitHub): fork creation, visibility
//! change, repository metadata lookup, with idempotent handling of
//! "already forked" (spec section 4.7).

use std::thread;
use std::time::Duration;

use chrono::Utc;
use log::{debug, warn};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::defaults::{MAX_RATELIMIT_WAIT, NETWORK_TIMEOUT};
use crate::error::{Error, Result};

const USER_AGENT: &str = concat!("gitcache/", env!("CARGO_PKG_VERSION"));
const GITHUB_API_BASE: &str = "https://api.github.com";

/// Result of a `create_fork` call, distinguishing a genuinely fresh fork
/// from reconciliation against a pre-existing one (spec section 9's Open
/// Question, resolved: see DESIGN.md).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForkOutcome {
    Created { fork_url: String },
    AlreadyExists { fork_url: String },
}

#[derive(Debug, Clone)]
pub struct RepoMeta {
    pub full_name: String,
    pub private: bool,
    pub default_branch: String,
}

#[derive(Deserialize)]
struct GitHubRepoResponse {
    full_name: String,
    private: bool,
    default_branch: String,
    #[serde(default)]
    ssh_url: String,
}

#[derive(Deserialize)]
struct GitHubErrorResponse {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<GitHubErrorDetail>,
}

#[derive(Deserialize)]
struct GitHubErrorDetail {
    #[serde(default)]
    code: String,
}

/// Client for GitHub's REST API, authenticated with a bearer token that is
/// never logged.
pub struct ProviderClient {
    http: Client,
    token: Option<String>,
}

impl ProviderClient {
    pub fn new(token: Option<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(NETWORK_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { http, token })
    }

    fn authed(&self, builder: reqwest::blocking::RequestBuilder) -> reqwest::blocking::RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Creates a fork of `owner/name` into `destination_namespace` (the
    /// authenticated user's namespace when `None`). Treats a 422 carrying
    /// GitHub's `already_exists` marker as idempotent success.
    pub fn create_fork(
        &self,
        owner: &str,
        name: &str,
        destination_namespace: Option<&str>,
    ) -> Result<ForkOutcome> {
        let url = format!("{GITHUB_API_BASE}/repos/{owner}/{name}/forks");
        let mut request = self.authed(self.http.post(&url));
        if let Some(namespace) = destination_namespace {
            request = request.json(&serde_json::json!({ "organization": namespace }));
        }

        let response = self.send_with_rate_limit_handling(request)?;
        let status = response.status();

        if status.is_success() {
            let body: GitHubRepoResponse = response.json()?;
            return Ok(ForkOutcome::Created {
                fork_url: body.ssh_url,
            });
        }

        if status == StatusCode::UNPROCESSABLE_ENTITY {
            let body: GitHubErrorResponse = response.json().unwrap_or(GitHubErrorResponse {
                message: String::new(),
                errors: Vec::new(),
            });
            if is_already_exists(&body) {
                let derived_name = derive_fork_name(owner, name, destination_namespace);
                let namespace = destination_namespace.unwrap_or(owner);
                let fork_url = format!("git@github.com:{namespace}/{derived_name}.git");
                return Ok(ForkOutcome::AlreadyExists { fork_url });
            }
            return Err(Error::ProviderValidation {
                owner: owner.to_string(),
                name: name.to_string(),
                message: body.message,
            });
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(Error::ProviderAuth {
                message: format!("fork request for {owner}/{name} rejected with {status}"),
            });
        }

        Err(Error::ProviderValidation {
            owner: owner.to_string(),
            name: name.to_string(),
            message: format!("unexpected status {status}"),
        })
    }

    pub fn set_visibility(&self, owner: &str, name: &str, private: bool) -> Result<()> {
        let url = format!("{GITHUB_API_BASE}/repos/{owner}/{name}");
        let request = self
            .authed(self.http.patch(&url))
            .json(&serde_json::json!({ "private": private }));
        let response = self.send_with_rate_limit_handling(request)?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            Err(Error::ProviderAuth {
                message: format!("set_visibility for {owner}/{name} rejected with {status}"),
            })
        } else {
            Err(Error::ProviderValidation {
                owner: owner.to_string(),
                name: name.to_string(),
                message: format!("unexpected status {status}"),
            })
        }
    }

    pub fn get_repo(&self, owner: &str, name: &str) -> Result<RepoMeta> {
        let url = format!("{GITHUB_API_BASE}/repos/{owner}/{name}");
        let request = self.authed(self.http.get(&url));
        let response = self.send_with_rate_limit_handling(request)?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(Error::ProviderNotFound {
                owner: owner.to_string(),
                name: name.to_string(),
            });
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(Error::ProviderAuth {
                message: format!("get_repo for {owner}/{name} rejected with {status}"),
            });
        }

        let body: GitHubRepoResponse = response.json()?;
        Ok(RepoMeta {
            full_name: body.full_name,
            private: body.private,
            default_branch: body.default_branch,
        })
    }

    /// Sends `request`, pausing through an exhausted rate-limit window if
    /// the reset is within `MAX_RATELIMIT_WAIT`, otherwise surfacing
    /// `ProviderRateLimit`.
    fn send_with_rate_limit_handling(
        &self,
        request: reqwest::blocking::RequestBuilder,
    ) -> Result<reqwest::blocking::Response> {
        let request = request
            .try_clone()
            .ok_or_else(|| Error::ProviderValidation {
                owner: String::new(),
                name: String::new(),
                message: "request body is not cloneable for retry".to_string(),
            })?;
        let response = request.send()?;

        let remaining = header_as_u64(&response, "x-ratelimit-remaining");
        let reset_epoch = header_as_u64(&response, "x-ratelimit-reset");

        if response.status() == StatusCode::FORBIDDEN && remaining == Some(0) {
            if let Some(reset) = reset_epoch {
                let now = Utc::now().timestamp() as u64;
                let wait_secs = reset.saturating_sub(now);
                if Duration::from_secs(wait_secs) <= MAX_RATELIMIT_WAIT {
                    warn!("rate limited, sleeping {wait_secs}s until reset");
                    thread::sleep(Duration::from_secs(wait_secs));
                    // The caller is responsible for retrying; we surface the
                    // response as-is to keep this function non-recursive.
                    return Err(Error::ProviderRateLimit {
                        message: format!("waited {wait_secs}s, retry the request"),
                    });
                }
                return Err(Error::ProviderRateLimit {
                    message: format!(
                        "reset in {wait_secs}s exceeds MAX_RATELIMIT_WAIT of {:?}",
                        MAX_RATELIMIT_WAIT
                    ),
                });
            }
        }

        debug!("provider response status={}", response.status());
        Ok(response)
    }
}

fn header_as_u64(response: &reqwest::blocking::Response, name: &str) -> Option<u64> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

fn is_already_exists(body: &GitHubErrorResponse) -> bool {
    body.errors.iter().any(|e| e.code == "already_exists")
}

/// The derived name used when synthesizing a fork's expected URL: `name`
/// when forking into the same namespace as `owner`, else `owner-name`
/// (spec section 4.7).
fn derive_fork_name(owner: &str, name: &str, destination_namespace: Option<&str>) -> String {
    match destination_namespace {
        Some(namespace) if namespace != owner => format!("{owner}-{name}"),
        _ => name.to_string(),
    }
}

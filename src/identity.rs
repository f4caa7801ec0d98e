//! # URL Parser & Classifier
//!
//! Normalizes repository URLs across transport forms (HTTPS, SSH, explicit
//! `ssh://`, `git+ssh://`) into a canonical `(host, owner, name)` identity
//! and classifies the host as a known provider or unknown. Pure function: no
//! I/O, no network, no filesystem access.

use crate::error::{Error, Result};
use crate::record::{ProviderClass, RepoIdentity};

/// Parses a repository URL into its canonical identity.
///
/// Accepts:
///   - HTTPS: `https://host/owner/name[.git]`
///   - SSH (scp-like): `git@host:owner/name[.git]`
///   - Explicit SSH: `ssh://user@host[:port]/owner/name[.git]`
///   - `git+ssh://` variants of the above
///
/// Strips a trailing `.git`, lowercases the host, rejects empty path
/// segments, and rejects `..` or embedded path separators inside `owner` or
/// `name`.
pub fn parse(raw_url: &str) -> Result<RepoIdentity> {
    let trimmed = raw_url.trim();
    if trimmed.is_empty() {
        return Err(invalid(raw_url, "empty URL"));
    }

    let (host, path) = if trimmed.starts_with("https://")
        || trimmed.starts_with("http://")
        || trimmed.starts_with("ssh://")
        || trimmed.starts_with("git+ssh://")
    {
        split_authority_path(raw_url, trimmed)?
    } else if let Some(at_pos) = trimmed.find('@') {
        // scp-like: git@host:owner/name[.git]
        let after_at = &trimmed[at_pos + 1..];
        let colon_pos = after_at
            .find(':')
            .ok_or_else(|| invalid(raw_url, "missing ':' in scp-like SSH URL"))?;
        let host = &after_at[..colon_pos];
        let path = &after_at[colon_pos + 1..];
        (host.to_string(), path.to_string())
    } else {
        return Err(invalid(raw_url, "unrecognized URL scheme"));
    };

    if host.is_empty() {
        return Err(invalid(raw_url, "empty host"));
    }
    let host = host.to_lowercase();

    let path = path.trim_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);

    let mut segments = path.split('/').filter(|s| !s.is_empty());
    let owner = segments
        .next()
        .ok_or_else(|| invalid(raw_url, "missing owner segment"))?;
    let name = segments
        .next()
        .ok_or_else(|| invalid(raw_url, "missing name segment"))?;
    if segments.next().is_some() {
        return Err(invalid(raw_url, "too many path segments, expected owner/name"));
    }

    validate_segment(raw_url, owner)?;
    validate_segment(raw_url, name)?;

    Ok(RepoIdentity::new(host, owner, name))
}

/// Classifies a host as a known provider or unknown (spec section 4.1).
pub fn classify(host: &str) -> ProviderClass {
    if host.eq_ignore_ascii_case(crate::defaults::GITHUB_HOST) {
        ProviderClass::GitHub
    } else {
        ProviderClass::Unknown
    }
}

/// Splits any `scheme://[user@]host[:port]/owner/name[.git]` form (HTTPS,
/// `http`, explicit `ssh`, `git+ssh`) into `(host, path)` using the `url`
/// crate's general authority parsing, which handles userinfo, ports, and
/// IPv6 literals without this crate reimplementing that grammar.
fn split_authority_path(raw_url: &str, full_url: &str) -> Result<(String, String)> {
    let parsed = url::Url::parse(full_url).map_err(|e| invalid(raw_url, &e.to_string()))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| invalid(raw_url, "missing host"))?
        .to_string();
    let path = parsed.path().trim_start_matches('/').to_string();
    Ok((host, path))
}

fn validate_segment(raw_url: &str, segment: &str) -> Result<()> {
    if segment.is_empty() {
        return Err(invalid(raw_url, "empty path segment"));
    }
    if segment.contains("..") || segment.contains('/') || segment.contains('\\') {
        return Err(invalid(
            raw_url,
            "path segment contains '..' or a path separator",
        ));
    }
    Ok(())
}

fn invalid(raw_url: &str, message: &str) -> Error {
    Error::UrlInvalid {
        url: raw_url.to_string(),
        message: message.to_string(),
    }
}

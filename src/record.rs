//! # Data Model
//!
//! Canonical repository identity and the persisted record shape described in
//! spec section 3. `RepoIdentity` is the immutable `(host, owner, name)`
//! triple; `RepoRecord` is what the Orchestrator and Inventory modules build
//! up from disk state and report back to callers (including `list --json`).

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical `(host, owner, name)` triple naming a repository.
///
/// `host` is always lowercased DNS form. `owner` and `name` are
/// case-preserved as first observed, but two identities compare equal when
/// their `owner`/`name` match case-insensitively (spec section 3).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoIdentity {
    pub host: String,
    pub owner: String,
    pub name: String,
}

impl RepoIdentity {
    pub fn new(host: impl Into<String>, owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Renders the canonical HTTPS fetch URL for this identity.
    ///
    /// Used by P1 (parse idempotence) and wherever `origin`/`upstream` URLs
    /// must be recomputed from an identity rather than carried verbatim.
    pub fn canonical_url(&self) -> String {
        format!("https://{}/{}/{}.git", self.host, self.owner, self.name)
    }

    /// Case-insensitive comparison key for owner/name, host already lowercase.
    pub fn comparison_key(&self) -> (String, String, String) {
        (
            self.host.clone(),
            self.owner.to_lowercase(),
            self.name.to_lowercase(),
        )
    }
}

/// Which hosting provider (if any) a repository's host is known to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderClass {
    GitHub,
    Unknown,
}

/// The object-sharing strategy applied when materializing a checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Strategy {
    Full,
    Shallow { depth: u32 },
    Treeless,
    Blobless,
}

impl Strategy {
    /// Parses the `--strategy`/`--depth` flag pair into a `Strategy`.
    pub fn parse(name: &str, depth: Option<u32>) -> crate::error::Result<Self> {
        match name {
            "full" => Ok(Strategy::Full),
            "shallow" => Ok(Strategy::Shallow {
                depth: depth.unwrap_or(1),
            }),
            "treeless" => Ok(Strategy::Treeless),
            "blobless" => Ok(Strategy::Blobless),
            other => Err(crate::error::Error::Usage {
                message: format!(
                    "unknown strategy '{}', expected one of: full, shallow, treeless, blobless",
                    other
                ),
            }),
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Full => write!(f, "full"),
            Strategy::Shallow { depth } => write!(f, "shallow({depth})"),
            Strategy::Treeless => write!(f, "treeless"),
            Strategy::Blobless => write!(f, "blobless"),
        }
    }
}

/// Everything the system knows about one cached repository identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoRecord {
    pub identity: RepoIdentity,
    pub origin_url: String,
    pub fork_url: Option<String>,
    pub strategy: Strategy,
    pub cache_path: PathBuf,
    pub readonly_path: PathBuf,
    pub modifiable_path: PathBuf,
    pub last_sync: Option<DateTime<Utc>>,
    pub provider_class: ProviderClass,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_url() {
        let id = RepoIdentity::new("github.com", "Torvalds", "Linux");
        assert_eq!(id.canonical_url(), "https://github.com/Torvalds/Linux.git");
    }

    #[test]
    fn test_comparison_key_case_insensitive() {
        let a = RepoIdentity::new("github.com", "Torvalds", "Linux");
        let b = RepoIdentity::new("github.com", "torvalds", "linux");
        assert_eq!(a.comparison_key(), b.comparison_key());
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!(Strategy::parse("full", None).unwrap(), Strategy::Full);
        assert_eq!(
            Strategy::parse("shallow", None).unwrap(),
            Strategy::Shallow { depth: 1 }
        );
        assert_eq!(
            Strategy::parse("shallow", Some(5)).unwrap(),
            Strategy::Shallow { depth: 5 }
        );
        assert_eq!(Strategy::parse("treeless", None).unwrap(), Strategy::Treeless);
        assert_eq!(Strategy::parse("blobless", None).unwrap(), Strategy::Blobless);
        assert!(Strategy::parse("bogus", None).is_err());
    }

    #[test]
    fn test_strategy_display() {
        assert_eq!(Strategy::Full.to_string(), "full");
        assert_eq!(Strategy::Shallow { depth: 3 }.to_string(), "shallow(3)");
    }

    #[test]
    fn test_record_serializes_to_json() {
        let record = RepoRecord {
            identity: RepoIdentity::new("github.com", "octocat", "Hello-World"),
            origin_url: "https://github.com/octocat/Hello-World.git".into(),
            fork_url: None,
            strategy: Strategy::Blobless,
            cache_path: PathBuf::from("/cache/github.com/octocat/Hello-World"),
            readonly_path: PathBuf::from("/checkout/octocat/Hello-World"),
            modifiable_path: PathBuf::from("/checkout/me/octocat-Hello-World"),
            last_sync: None,
            provider_class: ProviderClass::GitHub,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("Hello-World"));
        assert!(json.contains("\"github\""));
    }
}

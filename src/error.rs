//! # Error Handling
//!
//! Centralized error taxonomy for gitcache. Uses `thiserror` to derive
//! `Display`/`std::error::Error` on a single exhaustive enum, mirrored after
//! the taxonomy of spec section 7. Every variant maps to one of the process
//! exit codes defined in `defaults::exit_code`.

use thiserror::Error;

/// Main error type for gitcache operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A repository URL could not be parsed into a canonical identity.
    #[error("invalid repository URL '{url}': {message}")]
    UrlInvalid { url: String, message: String },

    /// A file lock could not be acquired within its timeout.
    #[error("timed out acquiring lock on {path}")]
    LockTimeout { path: String },

    /// A mutex guarding shared in-process state was poisoned by a panic.
    #[error("internal lock poisoned: {context}")]
    LockPoisoned { context: String },

    /// Free space on the target filesystem fell below the configured minimum.
    #[error("insufficient disk space at {path}: {available_mb} MB available, {required_mb} MB required")]
    DiskFull {
        path: String,
        available_mb: u64,
        required_mb: u64,
    },

    /// The filesystem refused an operation due to permissions.
    #[error("permission denied: {message}")]
    PermissionDenied { message: String },

    /// A network operation failed with a transient condition, all retries exhausted.
    #[error("network operation failed after retries: {message}")]
    NetworkFailed { message: String },

    /// A bare cache failed integrity validation.
    #[error("cache at {path} is corrupt: {message}")]
    RepoCorrupt { path: String, message: String },

    /// The hosting provider rejected or required credentials.
    #[error("provider authentication failed: {message}")]
    ProviderAuth { message: String },

    /// The hosting provider's rate limit was exceeded and could not be waited out.
    #[error("provider rate limit exceeded, reset not within bound: {message}")]
    ProviderRateLimit { message: String },

    /// The provider returned a 422 that was not the "already exists" marker.
    #[error("provider rejected request for {owner}/{name}: {message}")]
    ProviderValidation {
        owner: String,
        name: String,
        message: String,
    },

    /// The provider reports the resource does not exist.
    #[error("repository {owner}/{name} not found on provider")]
    ProviderNotFound { owner: String, name: String },

    /// An external cancellation signal interrupted the operation.
    #[error("operation canceled during stage {stage}")]
    Canceled { stage: String },

    /// A git subprocess exited nonzero for a reason other than the classified cases above.
    #[error("git command failed: {command} - {stderr}")]
    GitCommand { command: String, stderr: String },

    /// A usage error in command-line arguments.
    #[error("usage error: {message}")]
    Usage { message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An HTTP client error, wrapped from `reqwest::Error`.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A URL parsing error, wrapped from `url::ParseError`.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// A JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Maps this error onto the process exit codes of spec section 6.
    ///
    /// `0` is reserved for success and is never returned here.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Usage { .. } => 2,
            Error::NetworkFailed { .. } => 3,
            Error::ProviderAuth { .. } => 4,
            Error::LockTimeout { .. } => 5,
            Error::DiskFull { .. } => 6,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_url_invalid() {
        let error = Error::UrlInvalid {
            url: "not-a-url".to_string(),
            message: "missing owner/name".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("invalid repository URL"));
        assert!(display.contains("not-a-url"));
    }

    #[test]
    fn test_error_display_lock_timeout() {
        let error = Error::LockTimeout {
            path: "/tmp/x.lock".to_string(),
        };
        assert!(format!("{}", error).contains("timed out acquiring lock"));
    }

    #[test]
    fn test_error_display_disk_full() {
        let error = Error::DiskFull {
            path: "/tmp".to_string(),
            available_mb: 10,
            required_mb: 100,
        };
        let display = format!("{}", error);
        assert!(display.contains("insufficient disk space"));
        assert!(display.contains("10"));
        assert!(display.contains("100"));
    }

    #[test]
    fn test_error_display_repo_corrupt() {
        let error = Error::RepoCorrupt {
            path: "/cache/x".to_string(),
            message: "missing objects directory".to_string(),
        };
        assert!(format!("{}", error).contains("is corrupt"));
    }

    #[test]
    fn test_error_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: Error = io_error.into();
        assert!(format!("{}", error).contains("I/O error"));
    }

    #[test]
    fn test_exit_code_mapping() {
        assert_eq!(
            Error::Usage {
                message: "x".into()
            }
            .exit_code(),
            2
        );
        assert_eq!(
            Error::NetworkFailed { message: "x".into() }.exit_code(),
            3
        );
        assert_eq!(Error::ProviderAuth { message: "x".into() }.exit_code(), 4);
        assert_eq!(
            Error::LockTimeout {
                path: "x".into()
            }
            .exit_code(),
            5
        );
        assert_eq!(
            Error::DiskFull {
                path: "x".into(),
                available_mb: 0,
                required_mb: 1
            }
            .exit_code(),
            6
        );
        assert_eq!(
            Error::GitCommand {
                command: "x".into(),
                stderr: "y".into()
            }
            .exit_code(),
            1
        );
    }

    #[test]
    fn test_error_display_provider_validation() {
        let error = Error::ProviderValidation {
            owner: "octocat".into(),
            name: "Hello-World".into(),
            message: "quota exceeded".into(),
        };
        let display = format!("{}", error);
        assert!(display.contains("octocat/Hello-World"));
        assert!(display.contains("quota exceeded"));
    }
}

//! Resolution error types.

use std::path::PathBuf;

use pinhook_config::ConfigError;
use thiserror::Error;

/// Errors raised while turning a repository declaration into runnable hooks.
///
/// Each error is fatal for the hooks of one repository only; the engine
/// still runs the hooks of every other repository.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The source is reachable but has no such revision.
    #[error("cannot resolve revision '{rev}' of {repo}: {detail}")]
    UnresolvableRevision {
        /// Repository source.
        repo: String,
        /// Pinned revision.
        rev: String,
        /// Fetch tool output.
        detail: String,
    },

    /// The resolved repository defines no hook with this id.
    #[error("hook '{id}' is not defined by {repo}@{rev}")]
    UnknownHookId {
        /// Repository source.
        repo: String,
        /// Pinned revision.
        rev: String,
        /// The declared hook id.
        id: String,
    },

    /// The source could not be reached at all.
    #[error("failed to fetch {repo}: {message}")]
    FetchFailed {
        /// Repository source.
        repo: String,
        /// What went wrong.
        message: String,
    },

    /// The fetched repository has a missing or malformed hook manifest.
    #[error("invalid hook manifest in {repo}@{rev}: {source}")]
    InvalidManifest {
        /// Repository source.
        repo: String,
        /// Pinned revision.
        rev: String,
        /// Parse error.
        #[source]
        source: ConfigError,
    },

    /// The source or revision string is not acceptable to fetch.
    #[error("invalid repository source '{repo}': {message}")]
    InvalidSource {
        /// Repository source.
        repo: String,
        /// What is wrong.
        message: String,
    },

    /// The cache directory could not be read or written.
    #[error("cache error at {}: {message}", path.display())]
    Cache {
        /// The offending path.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },
}

impl ResolveError {
    /// The repository source this error is about, if any.
    #[must_use]
    pub fn repo(&self) -> Option<&str> {
        match self {
            Self::UnresolvableRevision { repo, .. }
            | Self::UnknownHookId { repo, .. }
            | Self::FetchFailed { repo, .. }
            | Self::InvalidManifest { repo, .. }
            | Self::InvalidSource { repo, .. } => Some(repo),
            Self::Cache { .. } => None,
        }
    }

    pub(crate) fn cache(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Cache {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for resolution.
pub type ResolveResult<T> = Result<T, ResolveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_declaration() {
        let err = ResolveError::UnknownHookId {
            repo: "https://github.com/pre-commit/pre-commit-hooks".to_string(),
            rev: "v2.2.3".to_string(),
            id: "check-yml".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("check-yml"));
        assert!(msg.contains("v2.2.3"));
        assert_eq!(
            err.repo(),
            Some("https://github.com/pre-commit/pre-commit-hooks")
        );
    }

    #[test]
    fn test_cache_error_has_no_repo() {
        let err = ResolveError::cache("/tmp/x", "denied");
        assert!(err.repo().is_none());
        assert!(err.to_string().contains("/tmp/x"));
    }
}

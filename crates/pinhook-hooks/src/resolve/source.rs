//! Source and revision validation for hook repositories.
//!
//! Both strings end up on a `git` command line, so anything that could be
//! read as an option or a path escape is rejected before fetching.

use std::path::{Path, PathBuf};

use crate::error::{ResolveError, ResolveResult};

/// Longest accepted revision.
const MAX_REV_LEN: usize = 256;

/// A validated repository source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoSource {
    /// `https://`, `ssh://` or scp-style `git@host:path`.
    Remote(String),
    /// `file://` URL or absolute path to a repository on this machine.
    Path(PathBuf),
}

impl RepoSource {
    /// Parse and validate a `repo:` value.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::InvalidSource`] for unsupported schemes and
    /// unsafe characters.
    pub fn parse(repo: &str) -> ResolveResult<Self> {
        let invalid = |message: String| ResolveError::InvalidSource {
            repo: repo.to_string(),
            message,
        };

        if repo.bytes().any(|b| b.is_ascii_control() || b == b' ') {
            return Err(invalid("contains whitespace or control characters".into()));
        }
        if repo.starts_with('-') {
            return Err(invalid("must not start with '-'".into()));
        }

        if let Some(path) = repo.strip_prefix("file://") {
            return Ok(Self::Path(PathBuf::from(path)));
        }
        if Path::new(repo).is_absolute() {
            return Ok(Self::Path(PathBuf::from(repo)));
        }
        if repo.starts_with("https://") || repo.starts_with("ssh://") {
            return Ok(Self::Remote(repo.to_string()));
        }
        if let Some(rest) = repo.strip_prefix("git@") {
            let (host, path) = rest
                .split_once(':')
                .ok_or_else(|| invalid("expected git@host:path".into()))?;
            validate_ssh_host(host).map_err(invalid)?;
            if path.is_empty() || path.contains("..") {
                return Err(invalid(format!("invalid SSH path '{path}'")));
            }
            return Ok(Self::Remote(repo.to_string()));
        }

        Err(invalid(
            "only https://, ssh://, git@host:path, file:// and absolute paths are supported"
                .into(),
        ))
    }

    /// The argument handed to `git`.
    #[must_use]
    pub fn as_git_arg(&self) -> String {
        match self {
            Self::Remote(url) => url.clone(),
            Self::Path(path) => path.display().to_string(),
        }
    }
}

fn validate_ssh_host(host: &str) -> Result<(), String> {
    let valid_chars = host
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.'));
    if host.is_empty()
        || !valid_chars
        || host.starts_with('-')
        || host.starts_with('.')
        || host.ends_with('.')
    {
        return Err(format!("invalid SSH host '{host}'"));
    }
    Ok(())
}

/// Validate a pinned revision: a tag, branch or commit id.
///
/// # Errors
///
/// Returns [`ResolveError::InvalidSource`] naming the repository.
pub fn validate_rev(repo: &str, rev: &str) -> ResolveResult<()> {
    let invalid = |message: String| ResolveError::InvalidSource {
        repo: repo.to_string(),
        message,
    };

    if rev.is_empty() || rev.len() > MAX_REV_LEN {
        return Err(invalid(format!("rev must be 1-{MAX_REV_LEN} characters")));
    }
    if rev.starts_with('-') {
        return Err(invalid(format!("rev must not start with '-': '{rev}'")));
    }
    if rev.contains("..") || rev.contains("//") {
        return Err(invalid(format!("rev has invalid format: '{rev}'")));
    }
    let valid_chars = rev
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'/' | b'+'));
    if !valid_chars {
        return Err(invalid(format!("rev contains invalid characters: '{rev}'")));
    }
    if rev.starts_with('/') || rev.ends_with('/') || rev.ends_with('.') || rev.ends_with(".lock") {
        return Err(invalid(format!("rev has invalid format: '{rev}'")));
    }
    Ok(())
}

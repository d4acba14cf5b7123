//! Repository fetchers.

use std::fmt;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::source::{RepoSource, validate_rev};
use crate::error::{ResolveError, ResolveResult};

/// Default timeout for fetching one repository (5 minutes).
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(300);

/// Materializes a repository at a pinned revision.
#[async_trait]
pub trait RepoFetcher: fmt::Debug + Send + Sync {
    /// Populate `dest`, an existing empty directory, with `repo` at `rev`.
    ///
    /// # Errors
    ///
    /// [`ResolveError::FetchFailed`] when the source cannot be reached,
    /// [`ResolveError::UnresolvableRevision`] when it has no such revision.
    async fn fetch(&self, repo: &str, rev: &str, dest: &Path) -> ResolveResult<()>;
}

/// Fetches with the `git` binary.
#[derive(Debug, Clone)]
pub struct GitFetcher {
    timeout: Duration,
}

impl Default for GitFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_FETCH_TIMEOUT)
    }
}

impl GitFetcher {
    /// Create a fetcher with a per-repository timeout.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn fetch_inner(&self, repo: &str, rev: &str, dest: &Path) -> ResolveResult<()> {
        let source = RepoSource::parse(repo)?;
        validate_rev(repo, rev)?;
        let url = source.as_git_arg();

        let failed = |message: String| ResolveError::FetchFailed {
            repo: repo.to_string(),
            message,
        };

        git(dest, &["init", "-q"]).await.map_err(&failed)?;
        git(dest, &["remote", "add", "origin", &url])
            .await
            .map_err(&failed)?;

        // A shallow fetch by name works for tags, branches and full commit
        // ids on most servers. Abbreviated ids need the full history.
        if git(dest, &["fetch", "-q", "--depth=1", "origin", rev])
            .await
            .is_ok()
        {
            debug!(repo, rev, "shallow fetch succeeded");
            return git(dest, &["checkout", "-q", "--detach", "FETCH_HEAD"])
                .await
                .map_err(|detail| unresolvable(repo, rev, detail));
        }

        debug!(repo, rev, "shallow fetch failed, fetching full history");
        git(dest, &["fetch", "-q", "--tags", "origin"])
            .await
            .map_err(&failed)?;
        git(dest, &["checkout", "-q", "--detach", rev])
            .await
            .map_err(|detail| unresolvable(repo, rev, detail))
    }
}

#[async_trait]
impl RepoFetcher for GitFetcher {
    async fn fetch(&self, repo: &str, rev: &str, dest: &Path) -> ResolveResult<()> {
        tokio::time::timeout(self.timeout, self.fetch_inner(repo, rev, dest))
            .await
            .map_err(|_| ResolveError::FetchFailed {
                repo: repo.to_string(),
                message: format!("timed out after {}s", self.timeout.as_secs()),
            })?
    }
}

fn unresolvable(repo: &str, rev: &str, detail: String) -> ResolveError {
    ResolveError::UnresolvableRevision {
        repo: repo.to_string(),
        rev: rev.to_string(),
        detail,
    }
}

/// Run `git` in `dir` with a scrubbed environment. Returns stderr on failure.
async fn git(dir: &Path, args: &[&str]) -> Result<(), String> {
    let mut cmd = Command::new("git");

    // Inherited GIT_* variables and user config can run arbitrary commands
    // (core.fsmonitor, GIT_PROXY_COMMAND, ...).
    cmd.env_clear();
    for var in ["PATH", "HOME"] {
        if let Ok(value) = std::env::var(var) {
            cmd.env(var, value);
        }
    }
    cmd.env("GIT_CONFIG_NOSYSTEM", "1")
        .env("GIT_CONFIG_GLOBAL", "/dev/null")
        .env("GIT_TERMINAL_PROMPT", "0")
        .env("GIT_SSH_COMMAND", "ssh -o BatchMode=yes")
        .current_dir(dir)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = cmd
        .output()
        .await
        .map_err(|e| format!("failed to run git: {e}"))?;
    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(format!("git {} failed: {stderr}", args.first().unwrap_or(&"")))
    }
}

//! Queries against the project's git repository.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use thiserror::Error;
use tokio::process::Command;

/// A failed git query.
#[derive(Debug, Error)]
#[error("git {command} failed: {message}")]
pub struct GitError {
    /// The subcommand.
    pub command: String,
    /// stderr or the spawn error.
    pub message: String,
}

async fn git_output(dir: &Path, args: &[&str]) -> Result<Vec<u8>, GitError> {
    let command = args.first().copied().unwrap_or_default().to_string();
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| GitError {
            command: command.clone(),
            message: e.to_string(),
        })?;
    if !output.status.success() {
        return Err(GitError {
            command,
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output.stdout)
}

fn split_nul(bytes: &[u8]) -> Vec<String> {
    bytes
        .split(|b| *b == 0)
        .filter(|s| !s.is_empty())
        .map(|s| String::from_utf8_lossy(s).into_owned())
        .collect()
}

/// Top-level directory of the work tree containing `dir`.
///
/// # Errors
///
/// Returns [`GitError`] when `dir` is not inside a git work tree.
pub async fn repo_root(dir: &Path) -> Result<PathBuf, GitError> {
    let out = git_output(dir, &["rev-parse", "--show-toplevel"]).await?;
    Ok(PathBuf::from(String::from_utf8_lossy(&out).trim()))
}

/// Paths staged for commit: added, copied, modified or renamed.
///
/// # Errors
///
/// Returns [`GitError`] if git fails.
pub async fn staged_files(root: &Path) -> Result<Vec<String>, GitError> {
    let out = git_output(
        root,
        &["diff", "--cached", "--name-only", "-z", "--diff-filter=ACMR"],
    )
    .await?;
    Ok(split_nul(&out))
}

/// Every tracked path.
///
/// # Errors
///
/// Returns [`GitError`] if git fails.
pub async fn all_files(root: &Path) -> Result<Vec<String>, GitError> {
    let out = git_output(root, &["ls-files", "-z"]).await?;
    Ok(split_nul(&out))
}

/// The hooks directory, honoring `core.hooksPath`.
///
/// # Errors
///
/// Returns [`GitError`] if git fails.
pub async fn hooks_dir(root: &Path) -> Result<PathBuf, GitError> {
    let out = git_output(root, &["rev-parse", "--git-path", "hooks"]).await?;
    let path = PathBuf::from(String::from_utf8_lossy(&out).trim());
    Ok(if path.is_absolute() {
        path
    } else {
        root.join(path)
    })
}

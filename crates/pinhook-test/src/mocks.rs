//! Mock implementations for testing.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use pinhook_config::MANIFEST_FILE_NAME;
use pinhook_hooks::{RepoFetcher, ResolveError, ResolveResult};

/// Contents of a hook repository at one revision.
#[derive(Debug, Clone, Default)]
pub struct MockRepo {
    manifest: String,
    files: Vec<(String, String, bool)>,
}

impl MockRepo {
    /// A repository publishing `manifest` as its `.pre-commit-hooks.yaml`.
    #[must_use]
    pub fn new(manifest: impl Into<String>) -> Self {
        Self {
            manifest: manifest.into(),
            files: Vec::new(),
        }
    }

    /// Add a plain file.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<String>, contents: impl Into<String>) -> Self {
        self.files.push((path.into(), contents.into(), false));
        self
    }

    /// Add an executable script.
    #[must_use]
    pub fn with_script(mut self, path: impl Into<String>, contents: impl Into<String>) -> Self {
        self.files.push((path.into(), contents.into(), true));
        self
    }

    fn write_to(&self, dest: &Path) -> std::io::Result<()> {
        std::fs::write(dest.join(MANIFEST_FILE_NAME), &self.manifest)?;
        for (path, contents, executable) in &self.files {
            let target = dest.join(path);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&target, contents)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if *executable {
                    std::fs::set_permissions(&target, std::fs::Permissions::from_mode(0o755))?;
                }
            }
            #[cfg(not(unix))]
            let _ = executable;
        }
        Ok(())
    }
}

/// Mock implementation of [`RepoFetcher`] serving repositories from memory.
///
/// An unknown source fails with `FetchFailed`; a known source without the
/// requested revision fails with `UnresolvableRevision`. Every call is
/// recorded.
#[derive(Debug, Default)]
pub struct MockFetcher {
    repos: HashMap<String, HashMap<String, MockRepo>>,
    delay: Duration,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockFetcher {
    /// Create an empty fetcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `repo` at `rev`.
    #[must_use]
    pub fn with_repo(mut self, repo: &str, rev: &str, contents: MockRepo) -> Self {
        self.repos
            .entry(repo.to_string())
            .or_default()
            .insert(rev.to_string(), contents);
        self
    }

    /// Sleep this long in every fetch, to widen race windows.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Every (source, revision) fetched, in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    /// How many times (source, revision) was fetched.
    #[must_use]
    pub fn fetch_count(&self, repo: &str, rev: &str) -> usize {
        self.calls()
            .iter()
            .filter(|(r, v)| r == repo && v == rev)
            .count()
    }
}

#[async_trait]
impl RepoFetcher for MockFetcher {
    async fn fetch(&self, repo: &str, rev: &str, dest: &Path) -> ResolveResult<()> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((repo.to_string(), rev.to_string()));
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let revs = self.repos.get(repo).ok_or_else(|| ResolveError::FetchFailed {
            repo: repo.to_string(),
            message: "repository not found".to_string(),
        })?;
        let contents = revs
            .get(rev)
            .ok_or_else(|| ResolveError::UnresolvableRevision {
                repo: repo.to_string(),
                rev: rev.to_string(),
                detail: format!("no revision '{rev}'"),
            })?;
        contents
            .write_to(dest)
            .map_err(|e| ResolveError::FetchFailed {
                repo: repo.to_string(),
                message: e.to_string(),
            })
    }
}

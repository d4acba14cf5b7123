//! On-disk repository cache keyed by (source, revision).
//!
//! Layout under the cache root:
//!
//! ```text
//! .lock                      shared by fetches, exclusive for `clean`
//! locks/<key>.lock           one fetch of <key> at a time across processes
//! .staging-<uuid>/           in-progress fetches
//! repos/<key>/checkout/      the repository at its revision
//! repos/<key>/pinhook-entry.json
//! ```
//!
//! An entry directory is only ever created by renaming a complete staging
//! directory, so an entry with metadata is complete and never rewritten.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::fetch::RepoFetcher;
use crate::error::{ResolveError, ResolveResult};

/// Metadata file inside every entry.
pub const ENTRY_FILE: &str = "pinhook-entry.json";
const REPOS_DIR: &str = "repos";
const CHECKOUT_DIR: &str = "checkout";
const LOCK_FILE: &str = ".lock";
const LOCKS_DIR: &str = "locks";
const STAGING_PREFIX: &str = ".staging-";
/// Hex characters of the blake3 digest used as the entry name.
const KEY_LEN: usize = 24;

/// Metadata recorded when an entry is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Repository source.
    pub repo: String,
    /// Pinned revision.
    pub rev: String,
    /// When the fetch completed.
    pub fetched_at: DateTime<Utc>,
    /// Entry directory name.
    pub key: String,
    /// Entry directory. Filled in when read back.
    #[serde(skip)]
    pub dir: PathBuf,
}

impl CacheEntry {
    /// The checkout inside this entry.
    #[must_use]
    pub fn checkout(&self) -> PathBuf {
        self.dir.join(CHECKOUT_DIR)
    }
}

/// Cache of fetched repositories.
pub struct RepoStore {
    root: PathBuf,
    fetcher: Arc<dyn RepoFetcher>,
    inflight: Mutex<HashMap<String, Arc<OnceCell<PathBuf>>>>,
}

impl std::fmt::Debug for RepoStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepoStore")
            .field("root", &self.root)
            .field("fetcher", &self.fetcher)
            .finish_non_exhaustive()
    }
}

impl RepoStore {
    /// Create a store rooted at `root`. Nothing is created until the first
    /// fetch.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, fetcher: Arc<dyn RepoFetcher>) -> Self {
        Self {
            root: root.into(),
            fetcher,
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Cache root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Entry name for (source, revision).
    #[must_use]
    pub fn key(repo: &str, rev: &str) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(repo.as_bytes());
        hasher.update(&[0]);
        hasher.update(rev.as_bytes());
        let hex = hasher.finalize().to_hex();
        hex.as_str().chars().take(KEY_LEN).collect()
    }

    fn entry_dir(&self, key: &str) -> PathBuf {
        self.root.join(REPOS_DIR).join(key)
    }

    /// Return the checkout of `repo` at `rev`, fetching it if needed.
    ///
    /// Concurrent calls for the same pair in this process share one fetch;
    /// other processes are excluded by a file lock. A failed fetch leaves
    /// nothing behind and is retried by the next call.
    ///
    /// # Errors
    ///
    /// Returns the fetcher's error, or [`ResolveError::Cache`] when the cache
    /// directory cannot be used.
    pub async fn checkout(&self, repo: &str, rev: &str) -> ResolveResult<PathBuf> {
        let key = Self::key(repo, rev);
        let cell = {
            let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(inflight.entry(key.clone()).or_default())
        };
        cell.get_or_try_init(|| self.materialize(repo, rev, &key))
            .await
            .cloned()
    }

    async fn materialize(&self, repo: &str, rev: &str, key: &str) -> ResolveResult<PathBuf> {
        let entry_dir = self.entry_dir(key);
        if let Some(entry) = read_entry(&entry_dir) {
            debug!(repo, rev, key, "cache hit");
            return Ok(entry.checkout());
        }

        let _locks = self.lock_key(key).await?;

        // Another process may have finished while we waited for the lock.
        if let Some(entry) = read_entry(&entry_dir) {
            debug!(repo, rev, key, "cache filled by another process");
            return Ok(entry.checkout());
        }
        if entry_dir.exists() {
            warn!(path = %entry_dir.display(), "removing incomplete cache entry");
            remove_dir(&entry_dir)?;
        }

        let staging = self
            .root
            .join(format!("{STAGING_PREFIX}{}", uuid::Uuid::new_v4()));
        let staging_checkout = staging.join(CHECKOUT_DIR);
        tokio::fs::create_dir_all(&staging_checkout)
            .await
            .map_err(|e| ResolveError::cache(&staging_checkout, e.to_string()))?;

        info!(repo, rev, "fetching hook repository");
        if let Err(e) = self.fetcher.fetch(repo, rev, &staging_checkout).await {
            let _ = remove_dir(&staging);
            return Err(e);
        }

        let entry = CacheEntry {
            repo: repo.to_string(),
            rev: rev.to_string(),
            fetched_at: Utc::now(),
            key: key.to_string(),
            dir: entry_dir.clone(),
        };
        let commit = async {
            let json = serde_json::to_vec_pretty(&entry)
                .map_err(|e| ResolveError::cache(&staging, e.to_string()))?;
            tokio::fs::write(staging.join(ENTRY_FILE), json)
                .await
                .map_err(|e| ResolveError::cache(&staging, e.to_string()))?;
            if let Some(parent) = entry_dir.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| ResolveError::cache(parent, e.to_string()))?;
            }
            tokio::fs::rename(&staging, &entry_dir)
                .await
                .map_err(|e| ResolveError::cache(&entry_dir, e.to_string()))
        };

        match commit.await {
            Ok(()) => {
                debug!(repo, rev, key, "cache entry committed");
                Ok(entry.checkout())
            },
            Err(e) => {
                let _ = remove_dir(&staging);
                // Lost a rename race: the existing entry is just as good.
                read_entry(&entry_dir).map(|existing| existing.checkout()).ok_or(e)
            },
        }
    }

    /// Take the root lock shared and the entry lock exclusively. Both are
    /// released when the returned files drop.
    async fn lock_key(&self, key: &str) -> ResolveResult<(File, File)> {
        let root = self.root.clone();
        let key_lock = self.root.join(LOCKS_DIR).join(format!("{key}.lock"));
        tokio::task::spawn_blocking(move || {
            let shared = lock_file(&root.join(LOCK_FILE), LockMode::Shared)?;
            let exclusive = lock_file(&key_lock, LockMode::Exclusive)?;
            Ok((shared, exclusive))
        })
        .await
        .map_err(|e| ResolveError::cache(&self.root, format!("lock task failed: {e}")))?
    }

    /// All complete entries, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Cache`] if the cache directory cannot be read.
    pub fn list(&self) -> ResolveResult<Vec<CacheEntry>> {
        let repos = self.root.join(REPOS_DIR);
        let dir = match std::fs::read_dir(&repos) {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ResolveError::cache(&repos, e.to_string())),
        };

        let mut entries: Vec<CacheEntry> = dir
            .filter_map(Result::ok)
            .filter_map(|d| read_entry(&d.path()))
            .collect();
        entries.sort_by(|a, b| a.fetched_at.cmp(&b.fetched_at));
        Ok(entries)
    }

    /// Remove every entry and leftover staging directory. Returns the number
    /// of entries removed.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Cache`] if a directory cannot be removed.
    pub fn clean(&self) -> ResolveResult<usize> {
        if !self.root.exists() {
            return Ok(0);
        }
        let _lock = lock_file(&self.root.join(LOCK_FILE), LockMode::Exclusive)?;
        let removed = self.list()?.len();

        let repos = self.root.join(REPOS_DIR);
        if repos.exists() {
            remove_dir(&repos)?;
        }
        let leftovers = std::fs::read_dir(&self.root)
            .map_err(|e| ResolveError::cache(&self.root, e.to_string()))?;
        for dir in leftovers.filter_map(Result::ok) {
            if dir.file_name().to_string_lossy().starts_with(STAGING_PREFIX) {
                remove_dir(&dir.path())?;
            }
        }

        info!(root = %self.root.display(), removed, "cache cleaned");
        Ok(removed)
    }
}

#[derive(Debug, Clone, Copy)]
enum LockMode {
    Shared,
    Exclusive,
}

/// Open (creating if needed) and lock `path`. Blocks until the lock is held.
fn lock_file(path: &Path, mode: LockMode) -> ResolveResult<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ResolveError::cache(parent, e.to_string()))?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(path)
        .map_err(|e| ResolveError::cache(path, format!("failed to open lock file: {e}")))?;
    let locked = match mode {
        LockMode::Shared => FileExt::lock_shared(&file),
        LockMode::Exclusive => file.lock_exclusive(),
    };
    locked.map_err(|e| ResolveError::cache(path, format!("failed to acquire lock: {e}")))?;
    Ok(file)
}

fn read_entry(entry_dir: &Path) -> Option<CacheEntry> {
    let bytes = std::fs::read(entry_dir.join(ENTRY_FILE)).ok()?;
    let mut entry: CacheEntry = serde_json::from_slice(&bytes).ok()?;
    entry.dir = entry_dir.to_path_buf();
    Some(entry)
}

fn remove_dir(path: &Path) -> ResolveResult<()> {
    std::fs::remove_dir_all(path).map_err(|e| ResolveError::cache(path, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Debug, Default)]
    struct CountingFetcher {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl RepoFetcher for CountingFetcher {
        async fn fetch(&self, repo: &str, rev: &str, dest: &Path) -> ResolveResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            if self.fail {
                return Err(ResolveError::FetchFailed {
                    repo: repo.to_string(),
                    message: "unreachable".to_string(),
                });
            }
            std::fs::write(dest.join("REV"), rev).unwrap();
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_second_checkout_is_cached() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(CountingFetcher::default());
        let store = RepoStore::new(dir.path(), fetcher.clone());

        let a = store.checkout("https://x/hooks", "v1").await.unwrap();
        let b = store.checkout("https://x/hooks", "v1").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(std::fs::read_to_string(a.join("REV")).unwrap(), "v1");
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);

        // A fresh store over the same root reads the entry from disk.
        let other = Arc::new(CountingFetcher::default());
        let store2 = RepoStore::new(dir.path(), other.clone());
        assert_eq!(store2.checkout("https://x/hooks", "v1").await.unwrap(), a);
        assert_eq!(other.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_checkouts_fetch_once() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(CountingFetcher::default());
        let store = Arc::new(RepoStore::new(dir.path(), fetcher.clone()));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.checkout("https://x/hooks", "v1").await })
            })
            .collect();
        for task in futures::future::join_all(tasks).await {
            task.unwrap().unwrap();
        }
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_distinct_revisions_are_distinct_entries() {
        assert_ne!(RepoStore::key("r", "v1"), RepoStore::key("r", "v2"));
        assert_ne!(RepoStore::key("ab", "c"), RepoStore::key("a", "bc"));
        assert_eq!(RepoStore::key("r", "v1").len(), KEY_LEN);
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(CountingFetcher {
            fail: true,
            ..Default::default()
        });
        let store = RepoStore::new(dir.path(), fetcher.clone());

        let err = store.checkout("https://x/hooks", "v1").await.unwrap_err();
        assert!(matches!(err, ResolveError::FetchFailed { .. }));
        assert!(store.list().unwrap().is_empty());
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|d| d.file_name().to_string_lossy().starts_with(STAGING_PREFIX))
            .collect();
        assert!(leftovers.is_empty());

        // Not memoized: the next call tries again.
        let _ = store.checkout("https://x/hooks", "v1").await;
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_list_and_clean() {
        let dir = tempfile::tempdir().unwrap();
        let store = RepoStore::new(dir.path(), Arc::new(CountingFetcher::default()));
        store.checkout("https://x/hooks", "v1").await.unwrap();
        store.checkout("https://x/hooks", "v2").await.unwrap();

        let entries = store.list().unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().any(|e| e.rev == "v2"));
        assert!(entries[0].checkout().join("REV").exists());

        assert_eq!(store.clean().unwrap(), 2);
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_clean_missing_root() {
        let store = RepoStore::new(
            "/nonexistent/pinhook-cache",
            Arc::new(CountingFetcher::default()),
        );
        assert_eq!(store.clean().unwrap(), 0);
    }
}

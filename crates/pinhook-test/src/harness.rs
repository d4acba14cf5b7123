//! End-to-end harness: mock fetcher, temporary cache, project tree.

use std::sync::Arc;

use pinhook_config::{Document, parse_document};
use pinhook_hooks::{HookExecutor, RepoStore, Resolution, Resolver, RunReport};
use tempfile::TempDir;

use crate::fixtures::{STANDARD_REPO, STANDARD_REV, TestProject, standard_hook_repo};
use crate::mocks::{MockFetcher, MockRepo};

/// Install a test-friendly tracing subscriber. Safe to call repeatedly.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("PINHOOK_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Wires a [`MockFetcher`], a temporary cache and a [`TestProject`].
#[derive(Debug)]
pub struct TestHarness {
    cache: TempDir,
    project: TestProject,
    fetcher: Arc<MockFetcher>,
    store: Arc<RepoStore>,
    fail_fast: bool,
    jobs: usize,
}

impl TestHarness {
    /// A harness whose fetcher serves nothing.
    ///
    /// # Panics
    ///
    /// Panics if the cache directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self::with_fetcher(MockFetcher::new())
    }

    /// A harness around a configured fetcher.
    ///
    /// # Panics
    ///
    /// Panics if the cache directory cannot be created.
    #[must_use]
    pub fn with_fetcher(fetcher: MockFetcher) -> Self {
        let cache = tempfile::tempdir().expect("failed to create cache dir");
        let fetcher = Arc::new(fetcher);
        let store = Arc::new(RepoStore::new(cache.path(), fetcher.clone()));
        Self {
            cache,
            project: TestProject::new(),
            fetcher,
            store,
            fail_fast: false,
            jobs: 1,
        }
    }

    /// A harness serving the standard hook repository.
    #[must_use]
    pub fn standard() -> Self {
        Self::with_fetcher(Self::standard_fetcher())
    }

    /// A fetcher serving the standard hook repository, to extend with more.
    #[must_use]
    pub fn standard_fetcher() -> MockFetcher {
        MockFetcher::new().with_repo(STANDARD_REPO, STANDARD_REV, standard_hook_repo())
    }

    /// Halt at the first failure.
    #[must_use]
    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Run hooks in parallel.
    #[must_use]
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    /// The project tree.
    #[must_use]
    pub fn project(&self) -> &TestProject {
        &self.project
    }

    /// The fetcher, for call assertions.
    #[must_use]
    pub fn fetcher(&self) -> &MockFetcher {
        &self.fetcher
    }

    /// The shared store.
    #[must_use]
    pub fn store(&self) -> Arc<RepoStore> {
        Arc::clone(&self.store)
    }

    /// Cache root.
    #[must_use]
    pub fn cache_root(&self) -> &std::path::Path {
        self.cache.path()
    }

    /// A resolver over the harness store.
    #[must_use]
    pub fn resolver(&self) -> Resolver {
        Resolver::new(self.store())
    }

    /// An executor for the project.
    #[must_use]
    pub fn executor(&self) -> HookExecutor {
        HookExecutor::new(self.project.root())
            .with_fail_fast(self.fail_fast)
            .with_jobs(self.jobs)
    }

    /// Resolve a parsed document.
    pub async fn resolve(&self, document: &Document) -> Resolution {
        self.resolver().resolve(document).await
    }

    /// Parse `document`, resolve it, and run it against `staged`.
    ///
    /// # Panics
    ///
    /// Panics if the document does not parse.
    pub async fn run(&self, document: &str, staged: &[&str]) -> RunReport {
        let document = parse_document(document).expect("test document must parse");
        let resolution = self.resolve(&document).await;
        let files = self.project.file_set(&document, staged);
        self.executor()
            .with_fail_fast(self.fail_fast || document.fail_fast)
            .run_resolution(&resolution, &files)
            .await
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience: a fetcher serving one extra repository alongside the
/// standard one.
#[must_use]
pub fn standard_fetcher_with(repo: &str, rev: &str, contents: MockRepo) -> MockFetcher {
    TestHarness::standard_fetcher().with_repo(repo, rev, contents)
}

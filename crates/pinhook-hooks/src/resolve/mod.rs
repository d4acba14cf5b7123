//! Hook resolution: repository declarations to runnable hooks.

pub mod fetch;
pub mod source;
pub mod store;

pub use fetch::{DEFAULT_FETCH_TIMEOUT, GitFetcher, RepoFetcher};
pub use source::{RepoSource, validate_rev};
pub use store::{CacheEntry, ENTRY_FILE, RepoStore};

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use pinhook_config::{
    Document, HookDefinition, LOCAL_REPO, MANIFEST_FILE_NAME, RepoDeclaration, RepoKind,
    load_manifest,
};
use tracing::{debug, warn};

use crate::error::{ResolveError, ResolveResult};
use crate::hook::ResolvedHook;

/// Default per-hook timeout.
pub const DEFAULT_HOOK_TIMEOUT: Duration = Duration::from_secs(60);

/// The hooks of a document, minus the repositories that failed.
#[derive(Debug, Default)]
pub struct Resolution {
    /// Resolved hooks in declaration order.
    pub hooks: Vec<ResolvedHook>,
    /// One error per repository that could not be resolved, in declaration
    /// order.
    pub errors: Vec<ResolveError>,
}

impl Resolution {
    /// Whether every repository resolved.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Resolves repository declarations through a [`RepoStore`].
#[derive(Debug, Clone)]
pub struct Resolver {
    store: Arc<RepoStore>,
    default_timeout: Duration,
}

impl Resolver {
    /// Create a resolver over a store.
    #[must_use]
    pub fn new(store: Arc<RepoStore>) -> Self {
        Self {
            store,
            default_timeout: DEFAULT_HOOK_TIMEOUT,
        }
    }

    /// Timeout for hooks that do not set `timeout_secs`.
    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &RepoStore {
        &self.store
    }

    /// Resolve every repository of a document.
    ///
    /// Repositories resolve concurrently. A failing repository contributes
    /// an error and no hooks; the others are unaffected.
    pub async fn resolve(&self, document: &Document) -> Resolution {
        let results =
            futures::future::join_all(document.repos.iter().map(|r| self.resolve_repo(r))).await;

        let mut resolution = Resolution::default();
        for result in results {
            match result {
                Ok(hooks) => resolution.hooks.extend(hooks),
                Err(e) => {
                    warn!(error = %e, "repository did not resolve");
                    resolution.errors.push(e);
                },
            }
        }
        resolution
    }

    /// Resolve one repository declaration.
    ///
    /// # Errors
    ///
    /// Returns the first error for this repository: a fetch failure, an
    /// invalid manifest, or an unknown hook id.
    pub async fn resolve_repo(&self, repo: &RepoDeclaration) -> ResolveResult<Vec<ResolvedHook>> {
        match repo.kind() {
            RepoKind::Local => self.resolve_local(repo),
            RepoKind::Remote { url, rev } => {
                let checkout = self.store.checkout(url, rev).await?;
                self.resolve_remote(repo, url, rev, &checkout)
            },
        }
    }

    fn resolve_local(&self, repo: &RepoDeclaration) -> ResolveResult<Vec<ResolvedHook>> {
        repo.hooks
            .iter()
            .map(|decl| {
                let def =
                    HookDefinition::from_local(decl).ok_or_else(|| ResolveError::InvalidSource {
                        repo: LOCAL_REPO.to_string(),
                        message: format!(
                            "local hook '{}' needs `name`, `entry` and `language`",
                            decl.id
                        ),
                    })?;
                Ok(ResolvedHook::merge(
                    LOCAL_REPO,
                    None,
                    decl,
                    &def,
                    self.default_timeout,
                ))
            })
            .collect()
    }

    fn resolve_remote(
        &self,
        repo: &RepoDeclaration,
        url: &str,
        rev: &str,
        checkout: &Path,
    ) -> ResolveResult<Vec<ResolvedHook>> {
        let manifest = load_manifest(&checkout.join(MANIFEST_FILE_NAME)).map_err(|source| {
            ResolveError::InvalidManifest {
                repo: url.to_string(),
                rev: rev.to_string(),
                source,
            }
        })?;
        debug!(repo = url, rev, hooks = manifest.len(), "loaded hook manifest");

        let label = repo.to_string();
        repo.hooks
            .iter()
            .map(|decl| {
                let def = manifest
                    .get(&decl.id)
                    .ok_or_else(|| ResolveError::UnknownHookId {
                        repo: url.to_string(),
                        rev: rev.to_string(),
                        id: decl.id.clone(),
                    })?;
                Ok(ResolvedHook::merge(
                    label.clone(),
                    Some(checkout.to_path_buf()),
                    decl,
                    def,
                    self.default_timeout,
                ))
            })
            .collect()
    }
}

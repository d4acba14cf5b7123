//! Pinhook hooks - resolution and invocation of pre-commit hooks.
//!
//! Given a parsed [`Document`](pinhook_config::Document), this crate:
//!
//! - **Resolves** every repository declaration at its pinned revision,
//!   through an on-disk cache keyed by (source, revision), and merges each
//!   hook declaration over the definition the repository publishes.
//! - **Invokes** the resolved hooks in declaration order against the staged
//!   file set, filtered per hook, and aggregates the outcomes into a
//!   [`Verdict`].
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use pinhook_hooks::prelude::*;
//!
//! let store = Arc::new(RepoStore::new(cache_root, Arc::new(GitFetcher::default())));
//! let resolution = Resolver::new(store).resolve(&document).await;
//! let files = FileSet::new(&project_root, staged, &document);
//! let report = HookExecutor::new(&project_root)
//!     .run_resolution(&resolution, &files)
//!     .await;
//! assert!(report.is_allowed());
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod error;
pub mod executor;
pub mod git;
pub mod handler;
pub mod hook;
pub mod resolve;
pub mod result;
pub mod tags;

pub use error::{ResolveError, ResolveResult};
pub use executor::HookExecutor;
pub use hook::{FileEntry, FileSet, ResolvedHook};
pub use resolve::{GitFetcher, RepoFetcher, RepoStore, Resolution, Resolver};
pub use result::{
    FailureKind, HookOutcome, HookStatus, ResolutionFailure, RunReport, SkipReason, Verdict,
};

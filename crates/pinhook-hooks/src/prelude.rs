//! Prelude module - commonly used types for convenient import.
//!
//! Use `use pinhook_hooks::prelude::*;` to import the resolve-and-run types.

// Resolution
pub use crate::{GitFetcher, RepoFetcher, RepoStore, Resolution, Resolver};

// Invocation
pub use crate::{FileSet, HookExecutor, ResolvedHook};

// Results
pub use crate::{HookOutcome, HookStatus, RunReport, Verdict};

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
//! Configuration for the pinhook pre-commit runner.
//!
//! Two inputs live here:
//!
//! - The **hook document** (`.pre-commit-config.yaml`): repository
//!   declarations with pinned revisions and per-hook overrides, parsed by
//!   [`parse_document`] / [`load_document`]. Hook repositories describe their
//!   own hooks in a [`Manifest`] (`.pre-commit-hooks.yaml`).
//! - **Runner settings** ([`Settings`]): timeouts, parallelism, cache
//!   location and logging, layered from embedded defaults, a user file and
//!   `PINHOOK_*` environment variables.
//!
//! # Usage
//!
//! ```rust
//! use pinhook_config::parse_document;
//!
//! let doc = parse_document(
//!     "repos:\n  - repo: local\n    hooks:\n      - {id: fmt, name: fmt, entry: cargo fmt, language: system}\n",
//! )
//! .unwrap();
//! assert_eq!(doc.hook_count(), 1);
//! ```
//!
//! # Design
//!
//! This crate depends on no other pinhook crate. It performs no IO beyond
//! reading the files it is pointed at.

/// Configuration error types.
pub mod error;
/// Hook repository manifests.
pub mod manifest;
/// Hook document parsing.
pub mod parse;
/// Regex path filters.
pub mod pattern;
/// Starter document.
pub mod sample;
/// Layered runner settings.
pub mod settings;
/// Declaration types.
pub mod types;
/// Cross-field document validation.
pub mod validate;

pub use error::{ConfigError, ConfigResult, Location};
pub use manifest::{HookDefinition, MANIFEST_FILE_NAME, Manifest, load_manifest, parse_manifest};
pub use parse::{load_document, parse_document, parse_document_named};
pub use pattern::Pattern;
pub use sample::SAMPLE_CONFIG;
pub use settings::{LoadedSettings, Settings};
pub use types::{
    CONFIG_FILE_NAME, Document, HookDeclaration, LOCAL_REPO, Language, RepoDeclaration, RepoKind,
};

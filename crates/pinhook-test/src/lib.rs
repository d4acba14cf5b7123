//! Pinhook Test - Shared test utilities for pinhook.
//!
//! Provides an in-memory [`MockFetcher`] standing in for `git`, fixtures for
//! hook manifests and project trees, and a [`TestHarness`] that wires a
//! temporary cache, a project and the resolver/executor together.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! pinhook-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! use pinhook_test::prelude::*;
//!
//! #[tokio::test]
//! async fn test_hooks_pass() {
//!     let harness = TestHarness::standard();
//!     harness.project().write("b.yaml", "a: 1\n");
//!     let report = harness.run(&standard_document(&[]), &["b.yaml"]).await;
//!     assert!(report.is_allowed());
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod harness;
pub mod mocks;

pub use fixtures::*;
pub use harness::*;
pub use mocks::*;

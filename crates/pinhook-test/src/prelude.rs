//! Prelude module - commonly used test utilities.
//!
//! Use `use pinhook_test::prelude::*;` in tests.

// Mocks and harness
pub use crate::{MockFetcher, MockRepo, TestHarness, TestProject};

// Fixtures
pub use crate::{
    STANDARD_REPO, STANDARD_REV, init_test_logging, standard_document, standard_fetcher_with,
    standard_hook_repo,
};

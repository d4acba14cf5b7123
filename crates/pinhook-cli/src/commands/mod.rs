//! CLI command implementations.

pub(crate) mod cache;
pub(crate) mod install;
pub(crate) mod run;
pub(crate) mod sample;
pub(crate) mod validate;

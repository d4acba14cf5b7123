//! pinhook telemetry - logging for the pinhook pre-commit runner.
//!
//! Library crates log through `tracing`; the binary calls [`setup_logging`]
//! once at startup. Logs go to stderr so the hook report on stdout stays
//! machine-readable.
//!
//! # Example
//!
//! ```rust,no_run
//! use pinhook_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), pinhook_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Compact)
//!     .with_directive("pinhook_hooks=debug");
//!
//! setup_logging(&config)?;
//! tracing::info!("logging ready");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LOG_ENV_VAR, LogConfig, LogFormat, LogTarget, setup_logging};

//! Configuration error types.

use std::fmt;

use thiserror::Error;

/// Where in a document a problem was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// A 1-based line and column, reported for syntax errors.
    Line {
        /// Line number.
        line: usize,
        /// Column number.
        column: usize,
    },
    /// A field path such as `repos[0].hooks[1].id`, reported for semantic errors.
    Field(String),
    /// The parser did not report a position.
    Unknown,
}

impl Location {
    /// Build a field location.
    #[must_use]
    pub fn field(path: impl Into<String>) -> Self {
        Self::Field(path.into())
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Line { line, column } => write!(f, "line {line}, column {column}"),
            Self::Field(path) => write!(f, "field `{path}`"),
            Self::Unknown => write!(f, "unknown position"),
        }
    }
}

/// Errors raised while reading the hook document or runner settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The hook document is syntactically or semantically invalid.
    #[error("malformed config {origin} at {location}: {message}")]
    MalformedConfig {
        /// File path, or `<input>` for in-memory text.
        origin: String,
        /// Position of the fault.
        location: Location,
        /// What is wrong.
        message: String,
    },

    /// A file could not be read.
    #[error("failed to read {path}: {source}")]
    ReadError {
        /// The file that failed.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A settings file is not valid TOML or does not fit the settings schema.
    #[error("failed to parse settings {path}: {source}")]
    SettingsParseError {
        /// The file that failed, or `<merged settings>`.
        path: String,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// A setting is out of range.
    #[error("invalid setting {field}: {message}")]
    ValidationError {
        /// Dotted setting name.
        field: String,
        /// What is wrong.
        message: String,
    },

    /// No platform directory could be determined for user files.
    #[error("could not determine the user {0} directory")]
    NoPlatformDir(&'static str),
}

impl ConfigError {
    pub(crate) fn malformed(
        origin: &str,
        location: Location,
        message: impl Into<String>,
    ) -> Self {
        Self::MalformedConfig {
            origin: origin.to_owned(),
            location,
            message: message.into(),
        }
    }

    /// The location of a [`ConfigError::MalformedConfig`], if this is one.
    #[must_use]
    pub fn location(&self) -> Option<&Location> {
        match self {
            Self::MalformedConfig { location, .. } => Some(location),
            _ => None,
        }
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

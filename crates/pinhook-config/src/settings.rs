//! Runner settings with layered loading.
//!
//! Precedence, lowest to highest:
//! 1. Embedded `defaults.toml`
//! 2. User file (`<config dir>/pinhook/settings.toml`, or
//!    `$PINHOOK_CONFIG_DIR/settings.toml`)
//! 3. `PINHOOK_*` environment variables
//!
//! Command-line flags are applied by the binary on top of the result.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};

const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Name of the user settings file.
pub const SETTINGS_FILE_NAME: &str = "settings.toml";

/// Overrides the directory searched for the user settings file.
pub const ENV_CONFIG_DIR: &str = "PINHOOK_CONFIG_DIR";
/// Overrides the cache location.
pub const ENV_CACHE_DIR: &str = "PINHOOK_CACHE_DIR";
/// Fallback cache location, used when `PINHOOK_CACHE_DIR` is unset.
pub const ENV_HOME: &str = "PINHOOK_HOME";
/// Overrides the default per-hook timeout in seconds.
pub const ENV_TIMEOUT: &str = "PINHOOK_TIMEOUT";
/// Overrides the number of hooks run at once.
pub const ENV_JOBS: &str = "PINHOOK_JOBS";
/// Overrides the log format.
pub const ENV_LOG_FORMAT: &str = "PINHOOK_LOG_FORMAT";

const MAX_JOBS: usize = 256;
const LOG_LEVELS: &[&str] = &["off", "error", "warn", "info", "debug", "trace"];
const LOG_FORMATS: &[&str] = &["pretty", "compact", "json"];

/// All runner settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Hook execution.
    pub run: RunSettings,
    /// Repository cache.
    pub cache: CacheSettings,
    /// Logging.
    pub logging: LoggingSettings,
}

/// Hook execution settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    /// Hooks run at once. `1` runs strictly in order.
    pub jobs: usize,
    /// Halt at the first failing hook.
    pub fail_fast: bool,
    /// Default per-hook timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            jobs: 1,
            fail_fast: false,
            timeout_secs: 60,
        }
    }
}

/// Repository cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Cache root. Defaults to the platform cache directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    /// Timeout for fetching one repository, in seconds.
    pub fetch_timeout_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            dir: None,
            fetch_timeout_secs: 300,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Level filter.
    pub level: String,
    /// `pretty`, `compact` or `json`.
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_owned(),
            format: "compact".to_owned(),
        }
    }
}

/// Settings plus where they came from.
#[derive(Debug, Clone)]
pub struct LoadedSettings {
    /// The merged, validated settings.
    pub settings: Settings,
    /// Settings files that were read.
    pub loaded_files: Vec<String>,
    /// Environment variables that changed a value.
    pub env_overrides: Vec<String>,
}

impl Settings {
    /// Load settings from defaults, the user file and the process environment.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the user file is malformed or a value is
    /// out of range.
    pub fn load() -> ConfigResult<LoadedSettings> {
        let env: HashMap<String, String> = std::env::vars()
            .filter(|(k, _)| k.starts_with("PINHOOK_"))
            .collect();
        load(None, &env)
    }

    /// The cache root: the configured directory or the platform cache dir.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoPlatformDir`] when no directory is configured
    /// and the platform has none.
    pub fn cache_root(&self) -> ConfigResult<PathBuf> {
        if let Some(dir) = &self.cache.dir {
            return Ok(dir.clone());
        }
        directories::ProjectDirs::from("", "", "pinhook")
            .map(|d| d.cache_dir().to_path_buf())
            .ok_or(ConfigError::NoPlatformDir("cache"))
    }
}

/// Load settings with an explicit settings directory and environment map.
///
/// `config_dir` wins over `PINHOOK_CONFIG_DIR` and the platform config dir.
///
/// # Errors
///
/// See [`Settings::load`].
pub fn load(
    config_dir: Option<&Path>,
    env: &HashMap<String, String>,
) -> ConfigResult<LoadedSettings> {
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::SettingsParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;
    let mut loaded_files = Vec::new();

    let dir = config_dir
        .map(Path::to_path_buf)
        .or_else(|| env.get(ENV_CONFIG_DIR).map(PathBuf::from))
        .or_else(|| {
            directories::ProjectDirs::from("", "", "pinhook").map(|d| d.config_dir().to_path_buf())
        });

    if let Some(dir) = dir {
        let path = dir.join(SETTINGS_FILE_NAME);
        if let Some(overlay) = try_load_file(&path)? {
            deep_merge(&mut merged, &overlay);
            info!(path = %path.display(), "loaded user settings");
            loaded_files.push(path.display().to_string());
        }
    }

    let env_overrides = apply_env(&mut merged, env)?;
    if !env_overrides.is_empty() {
        debug!(vars = ?env_overrides, "applied environment overrides");
    }

    let settings: Settings =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::SettingsParseError {
                path: "<merged settings>".to_owned(),
                source: e,
            })?;
    validate(&settings)?;

    Ok(LoadedSettings {
        settings,
        loaded_files,
        env_overrides,
    })
}

/// Check value ranges.
///
/// # Errors
///
/// Returns [`ConfigError::ValidationError`] naming the first bad field.
pub fn validate(settings: &Settings) -> ConfigResult<()> {
    let invalid = |field: &str, message: String| {
        Err(ConfigError::ValidationError {
            field: field.to_owned(),
            message,
        })
    };

    if settings.run.jobs == 0 || settings.run.jobs > MAX_JOBS {
        return invalid("run.jobs", format!("must be between 1 and {MAX_JOBS}"));
    }
    if settings.run.timeout_secs == 0 {
        return invalid("run.timeout_secs", "must be at least 1".to_owned());
    }
    if settings.cache.fetch_timeout_secs == 0 {
        return invalid("cache.fetch_timeout_secs", "must be at least 1".to_owned());
    }
    if !LOG_LEVELS.contains(&settings.logging.level.to_ascii_lowercase().as_str()) {
        return invalid(
            "logging.level",
            format!(
                "unknown level '{}'; expected one of: {}",
                settings.logging.level,
                LOG_LEVELS.join(", ")
            ),
        );
    }
    if !LOG_FORMATS.contains(&settings.logging.format.to_ascii_lowercase().as_str()) {
        return invalid(
            "logging.format",
            format!(
                "unknown format '{}'; expected one of: {}",
                settings.logging.format,
                LOG_FORMATS.join(", ")
            ),
        );
    }
    Ok(())
}

/// Write environment overrides into the merged tree. Returns the variables used.
fn apply_env(merged: &mut toml::Value, env: &HashMap<String, String>) -> ConfigResult<Vec<String>> {
    let mut used = Vec::new();

    let cache_dir = env
        .get(ENV_CACHE_DIR)
        .map(|v| (ENV_CACHE_DIR, v))
        .or_else(|| env.get(ENV_HOME).map(|v| (ENV_HOME, v)));
    if let Some((var, value)) = cache_dir {
        set_path(merged, &["cache", "dir"], toml::Value::String(value.clone()));
        used.push(var.to_owned());
    }

    if let Some(value) = env.get(ENV_TIMEOUT) {
        let secs = parse_int(ENV_TIMEOUT, value)?;
        set_path(merged, &["run", "timeout_secs"], toml::Value::Integer(secs));
        used.push(ENV_TIMEOUT.to_owned());
    }

    if let Some(value) = env.get(ENV_JOBS) {
        let jobs = parse_int(ENV_JOBS, value)?;
        set_path(merged, &["run", "jobs"], toml::Value::Integer(jobs));
        used.push(ENV_JOBS.to_owned());
    }

    if let Some(value) = env.get(ENV_LOG_FORMAT) {
        set_path(
            merged,
            &["logging", "format"],
            toml::Value::String(value.clone()),
        );
        used.push(ENV_LOG_FORMAT.to_owned());
    }

    Ok(used)
}

fn parse_int(var: &str, value: &str) -> ConfigResult<i64> {
    value
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|v| *v >= 0)
        .ok_or_else(|| ConfigError::ValidationError {
            field: var.to_owned(),
            message: format!("expected a non-negative integer, got '{value}'"),
        })
}

/// Set `path` in a table tree, creating intermediate tables.
fn set_path(root: &mut toml::Value, path: &[&str], value: toml::Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut node = root;
    for key in parents {
        let toml::Value::Table(table) = node else {
            return;
        };
        node = table
            .entry((*key).to_owned())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }
    if let toml::Value::Table(table) = node {
        table.insert((*last).to_owned(), value);
    }
}

/// Recursively merge `overlay` into `base`. Tables merge per key; scalars
/// and arrays replace.
fn deep_merge(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                if let Some(base_val) = base_table.get_mut(key) {
                    deep_merge(base_val, overlay_val);
                } else {
                    base_table.insert(key.clone(), overlay_val.clone());
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
        },
    }
}

/// Load a TOML file, returning `None` if it does not exist.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "settings file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };

    toml::from_str(&content)
        .map(Some)
        .map_err(|e| ConfigError::SettingsParseError {
            path: path.display().to_string(),
            source: e,
        })
}

//! Hook manifests (`.pre-commit-hooks.yaml`).
//!
//! A hook repository publishes its hook definitions as a YAML list at its
//! root. Unknown keys are ignored: manifests are written for many runners
//! and gain fields over time.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult, Location};
use crate::parse::{read_capped, yaml_error};
use crate::pattern::Pattern;
use crate::types::{HookDeclaration, Language};

/// File name of a hook repository's manifest.
pub const MANIFEST_FILE_NAME: &str = ".pre-commit-hooks.yaml";

/// A hook as its repository defines it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookDefinition {
    /// Hook id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Command to run.
    pub entry: String,
    /// Runtime of the entry point.
    pub language: Language,
    /// Default argument list.
    #[serde(default)]
    pub args: Vec<String>,
    /// Inclusion filter.
    #[serde(default = "Pattern::match_all")]
    pub files: Pattern,
    /// Exclusion filter.
    #[serde(default = "Pattern::match_none")]
    pub exclude: Pattern,
    /// File tags a path must carry.
    #[serde(default = "default_types")]
    pub types: Vec<String>,
    /// Run even when no file matches.
    #[serde(default)]
    pub always_run: bool,
    /// Append matched files to the command line.
    #[serde(default = "default_pass_filenames")]
    pub pass_filenames: bool,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_types() -> Vec<String> {
    vec!["file".to_string()]
}

fn default_pass_filenames() -> bool {
    true
}

impl HookDefinition {
    /// A `system` hook with manifest defaults for every optional field.
    #[must_use]
    pub fn system(id: impl Into<String>, entry: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            entry: entry.into(),
            language: Language::System,
            args: Vec::new(),
            files: Pattern::match_all(),
            exclude: Pattern::match_none(),
            types: default_types(),
            always_run: false,
            pass_filenames: true,
            description: None,
        }
    }

    /// Build the definition of an inline `local` hook. Returns `None` when the
    /// declaration lacks `name`, `entry` or `language`.
    #[must_use]
    pub fn from_local(decl: &HookDeclaration) -> Option<Self> {
        Some(Self {
            id: decl.id.clone(),
            name: decl.name.clone()?,
            entry: decl.entry.clone()?,
            language: decl.language.clone()?,
            args: Vec::new(),
            files: Pattern::match_all(),
            exclude: Pattern::match_none(),
            types: default_types(),
            always_run: false,
            pass_filenames: true,
            description: None,
        })
    }
}

/// All hooks a repository defines, in manifest order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    hooks: Vec<HookDefinition>,
}

impl Manifest {
    /// Build a manifest from definitions.
    #[must_use]
    pub fn new(hooks: Vec<HookDefinition>) -> Self {
        Self { hooks }
    }

    /// Look up a hook by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&HookDefinition> {
        self.hooks.iter().find(|h| h.id == id)
    }

    /// All definitions.
    #[must_use]
    pub fn hooks(&self) -> &[HookDefinition] {
        &self.hooks
    }

    /// Number of definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Whether the manifest defines no hooks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

/// Parse manifest text. `origin` names the source in error messages.
///
/// # Errors
///
/// Returns [`ConfigError::MalformedConfig`] on YAML errors, missing required
/// keys, empty ids or entries, and duplicate ids.
pub fn parse_manifest(text: &str, origin: &str) -> ConfigResult<Manifest> {
    let hooks: Vec<HookDefinition> =
        serde_yaml::from_str(text).map_err(|e| yaml_error(origin, &e))?;

    let mut seen: HashMap<&str, usize> = HashMap::new();
    for (i, hook) in hooks.iter().enumerate() {
        if hook.id.trim().is_empty() {
            return Err(ConfigError::malformed(
                origin,
                Location::field(format!("[{i}].id")),
                "hook id must not be empty",
            ));
        }
        if hook.entry.trim().is_empty() {
            return Err(ConfigError::malformed(
                origin,
                Location::field(format!("[{i}].entry")),
                format!("hook '{}' has an empty entry", hook.id),
            ));
        }
        if let Some(first) = seen.insert(hook.id.as_str(), i) {
            return Err(ConfigError::malformed(
                origin,
                Location::field(format!("[{i}].id")),
                format!("duplicate hook id '{}' (first defined at [{first}])", hook.id),
            ));
        }
    }

    Ok(Manifest::new(hooks))
}

/// Read and parse a manifest file.
///
/// # Errors
///
/// Returns [`ConfigError::ReadError`] if the file cannot be read, or the
/// errors of [`parse_manifest`].
pub fn load_manifest(path: &Path) -> ConfigResult<Manifest> {
    let text = read_capped(path)?;
    parse_manifest(&text, &path.display().to_string())
}

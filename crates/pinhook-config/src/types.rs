//! Declaration types for the hook document (`.pre-commit-config.yaml`).
//!
//! Every struct rejects unknown keys so typos surface as
//! [`MalformedConfig`](crate::ConfigError::MalformedConfig) instead of being
//! silently ignored. Values are never mutated after parsing.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::pattern::Pattern;

/// Default file name of the hook document.
pub const CONFIG_FILE_NAME: &str = ".pre-commit-config.yaml";

/// `repo:` value of a repository whose hooks are defined inline.
pub const LOCAL_REPO: &str = "local";

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// The whole hook document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Document {
    /// Global inclusion filter applied before any hook's own filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Pattern>,
    /// Global exclusion filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Pattern>,
    /// Stop at the first failing hook instead of running them all.
    #[serde(default)]
    pub fail_fast: bool,
    /// Repository declarations in run order.
    pub repos: Vec<RepoDeclaration>,
}

impl Document {
    /// Number of declared hooks across all repositories.
    #[must_use]
    pub fn hook_count(&self) -> usize {
        self.repos.iter().map(|r| r.hooks.len()).sum()
    }

    /// Whether `path` passes the global `files`/`exclude` filters.
    #[must_use]
    pub fn includes_path(&self, path: &str) -> bool {
        self.files.as_ref().is_none_or(|p| p.is_match(path))
            && !self.exclude.as_ref().is_some_and(|p| p.is_match(path))
    }
}

// ---------------------------------------------------------------------------
// RepoDeclaration
// ---------------------------------------------------------------------------

/// One `repos:` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepoDeclaration {
    /// Source location, or `local`.
    pub repo: String,
    /// Pinned revision. Required for remote repositories, absent for `local`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    /// Hook declarations in run order.
    pub hooks: Vec<HookDeclaration>,
}

/// Where a repository's hook definitions come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoKind<'a> {
    /// Hooks are defined inline in the document.
    Local,
    /// Hooks are defined by a fetched repository at a pinned revision.
    Remote {
        /// Source location.
        url: &'a str,
        /// Pinned revision.
        rev: &'a str,
    },
}

impl RepoDeclaration {
    /// Whether this is the inline `local` repository.
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.repo == LOCAL_REPO
    }

    /// Classify the declaration. A validated remote declaration always has a rev.
    #[must_use]
    pub fn kind(&self) -> RepoKind<'_> {
        if self.is_local() {
            RepoKind::Local
        } else {
            RepoKind::Remote {
                url: &self.repo,
                rev: self.rev.as_deref().unwrap_or_default(),
            }
        }
    }

    /// Find a hook declaration by id.
    #[must_use]
    pub fn hook(&self, id: &str) -> Option<&HookDeclaration> {
        self.hooks.iter().find(|h| h.id == id)
    }
}

impl fmt::Display for RepoDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.rev {
            Some(rev) => write!(f, "{}@{rev}", self.repo),
            None => f.write_str(&self.repo),
        }
    }
}

// ---------------------------------------------------------------------------
// HookDeclaration
// ---------------------------------------------------------------------------

/// One `hooks:` entry. Every field except `id` overrides the hook's
/// manifest default when present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HookDeclaration {
    /// Hook id, unique within its repository.
    pub id: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Command to run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<String>,
    /// Runtime of the entry point.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
    /// Argument list. Replaces the default list, never appends to it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    /// Inclusion filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Pattern>,
    /// Exclusion filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Pattern>,
    /// File tags a path must carry, e.g. `[yaml]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub types: Option<Vec<String>>,
    /// Run even when no file matches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub always_run: Option<bool>,
    /// Append matched files to the command line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass_filenames: Option<bool>,
    /// Per-hook timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Disabled hooks are reported as skipped.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl HookDeclaration {
    /// A declaration with only an id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            entry: None,
            language: None,
            args: None,
            files: None,
            exclude: None,
            types: None,
            always_run: None,
            pass_filenames: None,
            timeout_secs: None,
            enabled: true,
        }
    }

    /// Override the argument list.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = Some(args.into_iter().map(Into::into).collect());
        self
    }

    /// Disable the hook.
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

// ---------------------------------------------------------------------------
// Language
// ---------------------------------------------------------------------------

/// Runtime of a hook's entry point.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Language {
    /// Entry is an executable on `PATH`.
    System,
    /// Entry is a path relative to the hook repository root.
    Script,
    /// The hook always fails, printing its entry as the message.
    Fail,
    /// Any other runtime. Run like `system`; the environment is not provisioned.
    Other(String),
}

impl From<String> for Language {
    fn from(value: String) -> Self {
        match value.as_str() {
            "system" => Self::System,
            "script" => Self::Script,
            "fail" => Self::Fail,
            _ => Self::Other(value),
        }
    }
}

impl From<Language> for String {
    fn from(value: Language) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => f.write_str("system"),
            Self::Script => f.write_str("script"),
            Self::Fail => f.write_str("fail"),
            Self::Other(name) => f.write_str(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_round_trip_names() {
        assert_eq!(Language::from("system".to_string()), Language::System);
        assert_eq!(
            Language::from("python".to_string()),
            Language::Other("python".to_string())
        );
        assert_eq!(Language::Script.to_string(), "script");
    }

    #[test]
    fn test_repo_kind() {
        let remote = RepoDeclaration {
            repo: "https://github.com/pre-commit/pre-commit-hooks".to_string(),
            rev: Some("v2.2.3".to_string()),
            hooks: vec![HookDeclaration::new("check-yaml")],
        };
        assert_eq!(
            remote.kind(),
            RepoKind::Remote {
                url: "https://github.com/pre-commit/pre-commit-hooks",
                rev: "v2.2.3"
            }
        );
        assert_eq!(
            remote.to_string(),
            "https://github.com/pre-commit/pre-commit-hooks@v2.2.3"
        );

        let local = RepoDeclaration {
            repo: LOCAL_REPO.to_string(),
            rev: None,
            hooks: Vec::new(),
        };
        assert_eq!(local.kind(), RepoKind::Local);
    }

    #[test]
    fn test_document_global_filters() {
        let doc = Document {
            files: Some(Pattern::new(r"^src/").unwrap()),
            exclude: Some(Pattern::new(r"^src/vendor/").unwrap()),
            fail_fast: false,
            repos: Vec::new(),
        };
        assert!(doc.includes_path("src/a.py"));
        assert!(!doc.includes_path("src/vendor/b.py"));
        assert!(!doc.includes_path("docs/c.md"));
    }

    #[test]
    fn test_hook_declaration_builder() {
        let hook = HookDeclaration::new("flake8").with_args(["--max-line-length=100"]);
        assert_eq!(hook.args, Some(vec!["--max-line-length=100".to_string()]));
        assert!(hook.enabled);
        assert!(!hook.disabled().enabled);
    }
}

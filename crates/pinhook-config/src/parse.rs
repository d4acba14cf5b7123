//! Hook document parsing.

use std::path::Path;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult, Location};
use crate::types::Document;
use crate::validate;

/// Maximum accepted size of a document or manifest (1 MB).
const MAX_DOCUMENT_SIZE: usize = 1_048_576;

/// Origin reported for in-memory text.
pub const INPUT_ORIGIN: &str = "<input>";

/// Parse a hook document from text.
///
/// # Errors
///
/// Returns [`ConfigError::MalformedConfig`] when the text is not valid YAML,
/// does not fit the document schema, or fails validation.
pub fn parse_document(text: &str) -> ConfigResult<Document> {
    parse_document_named(text, INPUT_ORIGIN)
}

/// Parse a hook document, naming `origin` in error messages.
///
/// # Errors
///
/// See [`parse_document`].
pub fn parse_document_named(text: &str, origin: &str) -> ConfigResult<Document> {
    if text.trim().is_empty() {
        return Err(ConfigError::malformed(
            origin,
            Location::Unknown,
            "document is empty; expected a `repos` list",
        ));
    }

    let document: Document = serde_yaml::from_str(text).map_err(|e| yaml_error(origin, &e))?;
    validate::validate_document(&document, origin)?;

    debug!(
        origin,
        repos = document.repos.len(),
        hooks = document.hook_count(),
        "parsed hook document"
    );
    Ok(document)
}

/// Read and parse a hook document file.
///
/// # Errors
///
/// Returns [`ConfigError::ReadError`] if the file cannot be read, or the
/// errors of [`parse_document`].
pub fn load_document(path: &Path) -> ConfigResult<Document> {
    let text = read_capped(path)?;
    parse_document_named(&text, &path.display().to_string())
}

/// Read a file, rejecting anything over the size cap.
pub(crate) fn read_capped(path: &Path) -> ConfigResult<String> {
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    // Checked after reading so there is no stat/read race.
    if text.len() > MAX_DOCUMENT_SIZE {
        return Err(ConfigError::malformed(
            &path.display().to_string(),
            Location::Unknown,
            format!(
                "file is {} bytes, exceeding the {MAX_DOCUMENT_SIZE} byte limit",
                text.len()
            ),
        ));
    }
    Ok(text)
}

/// Convert a YAML error into `MalformedConfig`, keeping its position.
pub(crate) fn yaml_error(origin: &str, e: &serde_yaml::Error) -> ConfigError {
    let location = e.location().map_or(Location::Unknown, |l| Location::Line {
        line: l.line(),
        column: l.column(),
    });
    ConfigError::malformed(origin, location, e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Language, RepoKind};

    const SAMPLE: &str = r"
exclude: '^vendor/'
repos:
  - repo: https://github.com/pre-commit/pre-commit-hooks
    rev: v2.2.3
    hooks:
      - id: trailing-whitespace
      - id: check-yaml
        args: ['--unsafe']
  - repo: local
    hooks:
      - id: no-todo
        name: No TODO
        entry: grep -n TODO
        language: system
        enabled: false
";

    #[test]
    fn test_parse_sample() {
        let doc = parse_document(SAMPLE).unwrap();
        assert_eq!(doc.repos.len(), 2);
        assert_eq!(doc.hook_count(), 3);
        assert!(!doc.fail_fast);
        assert!(!doc.includes_path("vendor/x.py"));

        let first = &doc.repos[0];
        assert_eq!(
            first.kind(),
            RepoKind::Remote {
                url: "https://github.com/pre-commit/pre-commit-hooks",
                rev: "v2.2.3"
            }
        );
        assert_eq!(first.hooks[0].args, None);
        assert_eq!(first.hooks[1].args, Some(vec!["--unsafe".to_string()]));

        let local = &doc.repos[1];
        assert_eq!(local.kind(), RepoKind::Local);
        assert_eq!(local.hooks[0].language, Some(Language::System));
        assert!(!local.hooks[0].enabled);
    }

    #[test]
    fn test_parse_is_idempotent() {
        let a = parse_document(SAMPLE).unwrap();
        let b = parse_document(SAMPLE).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_reserialized_document_parses_equal() {
        let a = parse_document(SAMPLE).unwrap();
        let text = serde_yaml::to_string(&a).unwrap();
        let b = parse_document(&text).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_unknown_top_level_key() {
        let text = "repos: []\nbogus: 1\n";
        let err = parse_document(text).unwrap_err();
        assert!(err.to_string().contains("bogus"), "got: {err}");
        assert!(matches!(err.location(), Some(Location::Line { .. })));
    }

    #[test]
    fn test_missing_repo_key() {
        let text = "repos:\n  - rev: v1\n    hooks: [{id: a}]\n";
        let err = parse_document(text).unwrap_err();
        assert!(matches!(err, ConfigError::MalformedConfig { .. }));
        assert!(err.to_string().contains("repo"));
    }

    #[test]
    fn test_empty_document() {
        let err = parse_document("   \n").unwrap_err();
        assert!(matches!(err, ConfigError::MalformedConfig { .. }));
    }

    #[test]
    fn test_syntax_error_has_line() {
        let text = "repos:\n  - repo: x\n    rev: [unclosed\n";
        let err = parse_document(text).unwrap_err();
        assert!(matches!(err.location(), Some(Location::Line { .. })));
    }

    #[test]
    fn test_bad_exclude_regex() {
        let err = parse_document("exclude: '(('\nrepos: []\n").unwrap_err();
        assert!(err.to_string().contains("invalid regex"), "got: {err}");
    }

    #[test]
    fn test_load_document_missing_file() {
        let err = load_document(Path::new("/nonexistent/.pre-commit-config.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }

    #[test]
    fn test_load_document_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".pre-commit-config.yaml");
        std::fs::write(&path, "repos:\n  - repo: https://x\n    hooks: [{id: a}]\n").unwrap();
        let err = load_document(&path).unwrap_err();
        assert!(err.to_string().contains(".pre-commit-config.yaml"));
    }
}

//! Starter hook document printed by `pinhook sample-config`.

/// A small, valid hook document.
pub const SAMPLE_CONFIG: &str = "\
# See `pinhook --help` for the document format.
repos:
  - repo: https://github.com/pre-commit/pre-commit-hooks
    rev: v2.2.3
    hooks:
      - id: trailing-whitespace
      - id: end-of-file-fixer
      - id: check-yaml
      - id: check-added-large-files
";

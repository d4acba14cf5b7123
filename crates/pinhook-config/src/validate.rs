//! Post-parse document validation.
//!
//! Serde enforces the shape of the document; the rules here span fields:
//! `rev` depends on `repo`, hook ids must be unique per repository, inline
//! hooks must be complete. Errors carry the field path of the fault.

use std::collections::HashMap;

use tracing::warn;

use crate::error::{ConfigError, ConfigResult, Location};
use crate::types::{Document, HookDeclaration, RepoDeclaration};

/// Validate a deserialized document.
///
/// # Errors
///
/// Returns the first [`ConfigError::MalformedConfig`] found, in document order.
pub fn validate_document(document: &Document, origin: &str) -> ConfigResult<()> {
    for (i, repo) in document.repos.iter().enumerate() {
        validate_repo(repo, i, origin)?;
    }
    Ok(())
}

fn validate_repo(repo: &RepoDeclaration, index: usize, origin: &str) -> ConfigResult<()> {
    let at = |field: &str| Location::field(format!("repos[{index}].{field}"));

    if repo.repo.trim().is_empty() {
        return Err(ConfigError::malformed(
            origin,
            at("repo"),
            "repository source must not be empty",
        ));
    }

    if repo.is_local() {
        if repo.rev.is_some() {
            return Err(ConfigError::malformed(
                origin,
                at("rev"),
                "`local` repositories take no `rev`",
            ));
        }
    } else {
        match repo.rev.as_deref() {
            None => {
                return Err(ConfigError::malformed(
                    origin,
                    at("rev"),
                    format!("missing required `rev` for repository '{}'", repo.repo),
                ));
            },
            Some(rev) if rev.trim().is_empty() => {
                return Err(ConfigError::malformed(
                    origin,
                    at("rev"),
                    format!("empty `rev` for repository '{}'", repo.repo),
                ));
            },
            Some(_) => {},
        }
    }

    if repo.hooks.is_empty() {
        warn!(repo = %repo.repo, "repository declares no hooks");
    }

    let mut seen: HashMap<&str, usize> = HashMap::new();
    for (j, hook) in repo.hooks.iter().enumerate() {
        let hook_at = |field: &str| at(&format!("hooks[{j}].{field}"));

        if hook.id.trim().is_empty() {
            return Err(ConfigError::malformed(
                origin,
                hook_at("id"),
                "hook id must not be empty",
            ));
        }

        if let Some(first) = seen.insert(hook.id.as_str(), j) {
            return Err(ConfigError::malformed(
                origin,
                hook_at("id"),
                format!(
                    "duplicate hook id '{}' in repository '{}' (first declared at repos[{index}].hooks[{first}])",
                    hook.id, repo.repo
                ),
            ));
        }

        if hook.timeout_secs == Some(0) {
            return Err(ConfigError::malformed(
                origin,
                hook_at("timeout_secs"),
                "timeout must be at least 1 second",
            ));
        }

        if repo.is_local()
            && let Some(missing) = missing_local_field(hook)
        {
            return Err(ConfigError::malformed(
                origin,
                hook_at(missing),
                format!("local hook '{}' must define `{missing}`", hook.id),
            ));
        }
    }

    Ok(())
}

fn missing_local_field(hook: &HookDeclaration) -> Option<&'static str> {
    if hook.name.is_none() {
        Some("name")
    } else if hook.entry.as_deref().is_none_or(|e| e.trim().is_empty()) {
        Some("entry")
    } else if hook.language.is_none() {
        Some("language")
    } else {
        None
    }
}

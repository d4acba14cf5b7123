//! Validate commands - parse documents and manifests without running hooks.

use std::path::Path;

use anyhow::Result;
use pinhook_config::{CONFIG_FILE_NAME, MANIFEST_FILE_NAME, load_document, load_manifest};

use crate::theme::Theme;

/// Parse a configuration document and report its size.
pub(crate) fn validate_config(path: Option<&Path>) -> Result<()> {
    let path = path.unwrap_or(Path::new(CONFIG_FILE_NAME));
    let document = load_document(path)?;
    println!(
        "{}",
        Theme::success(&format!(
            "{}: {} repositories, {} hooks",
            path.display(),
            document.repos.len(),
            document.hook_count()
        ))
    );
    Ok(())
}

/// Parse a hook manifest and list the hooks it defines.
pub(crate) fn validate_manifest(path: Option<&Path>) -> Result<()> {
    let path = path.unwrap_or(Path::new(MANIFEST_FILE_NAME));
    let manifest = load_manifest(path)?;
    println!(
        "{}",
        Theme::success(&format!("{}: {} hooks", path.display(), manifest.len()))
    );
    for hook in manifest.hooks() {
        println!("  {} {}", hook.id, Theme::dimmed(&hook.name));
    }
    Ok(())
}

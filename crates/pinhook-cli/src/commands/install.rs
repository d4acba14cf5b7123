//! Install commands - manage the git `pre-commit` hook script.
//!
//! The runner call lives between two marker lines, so reinstalling
//! rewrites only that block and uninstalling removes only that block.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use pinhook_hooks::git;
use tracing::debug;

use crate::theme::Theme;

const HOOK_NAME: &str = "pre-commit";
const MARKER_BEGIN: &str = "# >>> pinhook >>>";
const MARKER_END: &str = "# <<< pinhook <<<";
const SHEBANG: &str = "#!/bin/sh";

/// What installing over an existing script does.
#[derive(Debug, PartialEq, Eq)]
enum Plan {
    /// Write this script.
    Write(String),
    /// The script is already current.
    Unchanged,
    /// A foreign script is present and `--force` was not given.
    Conflict,
}

/// Install the hook into the current repository.
pub(crate) async fn install(force: bool) -> Result<()> {
    let path = hook_path().await?;
    let exe = std::env::current_exe().context("cannot locate the pinhook executable")?;
    let existing = read_existing(&path).await?;

    match plan_install(existing.as_deref(), &block(&exe), force) {
        Plan::Conflict => bail!(
            "{} exists and was not written by pinhook; rerun with --force to replace it",
            path.display()
        ),
        Plan::Unchanged => {
            println!("{}", Theme::info(&format!("{} is up to date", path.display())));
        },
        Plan::Write(script) => {
            if let Some(dir) = path.parent() {
                tokio::fs::create_dir_all(dir)
                    .await
                    .with_context(|| format!("cannot create {}", dir.display()))?;
            }
            tokio::fs::write(&path, script)
                .await
                .with_context(|| format!("cannot write {}", path.display()))?;
            make_executable(&path).await?;
            println!("{}", Theme::success(&format!("installed {}", path.display())));
        },
    }
    Ok(())
}

/// Remove the hook block, deleting the script if nothing else remains.
pub(crate) async fn uninstall() -> Result<()> {
    let path = hook_path().await?;
    let Some(existing) = read_existing(&path).await? else {
        println!("{}", Theme::info("no pre-commit hook installed"));
        return Ok(());
    };

    match strip_block(&existing) {
        None => {
            println!(
                "{}",
                Theme::warning(&format!("{} was not written by pinhook; leaving it", path.display()))
            );
        },
        Some(rest) if is_empty_script(&rest) => {
            tokio::fs::remove_file(&path)
                .await
                .with_context(|| format!("cannot remove {}", path.display()))?;
            println!("{}", Theme::success(&format!("removed {}", path.display())));
        },
        Some(rest) => {
            tokio::fs::write(&path, rest)
                .await
                .with_context(|| format!("cannot write {}", path.display()))?;
            println!(
                "{}",
                Theme::success(&format!("removed pinhook from {}", path.display()))
            );
        },
    }
    Ok(())
}

async fn hook_path() -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("cannot read the current directory")?;
    let root = git::repo_root(&cwd)
        .await
        .context("not inside a git repository")?;
    let dir = git::hooks_dir(&root).await?;
    debug!(dir = %dir.display(), "hooks directory");
    Ok(dir.join(HOOK_NAME))
}

async fn read_existing(path: &Path) -> Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("cannot read {}", path.display())),
    }
}

#[cfg(unix)]
async fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .await
        .with_context(|| format!("cannot mark {} executable", path.display()))
}

#[cfg(not(unix))]
async fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

/// The marker-delimited block invoking `exe`.
fn block(exe: &Path) -> String {
    format!(
        "{MARKER_BEGIN}\n{} run || exit $?\n{MARKER_END}\n",
        shell_quote(&exe.display().to_string())
    )
}

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

fn plan_install(existing: Option<&str>, block: &str, force: bool) -> Plan {
    let fresh = || Plan::Write(format!("{SHEBANG}\n{block}"));
    let Some(existing) = existing else {
        return fresh();
    };
    match find_block(existing) {
        Some((start, end)) if &existing[start..end] == block => Plan::Unchanged,
        Some((start, end)) => Plan::Write(format!(
            "{}{block}{}",
            &existing[..start],
            &existing[end..]
        )),
        None if force || is_empty_script(existing) => fresh(),
        None => Plan::Conflict,
    }
}

/// The script without the block, or `None` if there is no block.
fn strip_block(existing: &str) -> Option<String> {
    let (start, end) = find_block(existing)?;
    Some(format!("{}{}", &existing[..start], &existing[end..]))
}

/// Byte range of the block, end marker line included.
fn find_block(text: &str) -> Option<(usize, usize)> {
    let start = text.find(MARKER_BEGIN)?;
    let end_marker = start.saturating_add(text[start..].find(MARKER_END)?);
    let after = end_marker.saturating_add(MARKER_END.len());
    let end = match text[after..].find('\n') {
        Some(0) => after.saturating_add(1),
        _ => after,
    };
    Some((start, end))
}

fn is_empty_script(text: &str) -> bool {
    text.lines()
        .map(str::trim)
        .all(|l| l.is_empty() || l == SHEBANG)
}

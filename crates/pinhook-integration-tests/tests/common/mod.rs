//! Shared helpers for integration tests.

use std::path::Path;
use std::process::Command;

use pinhook_config::MANIFEST_FILE_NAME;

/// Whether a `git` binary is available. Tests that need one return early
/// without it.
#[allow(dead_code)]
pub fn has_git() -> bool {
    which::which("git").is_ok()
}

/// Run git in `dir`, panicking on failure.
#[allow(dead_code)]
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(["-c", "user.name=pinhook", "-c", "user.email=pinhook@example.invalid"])
        .args(["-c", "commit.gpgsign=false", "-c", "tag.gpgsign=false"])
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Create a git repository publishing `manifest` plus executable `scripts`,
/// committed and tagged `tag`. Returns the commit id.
#[allow(dead_code)]
pub fn init_hook_repo(dir: &Path, manifest: &str, scripts: &[(&str, &str)], tag: &str) -> String {
    git(dir, &["init", "-q"]);
    std::fs::write(dir.join(MANIFEST_FILE_NAME), manifest).unwrap();
    for (path, contents) in scripts {
        let target = dir.join(path);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&target, contents).unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&target, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
    }
    git(dir, &["add", "-A"]);
    git(dir, &["commit", "-q", "-m", "hooks"]);
    git(dir, &["tag", tag]);
    git(dir, &["rev-parse", "HEAD"])
}

//! Test fixtures: a standard hook repository and project trees.

use std::path::{Path, PathBuf};

use pinhook_config::Document;
use pinhook_hooks::FileSet;
use tempfile::TempDir;

use crate::mocks::MockRepo;

/// Source of the standard hook repository.
pub const STANDARD_REPO: &str = "https://github.com/pre-commit/pre-commit-hooks";

/// Revision the standard hook repository is served at.
pub const STANDARD_REV: &str = "v2.2.3";

const STANDARD_MANIFEST: &str = r"
- id: trailing-whitespace
  name: Trim Trailing Whitespace
  entry: hooks/trailing-whitespace
  language: script
  types: [text]
- id: end-of-file-fixer
  name: Fix End of Files
  entry: hooks/end-of-file
  language: script
  types: [text]
- id: check-yaml
  name: Check Yaml
  entry: hooks/check-yaml
  language: script
  types: [yaml]
- id: check-added-large-files
  name: Check for added large files
  entry: hooks/large-files
  language: script
  args: ['--maxkb=500']
- id: echo-args
  name: Echo arguments
  entry: hooks/echo-args
  language: script
  args: ['--default']
- id: slow
  name: Sleeps
  entry: sleep 5
  language: system
  always_run: true
  pass_filenames: false
";

/// Fails listing lines that end in whitespace.
const TRAILING_WHITESPACE: &str = "#!/bin/sh
if grep -n '[[:space:]]$' \"$@\"; then
    echo 'trailing whitespace found'
    exit 1
fi
exit 0
";

/// Fails on files that do not end in a newline.
const END_OF_FILE: &str = "#!/bin/sh
status=0
for f in \"$@\"; do
    if [ -s \"$f\" ] && [ \"$(tail -c 1 \"$f\" | od -An -c | tr -d ' ')\" != '\\n' ]; then
        echo \"$f: missing newline at end of file\"
        status=1
    fi
done
exit $status
";

/// Fails on any tab character, which YAML does not allow for indentation.
const CHECK_YAML: &str = "#!/bin/sh
tab=$(printf '\\t')
if grep -n \"$tab\" \"$@\"; then
    echo 'tabs are not allowed in YAML'
    exit 1
fi
exit 0
";

/// Accepts `--maxkb=N` and fails on larger files.
const LARGE_FILES: &str = "#!/bin/sh
max=500
status=0
for arg in \"$@\"; do
    case \"$arg\" in
        --maxkb=*) max=${arg#--maxkb=} ;;
        *)
            kb=$(( $(wc -c < \"$arg\") / 1024 ))
            if [ \"$kb\" -gt \"$max\" ]; then
                echo \"$arg ($kb KB) exceeds $max KB\"
                status=1
            fi
            ;;
    esac
done
exit $status
";

/// Prints its arguments, one per line.
const ECHO_ARGS: &str = "#!/bin/sh
for arg in \"$@\"; do echo \"$arg\"; done
";

/// The standard hook repository: runnable `script` hooks mirroring a
/// common public hook collection.
#[must_use]
pub fn standard_hook_repo() -> MockRepo {
    MockRepo::new(STANDARD_MANIFEST)
        .with_script("hooks/trailing-whitespace", TRAILING_WHITESPACE)
        .with_script("hooks/end-of-file", END_OF_FILE)
        .with_script("hooks/check-yaml", CHECK_YAML)
        .with_script("hooks/large-files", LARGE_FILES)
        .with_script("hooks/echo-args", ECHO_ARGS)
        .with_file("README.md", "standard hooks\n")
}

/// A document using the standard repository. Each entry of `hooks` is
/// the YAML of one hook declaration, e.g. `"{id: check-yaml}"`.
#[must_use]
pub fn standard_document(hooks: &[&str]) -> String {
    let hooks = if hooks.is_empty() {
        vec!["{id: trailing-whitespace}", "{id: check-yaml}"]
    } else {
        hooks.to_vec()
    };
    let mut doc = format!("repos:\n  - repo: {STANDARD_REPO}\n    rev: {STANDARD_REV}\n    hooks:\n");
    for hook in hooks {
        doc.push_str("      - ");
        doc.push_str(hook);
        doc.push('\n');
    }
    doc
}

/// A throwaway project directory.
#[derive(Debug)]
pub struct TestProject {
    dir: TempDir,
}

impl TestProject {
    /// Create an empty project.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("failed to create project dir"),
        }
    }

    /// Project root.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Absolute path of a project file.
    #[must_use]
    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// Write a file, creating parent directories.
    ///
    /// # Panics
    ///
    /// Panics on IO errors.
    pub fn write(&self, rel: &str, contents: impl AsRef<[u8]>) -> &Self {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("failed to create parent dir");
        }
        std::fs::write(path, contents).expect("failed to write project file");
        self
    }

    /// Read a file back.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be read.
    #[must_use]
    pub fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.path(rel)).expect("failed to read project file")
    }

    /// The file set for `paths` under `document`'s global filters.
    #[must_use]
    pub fn file_set(&self, document: &Document, paths: &[&str]) -> FileSet {
        FileSet::new(self.root(), paths.iter().copied(), document)
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinhook_config::{parse_document, parse_manifest};

    #[test]
    fn test_standard_document_parses() {
        let doc = parse_document(&standard_document(&[])).unwrap();
        assert_eq!(doc.hook_count(), 2);

        let doc = parse_document(&standard_document(&["{id: echo-args, args: ['--y']}"])).unwrap();
        assert_eq!(doc.repos[0].hooks[0].args, Some(vec!["--y".to_string()]));
    }

    #[test]
    fn test_standard_manifest_parses() {
        let manifest = parse_manifest(STANDARD_MANIFEST, "standard").unwrap();
        assert!(manifest.get("check-yaml").is_some());
        assert_eq!(manifest.get("echo-args").unwrap().args, vec!["--default"]);
    }

    #[test]
    fn test_project_files() {
        let project = TestProject::new();
        project.write("src/a.py", "print(1)\n");
        assert_eq!(project.read("src/a.py"), "print(1)\n");
    }
}

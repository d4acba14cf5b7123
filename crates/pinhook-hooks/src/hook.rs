//! Resolved hooks: a declaration merged with its definition.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use pinhook_config::{Document, HookDeclaration, HookDefinition, Language, Pattern};
use serde::Serialize;

use crate::tags::tags_for_path;

/// A hook ready to run. Built fresh for every run and never persisted.
#[derive(Debug, Clone)]
pub struct ResolvedHook {
    /// Hook id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Repository label (`source@rev`, or `local`).
    pub repo: String,
    /// Checkout the hook came from. `None` for local hooks.
    pub repo_dir: Option<PathBuf>,
    /// Command to run.
    pub entry: String,
    /// Runtime of the entry point.
    pub language: Language,
    /// Effective argument list.
    pub args: Vec<String>,
    /// Inclusion filter.
    pub files: Pattern,
    /// Exclusion filter.
    pub exclude: Pattern,
    /// Tags every selected file must carry.
    pub types: Vec<String>,
    /// Run even with no selected files.
    pub always_run: bool,
    /// Append selected files to the command line.
    pub pass_filenames: bool,
    /// Per-invocation timeout.
    pub timeout: Duration,
    /// Disabled hooks are skipped.
    pub enabled: bool,
}

impl ResolvedHook {
    /// Merge a declaration over a definition.
    ///
    /// Every field the declaration sets replaces the definition's value. In
    /// particular `args` replaces the default list, it never appends.
    #[must_use]
    pub fn merge(
        repo: impl Into<String>,
        repo_dir: Option<PathBuf>,
        decl: &HookDeclaration,
        def: &HookDefinition,
        default_timeout: Duration,
    ) -> Self {
        Self {
            id: decl.id.clone(),
            name: decl.name.clone().unwrap_or_else(|| def.name.clone()),
            repo: repo.into(),
            repo_dir,
            entry: decl.entry.clone().unwrap_or_else(|| def.entry.clone()),
            language: decl.language.clone().unwrap_or_else(|| def.language.clone()),
            args: decl.args.clone().unwrap_or_else(|| def.args.clone()),
            files: decl.files.clone().unwrap_or_else(|| def.files.clone()),
            exclude: decl.exclude.clone().unwrap_or_else(|| def.exclude.clone()),
            types: decl.types.clone().unwrap_or_else(|| def.types.clone()),
            always_run: decl.always_run.unwrap_or(def.always_run),
            pass_filenames: decl.pass_filenames.unwrap_or(def.pass_filenames),
            timeout: decl
                .timeout_secs
                .map_or(default_timeout, Duration::from_secs),
            enabled: decl.enabled,
        }
    }

    /// Select the files this hook applies to, in file-set order.
    #[must_use]
    pub fn select<'a>(&self, files: &'a FileSet) -> Vec<&'a str> {
        files
            .entries
            .iter()
            .filter(|f| self.files.is_match(&f.path) && !self.exclude.is_match(&f.path))
            .filter(|f| self.types.iter().all(|t| f.tags.contains(t.as_str())))
            .map(|f| f.path.as_str())
            .collect()
    }
}

impl fmt::Display for ResolvedHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.repo)
    }
}

/// One candidate file and its tags.
#[derive(Debug, Clone, Serialize)]
pub struct FileEntry {
    /// Path relative to the project root, `/`-separated.
    pub path: String,
    /// Tags computed once per run.
    pub tags: BTreeSet<&'static str>,
}

/// The files a run considers, after the document's global filters.
#[derive(Debug, Clone, Default)]
pub struct FileSet {
    root: PathBuf,
    entries: Vec<FileEntry>,
}

impl FileSet {
    /// Build the set from staged paths. Paths rejected by the document's
    /// global `files`/`exclude` are dropped; duplicates keep their first
    /// position.
    #[must_use]
    pub fn new<I, S>(root: impl Into<PathBuf>, paths: I, document: &Document) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let root = root.into();
        let mut seen = std::collections::HashSet::new();
        let entries = paths
            .into_iter()
            .map(|p| normalize(p.as_ref()))
            .filter(|p| !p.is_empty() && document.includes_path(p))
            .filter(|p| seen.insert(p.clone()))
            .map(|path| FileEntry {
                tags: tags_for_path(&root, &path),
                path,
            })
            .collect();
        Self { root, entries }
    }

    /// Project root the paths are relative to.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All entries.
    #[must_use]
    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    /// Number of files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn normalize(path: &str) -> String {
    let path = path.replace('\\', "/");
    path.strip_prefix("./").unwrap_or(&path).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinhook_config::parse_document;

    fn definition() -> HookDefinition {
        let mut def = HookDefinition::system("check-yaml", "check-yaml");
        def.args = vec!["--x".to_string()];
        def.types = vec!["yaml".to_string()];
        def
    }

    fn empty_doc() -> Document {
        parse_document("repos: []\n").unwrap()
    }

    #[test]
    fn test_override_replaces_default_args() {
        let decl = HookDeclaration::new("check-yaml").with_args(["--y"]);
        let hook = ResolvedHook::merge(
            "r@v1",
            None,
            &decl,
            &definition(),
            Duration::from_secs(60),
        );
        assert_eq!(hook.args, vec!["--y"]);
    }

    #[test]
    fn test_no_override_keeps_default_args() {
        let decl = HookDeclaration::new("check-yaml");
        let hook = ResolvedHook::merge(
            "r@v1",
            None,
            &decl,
            &definition(),
            Duration::from_secs(60),
        );
        assert_eq!(hook.args, vec!["--x"]);
        assert_eq!(hook.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_empty_override_clears_args() {
        let decl = HookDeclaration::new("check-yaml").with_args(Vec::<String>::new());
        let hook = ResolvedHook::merge("r", None, &decl, &definition(), Duration::from_secs(1));
        assert!(hook.args.is_empty());
    }

    #[test]
    fn test_timeout_override() {
        let mut decl = HookDeclaration::new("check-yaml");
        decl.timeout_secs = Some(3);
        let hook = ResolvedHook::merge("r", None, &decl, &definition(), Duration::from_secs(60));
        assert_eq!(hook.timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_select_by_type() {
        let files = FileSet::new("/nonexistent", ["a.py", "b.yaml"], &empty_doc());
        let hook = ResolvedHook::merge(
            "r",
            None,
            &HookDeclaration::new("check-yaml"),
            &definition(),
            Duration::from_secs(1),
        );
        assert_eq!(hook.select(&files), vec!["b.yaml"]);

        let mut text_def = definition();
        text_def.types = vec!["text".to_string()];
        let text_hook = ResolvedHook::merge(
            "r",
            None,
            &HookDeclaration::new("check-yaml"),
            &text_def,
            Duration::from_secs(1),
        );
        assert_eq!(text_hook.select(&files), vec!["a.py", "b.yaml"]);
    }

    #[test]
    fn test_select_files_and_exclude() {
        let files = FileSet::new(
            "/nonexistent",
            ["src/a.py", "tests/b.py", "src/gen/c.py"],
            &empty_doc(),
        );
        let mut decl = HookDeclaration::new("lint");
        decl.files = Some(Pattern::new("^src/").unwrap());
        decl.exclude = Some(Pattern::new("/gen/").unwrap());
        let hook = ResolvedHook::merge(
            "r",
            None,
            &decl,
            &HookDefinition::system("lint", "lint"),
            Duration::from_secs(1),
        );
        assert_eq!(hook.select(&files), vec!["src/a.py"]);
    }

    #[test]
    fn test_file_set_applies_global_filters() {
        let doc = parse_document("exclude: '^vendor/'\nrepos: []\n").unwrap();
        let files = FileSet::new(
            "/nonexistent",
            ["./a.py", "vendor/b.py", "a.py", ""],
            &doc,
        );
        let paths: Vec<_> = files.entries().iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["a.py"]);
    }
}

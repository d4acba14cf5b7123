//! Hook executor: runs resolved hooks against the staged file set.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::handler::CommandHandler;
use crate::hook::{FileSet, ResolvedHook};
use crate::resolve::Resolution;
use crate::result::{
    FailureKind, HookOutcome, HookStatus, ResolutionFailure, RunReport, SkipReason,
};

/// Runs hooks in declaration order and aggregates their outcomes.
#[derive(Debug, Clone)]
pub struct HookExecutor {
    handler: CommandHandler,
    fail_fast: bool,
    jobs: usize,
}

impl HookExecutor {
    /// Create an executor for a project. Defaults: sequential, continue past
    /// failures.
    #[must_use]
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            handler: CommandHandler::new(project_root),
            fail_fast: false,
            jobs: 1,
        }
    }

    /// Use a specific handler.
    #[must_use]
    pub fn with_handler(mut self, handler: CommandHandler) -> Self {
        self.handler = handler;
        self
    }

    /// Halt at the first failing hook. Forces sequential execution.
    #[must_use]
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Run up to `jobs` hooks at once. Output is still reported in order, and
    /// hooks whose files overlap never run at the same time.
    #[must_use]
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Run a resolution and build the report. Resolution errors are carried
    /// into the report and block the commit.
    pub async fn run_resolution(&self, resolution: &Resolution, files: &FileSet) -> RunReport {
        let started_at = Utc::now();
        let outcomes = self.run(&resolution.hooks, files).await;
        let failures = resolution
            .errors
            .iter()
            .map(|e| ResolutionFailure {
                repo: e.repo().unwrap_or("<cache>").to_string(),
                message: e.to_string(),
            })
            .collect();
        let report = RunReport::new(started_at, outcomes, failures);
        info!(
            run_id = %report.run_id,
            hooks = report.hooks.len(),
            failed = report.count(HookStatus::is_failure),
            resolution_errors = report.resolution_errors.len(),
            verdict = %report.verdict,
            "run complete"
        );
        report
    }

    /// Run hooks against the file set. Outcomes are in `hooks` order.
    pub async fn run(&self, hooks: &[ResolvedHook], files: &FileSet) -> Vec<HookOutcome> {
        if self.fail_fast || self.jobs <= 1 {
            return self.run_sequential(hooks, files).await;
        }

        let waves = waves(hooks, files);
        debug!(
            jobs = self.jobs,
            hooks = hooks.len(),
            waves = waves.len(),
            "running hooks in parallel"
        );
        let mut outcomes = Vec::with_capacity(hooks.len());
        for wave in waves {
            let done: Vec<HookOutcome> =
                futures::stream::iter(wave.iter().map(|hook| self.run_hook(hook, files)))
                    .buffered(self.jobs)
                    .collect()
                    .await;
            outcomes.extend(done);
        }
        outcomes
    }

    async fn run_sequential(&self, hooks: &[ResolvedHook], files: &FileSet) -> Vec<HookOutcome> {
        let mut outcomes = Vec::with_capacity(hooks.len());
        let mut halted = false;

        for hook in hooks {
            if halted {
                outcomes.push(HookOutcome::skipped(
                    &hook.id,
                    &hook.name,
                    &hook.repo,
                    SkipReason::Halted,
                ));
                continue;
            }
            let outcome = self.run_hook(hook, files).await;
            if self.fail_fast && outcome.status.is_failure() {
                warn!(hook = %hook.id, "hook failed, halting");
                halted = true;
            }
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Run one hook.
    pub async fn run_hook(&self, hook: &ResolvedHook, files: &FileSet) -> HookOutcome {
        if !hook.enabled {
            debug!(hook = %hook.id, "hook disabled");
            return HookOutcome::skipped(&hook.id, &hook.name, &hook.repo, SkipReason::Disabled);
        }

        let selected = hook.select(files);
        if selected.is_empty() && !hook.always_run {
            debug!(hook = %hook.id, "no files to check");
            return HookOutcome::skipped(&hook.id, &hook.name, &hook.repo, SkipReason::NoFiles);
        }

        let watched: &[&str] = if hook.pass_filenames { &selected } else { &[] };
        let before = digest_files(files.root(), watched);

        let start = Instant::now();
        let (failure, output) = match self.handler.execute(hook, &selected).await {
            Ok(invocation) => (invocation.failure, invocation.output),
            Err(e) => (
                Some(FailureKind::SpawnError {
                    message: e.to_string(),
                }),
                String::new(),
            ),
        };
        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        let failure = failure.or_else(|| {
            let modified = modified_paths(files.root(), watched, &before);
            (!modified.is_empty()).then_some(FailureKind::FilesModified { paths: modified })
        });

        let status = match failure {
            None => HookStatus::Passed,
            Some(failure) => {
                info!(hook = %hook.id, %failure, "hook failed");
                HookStatus::Failed { failure }
            },
        };
        debug!(hook = %hook.id, files = selected.len(), duration_ms, "hook finished");

        HookOutcome {
            id: hook.id.clone(),
            name: hook.name.clone(),
            repo: hook.repo.clone(),
            status,
            files: selected.iter().map(ToString::to_string).collect(),
            output,
            duration_ms,
        }
    }
}

/// Files a hook may touch while it runs.
enum Footprint<'a> {
    /// Skipped without starting a process.
    Nothing,
    /// Only the files it is given.
    Files(Vec<&'a str>),
    /// Unknown: the hook gets no file names.
    Anything,
}

fn footprint<'a>(hook: &ResolvedHook, files: &'a FileSet) -> Footprint<'a> {
    if !hook.enabled {
        return Footprint::Nothing;
    }
    let selected = hook.select(files);
    if selected.is_empty() && !hook.always_run {
        Footprint::Nothing
    } else if hook.pass_filenames {
        Footprint::Files(selected)
    } else {
        Footprint::Anything
    }
}

/// Split hooks into consecutive runs that share no files. Hooks within a
/// wave may run concurrently; waves run one after another.
fn waves<'h>(hooks: &'h [ResolvedHook], files: &FileSet) -> Vec<&'h [ResolvedHook]> {
    let mut waves = Vec::new();
    let mut start = 0;
    let mut claimed: HashSet<&str> = HashSet::new();
    let mut exclusive = false;
    let mut occupied = false;

    for (i, hook) in hooks.iter().enumerate() {
        let footprint = footprint(hook, files);
        let conflicts = match &footprint {
            Footprint::Nothing => false,
            Footprint::Anything => occupied,
            Footprint::Files(paths) => exclusive || paths.iter().any(|p| claimed.contains(p)),
        };
        if conflicts {
            waves.push(&hooks[start..i]);
            start = i;
            claimed.clear();
            exclusive = false;
            occupied = false;
        }
        match footprint {
            Footprint::Nothing => {},
            Footprint::Anything => {
                exclusive = true;
                occupied = true;
            },
            Footprint::Files(paths) => {
                claimed.extend(paths);
                occupied = true;
            },
        }
    }
    if start < hooks.len() {
        waves.push(&hooks[start..]);
    }
    waves
}

fn digest_files(root: &Path, paths: &[&str]) -> Vec<Option<blake3::Hash>> {
    paths
        .iter()
        .map(|p| std::fs::read(root.join(p)).ok().map(|b| blake3::hash(&b)))
        .collect()
}

fn modified_paths(root: &Path, paths: &[&str], before: &[Option<blake3::Hash>]) -> Vec<String> {
    let after = digest_files(root, paths);
    paths
        .iter()
        .zip(before.iter().zip(after.iter()))
        .filter(|(_, (b, a))| b != a)
        .map(|(p, _)| (*p).to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::Verdict;
    use pinhook_config::{Document, HookDeclaration, HookDefinition, parse_document};
    use std::time::Duration;

    fn hook(id: &str, entry: &str, types: &[&str]) -> ResolvedHook {
        let mut def = HookDefinition::system(id, entry);
        def.types = types.iter().map(ToString::to_string).collect();
        ResolvedHook::merge(
            "https://h.example/hooks@v2.2.3",
            None,
            &HookDeclaration::new(id),
            &def,
            Duration::from_secs(10),
        )
    }

    fn doc() -> Document {
        parse_document("repos: []\n").unwrap()
    }

    fn project() -> (tempfile::TempDir, FileSet) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.py"), "print(1)\n").unwrap();
        std::fs::write(dir.path().join("b.yaml"), "a: 1\n").unwrap();
        let files = FileSet::new(dir.path(), ["a.py", "b.yaml"], &doc());
        (dir, files)
    }

    #[tokio::test]
    async fn test_both_hooks_pass() {
        let (dir, files) = project();
        let hooks = [
            hook("trailing-whitespace", "true", &["text"]),
            hook("check-yaml", "true", &["yaml"]),
        ];
        let report = HookExecutor::new(dir.path())
            .run_resolution(
                &Resolution {
                    hooks: hooks.to_vec(),
                    errors: Vec::new(),
                },
                &files,
            )
            .await;

        assert_eq!(report.verdict, Verdict::CommitAllowed);
        assert_eq!(report.hooks[0].files, vec!["a.py", "b.yaml"]);
        assert_eq!(report.hooks[1].files, vec!["b.yaml"]);
        assert!(report.hooks.iter().all(|h| h.status == HookStatus::Passed));
    }

    #[tokio::test]
    async fn test_failing_hook_blocks() {
        let (dir, files) = project();
        let hooks = [
            hook("trailing-whitespace", "true", &["text"]),
            hook("check-yaml", "sh -c 'exit 1' sh", &["yaml"]),
        ];
        let report = HookExecutor::new(dir.path())
            .run_resolution(
                &Resolution {
                    hooks: hooks.to_vec(),
                    errors: Vec::new(),
                },
                &files,
            )
            .await;

        assert_eq!(report.verdict, Verdict::CommitBlocked);
        assert_eq!(report.hooks[0].status, HookStatus::Passed);
        assert_eq!(
            report.hooks[1].status,
            HookStatus::Failed {
                failure: FailureKind::ExitCode { code: Some(1) }
            }
        );
    }

    #[tokio::test]
    async fn test_halt_policy() {
        let (dir, files) = project();
        let hooks = [
            hook("first", "false", &[]),
            hook("second", "true", &[]),
        ];

        let halting = HookExecutor::new(dir.path())
            .with_fail_fast(true)
            .run(&hooks, &files)
            .await;
        assert!(halting[0].status.is_failure());
        assert_eq!(
            halting[1].status,
            HookStatus::Skipped {
                reason: SkipReason::Halted
            }
        );

        let continuing = HookExecutor::new(dir.path()).run(&hooks, &files).await;
        assert!(continuing[0].status.is_failure());
        assert_eq!(continuing[1].status, HookStatus::Passed);
    }

    #[tokio::test]
    async fn test_skips() {
        let (dir, files) = project();
        let mut always = hook("always", "true", &["json"]);
        always.always_run = true;
        let mut disabled = hook("disabled", "false", &[]);
        disabled.enabled = false;
        let hooks = [hook("json-only", "false", &["json"]), always, disabled];

        let outcomes = HookExecutor::new(dir.path()).run(&hooks, &files).await;
        assert_eq!(
            outcomes[0].status,
            HookStatus::Skipped {
                reason: SkipReason::NoFiles
            }
        );
        assert_eq!(outcomes[1].status, HookStatus::Passed);
        assert!(outcomes[1].files.is_empty());
        assert_eq!(
            outcomes[2].status,
            HookStatus::Skipped {
                reason: SkipReason::Disabled
            }
        );
    }

    #[tokio::test]
    async fn test_modified_files_fail() {
        let (dir, files) = project();
        let fixer = hook(
            "fixer",
            r##"sh -c 'for f in "$@"; do echo "# fixed" >> "$f"; done' sh"##,
            &["python"],
        );
        let outcomes = HookExecutor::new(dir.path()).run(&[fixer], &files).await;
        assert_eq!(
            outcomes[0].status,
            HookStatus::Failed {
                failure: FailureKind::FilesModified {
                    paths: vec!["a.py".to_string()]
                }
            }
        );
    }

    #[tokio::test]
    async fn test_parallel_preserves_order() {
        let (dir, files) = project();
        let hooks = [
            hook("slow", "sh -c 'sleep 0.3; echo slow' sh", &[]),
            hook("fast", "sh -c 'echo fast' sh", &[]),
            hook("broken", "false", &[]),
        ];
        let outcomes = HookExecutor::new(dir.path())
            .with_jobs(3)
            .run(&hooks, &files)
            .await;
        let ids: Vec<_> = outcomes.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["slow", "fast", "broken"]);
        assert!(outcomes[0].output.contains("slow"));
        assert!(outcomes[2].status.is_failure());
    }

    #[tokio::test]
    async fn test_resolution_errors_block() {
        let (dir, files) = project();
        let resolution = Resolution {
            hooks: vec![hook("ok", "true", &[])],
            errors: vec![crate::ResolveError::UnknownHookId {
                repo: "https://a.example/hooks".to_string(),
                rev: "v1".to_string(),
                id: "nope".to_string(),
            }],
        };
        let report = HookExecutor::new(dir.path())
            .run_resolution(&resolution, &files)
            .await;
        assert_eq!(report.hooks[0].status, HookStatus::Passed);
        assert_eq!(report.verdict, Verdict::CommitBlocked);
        assert_eq!(report.resolution_errors[0].repo, "https://a.example/hooks");
    }

    #[tokio::test]
    async fn test_parallel_checker_ignores_concurrent_fixer() {
        let (dir, files) = project();
        let hooks = [
            hook(
                "fixer",
                r#"sh -c 'sleep 0.2; for f in "$@"; do echo y >> "$f"; done' sh"#,
                &["python"],
            ),
            hook("checker", "sh -c 'sleep 0.6' sh", &["python"]),
        ];
        let outcomes = HookExecutor::new(dir.path())
            .with_jobs(2)
            .run(&hooks, &files)
            .await;

        assert_eq!(
            outcomes[0].status,
            HookStatus::Failed {
                failure: FailureKind::FilesModified {
                    paths: vec!["a.py".to_string()]
                }
            }
        );
        assert_eq!(outcomes[1].status, HookStatus::Passed);
    }

    #[test]
    fn test_waves_split_on_shared_files() {
        let (_dir, files) = project();
        let mut no_names = hook("no-names", "true", &[]);
        no_names.pass_filenames = false;
        let hooks = [
            hook("py", "true", &["python"]),
            hook("yaml", "true", &["yaml"]),
            hook("json", "true", &["json"]),
            hook("text", "true", &["text"]),
            no_names,
            hook("py-again", "true", &["python"]),
        ];

        let ids: Vec<Vec<&str>> = waves(&hooks, &files)
            .iter()
            .map(|w| w.iter().map(|h| h.id.as_str()).collect())
            .collect();
        assert_eq!(
            ids,
            vec![
                vec!["py", "yaml", "json"],
                vec!["text"],
                vec!["no-names"],
                vec!["py-again"],
            ]
        );
    }
}

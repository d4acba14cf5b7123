//! Command hook handler - runs a hook's entry point as a child process.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use pinhook_config::Language;
use tokio::process::Command;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, warn};

use super::{
    HandlerError, HandlerResult, Invocation, MAX_BATCH_BYTES, command_bytes, partition, split_words,
};
use crate::hook::ResolvedHook;
use crate::result::FailureKind;

/// Set to `1` in every hook's environment.
const ENV_MARKER: &str = "PINHOOK";
/// Id of the running hook.
const ENV_HOOK_ID: &str = "PINHOOK_HOOK_ID";

/// Runs hooks with the project root as working directory.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    project_root: PathBuf,
    batch_bytes: usize,
}

impl CommandHandler {
    /// Create a handler for a project.
    #[must_use]
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            batch_bytes: MAX_BATCH_BYTES,
        }
    }

    /// Override the batch size limit.
    #[must_use]
    pub fn with_batch_bytes(mut self, batch_bytes: usize) -> Self {
        self.batch_bytes = batch_bytes.max(1);
        self
    }

    /// Project root hooks run in.
    #[must_use]
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Run `hook` against `files`.
    ///
    /// Files are split into batches; every batch must exit 0. Running stops
    /// at the first failing batch. The hook's timeout bounds all batches
    /// together.
    ///
    /// # Errors
    ///
    /// Returns an error if the hook's entry cannot be split into words.
    pub async fn execute(&self, hook: &ResolvedHook, files: &[&str]) -> HandlerResult<Invocation> {
        if hook.language == Language::Fail {
            let mut output = hook.entry.clone();
            for file in files {
                output.push('\n');
                output.push_str(file);
            }
            output.push('\n');
            return Ok(Invocation {
                failure: Some(FailureKind::FailLanguage),
                output,
                batches: 0,
            });
        }

        if let Language::Other(name) = &hook.language {
            warn!(
                hook = %hook.id,
                language = %name,
                "no environment support for language, running entry as a system command"
            );
        }

        let words = split_words(&hook.entry)?;
        let Some((program, entry_args)) = words.split_first() else {
            return Err(HandlerError::InvalidEntry {
                entry: hook.entry.clone(),
                message: "entry is empty",
            });
        };
        let program = self.program_path(hook, program);

        let batches = if hook.pass_filenames && !files.is_empty() {
            let fixed = command_bytes(words.iter().chain(&hook.args));
            partition(files, self.batch_bytes.saturating_sub(fixed).max(1))
        } else {
            vec![Vec::new()]
        };

        let deadline = Instant::now().checked_add(hook.timeout);
        let mut invocation = Invocation::default();
        for batch in batches {
            let mut cmd = Command::new(&program);
            cmd.args(entry_args)
                .args(&hook.args)
                .args(&batch)
                .current_dir(&self.project_root)
                .env(ENV_MARKER, "1")
                .env(ENV_HOOK_ID, &hook.id)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true);

            debug!(
                hook = %hook.id,
                program = %program.display(),
                args = ?hook.args,
                files = batch.len(),
                "invoking hook"
            );
            invocation.batches = invocation.batches.saturating_add(1);

            let result = match cmd.spawn() {
                Ok(child) => match deadline {
                    Some(deadline) => timeout_at(deadline, child.wait_with_output()).await,
                    None => Ok(child.wait_with_output().await),
                },
                Err(e) => {
                    invocation.failure = Some(FailureKind::SpawnError {
                        message: format!("{}: {e}", program.display()),
                    });
                    break;
                },
            };

            let output = match result {
                Ok(Ok(output)) => output,
                Ok(Err(e)) => {
                    invocation.failure = Some(FailureKind::SpawnError {
                        message: e.to_string(),
                    });
                    break;
                },
                Err(_) => {
                    warn!(hook = %hook.id, timeout_secs = hook.timeout.as_secs(), "hook timed out");
                    invocation.failure = Some(FailureKind::Timeout {
                        timeout_secs: hook.timeout.as_secs(),
                    });
                    break;
                },
            };

            invocation
                .output
                .push_str(&String::from_utf8_lossy(&output.stdout));
            invocation
                .output
                .push_str(&String::from_utf8_lossy(&output.stderr));

            if !output.status.success() {
                let code = output.status.code();
                debug!(hook = %hook.id, ?code, "hook exited non-zero");
                invocation.failure = Some(FailureKind::ExitCode { code });
                break;
            }
        }

        Ok(invocation)
    }

    /// `script` entries live in the repository that declares them: the
    /// checkout for fetched hooks, the project root for local ones. Everything
    /// else is looked up on `PATH` or relative to the project root.
    fn program_path(&self, hook: &ResolvedHook, program: &str) -> PathBuf {
        match (&hook.language, &hook.repo_dir) {
            (Language::Script, Some(dir)) => dir.join(program),
            (Language::Script, None) => self.project_root.join(program),
            _ => PathBuf::from(program),
        }
    }
}

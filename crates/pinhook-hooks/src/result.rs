//! Hook outcomes and the run report.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Why a hook did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No staged file passed the hook's filters.
    NoFiles,
    /// The declaration sets `enabled: false`.
    Disabled,
    /// An earlier hook failed under the halt policy.
    Halted,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NoFiles => "no files to check",
            Self::Disabled => "disabled",
            Self::Halted => "halted",
        })
    }
}

/// How a hook failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum FailureKind {
    /// The entry point exited non-zero. `None` when killed by a signal.
    ExitCode {
        /// Exit code.
        code: Option<i32>,
    },
    /// The entry point did not finish in time.
    Timeout {
        /// The limit that expired.
        timeout_secs: u64,
    },
    /// The entry point could not be started.
    SpawnError {
        /// OS error text.
        message: String,
    },
    /// The hook exited 0 but rewrote files it was given.
    FilesModified {
        /// Paths whose content changed.
        paths: Vec<String>,
    },
    /// A `fail` hook matched files.
    FailLanguage,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExitCode { code: Some(code) } => write!(f, "exit code {code}"),
            Self::ExitCode { code: None } => f.write_str("terminated by signal"),
            Self::Timeout { timeout_secs } => write!(f, "timed out after {timeout_secs}s"),
            Self::SpawnError { message } => write!(f, "failed to start: {message}"),
            Self::FilesModified { paths } => write!(f, "files were modified: {}", paths.join(", ")),
            Self::FailLanguage => f.write_str("matched a `fail` hook"),
        }
    }
}

/// Terminal state of one hook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum HookStatus {
    /// Every invocation exited 0.
    Passed,
    /// At least one invocation failed.
    Failed {
        /// The first failure.
        failure: FailureKind,
    },
    /// Never invoked.
    Skipped {
        /// Why.
        reason: SkipReason,
    },
}

impl HookStatus {
    /// Whether this status blocks the commit.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Whether the hook was skipped.
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }
}

/// The outcome of one hook, in declaration order within a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookOutcome {
    /// Hook id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Repository label.
    pub repo: String,
    /// Terminal state.
    #[serde(flatten)]
    pub status: HookStatus,
    /// Files the hook was invoked with.
    #[serde(default)]
    pub files: Vec<String>,
    /// Combined stdout and stderr of every invocation.
    #[serde(default)]
    pub output: String,
    /// Wall time in milliseconds.
    pub duration_ms: u64,
}

impl HookOutcome {
    /// An outcome for a hook that never ran.
    #[must_use]
    pub fn skipped(
        id: impl Into<String>,
        name: impl Into<String>,
        repo: impl Into<String>,
        reason: SkipReason,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            repo: repo.into(),
            status: HookStatus::Skipped { reason },
            files: Vec::new(),
            output: String::new(),
            duration_ms: 0,
        }
    }
}

/// A repository whose hooks could not be resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionFailure {
    /// Repository source.
    pub repo: String,
    /// Error text, naming the offending declaration.
    pub message: String,
}

/// Aggregate decision for the commit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Every invoked hook passed and every repository resolved.
    CommitAllowed,
    /// A hook failed or a repository did not resolve.
    CommitBlocked,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CommitAllowed => "commit allowed",
            Self::CommitBlocked => "commit blocked",
        })
    }
}

/// Everything one run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique id of this run.
    pub run_id: Uuid,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub completed_at: DateTime<Utc>,
    /// Hook outcomes in declaration order.
    pub hooks: Vec<HookOutcome>,
    /// Repositories that failed to resolve.
    #[serde(default)]
    pub resolution_errors: Vec<ResolutionFailure>,
    /// The decision.
    pub verdict: Verdict,
}

impl RunReport {
    /// Build a report, deriving the verdict from the outcomes.
    #[must_use]
    pub fn new(
        started_at: DateTime<Utc>,
        hooks: Vec<HookOutcome>,
        resolution_errors: Vec<ResolutionFailure>,
    ) -> Self {
        let blocked = !resolution_errors.is_empty() || hooks.iter().any(|h| h.status.is_failure());
        Self {
            run_id: Uuid::new_v4(),
            started_at,
            completed_at: Utc::now(),
            hooks,
            resolution_errors,
            verdict: if blocked {
                Verdict::CommitBlocked
            } else {
                Verdict::CommitAllowed
            },
        }
    }

    /// Look up a hook's outcome by id. Returns the first match.
    #[must_use]
    pub fn outcome(&self, id: &str) -> Option<&HookOutcome> {
        self.hooks.iter().find(|h| h.id == id)
    }

    /// Number of hooks with a given predicate on their status.
    #[must_use]
    pub fn count(&self, pred: impl Fn(&HookStatus) -> bool) -> usize {
        self.hooks.iter().filter(|h| pred(&h.status)).count()
    }

    /// Whether the commit may proceed.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        self.verdict == Verdict::CommitAllowed
    }
}

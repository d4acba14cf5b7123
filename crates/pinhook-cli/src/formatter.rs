//! Run report rendering.

use std::fmt::Write as _;

use clap::ValueEnum;
use colored::Colorize;
use pinhook_hooks::{HookOutcome, HookStatus, RunReport, SkipReason, Verdict};

use crate::theme::Theme;

/// Width of a hook status line.
const LINE_WIDTH: usize = 72;

/// How `run` prints its report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// One line per hook, details for failures.
    #[default]
    Pretty,
    /// The full report as JSON.
    Json,
}

/// Render a report for the terminal.
pub(crate) fn render_pretty(report: &RunReport) -> String {
    let mut out = String::new();

    for failure in &report.resolution_errors {
        let _ = writeln!(out, "{}", Theme::error(&failure.message));
    }

    for outcome in &report.hooks {
        let _ = writeln!(out, "{}", status_line(outcome));
        if let HookStatus::Failed { failure } = &outcome.status {
            let _ = writeln!(out, "{}", Theme::dimmed(&format!("- hook id: {}", outcome.id)));
            let _ = writeln!(out, "{}", Theme::dimmed(&format!("- {failure}")));
            if !outcome.output.trim().is_empty() {
                out.push('\n');
                for line in outcome.output.trim_end().lines() {
                    let _ = writeln!(out, "    {line}");
                }
                out.push('\n');
            }
        }
    }

    let _ = writeln!(out, "{}", Theme::separator());
    let summary = format!(
        "{} ({} passed, {} failed, {} skipped)",
        report.verdict,
        report.count(|s| *s == HookStatus::Passed),
        report.count(HookStatus::is_failure),
        report.count(HookStatus::is_skipped),
    );
    let _ = writeln!(
        out,
        "{}",
        match report.verdict {
            Verdict::CommitAllowed => Theme::success(&summary),
            Verdict::CommitBlocked => Theme::error(&summary),
        }
    );
    out
}

/// Render a report as pretty-printed JSON.
pub(crate) fn render_json(report: &RunReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

/// `Name.........Passed`, padded to [`LINE_WIDTH`].
fn status_line(outcome: &HookOutcome) -> String {
    let (note, label) = match &outcome.status {
        HookStatus::Passed => (String::new(), "Passed".green()),
        HookStatus::Failed { .. } => (String::new(), "Failed".red()),
        HookStatus::Skipped { reason } => (
            format!("({reason})"),
            match reason {
                SkipReason::NoFiles => "Skipped".cyan(),
                SkipReason::Disabled | SkipReason::Halted => "Skipped".yellow(),
            },
        ),
    };
    let used = outcome
        .name
        .chars()
        .count()
        .saturating_add(note.chars().count())
        .saturating_add(label.chars().count());
    let dots = ".".repeat(LINE_WIDTH.saturating_sub(used).max(3));
    format!("{}{dots}{}{label}", outcome.name, note.dimmed())
}

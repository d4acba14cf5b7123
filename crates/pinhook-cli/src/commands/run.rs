//! Run command - resolve the declared hooks and run them over the staged files.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Args;
use pinhook_config::{CONFIG_FILE_NAME, Document, Settings, load_document};
use pinhook_hooks::{
    FileSet, GitFetcher, HookExecutor, RepoStore, Resolver, RunReport, Verdict, git,
};
use tracing::{debug, info};

use crate::formatter::{self, OutputFormat};

/// Arguments of `pinhook run`.
#[derive(Debug, Args)]
pub(crate) struct RunArgs {
    /// Configuration document (defaults to .pre-commit-config.yaml at the repository root)
    #[arg(short, long)]
    pub(crate) config: Option<PathBuf>,

    /// Run over every tracked file instead of the staged ones
    #[arg(short, long, conflicts_with = "files")]
    pub(crate) all_files: bool,

    /// Run over these files instead of the staged ones
    #[arg(long, num_args = 1..)]
    pub(crate) files: Vec<String>,

    /// Run only the hook with this id
    #[arg(long)]
    pub(crate) hook: Option<String>,

    /// Stop at the first failing hook
    #[arg(long)]
    pub(crate) fail_fast: bool,

    /// Hooks to run at once
    #[arg(short, long)]
    pub(crate) jobs: Option<usize>,

    /// Default per-hook timeout in seconds
    #[arg(long)]
    pub(crate) timeout: Option<u64>,

    /// Report format
    #[arg(long, value_enum, default_value_t)]
    pub(crate) format: OutputFormat,
}

/// Where the files to check come from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum FileSource {
    Staged,
    All,
    Listed(Vec<String>),
}

impl RunArgs {
    fn file_source(&self) -> FileSource {
        if !self.files.is_empty() {
            FileSource::Listed(self.files.clone())
        } else if self.all_files {
            FileSource::All
        } else {
            FileSource::Staged
        }
    }
}

/// Run options after layering flags over settings and the document.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RunOptions {
    fail_fast: bool,
    jobs: usize,
    timeout: Duration,
    fetch_timeout: Duration,
}

impl RunOptions {
    fn layer(args: &RunArgs, settings: &Settings, document: &Document) -> Result<Self> {
        let jobs = args.jobs.unwrap_or(settings.run.jobs);
        if jobs == 0 {
            bail!("--jobs must be at least 1");
        }
        let timeout_secs = args.timeout.unwrap_or(settings.run.timeout_secs);
        if timeout_secs == 0 {
            bail!("--timeout must be at least 1 second");
        }
        Ok(Self {
            fail_fast: args.fail_fast || document.fail_fast || settings.run.fail_fast,
            jobs,
            timeout: Duration::from_secs(timeout_secs),
            fetch_timeout: Duration::from_secs(settings.cache.fetch_timeout_secs),
        })
    }
}

/// Run hooks and print the report. Returns the verdict for the exit code.
pub(crate) async fn run_hooks(args: &RunArgs, settings: &Settings) -> Result<Verdict> {
    let cwd = std::env::current_dir().context("cannot read the current directory")?;
    let source = args.file_source();
    let root = match (git::repo_root(&cwd).await, &source) {
        (Ok(root), _) => root,
        (Err(_), FileSource::Listed(_)) => cwd.clone(),
        (Err(e), _) => return Err(e).context("not inside a git repository"),
    };

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| root.join(CONFIG_FILE_NAME));
    let mut document = load_document(&config_path)?;
    if let Some(id) = &args.hook {
        select_hook(&mut document, id)?;
    }
    let options = RunOptions::layer(args, settings, &document)?;
    debug!(?options, config = %config_path.display(), "run options");

    let paths = collect_files(&root, source).await?;
    let files = FileSet::new(&root, paths, &document);
    info!(files = files.len(), hooks = document.hook_count(), "running hooks");

    let report = execute(&root, &document, &files, settings, &options).await?;
    match args.format {
        OutputFormat::Pretty => print!("{}", formatter::render_pretty(&report)),
        OutputFormat::Json => println!("{}", formatter::render_json(&report)?),
    }
    Ok(report.verdict)
}

async fn execute(
    root: &Path,
    document: &Document,
    files: &FileSet,
    settings: &Settings,
    options: &RunOptions,
) -> Result<RunReport> {
    let store = RepoStore::new(
        settings.cache_root()?,
        Arc::new(GitFetcher::new(options.fetch_timeout)),
    );
    let resolution = Resolver::new(Arc::new(store))
        .with_default_timeout(options.timeout)
        .resolve(document)
        .await;

    Ok(HookExecutor::new(root)
        .with_fail_fast(options.fail_fast)
        .with_jobs(options.jobs)
        .run_resolution(&resolution, files)
        .await)
}

async fn collect_files(root: &Path, source: FileSource) -> Result<Vec<String>> {
    Ok(match source {
        FileSource::Listed(files) => files,
        FileSource::All => git::all_files(root).await?,
        FileSource::Staged => git::staged_files(root).await?,
    })
}

/// Narrow the document to the declarations of one hook id.
fn select_hook(document: &mut Document, id: &str) -> Result<()> {
    for repo in &mut document.repos {
        repo.hooks.retain(|h| h.id == id);
    }
    document.repos.retain(|r| !r.hooks.is_empty());
    if document.repos.is_empty() {
        bail!("no hook with id '{id}' is declared");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinhook_config::parse_document;

    const DOC: &str = "\
repos:
  - repo: https://a.example/hooks
    rev: v1
    hooks:
      - id: check-yaml
      - id: trailing-whitespace
  - repo: https://b.example/hooks
    rev: v2
    hooks:
      - id: flake8
  - repo: local
    hooks:
      - {id: check-yaml, name: Local yaml, entry: 'true', language: system}
";

    fn args(extra: &[&str]) -> RunArgs {
        use clap::Parser;

        #[derive(Parser)]
        struct Wrapper {
            #[command(flatten)]
            args: RunArgs,
        }
        let argv = std::iter::once("run").chain(extra.iter().copied());
        Wrapper::try_parse_from(argv).unwrap().args
    }

    #[test]
    fn test_select_hook() {
        let mut doc = parse_document(DOC).unwrap();
        select_hook(&mut doc, "check-yaml").unwrap();
        assert_eq!(doc.repos.len(), 2);
        assert_eq!(doc.hook_count(), 2);
        assert!(doc.repos.iter().all(|r| r.hooks[0].id == "check-yaml"));

        let mut doc = parse_document(DOC).unwrap();
        assert!(select_hook(&mut doc, "missing").is_err());
    }

    #[test]
    fn test_file_source() {
        assert_eq!(args(&[]).file_source(), FileSource::Staged);
        assert_eq!(args(&["--all-files"]).file_source(), FileSource::All);
        assert_eq!(
            args(&["--files", "a.py", "b.yaml"]).file_source(),
            FileSource::Listed(vec!["a.py".to_string(), "b.yaml".to_string()])
        );
    }

    #[test]
    fn test_options_layering() {
        let settings = Settings::default();
        let doc = parse_document(DOC).unwrap();

        let defaults = RunOptions::layer(&args(&[]), &settings, &doc).unwrap();
        assert!(!defaults.fail_fast);
        assert_eq!(defaults.jobs, settings.run.jobs);
        assert_eq!(defaults.timeout, Duration::from_secs(settings.run.timeout_secs));

        let flagged = RunOptions::layer(
            &args(&["--fail-fast", "--jobs", "4", "--timeout", "5"]),
            &settings,
            &doc,
        )
        .unwrap();
        assert!(flagged.fail_fast);
        assert_eq!(flagged.jobs, 4);
        assert_eq!(flagged.timeout, Duration::from_secs(5));

        let halting = parse_document(&format!("fail_fast: true\n{DOC}")).unwrap();
        assert!(RunOptions::layer(&args(&[]), &settings, &halting).unwrap().fail_fast);

        assert!(RunOptions::layer(&args(&["--jobs", "0"]), &settings, &doc).is_err());
        assert!(RunOptions::layer(&args(&["--timeout", "0"]), &settings, &doc).is_err());
    }
}

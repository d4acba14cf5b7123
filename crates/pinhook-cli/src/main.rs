//! pinhook - pre-commit hook runner
//!
//! Reads `.pre-commit-config.yaml`, resolves every declared hook against its
//! pinned repository revision, and runs the hooks over the staged files.
//! Exits 0 when the commit may proceed, 1 when it is blocked and 2 on
//! configuration or usage errors.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use pinhook_config::Settings;
use pinhook_hooks::Verdict;
use pinhook_telemetry::{LogConfig, LogFormat};
use tracing::debug;

mod commands;
mod formatter;
mod theme;

use commands::{cache, install, run, sample, validate};
use theme::Theme;

const EXIT_BLOCKED: u8 = 1;
const EXIT_ERROR: u8 = 2;

/// pinhook - run pinned pre-commit hooks
#[derive(Parser)]
#[command(name = "pinhook")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log format: pretty, compact or json
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run hooks against the staged files
    Run(run::RunArgs),

    /// Check that a configuration document parses
    ValidateConfig {
        /// Document to check (defaults to .pre-commit-config.yaml)
        path: Option<PathBuf>,
    },

    /// Check that a hook manifest parses
    ValidateManifest {
        /// Manifest to check (defaults to .pre-commit-hooks.yaml)
        path: Option<PathBuf>,
    },

    /// Install the git pre-commit hook
    Install {
        /// Replace a pre-commit hook pinhook did not write
        #[arg(long)]
        force: bool,
    },

    /// Remove the git pre-commit hook
    Uninstall,

    /// Print a starter configuration document
    SampleConfig,

    /// Manage the repository cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
}

#[derive(Subcommand)]
enum CacheCommands {
    /// List cached repository checkouts
    List,
    /// Remove every cached checkout
    Clean,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = match Settings::load() {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("{}", Theme::error(&format!("invalid settings: {e}")));
            return ExitCode::from(EXIT_ERROR);
        },
    };
    let settings = loaded.settings;

    // Set up logging from settings, with -v and --log-format overrides.
    let format = cli
        .log_format
        .or_else(|| settings.logging.format.parse().ok())
        .unwrap_or_default();
    let log_config =
        LogConfig::from_verbosity(settings.logging.level.as_str(), cli.verbose).with_format(format);
    if let Err(e) = pinhook_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }
    debug!(
        files = ?loaded.loaded_files,
        env = ?loaded.env_overrides,
        "settings loaded"
    );

    match dispatch(cli.command, &settings).await {
        Ok(Verdict::CommitAllowed) => ExitCode::SUCCESS,
        Ok(Verdict::CommitBlocked) => ExitCode::from(EXIT_BLOCKED),
        Err(e) => {
            eprintln!("{}", Theme::error(&format!("{e:#}")));
            ExitCode::from(EXIT_ERROR)
        },
    }
}

/// Run a command. Commands other than `run` allow on success.
async fn dispatch(command: Commands, settings: &Settings) -> Result<Verdict> {
    match command {
        Commands::Run(args) => return run::run_hooks(&args, settings).await,
        Commands::ValidateConfig { path } => validate::validate_config(path.as_deref())?,
        Commands::ValidateManifest { path } => validate::validate_manifest(path.as_deref())?,
        Commands::Install { force } => install::install(force).await?,
        Commands::Uninstall => install::uninstall().await?,
        Commands::SampleConfig => sample::print_sample(),
        Commands::Cache { command } => handle_cache(&command, settings)?,
    }
    Ok(Verdict::CommitAllowed)
}

fn handle_cache(command: &CacheCommands, settings: &Settings) -> Result<()> {
    let store = cache::open_store(settings)?;
    match command {
        CacheCommands::List => cache::list_entries(&store),
        CacheCommands::Clean => cache::clean(&store),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_flags() {
        let cli = Cli::try_parse_from([
            "pinhook",
            "-vv",
            "run",
            "--all-files",
            "--hook",
            "check-yaml",
            "--jobs",
            "4",
            "--format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert!(args.all_files);
        assert_eq!(args.hook.as_deref(), Some("check-yaml"));
        assert_eq!(args.jobs, Some(4));
        assert_eq!(args.format, formatter::OutputFormat::Json);
    }

    #[test]
    fn test_files_conflict_with_all_files() {
        assert!(Cli::try_parse_from(["pinhook", "run", "--all-files", "--files", "a.py"]).is_err());
    }

    #[test]
    fn test_log_format_flag() {
        let cli = Cli::try_parse_from(["pinhook", "--log-format", "json", "sample-config"]).unwrap();
        assert_eq!(cli.log_format, Some(LogFormat::Json));
        assert!(Cli::try_parse_from(["pinhook", "--log-format", "xml", "sample-config"]).is_err());
    }
}

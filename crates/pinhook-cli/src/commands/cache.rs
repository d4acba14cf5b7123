//! Cache commands - inspect and clear fetched repositories.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use colored::Colorize;
use pinhook_config::Settings;
use pinhook_hooks::{GitFetcher, RepoStore};

use crate::theme::Theme;

/// Open the store at the configured cache root.
pub(crate) fn open_store(settings: &Settings) -> Result<RepoStore> {
    let fetcher = GitFetcher::new(Duration::from_secs(settings.cache.fetch_timeout_secs));
    Ok(RepoStore::new(settings.cache_root()?, Arc::new(fetcher)))
}

/// List cached checkouts, oldest first.
pub(crate) fn list_entries(store: &RepoStore) -> Result<()> {
    let entries = store.list()?;

    if entries.is_empty() {
        println!(
            "{}",
            Theme::info(&format!("Cache at {} is empty", store.root().display()))
        );
        return Ok(());
    }

    println!("\n{}", Theme::header("Cached Repositories"));
    println!(
        "{:>8} {:>16} {:<24} {}",
        "KEY".dimmed(),
        "FETCHED".dimmed(),
        "REV".dimmed(),
        "REPO".dimmed()
    );
    println!("{}", Theme::separator());

    for entry in &entries {
        println!(
            "{:>8} {:>16} {:<24} {}",
            Theme::short_key(&entry.key),
            Theme::timestamp(&entry.fetched_at),
            entry.rev,
            entry.repo
        );
    }

    println!();
    println!("{}", Theme::dimmed(&store.root().display().to_string()));
    Ok(())
}

/// Remove every cached checkout.
pub(crate) fn clean(store: &RepoStore) -> Result<()> {
    let removed = store.clean()?;
    println!(
        "{}",
        Theme::success(&format!(
            "Removed {removed} cached repositories from {}",
            store.root().display()
        ))
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinhook_test::{MockFetcher, standard_hook_repo};

    #[tokio::test]
    async fn test_list_and_clean() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = MockFetcher::new().with_repo("https://h.example/hooks", "v1", standard_hook_repo());
        let store = RepoStore::new(dir.path(), Arc::new(fetcher));

        list_entries(&store).unwrap();
        store.checkout("https://h.example/hooks", "v1").await.unwrap();
        assert_eq!(store.list().unwrap().len(), 1);
        list_entries(&store).unwrap();

        clean(&store).unwrap();
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_open_store_uses_configured_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.cache.dir = Some(dir.path().to_path_buf());
        assert_eq!(open_store(&settings).unwrap().root(), dir.path());
    }
}

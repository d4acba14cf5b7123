//! Resolution behavior across repositories: isolation of per-repository
//! errors, single-flight fetching and parse failures before any fetch.

use std::time::Duration;

use pinhook_config::{ConfigError, parse_document};
use pinhook_hooks::{HookStatus, ResolveError, Verdict};
use pinhook_test::prelude::*;

const OTHER_REPO: &str = "https://github.com/example/other-hooks";

const OTHER_MANIFEST: &str = "\
- id: always-ok
  name: Always OK
  entry: 'true'
  language: system
  always_run: true
  pass_filenames: false
";

fn two_repo_document(other_hooks: &str) -> String {
    format!(
        "{}  - repo: {OTHER_REPO}\n    rev: v1.0.0\n    hooks:\n{other_hooks}",
        standard_document(&["{id: check-yaml}"])
    )
}

#[tokio::test]
async fn test_unknown_hook_id_is_isolated_to_its_repository() {
    init_test_logging();
    let fetcher = standard_fetcher_with(OTHER_REPO, "v1.0.0", MockRepo::new(OTHER_MANIFEST));
    let harness = TestHarness::with_fetcher(fetcher);
    harness.project().write("b.yaml", "a: 1\n");

    let report = harness
        .run(&two_repo_document("      - id: no-such-hook\n"), &["b.yaml"])
        .await;

    assert_eq!(report.verdict, Verdict::CommitBlocked);
    assert_eq!(report.outcome("check-yaml").unwrap().status, HookStatus::Passed);
    assert_eq!(report.resolution_errors.len(), 1);
    assert_eq!(report.resolution_errors[0].repo, OTHER_REPO);
    assert!(report.resolution_errors[0].message.contains("no-such-hook"));
}

#[tokio::test]
async fn test_unresolvable_revision_names_repository() {
    let harness = TestHarness::standard();
    let doc = parse_document(&format!(
        "repos:\n  - repo: {STANDARD_REPO}\n    rev: v9.9.9\n    hooks:\n      - id: check-yaml\n"
    ))
    .unwrap();

    let resolution = harness.resolve(&doc).await;
    assert!(resolution.hooks.is_empty());
    assert!(matches!(
        &resolution.errors[..],
        [ResolveError::UnresolvableRevision { repo, rev, .. }]
            if repo == STANDARD_REPO && rev == "v9.9.9"
    ));
}

#[tokio::test]
async fn test_two_repositories_resolve_in_declaration_order() {
    let fetcher = standard_fetcher_with(OTHER_REPO, "v1.0.0", MockRepo::new(OTHER_MANIFEST));
    let harness = TestHarness::with_fetcher(fetcher);
    harness.project().write("b.yaml", "a: 1\n");

    let report = harness
        .run(&two_repo_document("      - id: always-ok\n"), &["b.yaml"])
        .await;

    assert_eq!(report.verdict, Verdict::CommitAllowed, "{report:#?}");
    let ids: Vec<&str> = report.hooks.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, vec!["check-yaml", "always-ok"]);
    assert_eq!(
        report.outcome("always-ok").unwrap().repo,
        format!("{OTHER_REPO}@v1.0.0")
    );
}

#[tokio::test]
async fn test_concurrent_resolution_fetches_once() {
    let fetcher = TestHarness::standard_fetcher().with_delay(Duration::from_millis(200));
    let harness = TestHarness::with_fetcher(fetcher);
    let doc = parse_document(&standard_document(&[])).unwrap();

    let resolutions =
        futures::future::join_all((0..8).map(|_| harness.resolve(&doc))).await;

    assert!(resolutions.iter().all(|r| r.is_complete() && r.hooks.len() == 2));
    assert_eq!(harness.fetcher().fetch_count(STANDARD_REPO, STANDARD_REV), 1);
}

#[tokio::test]
async fn test_separate_stores_share_the_cache() {
    let first = TestHarness::standard();
    let doc = parse_document(&standard_document(&[])).unwrap();
    assert!(first.resolve(&doc).await.is_complete());

    // A fresh store over the same root finds the entry on disk.
    let second = pinhook_hooks::RepoStore::new(
        first.cache_root(),
        std::sync::Arc::new(MockFetcher::new()),
    );
    let checkout = second.checkout(STANDARD_REPO, STANDARD_REV).await.unwrap();
    assert!(checkout.join(".pre-commit-hooks.yaml").exists());
    assert_eq!(second.list().unwrap().len(), 1);
}

#[tokio::test]
async fn test_malformed_document_fails_before_resolution() {
    let harness = TestHarness::standard();
    let duplicate = standard_document(&["{id: check-yaml}", "{id: check-yaml}"]);

    let err = parse_document(&duplicate).unwrap_err();
    assert!(matches!(err, ConfigError::MalformedConfig { .. }));
    assert!(err.to_string().contains("check-yaml"), "{err}");
    assert!(harness.fetcher().calls().is_empty());
}

#[tokio::test]
async fn test_local_hooks_need_no_fetch() {
    let harness = TestHarness::new();
    harness.project().write("a.py", "print(1)\n");
    let doc = "\
repos:
  - repo: local
    hooks:
      - id: no-print
        name: No print calls
        entry: grep -n print
        language: system
        types: [python]
      - id: forbidden
        name: Forbidden files
        entry: forbidden file
        language: fail
        files: '\\.orig$'
";

    let report = harness.run(doc, &["a.py"]).await;
    // grep exits 0 when it finds a match, so this hook passes
    assert_eq!(report.outcome("no-print").unwrap().status, HookStatus::Passed);
    assert!(report.outcome("forbidden").unwrap().status.is_skipped());
    assert!(harness.fetcher().calls().is_empty());
    assert_eq!(report.verdict, Verdict::CommitAllowed);
}

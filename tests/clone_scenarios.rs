//! End-to-end clone scenarios against the in-memory platform and git.
//!
//! These tests drive `SiteCloner` through complete runs and check what it
//! asked the platform and git to do.

mod common;

use common::*;
use site_clone::backups::BackupPolicy;
use site_clone::error::Error;
use site_clone::phases::code::PlanCase;
use site_clone::site::{Element, Env};
use tempfile::TempDir;

#[test]
fn test_acme_clone_with_test_environment_current() {
    let temp = TempDir::new().unwrap();
    let platform = acme();
    let git = FakeGit::new();
    let mut cloner = cloner(&platform, &git, temp.path(), false);

    let summary = cloner.clone_site_at(&acme_options(), now()).unwrap();

    assert_eq!(summary.target.name, "acme-copy");
    assert_eq!(summary.plan.case, PlanCase::TestCurrent);
    assert_eq!(platform.calls_with("create "), vec!["create acme-copy"]);
    assert_eq!(
        platform.calls_with("connection-mode "),
        vec!["connection-mode acme-copy dev git"]
    );

    // Only test is deployed; live is never touched.
    assert_eq!(platform.calls_with("deploy "), vec!["deploy acme-copy test"]);

    // Content for dev and test, not for live or the multidev.
    let imports = platform.calls_with("import ");
    assert_eq!(imports.len(), 4);
    assert!(imports.iter().all(|c| c.starts_with("import acme-copy dev")
        || c.starts_with("import acme-copy test")));
    assert_eq!(summary.content.envs, vec![Env::Dev, Env::Test]);
    assert!(summary.content.failures.is_empty());

    // Mail is disabled and addresses scrubbed on both environments.
    for env in ["dev", "test"] {
        let prefix = format!("remote acme-copy {} drush", env);
        let remote = platform.calls_with(&prefix);
        assert!(remote.iter().any(|c| c.contains("vset smtp_host NOEMAIL-FROM-CLONED-SITE.example.com")));
        assert!(remote.iter().any(|c| c.contains("sqlq \"update users set mail = '' where uid <> 0\"")));
    }
    assert!(platform.calls_with("remote acme-copy live").is_empty());
    assert_eq!(
        summary.content.hooks.ran,
        vec!["disable-smtp", "remove-emails", "disable-smtp", "remove-emails"]
    );
    assert!(summary.is_clean());
}

#[test]
fn test_acme_git_sequence() {
    let temp = TempDir::new().unwrap();
    let platform = acme();
    let git = FakeGit::new();
    let mut cloner = cloner(&platform, &git, temp.path(), false);

    cloner.clone_site_at(&acme_options(), now()).unwrap();

    let commands = git.commands();
    let source = temp.path().join("acme").display().to_string();
    assert!(commands[0].starts_with("git clone ssh://codeserver.dev.acme-id@"));
    assert!(commands[1].starts_with("git clone ssh://codeserver.dev.acme-copy-id@"));
    assert_eq!(
        commands[2],
        format!("git pull --no-rebase --no-squash --no-edit -X theirs {} master", source)
    );
    assert_eq!(commands[3], "git rev-parse master");
    assert_eq!(commands[4], "git reset --hard 9f3c2a1b");
    assert_eq!(commands[5], "git push --force origin master");
    assert_eq!(commands.len(), 6);
}

#[test]
fn test_default_hooks_can_be_skipped_everywhere() {
    let temp = TempDir::new().unwrap();
    let platform = acme();
    let git = FakeGit::new();
    let mut cloner = cloner(&platform, &git, temp.path(), false);

    let mut options = acme_options();
    options.skip_hooks = skip(&["disable-smtp", "remove-emails"]);
    let summary = cloner.clone_site_at(&options, now()).unwrap();

    let remote = platform.calls_with("remote acme-copy");
    assert!(remote.iter().all(|c| !c.contains("vset") && !c.contains("sqlq")));
    assert!(summary.content.hooks.ran.is_empty());
    assert_eq!(summary.content.hooks.skipped.len(), 4);
}

#[test]
fn test_source_equal_to_target_fails_before_any_platform_call() {
    let temp = TempDir::new().unwrap();
    let platform = acme();
    let git = FakeGit::new();
    let mut cloner = cloner(&platform, &git, temp.path(), false);

    let err = cloner
        .clone_site_at(&site_clone::phases::orchestrator::CloneOptions::new("acme", "acme"), now())
        .unwrap_err();

    assert!(matches!(err, Error::Validation { .. }));
    assert_eq!(platform.lookups(), 0);
    assert!(platform.calls().is_empty());
    assert!(git.calls.lock().unwrap().is_empty());
}

#[test]
fn test_missing_git_is_a_validation_error() {
    let temp = TempDir::new().unwrap();
    let platform = acme();
    let mut cloner = cloner(&platform, &FakeGit::missing(), temp.path(), false);

    let err = cloner.clone_site_at(&acme_options(), now()).unwrap_err();
    assert!(err.is_validation());
    assert!(err.to_string().contains("git"));
    assert_eq!(platform.lookups(), 0);
}

#[test]
fn test_unknown_source_site() {
    let temp = TempDir::new().unwrap();
    let platform = FakePlatform::new();
    let git = FakeGit::new();
    let mut cloner = cloner(&platform, &git, temp.path(), false);

    let err = cloner.clone_site_at(&acme_options(), now()).unwrap_err();
    assert!(matches!(err, Error::SiteNotFound { ref site } if site == "acme"));
    assert!(platform.calls().is_empty());
}

#[test]
fn test_existing_target_is_rejected() {
    let temp = TempDir::new().unwrap();
    let platform = acme().with_site("acme-copy", "drupal");
    let git = FakeGit::new();
    let mut cloner = cloner(&platform, &git, temp.path(), false);

    let err = cloner.clone_site_at(&acme_options(), now()).unwrap_err();
    assert!(err.is_validation());
    assert!(err.to_string().contains("already exists"));
    assert!(platform.calls_with("create ").is_empty());
}

#[test]
fn test_provisioning_failure_is_fatal() {
    let temp = TempDir::new().unwrap();
    let platform = acme().failing_create();
    let git = FakeGit::new();
    let mut cloner = cloner(&platform, &git, temp.path(), false);

    let err = cloner.clone_site_at(&acme_options(), now()).unwrap_err();
    assert!(matches!(err, Error::Provisioning { .. }));
    assert!(git.commands().is_empty());
    assert!(platform.calls_with("connection-mode").is_empty());
}

#[test]
fn test_pending_commits_on_test_and_live() {
    let temp = TempDir::new().unwrap();
    let platform = FakePlatform::new()
        .with_site("shop", "drupal")
        .with_env("shop", "dev", true)
        .with_env("shop", "test", true)
        .with_env("shop", "live", true)
        .with_deployable("shop", Env::Test, 2)
        .with_deployable("shop", Env::Live, 3)
        .with_fresh_backups("shop", &[Env::Dev, Env::Test, Env::Live]);
    let git = FakeGit::new();
    let mut cloner = cloner(&platform, &git, temp.path(), false);

    let summary = cloner
        .clone_site_at(
            &site_clone::phases::orchestrator::CloneOptions::new("shop", "qa-shop"),
            now(),
        )
        .unwrap();

    assert_eq!(summary.plan.case, PlanCase::PendingCommits);
    assert_eq!(
        platform.calls_with("deploy "),
        vec!["deploy qa-shop test", "deploy qa-shop live", "deploy qa-shop test"]
    );

    let commands = git.commands();
    let plan_commands: Vec<&str> = commands[5..].iter().map(String::as_str).collect();
    assert_eq!(
        plan_commands,
        vec![
            "git branch -f original",
            "git reset --hard HEAD~5",
            "git push --force origin master",
            "git merge --no-edit original",
            "git reset --hard HEAD~2",
            "git push --force origin master",
            "git merge --no-edit original",
            "git push origin master",
        ]
    );
    assert_eq!(summary.content.envs, vec![Env::Dev, Env::Test, Env::Live]);
}

#[test]
fn test_failed_push_aborts_with_recreation_error() {
    let temp = TempDir::new().unwrap();
    let platform = acme();
    let git = FakeGit::new().failing_on("push --force");
    let mut cloner = cloner(&platform, &git, temp.path(), false);

    let err = cloner.clone_site_at(&acme_options(), now()).unwrap_err();
    match err {
        Error::Recreation { site, step, .. } => {
            assert_eq!(site, "acme-copy");
            assert_eq!(step, "force-push");
        }
        other => panic!("expected recreation error, got {other:?}"),
    }
    assert!(platform.calls_with("deploy ").is_empty());
    assert!(platform.calls_with("import ").is_empty());
}

#[test]
fn test_missing_backup_and_failed_import_are_recorded() {
    let temp = TempDir::new().unwrap();
    // No files backup for test, and the dev database import fails.
    let platform = FakePlatform::new()
        .with_site("acme", "drupal")
        .with_env("acme", "dev", true)
        .with_env("acme", "test", true)
        .with_deployable("acme", Env::Test, 0)
        .with_fresh_backups("acme", &[Env::Dev])
        .with_backup("acme", Env::Test, Element::Database, 5)
        .failing_import(Env::Dev, Element::Database);
    let git = FakeGit::new();
    let mut cloner = cloner(&platform, &git, temp.path(), false);

    let summary = cloner.clone_site_at(&acme_options(), now()).unwrap();

    assert_eq!(
        summary.content.imported,
        vec![(Env::Dev, Element::Files), (Env::Test, Element::Database)]
    );
    let failed: Vec<(Env, Element)> = summary
        .content
        .failures
        .iter()
        .map(|f| (f.env, f.element))
        .collect();
    assert_eq!(failed, vec![(Env::Dev, Element::Database), (Env::Test, Element::Files)]);
    assert!(!summary.is_clean());
    // Hooks still ran for both environments.
    assert_eq!(summary.content.hooks.ran.len(), 4);
}

#[test]
fn test_latest_backup_is_imported() {
    let temp = TempDir::new().unwrap();
    let platform = FakePlatform::new()
        .with_site("acme", "drupal")
        .with_env("acme", "dev", true)
        .with_backup("acme", Env::Dev, Element::Database, 30)
        .with_backup("acme", Env::Dev, Element::Database, 3)
        .with_backup("acme", Env::Dev, Element::Files, 3);
    let git = FakeGit::new();
    let mut cloner = cloner(&platform, &git, temp.path(), false);

    let summary = cloner.clone_site_at(&acme_options(), now()).unwrap();

    assert_eq!(summary.plan.case, PlanCase::DevOnly);
    let imports = platform.calls_with("import acme-copy dev database");
    assert_eq!(imports.len(), 1);
    assert!(imports[0].ends_with("acme_dev_database_3h.tar.gz"));
    assert!(platform.calls_with("deploy ").is_empty());
}

#[test]
fn test_refresh_backups_creates_only_stale_ones() {
    let temp = TempDir::new().unwrap();
    let platform = FakePlatform::new()
        .with_site("acme", "drupal")
        .with_env("acme", "dev", true)
        .with_backup("acme", Env::Dev, Element::Database, 49)
        .with_backup("acme", Env::Dev, Element::Files, 47);
    let git = FakeGit::new();
    let mut cloner = cloner(&platform, &git, temp.path(), false);

    let mut options = acme_options();
    options.backup_policy = Some(BackupPolicy::IfStale);
    let summary = cloner.clone_site_at(&options, now()).unwrap();

    assert_eq!(summary.backups_created, vec![(Env::Dev, Element::Database)]);
    assert_eq!(platform.calls_with("backup "), vec!["backup acme dev database"]);
    // Backups are refreshed before the target exists.
    let calls = platform.calls();
    assert!(calls[0].starts_with("backup "));
}

#[test]
fn test_code_hook_runs_once_for_dev() {
    let temp = TempDir::new().unwrap();
    let platform = acme();
    let git = FakeGit::new();
    let mut cloner = cloner(&platform, &git, temp.path(), false);

    let summary = cloner.clone_site_at(&acme_options(), now()).unwrap();

    assert_eq!(summary.code_hooks.ran, vec!["copy-contrib-code"]);
    assert_eq!(
        platform.calls_with("remote acme dev drush status"),
        vec!["remote acme dev drush status --format=json"]
    );
}

#[test]
fn test_git_reset_tag() {
    let temp = TempDir::new().unwrap();
    let platform = acme();
    let git = FakeGit::new();
    let mut cloner = cloner(&platform, &git, temp.path(), false);

    let mut options = acme_options();
    options.git_reset_tag = Some("v1.2".to_string());
    cloner.clone_site_at(&options, now()).unwrap();

    let commands = git.commands();
    let tail: Vec<&str> = commands[commands.len() - 3..]
        .iter()
        .map(String::as_str)
        .collect();
    assert_eq!(
        tail,
        vec![
            "git rev-list -n 1 v1.2",
            "git reset --hard 4e5d6c7b",
            "git push --force origin master",
        ]
    );
}

#[test]
fn test_keep_workdirs_reports_retained_paths() {
    let temp = TempDir::new().unwrap();
    let platform = acme();
    let git = FakeGit::new();
    let mut cloner = cloner(&platform, &git, temp.path(), true);

    let summary = cloner.clone_site_at(&acme_options(), now()).unwrap();
    assert_eq!(
        summary.retained_workdirs,
        vec![temp.path().join("acme"), temp.path().join("acme-copy")]
    );
}

#[test]
fn test_target_defaults_to_source_org_and_upstream() {
    let temp = TempDir::new().unwrap();
    let platform = acme();
    let git = FakeGit::new();
    let mut cloner = cloner(&platform, &git, temp.path(), false);

    let mut options = acme_options();
    options.target_upstream = Some("custom-upstream".to_string());
    let summary = cloner.clone_site_at(&options, now()).unwrap();

    assert_eq!(summary.target.organization.as_deref(), Some("agency"));
    assert_eq!(summary.target.upstream.as_deref(), Some("custom-upstream"));
}

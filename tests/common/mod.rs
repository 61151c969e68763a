//! Shared test utilities for integration and E2E tests.
//!
//! This module provides in-memory stand-ins for the hosting platform and for
//! git, so the clone engine can run end to end without network access.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::*;
//!
//! #[test]
//! fn test_example() {
//!     let platform = FakePlatform::new().with_site("acme", "drupal");
//!     let git = FakeGit::new();
//!     // ... test code
//! }
//! ```

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};

use site_clone::error::{Error, Result};
use site_clone::hooks::{self, SkipList};
use site_clone::phases::orchestrator::{CloneOptions, SiteCloner};
use site_clone::platform::{Platform, RemoteCommand};
use site_clone::repository::RepositoryManager;
use site_clone::runner::{CommandOutput, CommandRunner, Invocation};
use site_clone::site::{
    Backup, ConnectionInfo, ConnectionMode, Element, Env, EnvironmentInfo, NewSite, RemoteOutput,
    Site,
};
use site_clone::workspace::Workspace;

/// Fixed "now" used by every scenario.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
}

/// Everything the fake platform knows and everything it was asked to do.
#[derive(Debug, Default)]
pub struct PlatformState {
    pub sites: BTreeMap<String, Site>,
    pub environments: BTreeMap<String, Vec<EnvironmentInfo>>,
    pub deployable: BTreeMap<(String, Env), u32>,
    pub backups: BTreeMap<(String, Env, Element), Vec<Backup>>,
    /// One line per mutating or remote call, e.g. `deploy acme-copy test`.
    pub calls: Vec<String>,
    /// Number of read-only lookups (site, environments, commits, backups).
    pub lookups: usize,
    pub fail_imports: BTreeSet<(Env, Element)>,
    pub fail_create: bool,
    pub fail_backup_creation: bool,
    /// Reported by `drush status` on any site.
    pub cms_version: String,
}

/// In-memory platform. Clones share state, so a test can keep a handle to
/// inspect what the engine did.
#[derive(Clone, Default)]
pub struct FakePlatform {
    pub state: Arc<Mutex<PlatformState>>,
}

impl FakePlatform {
    pub fn new() -> Self {
        let platform = Self::default();
        platform.state.lock().unwrap().cms_version = "7.98".to_string();
        platform
    }

    pub fn with_site(self, name: &str, framework: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.sites.insert(
                name.to_string(),
                Site {
                    name: name.to_string(),
                    id: format!("{}-id", name),
                    organization: Some("agency".to_string()),
                    upstream: Some("drupal7".to_string()),
                    framework: Some(framework.to_string()),
                },
            );
            state.environments.entry(name.to_string()).or_default();
        }
        self
    }

    pub fn with_env(self, site: &str, env: &str, initialized: bool) -> Self {
        self.state
            .lock()
            .unwrap()
            .environments
            .entry(site.to_string())
            .or_default()
            .push(EnvironmentInfo {
                name: env.to_string(),
                initialized,
            });
        self
    }

    pub fn with_deployable(self, site: &str, env: Env, count: u32) -> Self {
        self.state
            .lock()
            .unwrap()
            .deployable
            .insert((site.to_string(), env), count);
        self
    }

    /// Adds a finished backup that completed `age_hours` before [`now`].
    pub fn with_backup(self, site: &str, env: Env, element: Element, age_hours: i64) -> Self {
        let backup = Backup {
            id: format!("{}_{}_{}_{}h.tar.gz", site, env, element, age_hours),
            element,
            finish_time: now() - Duration::hours(age_hours),
        };
        self.state
            .lock()
            .unwrap()
            .backups
            .entry((site.to_string(), env, element))
            .or_default()
            .push(backup);
        self
    }

    /// Adds fresh database and files backups for every listed environment.
    pub fn with_fresh_backups(mut self, site: &str, envs: &[Env]) -> Self {
        for env in envs {
            for element in Element::CONTENT {
                self = self.with_backup(site, *env, element, 2);
            }
        }
        self
    }

    pub fn failing_import(self, env: Env, element: Element) -> Self {
        self.state.lock().unwrap().fail_imports.insert((env, element));
        self
    }

    pub fn failing_create(self) -> Self {
        self.state.lock().unwrap().fail_create = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Calls starting with `prefix`.
    pub fn calls_with(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .collect()
    }

    pub fn lookups(&self) -> usize {
        self.state.lock().unwrap().lookups
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }
}

impl Platform for FakePlatform {
    fn find_site(&self, name: &str) -> Result<Option<Site>> {
        let mut state = self.state.lock().unwrap();
        state.lookups += 1;
        Ok(state.sites.get(name).cloned())
    }

    fn environments(&self, site: &Site) -> Result<Vec<EnvironmentInfo>> {
        let mut state = self.state.lock().unwrap();
        state.lookups += 1;
        Ok(state.environments.get(&site.name).cloned().unwrap_or_default())
    }

    fn count_deployable_commits(&self, site: &Site, env: Env) -> Result<u32> {
        let mut state = self.state.lock().unwrap();
        state.lookups += 1;
        state
            .deployable
            .get(&(site.name.clone(), env))
            .copied()
            .ok_or_else(|| Error::EnvironmentNotFound {
                site: site.name.clone(),
                env: env.to_string(),
            })
    }

    fn connection_info(&self, site: &Site, env: Env) -> Result<ConnectionInfo> {
        Ok(ConnectionInfo {
            git_url: None,
            git_command: Some(format!(
                "git clone ssh://codeserver.{env}.{id}@codeserver.{env}.{id}.drush.in:2222/~/repository.git {name}",
                env = env,
                id = site.id,
                name = site.name
            )),
        })
    }

    fn set_connection_mode(&self, site: &Site, env: Env, mode: ConnectionMode) -> Result<()> {
        self.record(format!("connection-mode {} {} {}", site.name, env, mode.as_str()));
        Ok(())
    }

    fn finished_backups(&self, site: &Site, env: Env, element: Element) -> Result<Vec<Backup>> {
        let mut state = self.state.lock().unwrap();
        state.lookups += 1;
        Ok(state
            .backups
            .get(&(site.name.clone(), env, element))
            .cloned()
            .unwrap_or_default())
    }

    fn backup_url(&self, site: &Site, env: Env, backup: &Backup) -> Result<String> {
        Ok(format!(
            "https://backups.example.com/{}/{}/{}",
            site.name, env, backup.id
        ))
    }

    fn create_backup(&self, site: &Site, env: Env, element: Element) -> Result<()> {
        if self.state.lock().unwrap().fail_backup_creation {
            return Err(Error::Platform {
                command: "backup create".to_string(),
                message: "workflow failed".to_string(),
            });
        }
        self.record(format!("backup {} {} {}", site.name, env, element));
        Ok(())
    }

    fn run_remote_command(
        &self,
        site: &Site,
        env: Env,
        command: &RemoteCommand,
    ) -> Result<RemoteOutput> {
        self.record(format!("remote {} {} {}", site.name, env, command.command_line()));
        let state = self.state.lock().unwrap();
        let output = if command.args.first().map(String::as_str) == Some("status") {
            format!(r#"{{"drupal-version": "{}"}}"#, state.cms_version)
        } else {
            String::new()
        };
        Ok(RemoteOutput {
            exit_code: 0,
            output,
        })
    }

    fn create_site(&self, new_site: &NewSite) -> Result<()> {
        self.record(format!("create {}", new_site.name));
        let mut state = self.state.lock().unwrap();
        if state.fail_create {
            return Err(Error::Provisioning {
                site: new_site.name.clone(),
                message: "organization quota exceeded".to_string(),
            });
        }
        state.sites.insert(
            new_site.name.clone(),
            Site {
                name: new_site.name.clone(),
                id: format!("{}-id", new_site.name),
                organization: new_site.organization.clone(),
                upstream: new_site.upstream.clone(),
                framework: Some("drupal".to_string()),
            },
        );
        state.environments.insert(
            new_site.name.clone(),
            Env::ALL
                .iter()
                .map(|env| EnvironmentInfo {
                    name: env.to_string(),
                    initialized: *env == Env::Dev,
                })
                .collect(),
        );
        Ok(())
    }

    fn import_content(&self, site: &Site, env: Env, element: Element, url: &str) -> Result<()> {
        self.record(format!("import {} {} {} {}", site.name, env, element, url));
        if self.state.lock().unwrap().fail_imports.contains(&(env, element)) {
            return Err(Error::Platform {
                command: "import-content".to_string(),
                message: "archive is corrupt".to_string(),
            });
        }
        Ok(())
    }

    fn deploy(&self, site: &Site, env: Env, _note: &str) -> Result<()> {
        self.record(format!("deploy {} {}", site.name, env));
        Ok(())
    }
}

/// Git stand-in: records every invocation and answers the few queries the
/// engine makes. Nothing touches the disk.
#[derive(Clone, Default)]
pub struct FakeGit {
    pub calls: Arc<Mutex<Vec<Invocation>>>,
    fail_on: Option<String>,
    missing: bool,
}

impl FakeGit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails every invocation whose rendered command line contains `needle`.
    pub fn failing_on(mut self, needle: &str) -> Self {
        self.fail_on = Some(needle.to_string());
        self
    }

    /// Behaves as if git were not installed.
    pub fn missing() -> Self {
        Self {
            missing: true,
            ..Self::default()
        }
    }

    /// Every git invocation as `git <args>`, `--version` probes excluded.
    pub fn commands(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.args.first().map(String::as_str) != Some("--version"))
            .map(|c| c.to_string())
            .collect()
    }
}

impl CommandRunner for FakeGit {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        if self.missing {
            return Err(Error::Spawn {
                program: invocation.program.clone(),
                message: "No such file or directory".to_string(),
            });
        }
        self.calls.lock().unwrap().push(invocation.clone());
        let line = invocation.to_string();
        if self.fail_on.as_deref().is_some_and(|needle| line.contains(needle)) {
            return Ok(CommandOutput::failed(1, format!("fatal: {} failed", line)));
        }
        let stdout = match invocation.args.first().map(String::as_str) {
            Some("rev-parse") => "9f3c2a1b\n",
            Some("rev-list") => "4e5d6c7b\n",
            _ => "",
        };
        Ok(CommandOutput::ok(stdout))
    }
}

/// Builds a cloner over the fakes, with working copies under `workdir`.
pub fn cloner(platform: &FakePlatform, git: &FakeGit, workdir: &Path, keep: bool) -> SiteCloner {
    let repos = RepositoryManager::with_runner(
        Box::new(git.clone()),
        Workspace::new(workdir, keep),
        "master",
    );
    SiteCloner::new(Box::new(platform.clone()), repos, hooks::default_registry())
}

/// The "acme" source: dev and test initialized, test fully deployed, live
/// present but never initialized.
pub fn acme() -> FakePlatform {
    FakePlatform::new()
        .with_site("acme", "drupal")
        .with_env("acme", "dev", true)
        .with_env("acme", "test", true)
        .with_env("acme", "live", false)
        .with_env("acme", "feature-x", true)
        .with_deployable("acme", Env::Test, 0)
        .with_fresh_backups("acme", &[Env::Dev, Env::Test])
}

pub fn acme_options() -> CloneOptions {
    CloneOptions::new("acme", "acme-copy")
}

pub fn skip(names: &[&str]) -> SkipList {
    names.iter().collect()
}

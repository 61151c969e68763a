//! Orchestrator for the complete clone operation
//!
//! This module sequences every phase of a clone behind one call,
//! [`SiteCloner::clone_site`]:
//!
//! 1. Validate the request (no platform call happens before the target name
//!    has been checked against the source name)
//! 2. Read the source topology and plan the code recreation
//! 3. Optionally refresh stale backups
//! 4. Provision the target site and switch its dev environment to git mode
//! 5. Clone both sites, merge source into target, pin target to source HEAD
//! 6. Execute the code plan, optionally reset to a tag, run code hooks
//! 7. Replicate content per environment and run content hooks
//! 8. Release the working copies
//!
//! Steps 1 to 6 are fatal on failure. Content and hook failures are recorded
//! in the returned [`CloneSummary`].

use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use log::info;

use super::code::{self, CodePlan};
use super::content::{ContentPipeline, ContentReport};
use super::topology::{Topology, TopologyReader};
use crate::backups::{self, BackupPolicy};
use crate::defaults;
use crate::error::{Error, Result};
use crate::git;
use crate::hooks::{HookContext, HookKind, HookRegistry, HookReport, SkipList};
use crate::platform::Platform;
use crate::repository::RepositoryManager;
use crate::site::{ConnectionMode, Element, Env, NewSite, Site};

/// Builds the target site name from the source name.
///
/// An explicit name wins. Otherwise the prefix and suffix, when given, are
/// joined to the source name with dashes: `P-source-S`.
pub fn derive_target_name(
    source: &str,
    explicit: Option<&str>,
    prefix: Option<&str>,
    suffix: Option<&str>,
) -> String {
    if let Some(name) = explicit {
        return name.to_string();
    }
    let mut name = source.to_string();
    if let Some(prefix) = prefix {
        name = format!("{}-{}", prefix, name);
    }
    if let Some(suffix) = suffix {
        name = format!("{}-{}", name, suffix);
    }
    name
}

/// Everything the caller decides about one clone.
#[derive(Debug, Clone, Default)]
pub struct CloneOptions {
    pub source_site: String,
    pub target_site: String,
    /// Organization for the target; defaults to the source's.
    pub target_org: Option<String>,
    /// Upstream for the target; defaults to the source's.
    pub target_upstream: Option<String>,
    pub source_git_depth: Option<u32>,
    pub target_git_depth: Option<u32>,
    pub git_reset_tag: Option<String>,
    pub cms_version: Option<String>,
    pub skip_hooks: SkipList,
    /// Backup pre-flight; `None` imports whatever backups exist.
    pub backup_policy: Option<BackupPolicy>,
}

impl CloneOptions {
    pub fn new(source_site: impl Into<String>, target_site: impl Into<String>) -> Self {
        Self {
            source_site: source_site.into(),
            target_site: target_site.into(),
            ..Default::default()
        }
    }

    /// Checks the request itself, without asking the platform anything.
    pub fn validate(&self) -> Result<()> {
        if self.source_site.trim().is_empty() {
            return Err(Error::Validation {
                message: "The source site name is empty".to_string(),
                hint: Some("Pass --source-site <SITE>".to_string()),
            });
        }
        if self.target_site.trim().is_empty() {
            return Err(Error::Validation {
                message: "The target site name is empty".to_string(),
                hint: Some("Pass --target-site, --target-site-prefix or --target-site-suffix".to_string()),
            });
        }
        if self.source_site == self.target_site {
            return Err(Error::Validation {
                message: format!(
                    "The target site name is the same as the source site name: {}",
                    self.source_site
                ),
                hint: Some(
                    "Pass --target-site, --target-site-prefix or --target-site-suffix".to_string(),
                ),
            });
        }
        Ok(())
    }
}

/// What a successful clone produced.
#[derive(Debug, Clone)]
pub struct CloneSummary {
    pub source: Site,
    pub target: Site,
    pub topology: Topology,
    pub plan: CodePlan,
    pub backups_created: Vec<(Env, Element)>,
    pub code_hooks: HookReport,
    pub content: ContentReport,
    /// Working copies left on disk in keep mode.
    pub retained_workdirs: Vec<PathBuf>,
}

impl CloneSummary {
    /// Whether every content element and hook succeeded.
    pub fn is_clean(&self) -> bool {
        self.code_hooks.is_clean() && self.content.is_clean()
    }
}

/// Runs clones against one platform with one set of working copies.
pub struct SiteCloner {
    platform: Box<dyn Platform>,
    repos: RepositoryManager,
    hooks: HookRegistry,
    deploy_note: String,
    backup_max_age: Duration,
}

impl SiteCloner {
    pub fn new(platform: Box<dyn Platform>, repos: RepositoryManager, hooks: HookRegistry) -> Self {
        Self {
            platform,
            repos,
            hooks,
            deploy_note: defaults::DEPLOY_NOTE.to_string(),
            backup_max_age: Duration::hours(defaults::BACKUP_MAX_AGE_HOURS),
        }
    }

    pub fn with_deploy_note(mut self, note: impl Into<String>) -> Self {
        self.deploy_note = note.into();
        self
    }

    pub fn with_backup_max_age(mut self, max_age: Duration) -> Self {
        self.backup_max_age = max_age;
        self
    }

    /// Clones `options.source_site` into a new `options.target_site`.
    pub fn clone_site(&mut self, options: &CloneOptions) -> Result<CloneSummary> {
        self.clone_site_at(options, Utc::now())
    }

    /// Like [`clone_site`](Self::clone_site), judging backup age against `now`.
    pub fn clone_site_at(
        &mut self,
        options: &CloneOptions,
        now: DateTime<Utc>,
    ) -> Result<CloneSummary> {
        let result = self.run(options, now);
        // Working copies go on every exit path; a release error only
        // surfaces when the clone itself succeeded.
        let released = self.repos.release();
        let mut summary = result?;
        summary.retained_workdirs = released?;
        Ok(summary)
    }

    fn run(&mut self, options: &CloneOptions, now: DateTime<Utc>) -> Result<CloneSummary> {
        options.validate()?;

        if !self.repos.git_available() {
            return Err(Error::Validation {
                message: "git is not installed or not on PATH".to_string(),
                hint: Some("Install git and make sure `git --version` works".to_string()),
            });
        }

        let platform = self.platform.as_ref();
        let source = platform.get_site(&options.source_site)?;
        if platform.find_site(&options.target_site)?.is_some() {
            return Err(Error::Validation {
                message: format!("The target site already exists: {}", options.target_site),
                hint: Some("Choose another target name or delete the existing site".to_string()),
            });
        }

        // Topology and plan
        let reader = TopologyReader::new(platform);
        let topology = reader.read_topology(&source)?;
        let commits = reader.deployable_commits(&source, &topology)?;
        let plan = code::plan(&topology, &commits)?;
        info!("Source {} plan: {:?}", source.name, plan.case);

        // Backup pre-flight
        let backups_created = match options.backup_policy {
            Some(policy) => backups::ensure_fresh_backups(
                platform,
                &source,
                &topology,
                policy,
                self.backup_max_age,
                now,
            )?,
            None => Vec::new(),
        };

        // Provisioning
        let target = self.provision_target(&source, options)?;
        self.platform
            .set_connection_mode(&target, Env::Dev, ConnectionMode::Git)?;

        // Working copies
        info!("Downloading site code...");
        let source_url = self.clone_url(&source)?;
        let target_url = self.clone_url(&target)?;
        self.repos
            .clone_or_update(&source.name, &source_url, options.source_git_depth)?
            .check()?;
        self.repos
            .clone_or_update(&target.name, &target_url, options.target_git_depth)?
            .check()?;
        let source_path = self.repos.workspace().checkout_path(&source.name);
        let target_path = self.repos.workspace().checkout_path(&target.name);

        // Code
        let platform = self.platform.as_ref();
        code::prepare_target(&self.repos, &target_path, &source_path)?;
        code::execute_plan(
            &plan,
            &self.repos,
            platform,
            &target,
            &target_path,
            &self.deploy_note,
        )?;
        if let Some(tag) = &options.git_reset_tag {
            code::reset_to_tag(&self.repos, &target_path, tag)?;
        }

        let ctx = HookContext {
            platform,
            repos: &self.repos,
            source: &source,
            target: &target,
            env: Env::Dev,
            options,
        };
        let code_hooks = self.hooks.invoke(HookKind::Code, &ctx, &options.skip_hooks);

        // Content
        let content = ContentPipeline::new(platform, &self.repos, &self.hooks, options)
            .run(&source, &target, &topology);

        Ok(CloneSummary {
            source,
            target,
            topology,
            plan,
            backups_created,
            code_hooks,
            content,
            retained_workdirs: Vec::new(),
        })
    }

    fn provision_target(&self, source: &Site, options: &CloneOptions) -> Result<Site> {
        let new_site = NewSite {
            name: options.target_site.clone(),
            label: options.target_site.clone(),
            organization: options
                .target_org
                .clone()
                .or_else(|| source.organization.clone()),
            upstream: options
                .target_upstream
                .clone()
                .or_else(|| source.upstream.clone()),
        };

        info!("Creating the target site {}...", new_site.name);
        self.platform
            .create_site(&new_site)
            .map_err(|e| match e {
                Error::Provisioning { .. } => e,
                other => Error::Provisioning {
                    site: new_site.name.clone(),
                    message: other.to_string(),
                },
            })?;

        self.platform.get_site(&new_site.name)
    }

    fn clone_url(&self, site: &Site) -> Result<String> {
        let info = self.platform.connection_info(site, Env::Dev)?;
        git::clone_url(&info).ok_or_else(|| Error::Platform {
            command: "connection-info".to_string(),
            message: format!("no git clone URL reported for {}", site.name),
        })
    }
}

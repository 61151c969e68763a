//! Clone command implementation
//!
//! The clone command creates a new site from an existing one:
//! 1. Validate the request and load settings
//! 2. Provision the target and recreate its code history per environment
//! 3. Import database and files from the source's backups
//! 4. Apply code and content hooks
//! 5. Print the source and target URLs

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use log::debug;

use site_clone::backups::BackupPolicy;
use site_clone::config::{self, Settings};
use site_clone::error::Error;
use site_clone::hooks::{self, HookKind, HookRegistry, SkipList};
use site_clone::output::{self, OutputConfig, UrlScheme};
use site_clone::phases::orchestrator::{derive_target_name, CloneOptions, SiteCloner};
use site_clone::platform::terminus::TerminusCli;
use site_clone::repository::RepositoryManager;
use site_clone::runner::{CommandRunner, SystemRunner};
use site_clone::suggestions;
use site_clone::workspace::Workspace;

/// Arguments for the clone command
#[derive(Args, Debug, Default)]
pub struct CloneArgs {
    /// Name of the existing site to clone
    #[arg(long, value_name = "SITE")]
    pub source_site: String,

    /// Name of the new site
    #[arg(long, value_name = "SITE", conflicts_with_all = ["target_site_prefix", "target_site_suffix"])]
    pub target_site: Option<String>,

    /// Name the new site <PREFIX>-<source>
    #[arg(long, value_name = "PREFIX")]
    pub target_site_prefix: Option<String>,

    /// Name the new site <source>-<SUFFIX>
    #[arg(long, value_name = "SUFFIX")]
    pub target_site_suffix: Option<String>,

    /// Organization for the new site (defaults to the source's)
    #[arg(long, value_name = "ORG")]
    pub target_site_org: Option<String>,

    /// Upstream for the new site (defaults to the source's)
    #[arg(long, value_name = "UPSTREAM")]
    pub target_site_upstream: Option<String>,

    /// History depth when cloning the source (default: full history)
    #[arg(long, value_name = "N")]
    pub source_site_git_depth: Option<u32>,

    /// History depth when cloning the target (default: full history)
    #[arg(long, value_name = "N")]
    pub target_site_git_depth: Option<u32>,

    /// Reset the new site's code to this tag after recreating it
    #[arg(long, value_name = "TAG")]
    pub git_reset_tag: Option<String>,

    /// CMS version, dot separated with the major version first
    #[arg(long, value_name = "VERSION")]
    pub cms_version: Option<String>,

    /// Do not disable SMTP on the new site
    #[arg(long)]
    pub no_disable_smtp: bool,

    /// Do not remove user email addresses on the new site
    #[arg(long)]
    pub no_remove_emails: bool,

    /// Create backups that are missing or stale before cloning
    #[arg(long, conflicts_with = "force_backups")]
    pub refresh_backups: bool,

    /// Always create new backups before cloning
    #[arg(long)]
    pub force_backups: bool,

    /// Comma-separated hooks not to run
    #[arg(long, value_name = "HOOKS", value_delimiter = ',')]
    pub skip_hooks: Vec<String>,

    /// Keep the working copies after the run (debug)
    #[arg(long)]
    pub keep_workdirs: bool,

    /// Path to settings file
    #[arg(long, value_name = "PATH", env = "SITE_CLONE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Root directory for working copies
    #[arg(long, value_name = "PATH", env = "SITE_CLONE_WORKDIR")]
    pub workdir: Option<PathBuf>,
}

impl CloneArgs {
    fn target_name(&self) -> String {
        derive_target_name(
            &self.source_site,
            self.target_site.as_deref(),
            self.target_site_prefix.as_deref(),
            self.target_site_suffix.as_deref(),
        )
    }

    fn backup_policy(&self) -> Option<BackupPolicy> {
        if self.force_backups {
            Some(BackupPolicy::Always)
        } else if self.refresh_backups {
            Some(BackupPolicy::IfStale)
        } else {
            None
        }
    }

    /// Hooks to skip: settings file, `--skip-hooks` and the `--no-*` flags.
    fn skip_list(&self, settings: &Settings) -> SkipList {
        let mut skip: SkipList = settings
            .skip_hooks
            .iter()
            .chain(self.skip_hooks.iter())
            .collect();
        if self.no_disable_smtp {
            skip.insert("disable-smtp");
        }
        if self.no_remove_emails {
            skip.insert("remove-emails");
        }
        skip
    }
}

fn load_settings(args: &CloneArgs) -> Result<Settings> {
    if let Some(path) = &args.config {
        if !path.exists() {
            return Err(suggestions::config_not_found(path));
        }
    }
    Ok(config::load(args.config.as_deref())?)
}

/// Builds the clone request, checking everything that needs no platform call.
fn build_options(args: &CloneArgs, settings: &Settings, registry: &HookRegistry) -> Result<CloneOptions> {
    let mut options = CloneOptions::new(args.source_site.clone(), args.target_name());
    options.target_org = args.target_site_org.clone();
    options.target_upstream = args.target_site_upstream.clone();
    options.source_git_depth = args.source_site_git_depth;
    options.target_git_depth = args.target_site_git_depth;
    options.git_reset_tag = args.git_reset_tag.clone();
    options.cms_version = args.cms_version.clone();
    options.skip_hooks = args.skip_list(settings);
    options.backup_policy = args.backup_policy();
    options.validate()?;

    let mut known = registry.names(HookKind::Code);
    known.extend(registry.names(HookKind::Content));
    known.sort_unstable();
    if let Some(unknown) = options.skip_hooks.iter().find(|name| !known.contains(name)) {
        return Err(suggestions::unknown_hook(unknown, &known));
    }

    Ok(options)
}

/// Execute the clone command
pub fn execute(args: CloneArgs, output_config: &OutputConfig) -> Result<()> {
    let settings = load_settings(&args)?;
    let registry = hooks::default_registry();
    let options = build_options(&args, &settings, &registry)?;
    debug!("Clone options: {:?}", options);

    if !SystemRunner.is_available(&settings.platform_bin) {
        return Err(suggestions::platform_client_missing(&settings.platform_bin));
    }

    let workdir = args.workdir.clone().unwrap_or_else(|| settings.workdir.clone());
    let workspace = Workspace::new(workdir, args.keep_workdirs);
    let repos = RepositoryManager::new(workspace, settings.primary_branch.clone());
    let platform = TerminusCli::new(settings.platform_bin.clone(), Box::new(SystemRunner));

    let mut cloner = SiteCloner::new(Box::new(platform), repos, registry)
        .with_deploy_note(settings.deploy_note.clone())
        .with_backup_max_age(settings.backup_max_age()?);

    println!(
        "{} Cloning {} to {}",
        output::emoji(output_config, "🔁", "[CLONE]"),
        options.source_site,
        options.target_site
    );

    let summary = match cloner.clone_site(&options) {
        Ok(summary) => summary,
        Err(Error::SiteNotFound { site }) if site == options.source_site => {
            return Err(suggestions::site_not_found(&site));
        }
        Err(e) => return Err(e.into()),
    };

    let urls = UrlScheme {
        site_domain: settings.site_domain.clone(),
        dashboard_url: settings.dashboard_url.clone(),
    };
    print!("{}", output::render_summary(output_config, &summary, &urls)?);
    Ok(())
}

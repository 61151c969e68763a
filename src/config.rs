//! # Settings File
//!
//! This module defines [`Settings`], the optional YAML file that configures
//! the tool itself (as opposed to one clone request, which comes from the
//! command line). Every field has a default, so an empty file and a missing
//! file mean the same thing.
//!
//! ```yaml
//! platform_bin: /usr/local/bin/terminus
//! workdir: /var/tmp/clones
//! primary_branch: master
//! deploy_note: Recreated by the clone job
//! backup_max_age_hours: 24
//! site_domain: pantheonsite.io
//! dashboard_url: https://dashboard.pantheon.io
//! skip_hooks:
//!   - copy-contrib-code
//! ```
//!
//! Command-line flags override whatever the file says.

use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::Deserialize;

use crate::defaults;
use crate::error::{Error, Result};

/// Tool settings, loaded from YAML.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Platform command-line client to drive.
    pub platform_bin: String,
    /// Root directory for working copies.
    pub workdir: PathBuf,
    pub primary_branch: String,
    /// Note attached to deploys.
    pub deploy_note: String,
    /// Age after which a backup counts as stale.
    pub backup_max_age_hours: i64,
    /// Domain of environment URLs in the summary.
    pub site_domain: String,
    pub dashboard_url: String,
    /// Hooks never to run, in addition to those skipped on the command line.
    pub skip_hooks: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            platform_bin: defaults::PLATFORM_BIN.to_string(),
            workdir: defaults::default_workdir(),
            primary_branch: defaults::PRIMARY_BRANCH.to_string(),
            deploy_note: defaults::DEPLOY_NOTE.to_string(),
            backup_max_age_hours: defaults::BACKUP_MAX_AGE_HOURS,
            site_domain: defaults::SITE_DOMAIN.to_string(),
            dashboard_url: defaults::DASHBOARD_URL.to_string(),
            skip_hooks: Vec::new(),
        }
    }
}

impl Settings {
    /// `backup_max_age_hours` as a duration.
    pub fn backup_max_age(&self) -> Result<Duration> {
        if self.backup_max_age_hours <= 0 {
            return Err(Error::Config {
                message: format!(
                    "backup_max_age_hours must be positive, got {}",
                    self.backup_max_age_hours
                ),
            });
        }
        Duration::try_hours(self.backup_max_age_hours).ok_or_else(|| Error::Config {
            message: format!(
                "backup_max_age_hours is out of range, got {}",
                self.backup_max_age_hours
            ),
        })
    }

    fn check(self) -> Result<Self> {
        self.backup_max_age()?;
        if self.primary_branch.trim().is_empty() {
            return Err(Error::Config {
                message: "primary_branch must not be empty".to_string(),
            });
        }
        Ok(self)
    }
}

/// Parses settings from a YAML string. Blank input yields the defaults.
pub fn parse(yaml_content: &str) -> Result<Settings> {
    if yaml_content.trim().is_empty() {
        return Ok(Settings::default());
    }
    let settings: Settings = serde_yaml::from_str(yaml_content).map_err(|e| Error::Config {
        message: e.to_string(),
    })?;
    settings.check()
}

/// Parse settings from a YAML file path
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("cannot read {}: {}", path.display(), e),
    })?;
    parse(&content)
}

/// Loads settings from `path` when given, otherwise the defaults.
pub fn load(path: Option<&Path>) -> Result<Settings> {
    match path {
        Some(path) => from_file(path),
        None => Ok(Settings::default()),
    }
}

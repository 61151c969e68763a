//! Default values for site-clone configuration.
//!
//! This module provides centralized default values used across commands,
//! ensuring consistency and avoiding duplication.

use std::path::PathBuf;

/// Platform command-line client used when none is configured.
pub const PLATFORM_BIN: &str = "terminus";

/// Branch that carries deployable code on every site.
pub const PRIMARY_BRANCH: &str = "master";

/// Note attached to every deploy made while recreating code.
pub const DEPLOY_NOTE: &str = "Deployed by site-clone";

/// Backups older than this are stale.
pub const BACKUP_MAX_AGE_HOURS: i64 = 48;

/// Domain under which environment URLs live (`<env>-<site>.<domain>`).
pub const SITE_DOMAIN: &str = "pantheonsite.io";

pub const DASHBOARD_URL: &str = "https://dashboard.pantheon.io";

/// Returns the default root for working copies.
///
/// Each run puts its checkouts under `<temp>/site-clone/<site-name>`.
///
/// This can be overridden by the `--workdir` CLI flag, the
/// `SITE_CLONE_WORKDIR` environment variable or the settings file.
pub fn default_workdir() -> PathBuf {
    std::env::temp_dir().join("site-clone")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_workdir_returns_path() {
        let workdir = default_workdir();
        // Should end with "site-clone"
        assert!(workdir.ends_with("site-clone"));
    }

    #[test]
    fn test_default_workdir_is_under_temp() {
        assert!(default_workdir().starts_with(std::env::temp_dir()));
    }
}

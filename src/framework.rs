//! CMS framework commands on remote environments.
//!
//! Only Drupal sites are supported: their commands go through `drush`. A site
//! on any other framework gets [`Error::Unsupported`] before anything is sent.

use log::{debug, error};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::platform::{Platform, RemoteCommand};
use crate::site::{Env, RemoteOutput, Site};

/// Runs `drush <args>` on an environment of a Drupal site.
///
/// A non-zero exit code is an error carrying the command's output.
pub fn run_drush<I, S>(platform: &dyn Platform, site: &Site, env: Env, args: I) -> Result<RemoteOutput>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    if !site.is_drupal() {
        return Err(Error::Unsupported {
            operation: "framework command".to_string(),
            cms: site.framework.clone().unwrap_or_else(|| "unknown".to_string()),
        });
    }

    let command = RemoteCommand::new("drush", args);
    debug!("{}.{}: {}", site.name, env, command.command_line());
    let output = platform.run_remote_command(site, env, &command)?;
    if !output.succeeded() {
        error!(
            "{}.{}: {} exited with {}",
            site.name,
            env,
            command.command_line(),
            output.exit_code
        );
        return Err(Error::Platform {
            command: command.command_line(),
            message: output.output.trim().to_string(),
        });
    }
    Ok(output)
}

#[derive(Deserialize)]
struct DrushStatus {
    #[serde(rename = "drupal-version")]
    drupal_version: Option<String>,
}

/// The CMS version reported by `drush status` on the site's dev environment.
pub fn cms_version(platform: &dyn Platform, site: &Site) -> Result<String> {
    let output = run_drush(platform, site, Env::Dev, ["status", "--format=json"])?;
    let status: DrushStatus = serde_json::from_str(output.output.trim())?;
    status.drupal_version.ok_or_else(|| Error::Platform {
        command: "drush status --format=json".to_string(),
        message: format!("no drupal-version reported for {}", site.name),
    })
}

/// The major component of a version string, e.g. `7` for `7.98`.
pub fn major_version(version: &str) -> Option<u32> {
    version.trim().split('.').next()?.parse().ok()
}

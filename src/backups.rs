//! Backup selection and the staleness pre-flight.
//!
//! Content is only ever imported from the most recent *finished* backup of an
//! (environment, element) pair. The pre-flight check runs before the target
//! site exists and makes sure those backups are recent enough, creating new
//! ones according to a [`BackupPolicy`].

use chrono::{DateTime, Duration, Utc};
use log::{debug, info};

use crate::error::{Error, Result};
use crate::phases::topology::Topology;
use crate::platform::Platform;
use crate::site::{Backup, Element, Env, Site};

/// When the pre-flight creates new backups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupPolicy {
    /// Only when the latest backup is missing or older than the maximum age.
    IfStale,
    /// Always, regardless of what already exists.
    Always,
}

/// The most recent finished backup of `element`, if there is one.
pub fn latest_finished_backup(
    platform: &dyn Platform,
    site: &Site,
    env: Env,
    element: Element,
) -> Result<Option<Backup>> {
    let backups = platform.finished_backups(site, env, element)?;
    Ok(backups.into_iter().max_by_key(|b| b.finish_time))
}

/// Creates backups for every initialized environment according to `policy`.
///
/// Returns the (environment, element) pairs for which a backup was created.
/// A failed backup creation is fatal.
pub fn ensure_fresh_backups(
    platform: &dyn Platform,
    site: &Site,
    topology: &Topology,
    policy: BackupPolicy,
    max_age: Duration,
    now: DateTime<Utc>,
) -> Result<Vec<(Env, Element)>> {
    let mut created = Vec::new();

    for env in topology.initialized() {
        for element in Element::CONTENT {
            let needs_backup = match policy {
                BackupPolicy::Always => true,
                BackupPolicy::IfStale => {
                    match latest_finished_backup(platform, site, env, element)? {
                        Some(backup) if !backup.is_stale_at(now, max_age) => {
                            debug!(
                                "{}.{} {} backup from {} is fresh",
                                site.name, env, element, backup.finish_time
                            );
                            false
                        }
                        Some(_) => {
                            info!("{}.{} {} backup is stale", site.name, env, element);
                            true
                        }
                        None => {
                            info!("{}.{} has no {} backup", site.name, env, element);
                            true
                        }
                    }
                }
            };

            if needs_backup {
                info!("Creating {} backup for {}.{}", element, site.name, env);
                platform
                    .create_backup(site, env, element)
                    .map_err(|e| Error::Backup {
                        site: site.name.clone(),
                        env: env.to_string(),
                        element: element.to_string(),
                        message: e.to_string(),
                    })?;
                created.push((env, element));
            }
        }
    }

    Ok(created)
}

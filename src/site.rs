//! # Site Data Model
//!
//! Plain data describing what the platform reports about sites, their
//! environments and their backups. Values are produced by a
//! [`Platform`](crate::platform::Platform) implementation and never mutated by
//! the core.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};

use crate::error::Error;

/// One stage of the dev → test → live promotion chain.
///
/// The derived ordering follows the chain, so sorted collections of `Env`
/// iterate dev, test, live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Env {
    Dev,
    Test,
    Live,
}

impl Env {
    /// All chain environments in promotion order.
    pub const ALL: [Env; 3] = [Env::Dev, Env::Test, Env::Live];

    pub fn as_str(&self) -> &'static str {
        match self {
            Env::Dev => "dev",
            Env::Test => "test",
            Env::Live => "live",
        }
    }

    /// Parses a chain environment name. Multidev names yield `None`.
    pub fn from_name(name: &str) -> Option<Env> {
        match name {
            "dev" => Some(Env::Dev),
            "test" => Some(Env::Test),
            "live" => Some(Env::Live),
            _ => None,
        }
    }
}

impl fmt::Display for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Env {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Env::from_name(s).ok_or_else(|| Error::validation(format!("unknown environment '{}'", s)))
    }
}

/// A category of environment content that is backed up independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Element {
    Code,
    Database,
    Files,
}

impl Element {
    /// Elements replicated from backups. Code is recreated through git instead.
    pub const CONTENT: [Element; 2] = [Element::Database, Element::Files];

    pub fn as_str(&self) -> &'static str {
        match self {
            Element::Code => "code",
            Element::Database => "database",
            Element::Files => "files",
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A site as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    /// Machine name, used in URLs and working-copy paths.
    pub name: String,
    /// Platform identifier, used in dashboard links.
    pub id: String,
    pub organization: Option<String>,
    pub upstream: Option<String>,
    /// CMS identifier such as `drupal` or `wordpress`.
    pub framework: Option<String>,
}

impl Site {
    pub fn is_drupal(&self) -> bool {
        self.framework.as_deref() == Some("drupal")
    }
}

/// One environment of a site, chain or multidev.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentInfo {
    pub name: String,
    pub initialized: bool,
}

/// Connection details for an environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionInfo {
    /// Direct git URL when the platform reports one.
    pub git_url: Option<String>,
    /// The platform's suggested clone command, e.g. `git clone ssh://... acme`.
    pub git_command: Option<String>,
}

/// A finished backup of one element of one environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backup {
    /// Platform identifier of the archive (usually its file name).
    pub id: String,
    pub element: Element,
    pub finish_time: DateTime<Utc>,
}

impl Backup {
    /// Whether the backup finished more than `max_age` before `now`.
    pub fn is_stale_at(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        now - self.finish_time > max_age
    }
}

/// Result of a command executed on a remote environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteOutput {
    pub exit_code: i32,
    pub output: String,
}

impl RemoteOutput {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// Connection mode of an environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    Git,
    Sftp,
}

impl ConnectionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionMode::Git => "git",
            ConnectionMode::Sftp => "sftp",
        }
    }
}

/// Parameters for provisioning a new site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSite {
    pub name: String,
    pub label: String,
    pub organization: Option<String>,
    pub upstream: Option<String>,
}

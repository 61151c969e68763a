//! # Hosting Platform Interface
//!
//! The [`Platform`] trait is the only way the clone engine talks to the hosting
//! platform: site lookup and provisioning, environment metadata, backups,
//! content import, deploys and remote commands. Everything behind it is an
//! external collaborator.
//!
//! [`terminus::TerminusCli`] is the production implementation, which drives the
//! platform's command-line client. Tests substitute in-memory fakes.

pub mod terminus;

use crate::error::{Error, Result};
use crate::site::{
    Backup, ConnectionInfo, ConnectionMode, Element, Env, EnvironmentInfo, NewSite, RemoteOutput,
    Site,
};

/// A command to execute on a remote environment, e.g. a `drush` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl RemoteCommand {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// The full command as a single shell line for the remote side.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(shell_quote)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// The arguments alone, quoted, for clients that supply the program name.
    pub fn args_line(&self) -> String {
        self.args
            .iter()
            .map(String::as_str)
            .map(shell_quote)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Quotes one word for a POSIX shell, leaving plain words untouched.
fn shell_quote(word: &str) -> String {
    let plain = |c: char| c.is_ascii_alphanumeric() || "_-./:=@%+,".contains(c);
    if !word.is_empty() && word.chars().all(plain) {
        return word.to_string();
    }
    if !word.contains(['"', '\\', '$', '`', '!']) {
        return format!("\"{}\"", word);
    }
    format!("'{}'", word.replace('\'', "'\\''"))
}

/// Trait for hosting platform operations - allows faking in tests
pub trait Platform: Send + Sync {
    /// Looks up a site by name; `Ok(None)` when it does not exist.
    fn find_site(&self, name: &str) -> Result<Option<Site>>;

    /// Looks up a site by name, failing when it does not exist.
    fn get_site(&self, name: &str) -> Result<Site> {
        self.find_site(name)?.ok_or_else(|| Error::SiteNotFound {
            site: name.to_string(),
        })
    }

    /// Lists every environment of a site, multidevs included.
    fn environments(&self, site: &Site) -> Result<Vec<EnvironmentInfo>>;

    /// Commits present upstream of `env` that have not been deployed to it.
    fn count_deployable_commits(&self, site: &Site, env: Env) -> Result<u32>;

    fn connection_info(&self, site: &Site, env: Env) -> Result<ConnectionInfo>;

    fn set_connection_mode(&self, site: &Site, env: Env, mode: ConnectionMode) -> Result<()>;

    /// Finished backups of one element, in no particular order.
    fn finished_backups(&self, site: &Site, env: Env, element: Element) -> Result<Vec<Backup>>;

    /// A retrieval URL for a backup archive.
    fn backup_url(&self, site: &Site, env: Env, backup: &Backup) -> Result<String>;

    /// Creates a backup and blocks until it has finished.
    fn create_backup(&self, site: &Site, env: Env, element: Element) -> Result<()>;

    fn run_remote_command(
        &self,
        site: &Site,
        env: Env,
        command: &RemoteCommand,
    ) -> Result<RemoteOutput>;

    /// Provisions a new site. Not retried on failure.
    fn create_site(&self, new_site: &NewSite) -> Result<()>;

    /// Loads the archive at `url` into `element` of the environment.
    fn import_content(&self, site: &Site, env: Env, element: Element, url: &str) -> Result<()>;

    /// Deploys committed code into `env` (test or live only).
    fn deploy(&self, site: &Site, env: Env, note: &str) -> Result<()>;
}

//! Environment topology of the source site.
//!
//! Reads which of the chain environments (dev, test, live) are initialized and
//! how many commits are waiting to be deployed to test and live. Multidev
//! environments are dropped. Everything here is read-only.

use std::collections::BTreeMap;

use log::debug;

use crate::error::{Error, Result};
use crate::platform::Platform;
use crate::site::{Env, Site};

/// Initialization state of each chain environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Topology {
    envs: BTreeMap<Env, bool>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter, mostly for tests.
    pub fn with(mut self, env: Env, initialized: bool) -> Self {
        self.envs.insert(env, initialized);
        self
    }

    pub fn set(&mut self, env: Env, initialized: bool) {
        self.envs.insert(env, initialized);
    }

    /// Whether `env` exists and is initialized. Missing environments are not.
    pub fn is_initialized(&self, env: Env) -> bool {
        self.envs.get(&env).copied().unwrap_or(false)
    }

    /// Initialized environments in chain order.
    pub fn initialized(&self) -> impl Iterator<Item = Env> + '_ {
        self.envs
            .iter()
            .filter(|(_, initialized)| **initialized)
            .map(|(env, _)| *env)
    }

    pub fn contains(&self, env: Env) -> bool {
        self.envs.contains_key(&env)
    }
}

/// Commits waiting to be deployed, keyed by environment.
///
/// Only test and live appear, and only when initialized. A missing key means
/// "not applicable", which is different from zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployableCommits {
    counts: BTreeMap<Env, u32>,
}

impl DeployableCommits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, env: Env, count: u32) -> Self {
        self.counts.insert(env, count);
        self
    }

    pub fn get(&self, env: Env) -> Option<u32> {
        self.counts.get(&env).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// Reads topology and deployable commits through the platform.
pub struct TopologyReader<'a> {
    platform: &'a dyn Platform,
}

impl<'a> TopologyReader<'a> {
    pub fn new(platform: &'a dyn Platform) -> Self {
        Self { platform }
    }

    /// Initialization state of the chain environments of `site`.
    pub fn read_topology(&self, site: &Site) -> Result<Topology> {
        let mut topology = Topology::new();
        for info in self.platform.environments(site)? {
            match Env::from_name(&info.name) {
                Some(env) => topology.set(env, info.initialized),
                None => debug!("Ignoring multidev environment {}.{}", site.name, info.name),
            }
        }
        if !topology.contains(Env::Dev) {
            return Err(Error::EnvironmentNotFound {
                site: site.name.clone(),
                env: Env::Dev.to_string(),
            });
        }
        Ok(topology)
    }

    /// Pending commit counts for the initialized members of {test, live}.
    pub fn deployable_commits(&self, site: &Site, topology: &Topology) -> Result<DeployableCommits> {
        let mut commits = DeployableCommits::new();
        for env in [Env::Test, Env::Live] {
            if topology.is_initialized(env) {
                let count = self.platform.count_deployable_commits(site, env)?;
                debug!("{}.{} has {} deployable commits", site.name, env, count);
                commits = commits.with(env, count);
            }
        }
        Ok(commits)
    }
}

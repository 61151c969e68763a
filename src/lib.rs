//! # Site Clone Library
//!
//! This library provides the engine behind the `site-clone` command-line tool:
//! it creates a new site on a managed hosting platform that reproduces an
//! existing site's environments, code history and content.
//!
//! ## Core Concepts
//!
//! - **Platform (`platform`)**: The [`Platform`](platform::Platform) trait is
//!   the only way the engine talks to the hosting platform. The production
//!   implementation drives the platform's command-line client.
//! - **Working copies (`workspace`, `repository`, `git`)**: Local git
//!   checkouts of the source and target sites and the typed git operations
//!   performed on them.
//! - **Phases (`phases`)**: Topology reading, code recreation planning and
//!   execution, content replication, and the orchestrator that sequences them.
//! - **Hooks (`hooks`)**: Named transformations applied to the target after
//!   code and content have been recreated.
//!
//! ## Execution Flow
//!
//! The main entry point is [`phases::orchestrator::SiteCloner`], which:
//!
//! 1.  **Validates** the request before any platform call.
//! 2.  **Reads** the source's environment topology and pending commits.
//! 3.  **Provisions** the target site.
//! 4.  **Recreates code**: clones both sites, merges source into target and
//!     replays the source's promotion state with resets, pushes and deploys.
//! 5.  **Replicates content** from the latest backups, per environment.
//! 6.  **Runs hooks** and releases the working copies.
//!
//! ## Quick Example
//!
//! ```
//! use site_clone::phases::code::{plan, CodeStep, DeployTarget};
//! use site_clone::phases::topology::{DeployableCommits, Topology};
//! use site_clone::site::Env;
//!
//! // dev and test initialized, nothing waiting to be deployed to test
//! let topology = Topology::new().with(Env::Dev, true).with(Env::Test, true);
//! let commits = DeployableCommits::new().with(Env::Test, 0);
//!
//! let plan = plan(&topology, &commits).unwrap();
//! assert_eq!(plan.steps, vec![CodeStep::ForcePush, CodeStep::Deploy(DeployTarget::Test)]);
//! ```

pub mod backups;
pub mod config;
pub mod defaults;
pub mod error;
pub mod framework;
pub mod git;
pub mod hooks;
pub mod output;
pub mod phases;
pub mod platform;
pub mod repository;
pub mod runner;
pub mod site;
pub mod suggestions;
pub mod workspace;

#[cfg(test)]
mod planner_proptest;

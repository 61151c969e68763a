//! Code recreation: planning and executing the target's deploy history.
//!
//! The target working copy arrives here already merged with the source code
//! and reset to the source's HEAD. What remains is to reproduce the source's
//! promotion state: which commits are live, which are on test, and which are
//! only on dev. [`plan`] turns the source's deployable-commit counts into an
//! ordered list of [`CodeStep`]s, and [`execute_plan`] runs them against the
//! working copy and the platform.
//!
//! ## Decision table
//!
//! The first matching row wins.
//!
//! | test | live | plan |
//! |------|------|------|
//! | n/a  | n/a  | force-push (dev only) |
//! | 0    | 0    | force-push, deploy live |
//! | 0    | n/a  | force-push, deploy test |
//! | n/a  | any  | rejected as inconsistent |
//! | any other |  | pending-commit procedure |
//!
//! The pending-commit procedure snapshots the tip, rewinds the branch so that
//! only already-promoted commits remain, force-pushes and deploys, then
//! restores the snapshot. With commits pending on both live and test this
//! happens twice: once for live (rewinding `live + test` commits) and once
//! for test.
//!
//! None of these operations can be undone. A failing step aborts the clone
//! with [`Error::Recreation`] and leaves the target as it is.

use std::fmt;
use std::path::Path;

use log::info;

use super::topology::{DeployableCommits, Topology};
use crate::error::{Error, Result};
use crate::platform::Platform;
use crate::repository::RepositoryManager;
use crate::site::{Env, Site};

/// Where a `Deploy` step promotes code. Dev receives code by push, never by
/// deploy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployTarget {
    Test,
    Live,
}

impl DeployTarget {
    pub fn env(self) -> Env {
        match self {
            DeployTarget::Test => Env::Test,
            DeployTarget::Live => Env::Live,
        }
    }
}

impl fmt::Display for DeployTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.env())
    }
}

/// One step of a code recreation plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeStep {
    /// Save the current tip on the snapshot branch.
    Snapshot,
    /// Move HEAD back by this many commits.
    Rewind(u32),
    ForcePush,
    /// Non-force push of the primary branch.
    Push,
    /// Deploy to test, or to test and then live.
    Deploy(DeployTarget),
    /// Merge the snapshot branch back in.
    RestoreSnapshot,
}

impl fmt::Display for CodeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodeStep::Snapshot => write!(f, "snapshot"),
            CodeStep::Rewind(n) => write!(f, "rewind {}", n),
            CodeStep::ForcePush => write!(f, "force-push"),
            CodeStep::Push => write!(f, "push"),
            CodeStep::Deploy(target) => write!(f, "deploy {}", target),
            CodeStep::RestoreSnapshot => write!(f, "restore snapshot"),
        }
    }
}

/// Which row of the decision table produced a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanCase {
    DevOnly,
    LiveCurrent,
    TestCurrent,
    PendingCommits,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodePlan {
    pub case: PlanCase,
    pub steps: Vec<CodeStep>,
}

impl CodePlan {
    /// Number of `Deploy(target)` steps for exactly `target`.
    pub fn deploys_to(&self, target: DeployTarget) -> usize {
        self.steps
            .iter()
            .filter(|step| **step == CodeStep::Deploy(target))
            .count()
    }
}

/// Computes the steps that reproduce the source's promotion state.
pub fn plan(topology: &Topology, commits: &DeployableCommits) -> Result<CodePlan> {
    for env in [Env::Test, Env::Live] {
        if commits.get(env).is_some() != topology.is_initialized(env) {
            return Err(Error::InconsistentTopology {
                message: format!(
                    "deployable commits for {} do not match its initialization state",
                    env
                ),
            });
        }
    }

    let test = commits.get(Env::Test);
    let live = commits.get(Env::Live);

    let plan = match (test, live) {
        (None, None) => CodePlan {
            case: PlanCase::DevOnly,
            steps: vec![CodeStep::ForcePush],
        },
        (None, Some(_)) => {
            return Err(Error::InconsistentTopology {
                message: "live is initialized but test is not".to_string(),
            })
        }
        (Some(0), Some(0)) => CodePlan {
            case: PlanCase::LiveCurrent,
            steps: vec![CodeStep::ForcePush, CodeStep::Deploy(DeployTarget::Live)],
        },
        (Some(0), None) => CodePlan {
            case: PlanCase::TestCurrent,
            steps: vec![CodeStep::ForcePush, CodeStep::Deploy(DeployTarget::Test)],
        },
        (Some(test), live) => CodePlan {
            case: PlanCase::PendingCommits,
            steps: pending_commit_steps(test, live),
        },
    };

    Ok(plan)
}

fn pending_commit_steps(test: u32, live: Option<u32>) -> Vec<CodeStep> {
    let mut steps = vec![CodeStep::Snapshot];
    let live_pending = live.unwrap_or(0);

    if live_pending > 0 {
        steps.extend([
            CodeStep::Rewind(live_pending + test),
            CodeStep::ForcePush,
            CodeStep::Deploy(DeployTarget::Live),
            CodeStep::RestoreSnapshot,
        ]);
    }

    if test > 0 {
        let deploy_to = if live_pending == 0 {
            DeployTarget::Live
        } else {
            DeployTarget::Test
        };
        steps.extend([
            CodeStep::Rewind(test),
            CodeStep::ForcePush,
            CodeStep::Deploy(deploy_to),
            CodeStep::RestoreSnapshot,
            CodeStep::Push,
        ]);
    } else {
        steps.extend([CodeStep::Push, CodeStep::Deploy(DeployTarget::Test)]);
    }

    steps
}

/// Merges the source checkout into the target and pins the target to the
/// source's HEAD.
pub fn prepare_target(repos: &RepositoryManager, target: &Path, source: &Path) -> Result<()> {
    info!("Merging {} into {}", source.display(), target.display());
    repos.merge_into(target, source)?.check()?;
    let head = repos.head_commit_id(source)?;
    info!("Resetting target to source HEAD {}", head);
    repos.reset_hard(target, &head)?.check()?;
    Ok(())
}

/// Runs a plan against the target working copy and site.
pub fn execute_plan(
    plan: &CodePlan,
    repos: &RepositoryManager,
    platform: &dyn Platform,
    target: &Site,
    path: &Path,
    deploy_note: &str,
) -> Result<()> {
    info!("Recreating code for {} ({:?})", target.name, plan.case);
    for step in &plan.steps {
        info!("Code step: {}", step);
        run_step(*step, repos, platform, target, path, deploy_note).map_err(|e| {
            Error::Recreation {
                site: target.name.clone(),
                step: step.to_string(),
                message: e.to_string(),
            }
        })?;
    }
    Ok(())
}

fn run_step(
    step: CodeStep,
    repos: &RepositoryManager,
    platform: &dyn Platform,
    target: &Site,
    path: &Path,
    deploy_note: &str,
) -> Result<()> {
    match step {
        CodeStep::Snapshot => {
            repos.create_snapshot_branch(path)?.check()?;
        }
        CodeStep::Rewind(count) => {
            repos.rewind_commits(path, count)?.check()?;
        }
        CodeStep::ForcePush => {
            repos.force_push(path)?.check()?;
        }
        CodeStep::Push => {
            repos.push(path)?.check()?;
        }
        CodeStep::RestoreSnapshot => {
            repos.merge_snapshot_branch(path)?.check()?;
        }
        CodeStep::Deploy(DeployTarget::Test) => {
            platform.deploy(target, Env::Test, deploy_note)?;
        }
        CodeStep::Deploy(DeployTarget::Live) => {
            platform.deploy(target, Env::Test, deploy_note)?;
            platform.deploy(target, Env::Live, deploy_note)?;
        }
    }
    Ok(())
}

/// Resets the target to `tag` and force-pushes, after the plan has run.
pub fn reset_to_tag(repos: &RepositoryManager, path: &Path, tag: &str) -> Result<()> {
    info!("Resetting target code to tag {}", tag);
    let commit = repos.resolve_tag(path, tag)?;
    repos.reset_hard(path, &commit)?.check()?;
    repos.force_push(path)?.check()?;
    Ok(())
}

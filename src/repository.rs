//! # Local Repository Management
//!
//! This module provides the `RepositoryManager`, which performs every git
//! operation the clone engine needs against the working copies held in a
//! [`Workspace`].
//!
//! ## Design
//!
//! Each operation builds a typed [`GitOp`] and hands it to a
//! [`CommandRunner`]. The runner is a trait object so tests can substitute a
//! fake that records invocations and scripts failures, without real git or
//! network access.
//!
//! Operations report failure as a [`GitOutcome`] whose `succeeded()` is false
//! rather than as an `Err`; only a failure to start git at all is an `Err`.
//! Callers decide whether a failed outcome is fatal, usually by calling
//! [`GitOutcome::check`].
//!
//! Operations on one working copy must run one at a time: git keeps index and
//! lock files in the checkout, and the manager never runs anything in parallel.

use std::fs;
use std::path::{Path, PathBuf};

use log::{error, info, warn};

use crate::error::{Error, Result};
use crate::git::{self, GitOp, SNAPSHOT_BRANCH};
use crate::runner::{CommandOutput, CommandRunner, SystemRunner};
use crate::workspace::Workspace;

/// The result of one git operation.
#[derive(Debug, Clone)]
pub struct GitOutcome {
    pub op: GitOp,
    pub path: PathBuf,
    pub output: CommandOutput,
}

impl GitOutcome {
    /// An outcome for an operation that needed no git call.
    fn skipped(op: GitOp, path: &Path) -> Self {
        Self {
            op,
            path: path.to_path_buf(),
            output: CommandOutput::ok(""),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.output.success
    }

    /// Converts a failed outcome into `Error::GitCommand`.
    pub fn check(self) -> Result<CommandOutput> {
        if self.output.success {
            return Ok(self.output);
        }
        Err(Error::GitCommand {
            command: self.op.to_string(),
            path: self.path.display().to_string(),
            stderr: git::describe_failure(&self.output.failure_message()),
        })
    }
}

/// Runs git operations against the working copies of one clone run.
pub struct RepositoryManager {
    runner: Box<dyn CommandRunner>,
    workspace: Workspace,
    primary_branch: String,
}

impl RepositoryManager {
    /// Creates a `RepositoryManager` that runs the system `git`.
    pub fn new(workspace: Workspace, primary_branch: impl Into<String>) -> Self {
        Self::with_runner(Box::new(SystemRunner), workspace, primary_branch)
    }

    /// Creates a `RepositoryManager` with a custom `CommandRunner`.
    ///
    /// This is primarily used for testing to inject fake git behaviour.
    pub fn with_runner(
        runner: Box<dyn CommandRunner>,
        workspace: Workspace,
        primary_branch: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            workspace,
            primary_branch: primary_branch.into(),
        }
    }

    pub fn primary_branch(&self) -> &str {
        &self.primary_branch
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// The checkout acquired for `site`, if any.
    pub fn checkout(&self, site: &str) -> Option<&Path> {
        self.workspace.get(site)
    }

    /// Whether `git` can be run at all.
    pub fn git_available(&self) -> bool {
        self.runner.is_available("git")
    }

    /// Releases the workspace; see [`Workspace::release`].
    pub fn release(&mut self) -> Result<Vec<PathBuf>> {
        self.workspace.release()
    }

    fn run(&self, op: GitOp, path: &Path) -> Result<GitOutcome> {
        info!("Exec: {}", op);
        let output = self.runner.run(&op.invocation(path))?;
        if !output.success {
            error!("{} failed in {}: {}", op, path.display(), output.failure_message());
        }
        Ok(GitOutcome {
            op,
            path: path.to_path_buf(),
            output,
        })
    }

    /// Brings the working copy for `site` up to date, cloning when needed.
    ///
    /// An existing checkout is updated with `git pull`. If that fails the
    /// directory is discarded and a fresh clone is made. `depth` limits the
    /// history of a fresh clone; `None` fetches everything.
    pub fn clone_or_update(
        &mut self,
        site: &str,
        url: &str,
        depth: Option<u32>,
    ) -> Result<GitOutcome> {
        let path = self.workspace.acquire(site)?;

        if path.join(".git").is_dir() {
            info!("Found {}. Attempting 'git pull'.", path.display());
            let outcome = self.run(GitOp::Pull, &path)?;
            if outcome.succeeded() {
                return Ok(outcome);
            }
            warn!("Failed to git pull {}; cloning again", site);
        }

        if path.exists() {
            fs::remove_dir_all(&path)?;
        }

        match depth {
            Some(depth) => info!("Git cloning --depth {} {}...", depth, site),
            None => info!("Git cloning {}...", site),
        }
        let op = GitOp::Clone {
            url: url.to_string(),
            dest: path.clone(),
            depth,
        };
        self.run(op, &path)
    }

    /// Merges the source checkout's primary branch into the target checkout.
    ///
    /// Conflicts are resolved in favour of the source side.
    pub fn merge_into(&self, target: &Path, source: &Path) -> Result<GitOutcome> {
        let op = GitOp::MergeFrom {
            source: source.to_path_buf(),
            branch: self.primary_branch.clone(),
        };
        self.run(op, target)
    }

    /// The commit id at the tip of the primary branch.
    pub fn head_commit_id(&self, path: &Path) -> Result<String> {
        let op = GitOp::RevParse {
            rev: self.primary_branch.clone(),
        };
        let output = self.run(op.clone(), path)?.check()?;
        output
            .first_line()
            .map(str::to_string)
            .ok_or_else(|| Error::GitCommand {
                command: op.to_string(),
                path: path.display().to_string(),
                stderr: "no commit id in output".to_string(),
            })
    }

    /// Resets the working tree and index to `commit`, discarding later state.
    pub fn reset_hard(&self, path: &Path, commit: &str) -> Result<GitOutcome> {
        self.run(
            GitOp::ResetHard {
                rev: commit.to_string(),
            },
            path,
        )
    }

    /// Moves HEAD back by exactly `count` commits. Zero does nothing.
    pub fn rewind_commits(&self, path: &Path, count: u32) -> Result<GitOutcome> {
        let op = GitOp::ResetHard {
            rev: format!("HEAD~{}", count),
        };
        if count == 0 {
            return Ok(GitOutcome::skipped(op, path));
        }
        self.run(op, path)
    }

    /// Overwrites the remote primary branch with the local one.
    pub fn force_push(&self, path: &Path) -> Result<GitOutcome> {
        self.run(
            GitOp::Push {
                branch: self.primary_branch.clone(),
                force: true,
            },
            path,
        )
    }

    /// Pushes the primary branch without force.
    pub fn push(&self, path: &Path) -> Result<GitOutcome> {
        self.run(
            GitOp::Push {
                branch: self.primary_branch.clone(),
                force: false,
            },
            path,
        )
    }

    /// Saves the current tip under the snapshot branch, staying on the
    /// primary branch.
    pub fn create_snapshot_branch(&self, path: &Path) -> Result<GitOutcome> {
        self.run(
            GitOp::ForceBranch {
                name: SNAPSHOT_BRANCH.to_string(),
            },
            path,
        )
    }

    /// Merges the snapshot branch back, restoring the full local history.
    pub fn merge_snapshot_branch(&self, path: &Path) -> Result<GitOutcome> {
        self.run(
            GitOp::Merge {
                branch: SNAPSHOT_BRANCH.to_string(),
            },
            path,
        )
    }

    /// The commit a tag points at.
    pub fn resolve_tag(&self, path: &Path, tag: &str) -> Result<String> {
        let op = GitOp::RevList {
            rev: tag.to_string(),
        };
        let output = self.run(op.clone(), path)?.check()?;
        output
            .first_line()
            .map(str::to_string)
            .ok_or_else(|| Error::GitCommand {
                command: op.to_string(),
                path: path.display().to_string(),
                stderr: format!("tag {} does not resolve to a commit", tag),
            })
    }

    /// Stages everything, commits and pushes the primary branch.
    ///
    /// Stops at the first failing step and returns its outcome.
    pub fn commit_all_and_push(&self, path: &Path, message: &str) -> Result<GitOutcome> {
        let add = self.run(GitOp::AddAll, path)?;
        if !add.succeeded() {
            return Ok(add);
        }
        let commit = self.run(
            GitOp::Commit {
                message: message.to_string(),
            },
            path,
        )?;
        if !commit.succeeded() {
            return Ok(commit);
        }
        self.push(path)
    }
}

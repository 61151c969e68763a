//! Typed git operations.
//!
//! Every git call the clone engine makes is one [`GitOp`] variant. A variant
//! renders to an argument vector for the system `git`, which automatically
//! handles:
//! - SSH keys from ~/.ssh/
//! - Git credential helpers
//! - Any authentication configured in ~/.gitconfig

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::runner::Invocation;
use crate::site::ConnectionInfo;

/// Name of the auxiliary branch holding the pre-rewrite tip.
pub const SNAPSHOT_BRANCH: &str = "original";

/// A single git invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitOp {
    /// `git clone [--depth N] <url> <dest>`
    Clone {
        url: String,
        dest: PathBuf,
        depth: Option<u32>,
    },
    /// `git pull` from the checkout's own remote.
    Pull,
    /// Merge another local checkout's branch, preferring the incoming side on
    /// conflicts.
    MergeFrom { source: PathBuf, branch: String },
    /// `git rev-parse <rev>`
    RevParse { rev: String },
    /// `git reset --hard <rev>`
    ResetHard { rev: String },
    /// `git push [--force] origin <branch>`
    Push { branch: String, force: bool },
    /// `git branch -f <name>`: point `name` at HEAD without switching to it.
    ForceBranch { name: String },
    /// `git merge --no-edit <branch>`
    Merge { branch: String },
    /// `git rev-list -n 1 <rev>`
    RevList { rev: String },
    /// `git add -A`
    AddAll,
    /// `git commit -m <message>`
    Commit { message: String },
}

impl GitOp {
    /// Short operation name used in logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            GitOp::Clone { .. } => "clone",
            GitOp::Pull => "pull",
            GitOp::MergeFrom { .. } => "merge",
            GitOp::RevParse { .. } => "rev-parse",
            GitOp::ResetHard { .. } => "reset",
            GitOp::Push { force: true, .. } => "force-push",
            GitOp::Push { force: false, .. } => "push",
            GitOp::ForceBranch { .. } => "branch",
            GitOp::Merge { .. } => "merge",
            GitOp::RevList { .. } => "rev-list",
            GitOp::AddAll => "add",
            GitOp::Commit { .. } => "commit",
        }
    }

    /// Arguments passed to `git`.
    pub fn args(&self) -> Vec<String> {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        match self {
            GitOp::Clone { url, dest, depth } => {
                let mut args = owned(&["clone"]);
                if let Some(depth) = depth {
                    args.push("--depth".to_string());
                    args.push(depth.to_string());
                }
                args.push(url.clone());
                args.push(dest.to_string_lossy().into_owned());
                args
            }
            GitOp::Pull => owned(&["pull", "--no-rebase", "--no-edit"]),
            GitOp::MergeFrom { source, branch } => {
                let mut args = owned(&[
                    "pull",
                    "--no-rebase",
                    "--no-squash",
                    "--no-edit",
                    "-X",
                    "theirs",
                ]);
                args.push(source.to_string_lossy().into_owned());
                args.push(branch.clone());
                args
            }
            GitOp::RevParse { rev } => owned(&["rev-parse", rev.as_str()]),
            GitOp::ResetHard { rev } => owned(&["reset", "--hard", rev.as_str()]),
            GitOp::Push { branch, force } => {
                let mut args = owned(&["push"]);
                if *force {
                    args.push("--force".to_string());
                }
                args.push("origin".to_string());
                args.push(branch.clone());
                args
            }
            GitOp::ForceBranch { name } => owned(&["branch", "-f", name.as_str()]),
            GitOp::Merge { branch } => owned(&["merge", "--no-edit", branch.as_str()]),
            GitOp::RevList { rev } => owned(&["rev-list", "-n", "1", rev.as_str()]),
            GitOp::AddAll => owned(&["add", "-A"]),
            GitOp::Commit { message } => owned(&["commit", "-m", message.as_str()]),
        }
    }

    /// The invocation to run inside the checkout at `repo`.
    ///
    /// Clones carry an absolute destination and run without a working
    /// directory, since `repo` does not exist yet.
    pub fn invocation(&self, repo: &Path) -> Invocation {
        let invocation = Invocation::new("git").args(self.args());
        match self {
            GitOp::Clone { .. } => invocation,
            _ => invocation.current_dir(repo),
        }
    }
}

impl fmt::Display for GitOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "git {}", self.args().join(" "))
    }
}

fn clone_command_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"git\s+clone\s+(?:-\S+\s+)*(?P<url>[^\s'-][^\s']*)").expect("valid regex")
    })
}

/// Extracts the clone URL from an environment's connection info.
///
/// Prefers the explicit `git_url`; otherwise takes the URL argument out of the
/// suggested `git clone ... <url> <dir>` command.
pub fn clone_url(info: &ConnectionInfo) -> Option<String> {
    if let Some(url) = info.git_url.as_ref().filter(|u| !u.trim().is_empty()) {
        return Some(url.trim().to_string());
    }
    let command = info.git_command.as_deref()?;
    clone_command_regex()
        .captures(command)
        .and_then(|caps| caps.name("url"))
        .map(|m| m.as_str().to_string())
}

/// Human-oriented description of a failed git call.
///
/// Provides a helpful message for common auth failures.
pub fn describe_failure(stderr: &str) -> String {
    if stderr.contains("Authentication failed")
        || stderr.contains("Permission denied")
        || stderr.contains("Could not read from remote repository")
    {
        format!(
            "Authentication failed. Make sure you have access to the repository.\n\
            Ensure you have:\n\
            - SSH key added to ssh-agent and registered with the platform\n\
            - Git credentials configured\n\
            Error: {}",
            stderr.trim()
        )
    } else {
        stderr.trim().to_string()
    }
}

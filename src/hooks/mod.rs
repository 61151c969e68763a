//! # Transformation Hooks
//!
//! Hooks are named transformations applied to the target after its code or
//! content has been recreated, such as disabling outbound mail on a cloned
//! database. Each hook is a [`Transform`] registered explicitly with a
//! [`HookRegistry`]; nothing is discovered by name at runtime.
//!
//! ## Kinds
//!
//! - **Code** hooks run once, for dev, after the code recreation plan.
//! - **Content** hooks run for every environment whose content was imported.
//!
//! Within a kind, hooks run in name order. Any hook can be suppressed by
//! name through a [`SkipList`]. A failing hook is logged and recorded in the
//! [`HookReport`] but never stops the clone.

pub mod code;
pub mod content;

use std::collections::BTreeSet;
use std::fmt;

use log::{error, info};

use crate::error::Result;
use crate::phases::orchestrator::CloneOptions;
use crate::platform::Platform;
use crate::repository::RepositoryManager;
use crate::site::{Env, Site};

/// When a hook runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HookKind {
    Code,
    Content,
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookKind::Code => write!(f, "code"),
            HookKind::Content => write!(f, "content"),
        }
    }
}

/// Everything a hook may touch.
pub struct HookContext<'a> {
    pub platform: &'a dyn Platform,
    pub repos: &'a RepositoryManager,
    pub source: &'a Site,
    pub target: &'a Site,
    pub env: Env,
    pub options: &'a CloneOptions,
}

/// A named transformation of the target site.
pub trait Transform: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> HookKind;

    fn apply(&self, ctx: &HookContext<'_>) -> Result<()>;
}

/// Hook names that must not run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipList {
    names: BTreeSet<String>,
}

impl SkipList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a comma-separated list, ignoring blanks.
    pub fn parse(list: &str) -> Self {
        list.split(',').collect()
    }

    pub fn insert(&mut self, name: impl Into<String>) {
        self.names.insert(name.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl<S: AsRef<str>> FromIterator<S> for SkipList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let names = iter
            .into_iter()
            .map(|s| s.as_ref().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        Self { names }
    }
}

/// What happened during one [`HookRegistry::invoke`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookReport {
    pub ran: Vec<String>,
    pub skipped: Vec<String>,
    /// Hook name and error message.
    pub failed: Vec<(String, String)>,
}

impl HookReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn merge(&mut self, other: HookReport) {
        self.ran.extend(other.ran);
        self.skipped.extend(other.skipped);
        self.failed.extend(other.failed);
    }
}

/// The set of registered hooks.
#[derive(Default)]
pub struct HookRegistry {
    hooks: Vec<Box<dyn Transform>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a hook. A hook with the same name and kind replaces the old one.
    pub fn register(&mut self, hook: Box<dyn Transform>) {
        self.hooks
            .retain(|h| !(h.name() == hook.name() && h.kind() == hook.kind()));
        self.hooks.push(hook);
        self.hooks
            .sort_by(|a, b| (a.kind(), a.name()).cmp(&(b.kind(), b.name())));
    }

    /// Names of the hooks of `kind`, in run order.
    pub fn names(&self, kind: HookKind) -> Vec<&str> {
        self.hooks
            .iter()
            .filter(|h| h.kind() == kind)
            .map(|h| h.name())
            .collect()
    }

    /// Runs every hook of `kind` not in `skip`.
    pub fn invoke(&self, kind: HookKind, ctx: &HookContext<'_>, skip: &SkipList) -> HookReport {
        let mut report = HookReport::default();

        for hook in self.hooks.iter().filter(|h| h.kind() == kind) {
            let name = hook.name();
            if skip.contains(name) {
                info!("Skipping {} hook '{}' on {}.{}", kind, name, ctx.target.name, ctx.env);
                report.skipped.push(name.to_string());
                continue;
            }

            info!("Running {} hook '{}' on {}.{}", kind, name, ctx.target.name, ctx.env);
            match hook.apply(ctx) {
                Ok(()) => report.ran.push(name.to_string()),
                Err(e) => {
                    error!("Hook '{}' failed on {}.{}: {}", name, ctx.target.name, ctx.env, e);
                    report.failed.push((name.to_string(), e.to_string()));
                }
            }
        }

        report
    }
}

/// The registry with every built-in hook.
pub fn default_registry() -> HookRegistry {
    let mut registry = HookRegistry::new();
    registry.register(Box::new(content::DisableSmtp));
    registry.register(Box::new(content::RemoveEmails));
    registry.register(Box::new(code::CopyContribCode));
    registry
}

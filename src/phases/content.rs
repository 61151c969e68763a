//! Content recreation: database and files from backups.
//!
//! For each initialized source environment, in chain order, the latest
//! finished backup of every content element is imported into the target
//! environment of the same name. Then the content hooks run for that
//! environment. A missing backup or a failed import is logged and recorded
//! in the [`ContentReport`]; the pipeline moves on to the next element.

use log::{error, info};

use super::orchestrator::CloneOptions;
use super::topology::Topology;
use crate::backups;
use crate::error::{Error, Result};
use crate::hooks::{HookContext, HookKind, HookRegistry, HookReport};
use crate::platform::Platform;
use crate::repository::RepositoryManager;
use crate::site::{Element, Env, Site};

/// A content element that could not be replicated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementFailure {
    pub env: Env,
    pub element: Element,
    pub message: String,
}

/// Outcome of the content pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentReport {
    /// Environments processed, in order.
    pub envs: Vec<Env>,
    pub imported: Vec<(Env, Element)>,
    pub failures: Vec<ElementFailure>,
    pub hooks: HookReport,
}

impl ContentReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.hooks.is_clean()
    }
}

pub struct ContentPipeline<'a> {
    platform: &'a dyn Platform,
    repos: &'a RepositoryManager,
    hooks: &'a HookRegistry,
    options: &'a CloneOptions,
}

impl<'a> ContentPipeline<'a> {
    pub fn new(
        platform: &'a dyn Platform,
        repos: &'a RepositoryManager,
        hooks: &'a HookRegistry,
        options: &'a CloneOptions,
    ) -> Self {
        Self {
            platform,
            repos,
            hooks,
            options,
        }
    }

    pub fn run(&self, source: &Site, target: &Site, topology: &Topology) -> ContentReport {
        let mut report = ContentReport::default();

        for env in topology.initialized() {
            report.envs.push(env);

            for element in Element::CONTENT {
                match self.replicate(source, target, env, element) {
                    Ok(()) => report.imported.push((env, element)),
                    Err(e) => {
                        error!("{}", e);
                        report.failures.push(ElementFailure {
                            env,
                            element,
                            message: e.to_string(),
                        });
                    }
                }
            }

            let ctx = HookContext {
                platform: self.platform,
                repos: self.repos,
                source,
                target,
                env,
                options: self.options,
            };
            let hooks = self
                .hooks
                .invoke(HookKind::Content, &ctx, &self.options.skip_hooks);
            report.hooks.merge(hooks);
        }

        report
    }

    fn replicate(&self, source: &Site, target: &Site, env: Env, element: Element) -> Result<()> {
        let backup = backups::latest_finished_backup(self.platform, source, env, element)?
            .ok_or_else(|| Error::Backup {
                site: source.name.clone(),
                env: env.to_string(),
                element: element.to_string(),
                message: "no finished backup found".to_string(),
            })?;

        let url = self.platform.backup_url(source, env, &backup)?;
        info!(
            "Importing {} from {}.{} into {}.{}",
            element, source.name, env, target.name, env
        );
        self.platform
            .import_content(target, env, element, &url)
            .map_err(|e| match e {
                Error::Import { .. } => e,
                other => Error::Import {
                    site: target.name.clone(),
                    env: env.to_string(),
                    element: element.to_string(),
                    message: other.to_string(),
                },
            })
    }
}

//! Built-in code hooks.

use std::fs;
use std::path::Path;

use log::{debug, info};
use walkdir::WalkDir;

use super::{HookContext, HookKind, Transform};
use crate::error::{Error, Result};
use crate::framework;
use crate::site::Env;

/// Copies contributed modules and themes (`sites/all/*`) from the source
/// checkout into the target, then commits and pushes them to dev.
///
/// Drupal 5 through 7 only. Files already present in the target are kept.
pub struct CopyContribCode;

impl Transform for CopyContribCode {
    fn name(&self) -> &str {
        "copy-contrib-code"
    }

    fn kind(&self) -> HookKind {
        HookKind::Code
    }

    fn apply(&self, ctx: &HookContext<'_>) -> Result<()> {
        if ctx.env != Env::Dev {
            return Ok(());
        }

        let cms = ctx.source.framework.as_deref().unwrap_or("unknown");
        if !ctx.source.is_drupal() {
            return Err(Error::Unsupported {
                operation: "copying contributed code".to_string(),
                cms: cms.to_string(),
            });
        }

        let version = match &ctx.options.cms_version {
            Some(version) => version.clone(),
            None => framework::cms_version(ctx.platform, ctx.source)?,
        };
        if !matches!(framework::major_version(&version), Some(5..=7)) {
            return Err(Error::Unsupported {
                operation: "copying contributed code".to_string(),
                cms: format!("{} {}", cms, version),
            });
        }

        let missing_checkout = |site: &str| Error::Hook {
            hook: self.name().to_string(),
            env: ctx.env.to_string(),
            message: format!("no working copy for {}", site),
        };
        let source = ctx
            .repos
            .checkout(&ctx.source.name)
            .ok_or_else(|| missing_checkout(&ctx.source.name))?;
        let target = ctx
            .repos
            .checkout(&ctx.target.name)
            .ok_or_else(|| missing_checkout(&ctx.target.name))?;

        info!("Copying contributed code {} -> {}", ctx.source.name, ctx.target.name);
        let copied = copy_contrib_dirs(&source.join("sites/all"), &target.join("sites/all"))?;
        if copied == 0 {
            debug!("No contributed code to copy from {}", ctx.source.name);
            return Ok(());
        }

        info!(
            "Pushing {} contributed files from {} to {}'s dev environment",
            copied, ctx.source.name, ctx.target.name
        );
        let message = format!("Adding contributed code from {}.", ctx.source.name);
        ctx.repos.commit_all_and_push(target, &message)?.check()?;
        Ok(())
    }
}

/// Copies every directory directly under `source` into `target`, skipping
/// files that already exist there. Symlinks are followed. Returns the number
/// of files copied.
pub fn copy_contrib_dirs(source: &Path, target: &Path) -> Result<usize> {
    if !source.is_dir() {
        return Ok(0);
    }

    let mut copied = 0;
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        // A dangling link is not a directory.
        if fs::metadata(entry.path()).is_ok_and(|m| m.is_dir()) {
            copied += copy_missing(&entry.path(), &target.join(entry.file_name()))?;
        }
    }
    Ok(copied)
}

fn copy_missing(source: &Path, target: &Path) -> Result<usize> {
    let mut copied = 0;
    for entry in WalkDir::new(source).follow_links(true) {
        let entry = entry?;
        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        let dest = target.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest)?;
        } else if !dest.exists() {
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &dest)?;
            copied += 1;
        }
    }
    Ok(copied)
}

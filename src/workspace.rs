//! Local working copies.
//!
//! A [`Workspace`] owns the directory under which every site's checkout lives
//! (`<root>/<site-name>`) and the set of checkouts acquired during one run.
//! Releasing the workspace deletes those checkouts, `.git` included, unless it
//! was created in keep mode, in which case they are left in place and named in
//! a warning. Release also happens on drop, so a run that aborts half way
//! still cleans up after itself.
//!
//! There is no locking: two runs that touch the same site name share the same
//! directory.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::error::Result;

/// Root directory plus the checkouts acquired from it.
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    keep: bool,
    checkouts: BTreeMap<String, PathBuf>,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>, keep: bool) -> Self {
        Self {
            root: root.into(),
            keep,
            checkouts: BTreeMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn keeps_checkouts(&self) -> bool {
        self.keep
    }

    /// Where the checkout for `site` lives, acquired or not.
    pub fn checkout_path(&self, site: &str) -> PathBuf {
        self.root.join(site)
    }

    /// Registers the checkout for `site` and makes sure the root exists.
    pub fn acquire(&mut self, site: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.root)?;
        let path = self.checkout_path(site);
        self.checkouts.insert(site.to_string(), path.clone());
        Ok(path)
    }

    /// The checkout for `site`, if it was acquired.
    pub fn get(&self, site: &str) -> Option<&Path> {
        self.checkouts.get(site).map(PathBuf::as_path)
    }

    /// Deletes (or, in keep mode, retains) every acquired checkout.
    ///
    /// Returns the paths that were retained. Calling it again is a no-op.
    pub fn release(&mut self) -> Result<Vec<PathBuf>> {
        let checkouts = std::mem::take(&mut self.checkouts);
        let paths: Vec<PathBuf> = checkouts.into_values().collect();

        if self.keep {
            if !paths.is_empty() {
                let listed: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
                warn!("Keeping working copies for debugging: {}", listed.join(", "));
            }
            return Ok(paths);
        }

        for path in &paths {
            if path.exists() {
                debug!("Removing working copy {}", path.display());
                fs::remove_dir_all(path)?;
            }
        }
        Ok(Vec::new())
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("Failed to remove working copies: {}", e);
        }
    }
}

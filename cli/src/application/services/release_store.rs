//! Application service: the active-release lookup for a deploy directory.

use std::path::{Path, PathBuf};

use crate::application::ports::{PointerEntry, ReleaseFs};
use crate::domain::release::{self, release_id_from_link};
use crate::domain::ReleaseStoreError;

/// Release directories and active pointers under one deploy directory.
pub struct ReleaseStore<F> {
    deploy_dir: PathBuf,
    fs: F,
}

impl<F: ReleaseFs> ReleaseStore<F> {
    pub fn new(deploy_dir: impl Into<PathBuf>, fs: F) -> Self {
        Self {
            deploy_dir: deploy_dir.into(),
            fs,
        }
    }

    #[must_use]
    pub fn deploy_dir(&self) -> &Path {
        &self.deploy_dir
    }

    pub(crate) fn fs(&self) -> &F {
        &self.fs
    }

    #[must_use]
    pub fn release_dir_path(&self, target: &str, release_id: &str) -> PathBuf {
        release::release_dir_path(&self.deploy_dir, target, release_id)
    }

    #[must_use]
    pub fn active_pointer_path(&self, target: &str) -> PathBuf {
        release::active_pointer_path(&self.deploy_dir, target)
    }

    /// Returns the release ID named by the target's active pointer, or `None`
    /// when nothing has been deployed yet.
    ///
    /// # Errors
    ///
    /// - [`ReleaseStoreError::PointerCorrupted`] if the pointer slot holds
    ///   something other than a symbolic link.
    /// - [`ReleaseStoreError::MalformedReleaseRecord`] if the link target is
    ///   not `<target>-<release_id>`.
    pub fn current_release_id(&self, target: &str) -> Result<Option<String>, ReleaseStoreError> {
        let path = self.active_pointer_path(target);
        let entry = self
            .fs
            .inspect_pointer(&path)
            .map_err(|source| ReleaseStoreError::Io {
                path: path.clone(),
                source,
            })?;
        match entry {
            PointerEntry::Missing => Ok(None),
            PointerEntry::NotALink => Err(ReleaseStoreError::PointerCorrupted { path }),
            PointerEntry::Link(link_target) => release_id_from_link(target, &link_target).map(Some),
        }
    }
}

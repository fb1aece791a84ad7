//! Application service: the deployment transaction.
//!
//! allocate → populate → promote → retire. Only the rename inside `promote`
//! changes what the active pointer resolves to; every earlier failure leaves
//! the pointer untouched and retirement runs after the commit, outside the
//! transaction's error path.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::application::ports::{ArchiveExtractor, ReleaseFs};
use crate::application::services::release_store::ReleaseStore;
use crate::domain::DeployError;
use crate::domain::release::{release_dir_name, staging_link_path};

/// Release archives wrap their payload in one top-level directory.
pub const STRIP_COMPONENTS: usize = 1;

// ── Public types ──────────────────────────────────────────────────────────────

/// A committed deployment.
#[derive(Debug)]
pub struct Deployment {
    /// The directory the active pointer now names.
    pub release_dir: PathBuf,
    /// What happened to the superseded release directory.
    pub retirement: Retirement,
}

/// Post-commit cleanup result. Never affects the committed promotion.
#[derive(Debug)]
pub enum Retirement {
    /// There was no previous release.
    NotNeeded,
    /// The previous release directory is gone.
    Retired(PathBuf),
    /// The previous release directory could not be removed and is orphaned.
    Failed(DeployError),
}

/// Runs the deployment transaction for targets under one deploy directory.
pub struct DeploymentCoordinator<E, F> {
    store: ReleaseStore<F>,
    extractor: E,
}

impl<E: ArchiveExtractor, F: ReleaseFs> DeploymentCoordinator<E, F> {
    pub fn new(store: ReleaseStore<F>, extractor: E) -> Self {
        Self { store, extractor }
    }

    #[must_use]
    pub fn store(&self) -> &ReleaseStore<F> {
        &self.store
    }

    /// Deploy `archive` as `release_id` of `target` and make it active.
    ///
    /// `archive` must already be authenticated, and `release_id` must differ
    /// from `previous`.
    ///
    /// # Errors
    ///
    /// Returns an error if allocation, extraction or promotion fails; the
    /// active pointer is unchanged in every such case. A failed retirement is
    /// reported through [`Deployment::retirement`] instead.
    pub fn deploy(
        &self,
        target: &str,
        release_id: &str,
        previous: Option<&str>,
        archive: &[u8],
    ) -> Result<Deployment, DeployError> {
        let release_dir = self.allocate(target, release_id)?;
        self.populate(&release_dir, archive)?;
        self.promote(target, release_id)?;
        info!(
            target_name = %target,
            release_id = %release_id,
            path = %release_dir.display(),
            "release promoted"
        );

        let retirement = match previous {
            Some(prev) if prev != release_id => match self.retire(target, prev) {
                Ok(path) => Retirement::Retired(path),
                Err(e) => Retirement::Failed(e),
            },
            _ => Retirement::NotNeeded,
        };
        Ok(Deployment {
            release_dir,
            retirement,
        })
    }

    /// Create the release directory. Never reuses an existing one.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::AlreadyExists`] when the directory is present.
    pub fn allocate(&self, target: &str, release_id: &str) -> Result<PathBuf, DeployError> {
        let path = self.store.release_dir_path(target, release_id);
        match self.store.fs().create_dir(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "release directory allocated");
                Ok(path)
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                Err(DeployError::AlreadyExists { path })
            }
            Err(source) => Err(DeployError::Allocate { path, source }),
        }
    }

    fn populate(&self, release_dir: &Path, archive: &[u8]) -> Result<(), DeployError> {
        self.extractor
            .extract(archive, release_dir, STRIP_COMPONENTS)
            .map_err(|source| DeployError::Extraction {
                path: release_dir.to_path_buf(),
                source,
            })
    }

    /// Atomically repoint the target's active pointer at `release_id`.
    ///
    /// A relative link is staged next to the pointer, then renamed over it.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::PromotionFailed`] naming the step that failed.
    pub fn promote(&self, target: &str, release_id: &str) -> Result<(), DeployError> {
        let fs = self.store.fs();
        let staging = staging_link_path(self.store.deploy_dir(), target);
        let pointer = self.store.active_pointer_path(target);
        let link_target = PathBuf::from(release_dir_name(target, release_id));
        let failed = |step, source| DeployError::PromotionFailed {
            step,
            path: link_target.clone(),
            source,
        };

        // A crashed earlier run may have left its staging link behind.
        match fs.remove_file(&staging) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => {
                return Err(failed("clear staging link", e));
            }
            _ => {}
        }
        fs.symlink(&link_target, &staging)
            .map_err(|e| failed("create staging link", e))?;
        if let Err(e) = fs.rename(&staging, &pointer) {
            let _ = fs.remove_file(&staging);
            return Err(failed("rename onto active pointer", e));
        }
        Ok(())
    }

    /// Delete a superseded release directory.
    ///
    /// A directory that is already gone counts as retired.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::RetireFailed`] if removal fails.
    pub fn retire(&self, target: &str, release_id: &str) -> Result<PathBuf, DeployError> {
        let path = self.store.release_dir_path(target, release_id);
        match self.store.fs().remove_dir_all(&path) {
            Ok(()) => Ok(path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "superseded release already removed");
                Ok(path)
            }
            Err(source) => Err(DeployError::RetireFailed { path, source }),
        }
    }
}

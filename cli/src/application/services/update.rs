//! Application service: the per-target update cycle.
//!
//! Imports only from `crate::domain` and `crate::application`.
//! All I/O is routed through injected port traits.

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::application::ports::{ArchiveExtractor, ReleaseFs, ReleaseSource, SignatureVerifier};
use crate::application::services::deploy::{DeploymentCoordinator, Retirement};
use crate::domain::{
    AssetError, DeployError, ReleaseStoreError, SignatureError, Target, error_chain,
    select_assets,
};

// ── Public types ──────────────────────────────────────────────────────────────

/// Whether archives are authenticated before deployment.
pub enum Verification<V> {
    Enforced(V),
    /// Deploy unauthenticated archives. Logged loudly on every use.
    UnsafeSkip,
}

/// Result of one successful pass over one target.
#[derive(Debug)]
pub enum CycleOutcome {
    /// The active release already matches the latest upstream release.
    UpToDate { release_id: String },
    /// A new release was promoted.
    Updated {
        release_id: String,
        previous: Option<String>,
        retirement: Retirement,
    },
}

/// Why a target was skipped this cycle. None of these are fatal; the target
/// is retried on the next sweep.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("remote release source failed: {0:#}")]
    Remote(anyhow::Error),

    #[error(transparent)]
    Shape(#[from] AssetError),

    #[error(transparent)]
    Authentication(#[from] SignatureError),

    #[error(transparent)]
    Store(#[from] ReleaseStoreError),

    #[error(transparent)]
    Deploy(#[from] DeployError),

    #[error("deployment task did not complete")]
    Task(#[from] tokio::task::JoinError),
}

impl CycleError {
    /// Shape errors recur until upstream fixes the release.
    #[must_use]
    pub const fn is_persistent(&self) -> bool {
        matches!(self, Self::Shape(_))
    }
}

/// Tally of one sweep over all targets.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub updated: usize,
    pub up_to_date: usize,
    pub failed: usize,
}

// ── Update agent ──────────────────────────────────────────────────────────────

/// Checks targets against their release source and deploys new releases.
pub struct UpdateAgent<S, V, E, F> {
    source: S,
    verification: Verification<V>,
    coordinator: Arc<DeploymentCoordinator<E, F>>,
}

impl<S, V, E, F> UpdateAgent<S, V, E, F>
where
    S: ReleaseSource,
    V: SignatureVerifier,
    E: ArchiveExtractor + Send + Sync + 'static,
    F: ReleaseFs + Send + Sync + 'static,
{
    pub fn new(
        source: S,
        verification: Verification<V>,
        coordinator: DeploymentCoordinator<E, F>,
    ) -> Self {
        Self {
            source,
            verification,
            coordinator: Arc::new(coordinator),
        }
    }

    #[must_use]
    pub fn coordinator(&self) -> &DeploymentCoordinator<E, F> {
        &self.coordinator
    }

    /// Run one update pass for `target`.
    ///
    /// # Errors
    ///
    /// Returns a classified [`CycleError`]; the active release is never left
    /// pointing at unverified or partially written content.
    pub async fn check_target(&self, target: &Target) -> Result<CycleOutcome, CycleError> {
        let name = target.name.as_str();
        info!(target_name = %name, "checking for update...");

        let current = self.coordinator.store().current_release_id(name)?;
        let latest = self
            .source
            .latest_release(target)
            .await
            .map_err(CycleError::Remote)?;

        if current.as_deref() == Some(latest.id.as_str()) {
            info!(target_name = %name, release_id = %latest.id, "already at latest release");
            return Ok(CycleOutcome::UpToDate {
                release_id: latest.id,
            });
        }
        info!(
            target_name = %name,
            release_id = %latest.id,
            tag = %latest.tag,
            current = current.as_deref().unwrap_or("none"),
            "update found"
        );

        let assets = select_assets(&target.repo, &latest.assets)?;
        self.source.check_origin(&assets.archive)?;
        self.source.check_origin(&assets.signature)?;
        let archive = self.fetch(&assets.archive).await?;
        let signature = self.fetch(&assets.signature).await?;

        match &self.verification {
            Verification::Enforced(verifier) => {
                if !verifier.verify(&archive, &signature)? {
                    return Err(SignatureError::VerificationFailed.into());
                }
            }
            Verification::UnsafeSkip => {
                warn!(target_name = %name, "skipping signature verification!");
            }
        }

        let coordinator = Arc::clone(&self.coordinator);
        let (task_name, task_id, task_prev) =
            (name.to_string(), latest.id.clone(), current.clone());
        let deployment = tokio::task::spawn_blocking(move || {
            coordinator.deploy(&task_name, &task_id, task_prev.as_deref(), &archive)
        })
        .await??;

        if let Retirement::Failed(e) = &deployment.retirement {
            warn!(
                target_name = %name,
                error = %error_chain(e),
                "previous release left on disk"
            );
        }
        Ok(CycleOutcome::Updated {
            release_id: latest.id,
            previous: current,
            retirement: deployment.retirement,
        })
    }

    async fn fetch(&self, asset: &crate::domain::ReleaseAsset) -> Result<Vec<u8>, CycleError> {
        self.source
            .download(asset)
            .await
            .map_err(|e| match e.downcast::<AssetError>() {
                Ok(shape) => CycleError::Shape(shape),
                Err(other) => CycleError::Remote(other),
            })
    }

    /// Check every target once, in order. Failures are logged and counted,
    /// never propagated.
    pub async fn sweep(&self, targets: &[Target]) -> SweepReport {
        let mut report = SweepReport::default();
        for target in targets {
            match self.check_target(target).await {
                Ok(CycleOutcome::UpToDate { .. }) => report.up_to_date += 1,
                Ok(CycleOutcome::Updated { release_id, .. }) => {
                    info!(
                        target_name = %target.name,
                        release_id = %release_id,
                        "update successful"
                    );
                    report.updated += 1;
                }
                Err(e) if e.is_persistent() => {
                    error!(
                        target_name = %target.name,
                        error = %error_chain(&e),
                        "update failed; release is malformed and will be skipped until fixed upstream"
                    );
                    report.failed += 1;
                }
                Err(e) => {
                    error!(target_name = %target.name, error = %error_chain(&e), "update failed");
                    report.failed += 1;
                }
            }
        }
        report
    }
}

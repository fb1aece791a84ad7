//! Command implementations

pub mod run;
pub mod status;
pub mod verify;

use crate::application::services::{DeploymentCoordinator, ReleaseStore};
use crate::domain::AgentConfig;
use crate::infra::extract::TarGzExtractor;
use crate::infra::fs::LocalFs;

/// The production release store rooted at the configured deploy directory.
#[must_use]
pub fn release_store(config: &AgentConfig) -> ReleaseStore<LocalFs> {
    ReleaseStore::new(config.deploy_dir.clone(), LocalFs)
}

/// The production deployment coordinator for `config`.
#[must_use]
pub fn coordinator(config: &AgentConfig) -> DeploymentCoordinator<TarGzExtractor, LocalFs> {
    DeploymentCoordinator::new(release_store(config), TarGzExtractor)
}

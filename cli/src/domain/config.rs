//! Domain types and validators for the agent configuration.
//!
//! Pure functions only, no I/O, no async, no filesystem access.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;

/// Target names become directory-name prefixes, so they are restricted
/// before any path interpolation.
pub static TARGET_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid regex")
});

// ── Config schema ────────────────────────────────────────────────────────────

/// A monitored release source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Name used for directory naming under the deploy directory.
    pub name: String,
    /// Upstream repository owner.
    pub owner: String,
    /// Upstream repository name.
    pub repo: String,
}

/// Top-level configuration loaded from the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub deploy_dir: PathBuf,
    pub targets: Vec<Target>,
    /// Path to a minisign public key file.
    #[serde(default)]
    pub public_signing_key_file: Option<PathBuf>,
    /// Inline base64 minisign public key.
    #[serde(default)]
    pub public_signing_key: Option<String>,
    #[serde(default)]
    pub unsafe_skip_signature_verification: bool,
    /// Seconds between sweeps.
    pub update_interval: u64,
}

impl AgentConfig {
    /// Validates the config as a whole.
    ///
    /// # Errors
    ///
    /// Returns the first violation found, naming the offending target index.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.deploy_dir.as_os_str().is_empty() {
            return Err(ConfigError::MissingDeployDir);
        }
        if self.update_interval == 0 {
            return Err(ConfigError::InvalidInterval);
        }
        let has_file = self
            .public_signing_key_file
            .as_ref()
            .is_some_and(|p| !p.as_os_str().is_empty());
        let has_inline = self
            .public_signing_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty());
        if has_file && has_inline {
            return Err(ConfigError::ConflictingSigningKeys);
        }
        if !self.unsafe_skip_signature_verification && !has_file && !has_inline {
            return Err(ConfigError::MissingSigningKey);
        }
        validate_targets(&self.targets)
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.update_interval)
    }
}

// ── Validators ───────────────────────────────────────────────────────────────

/// Returns `true` when `name` is usable as a directory-name prefix.
#[must_use]
pub fn is_valid_target_name(name: &str) -> bool {
    TARGET_NAME_RE.is_match(name)
}

/// Validates target shape and name uniqueness.
///
/// # Errors
///
/// Returns an error for the first target that is incomplete, badly named,
/// or reuses an earlier target's name.
pub fn validate_targets(targets: &[Target]) -> Result<(), ConfigError> {
    if targets.is_empty() {
        return Err(ConfigError::NoTargets);
    }
    let mut seen = HashSet::new();
    for (index, target) in targets.iter().enumerate() {
        if target.name.is_empty() {
            return Err(ConfigError::MissingTargetField {
                index,
                field: "name",
            });
        }
        if !is_valid_target_name(&target.name) {
            return Err(ConfigError::InvalidTargetName {
                index,
                name: target.name.clone(),
            });
        }
        if target.owner.is_empty() {
            return Err(ConfigError::MissingTargetField {
                index,
                field: "owner",
            });
        }
        if target.repo.is_empty() {
            return Err(ConfigError::MissingTargetField {
                index,
                field: "repo",
            });
        }
        if !seen.insert(target.name.as_str()) {
            return Err(ConfigError::DuplicateTargetName {
                index,
                name: target.name.clone(),
            });
        }
    }
    Ok(())
}

// ── Unit tests ───────────────────────────────────────────────────────────────

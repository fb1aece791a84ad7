//! Domain layer: pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod config;
pub mod error;
pub mod release;

pub use config::{AgentConfig, Target, validate_targets};
pub use error::{
    AssetError, ConfigError, DeployError, ExtractError, ReleaseStoreError, SignatureError,
    error_chain,
};
pub use release::{
    AssetPair, ReleaseAsset, active_pointer_path, release_dir_path, release_id_from_link,
    select_assets,
};

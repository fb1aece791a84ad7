//! Application services: use-case orchestration.
//!
//! Each service module implements a single use-case by composing domain logic
//! with port trait calls. Services import only from `crate::domain` and
//! `crate::application::ports`, never from `crate::infra` or
//! `crate::commands`.

pub mod deploy;
pub mod release_store;
pub mod update;

pub use deploy::{Deployment, DeploymentCoordinator, Retirement, STRIP_COMPONENTS};
pub use release_store::ReleaseStore;
pub use update::{CycleError, CycleOutcome, SweepReport, UpdateAgent, Verification};

//! Infrastructure layer: concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: archive extraction,
//! filesystem access, signature checks, the GitHub API and config files.
//!
//! Imports from `crate::domain` and `crate::application::ports` are allowed.
//! Imports from `crate::commands` are forbidden.

pub mod config;
pub mod extract;
pub mod fs;
pub mod github;
pub mod signature;

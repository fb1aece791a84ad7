//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

// ── Signature errors ──────────────────────────────────────────────────────────

/// Errors raised while authenticating a release archive.
#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("malformed public key: {0}")]
    MalformedKey(String),

    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    #[error("signature verification failed: archive does not match its signature")]
    VerificationFailed,
}

// ── Extraction errors ─────────────────────────────────────────────────────────

/// Errors raised while unpacking a release archive.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("archive entry '{entry}' escapes the destination directory")]
    PathTraversal { entry: String },

    #[error("archive entry '{entry}' has unsupported kind: {kind}")]
    UnsupportedEntryKind { entry: String, kind: String },

    #[error("extraction failed during {operation} at {}", path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ExtractError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}

// ── Release store errors ──────────────────────────────────────────────────────

/// Errors raised while reading the active release pointer.
#[derive(Debug, Error)]
pub enum ReleaseStoreError {
    #[error("active pointer {} exists but is not a symbolic link", path.display())]
    PointerCorrupted { path: PathBuf },

    #[error("active pointer names '{segment}', which is not a <target>-<release> directory")]
    MalformedReleaseRecord { segment: String },

    #[error("cannot inspect active pointer {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

// ── Deployment errors ─────────────────────────────────────────────────────────

/// Errors raised by the deployment transaction.
///
/// Everything except [`DeployError::RetireFailed`] leaves the active pointer
/// exactly as it was before the attempt.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("release directory {} already exists", path.display())]
    AlreadyExists { path: PathBuf },

    #[error("cannot create release directory {}", path.display())]
    Allocate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot populate release directory {}", path.display())]
    Extraction {
        path: PathBuf,
        #[source]
        source: ExtractError,
    },

    #[error("cannot promote {} to active during {step}", path.display())]
    PromotionFailed {
        step: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot remove superseded release directory {}", path.display())]
    RetireFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

// ── Release asset errors ──────────────────────────────────────────────────────

/// Shape errors in an upstream release. These recur every cycle until the
/// release itself is fixed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssetError {
    #[error("release must carry exactly one {kind} asset (found {found})")]
    WrongCount { kind: &'static str, found: usize },

    #[error("release asset URL is invalid: {url}")]
    InvalidUrl { url: String },

    #[error("release asset URL is not hosted on {expected}: {url}")]
    UntrustedHost { url: String, expected: &'static str },
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Startup configuration errors. Always fatal.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("deploy directory must be set")]
    MissingDeployDir,

    #[error("update interval must be >0")]
    InvalidInterval,

    #[error("public signing key must be set if signature verification is enabled")]
    MissingSigningKey,

    #[error("set only one of public_signing_key and public_signing_key_file")]
    ConflictingSigningKeys,

    #[error("at least one target must be set")]
    NoTargets,

    #[error("{field} for target {index} must be set")]
    MissingTargetField { index: usize, field: &'static str },

    #[error("name for target {index} must match pattern ^[A-Za-z0-9_-]+$ (got '{name}')")]
    InvalidTargetName { index: usize, name: String },

    #[error("target {index} has duplicate name '{name}'")]
    DuplicateTargetName { index: usize, name: String },
}

/// Render `err` followed by every cause in its source chain, joined by `": "`.
#[must_use]
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut rendered = err.to_string();
    let mut cause = err.source();
    while let Some(inner) = cause {
        rendered.push_str(": ");
        rendered.push_str(&inner.to_string());
        cause = inner.source();
    }
    rendered
}

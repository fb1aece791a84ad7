//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`, never from `crate::infra`
//! or `crate::commands`.

use std::io;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::domain::{AssetError, ExtractError, ReleaseAsset, SignatureError, Target};

// ── Value Types ───────────────────────────────────────────────────────────────

/// The newest release an upstream source offers for a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestRelease {
    /// Opaque release identifier, compared only for equality.
    pub id: String,
    /// Human-readable tag, used in log lines only.
    pub tag: String,
    pub assets: Vec<ReleaseAsset>,
}

/// What occupies the active pointer slot on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointerEntry {
    /// Nothing at the path.
    Missing,
    /// Something other than a symbolic link.
    NotALink,
    /// A symbolic link and its (unresolved) target.
    Link(PathBuf),
}

// ── Authentication Port ───────────────────────────────────────────────────────

/// Authenticates archive bytes against a detached signature.
pub trait SignatureVerifier {
    /// Returns `Ok(false)` for a well-formed signature that does not match.
    ///
    /// # Errors
    ///
    /// Returns an error only when the key or signature cannot be decoded.
    fn verify(&self, payload: &[u8], signature: &[u8]) -> Result<bool, SignatureError>;
}

// ── Archive Port ──────────────────────────────────────────────────────────────

/// Unpacks a compressed archive into a directory.
pub trait ArchiveExtractor {
    /// Extract `archive` under `destination`, dropping the first
    /// `strip_components` path segments of every entry.
    ///
    /// # Errors
    ///
    /// Returns an error on unsafe paths, unsupported entries, or I/O failure.
    /// Partial output may remain in `destination`.
    fn extract(
        &self,
        archive: &[u8],
        destination: &Path,
        strip_components: usize,
    ) -> Result<(), ExtractError>;
}

// ── Release Filesystem Port ───────────────────────────────────────────────────

/// The filesystem primitives the deployment transaction is built from.
///
/// Kept narrow so tests can inject failures at each step.
pub trait ReleaseFs {
    /// Create exactly one directory; fails if it already exists.
    fn create_dir(&self, path: &Path) -> io::Result<()>;
    /// Create a symbolic link at `link` pointing at `target`.
    fn symlink(&self, target: &Path, link: &Path) -> io::Result<()>;
    /// Atomically replace `to` with `from`.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
    /// Remove a file or symbolic link.
    fn remove_file(&self, path: &Path) -> io::Result<()>;
    /// Remove a directory tree.
    fn remove_dir_all(&self, path: &Path) -> io::Result<()>;
    /// Inspect a path without following it.
    fn inspect_pointer(&self, path: &Path) -> io::Result<PointerEntry>;
}

// ── Release Source Port ───────────────────────────────────────────────────────

/// Remote release listing and asset download.
#[allow(async_fn_in_trait)]
pub trait ReleaseSource {
    /// Fetch the latest release for a target.
    async fn latest_release(&self, target: &Target) -> Result<LatestRelease>;

    /// Reject assets whose download URL does not come from the trusted host.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::InvalidUrl`] or [`AssetError::UntrustedHost`].
    fn check_origin(&self, asset: &ReleaseAsset) -> Result<(), AssetError>;

    /// Download one asset. Implementations run [`ReleaseSource::check_origin`]
    /// first and return its [`AssetError`] before any bytes are fetched.
    async fn download(&self, asset: &ReleaseAsset) -> Result<Vec<u8>>;
}

//! Release naming, active-pointer parsing, and release asset selection.
//!
//! The directory name of a release is the only record of which release is
//! installed: `<deploy_dir>/<target>-<release_id>`. The active pointer is a
//! symlink at `<deploy_dir>/<target>` naming one of those directories.
//!
//! Pure functions only, no I/O, no async, no filesystem access.

use std::path::{Path, PathBuf};

use crate::domain::error::{AssetError, ReleaseStoreError};

/// Suffix of the archive asset in an upstream release.
pub const ARCHIVE_SUFFIX: &str = ".tar.gz";
/// Suffix of the detached signature asset in an upstream release.
pub const SIGNATURE_SUFFIX: &str = ".minisig";

// ── Naming ───────────────────────────────────────────────────────────────────

/// `<target>-<release_id>`
#[must_use]
pub fn release_dir_name(target: &str, release_id: &str) -> String {
    format!("{target}-{release_id}")
}

/// `<deploy_dir>/<target>-<release_id>`
#[must_use]
pub fn release_dir_path(deploy_dir: &Path, target: &str, release_id: &str) -> PathBuf {
    deploy_dir.join(release_dir_name(target, release_id))
}

/// `<deploy_dir>/<target>`
#[must_use]
pub fn active_pointer_path(deploy_dir: &Path, target: &str) -> PathBuf {
    deploy_dir.join(target)
}

/// Adjacent path where the replacement pointer is staged before the rename.
///
/// The leading dot keeps it from ever parsing as a release directory.
#[must_use]
pub fn staging_link_path(deploy_dir: &Path, target: &str) -> PathBuf {
    deploy_dir.join(format!(".{target}.next"))
}

// ── Parsing ──────────────────────────────────────────────────────────────────

/// Splits a release directory name on its last `-` into `(target, release_id)`.
///
/// # Errors
///
/// Returns [`ReleaseStoreError::MalformedReleaseRecord`] when there is no `-`
/// or either side of it is empty.
pub fn parse_release_dir_name(segment: &str) -> Result<(&str, &str), ReleaseStoreError> {
    match segment.rsplit_once('-') {
        Some((name, id)) if !name.is_empty() && !id.is_empty() => Ok((name, id)),
        _ => Err(malformed(segment)),
    }
}

/// Derives the installed release ID from the active pointer's link target.
///
/// Only the final path segment of `link_target` is considered, so absolute
/// and relative link targets are treated alike.
///
/// # Errors
///
/// Returns [`ReleaseStoreError::MalformedReleaseRecord`] when the segment is
/// not `<target>-<release_id>` for this `target`.
pub fn release_id_from_link(target: &str, link_target: &Path) -> Result<String, ReleaseStoreError> {
    let segment = link_target
        .file_name()
        .and_then(|s| s.to_str())
        .ok_or_else(|| malformed(&link_target.to_string_lossy()))?;
    let (name, id) = parse_release_dir_name(segment)?;
    if name != target {
        return Err(malformed(segment));
    }
    Ok(id.to_string())
}

fn malformed(segment: &str) -> ReleaseStoreError {
    ReleaseStoreError::MalformedReleaseRecord {
        segment: segment.to_string(),
    }
}

// ── Release assets ───────────────────────────────────────────────────────────

/// An asset listed on an upstream release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseAsset {
    pub name: String,
    pub download_url: String,
}

/// The archive and signature assets picked out of a release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPair {
    pub archive: ReleaseAsset,
    pub signature: ReleaseAsset,
}

/// Picks the `<repo>-<version>.tar.gz` and `<repo>-<version>.minisig` assets.
///
/// # Errors
///
/// Returns [`AssetError::WrongCount`] unless exactly one asset of each kind is
/// present.
pub fn select_assets(repo: &str, assets: &[ReleaseAsset]) -> Result<AssetPair, AssetError> {
    let archive = pick_one(repo, assets, ARCHIVE_SUFFIX, "archive")?;
    let signature = pick_one(repo, assets, SIGNATURE_SUFFIX, "signature")?;
    Ok(AssetPair { archive, signature })
}

fn pick_one(
    repo: &str,
    assets: &[ReleaseAsset],
    suffix: &str,
    kind: &'static str,
) -> Result<ReleaseAsset, AssetError> {
    let mut matches = assets
        .iter()
        .filter(|a| asset_version(repo, &a.name, suffix).is_some());
    match (matches.next(), matches.next()) {
        (Some(asset), None) => Ok(asset.clone()),
        (None, _) => Err(AssetError::WrongCount { kind, found: 0 }),
        (Some(_), Some(_)) => Err(AssetError::WrongCount {
            kind,
            found: 2 + matches.count(),
        }),
    }
}

/// Returns the `<version>` part of `<repo>-<version><suffix>`, where version
/// is word characters and dots.
#[must_use]
pub fn asset_version<'a>(repo: &str, name: &'a str, suffix: &str) -> Option<&'a str> {
    let version = name
        .strip_prefix(repo)?
        .strip_prefix('-')?
        .strip_suffix(suffix)?;
    let valid = !version.is_empty()
        && version
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    valid.then_some(version)
}

/// Encode bytes as lowercase hex string.
#[must_use]
pub fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        out.push(char::from(HEX[(b >> 4) as usize]));
        out.push(char::from(HEX[(b & 0xf) as usize]));
    }
    out
}

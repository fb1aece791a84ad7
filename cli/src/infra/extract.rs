//! Archive infrastructure: implements `ArchiveExtractor` for gzip-compressed tar.
//!
//! Entries are streamed in archive order. Every written path is built from
//! plain (`Normal`) path segments only, so nothing lands outside the
//! destination; symlinks, hardlinks and device nodes are refused outright.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tar::{Archive, Entry, EntryType};

use crate::application::ports::ArchiveExtractor;
use crate::domain::ExtractError;

/// Name `git archive` and others give the pax global header pseudo-entry.
const PAX_GLOBAL_HEADER: &str = "pax_global_header";

/// Production `ArchiveExtractor` for `.tar.gz` release archives.
pub struct TarGzExtractor;

impl ArchiveExtractor for TarGzExtractor {
    fn extract(
        &self,
        archive: &[u8],
        destination: &Path,
        strip_components: usize,
    ) -> Result<(), ExtractError> {
        extract_tar_gz(archive, destination, strip_components)
    }
}

/// Unpack a `.tar.gz` byte buffer under `destination`.
///
/// # Errors
///
/// - [`ExtractError::PathTraversal`] for absolute entries or entries whose
///   stripped path contains `..`.
/// - [`ExtractError::UnsupportedEntryKind`] for anything but files and
///   directories.
/// - [`ExtractError::Io`] for corrupt input or filesystem failures.
pub fn extract_tar_gz(
    archive: &[u8],
    destination: &Path,
    strip_components: usize,
) -> Result<(), ExtractError> {
    let mut tar = Archive::new(GzDecoder::new(archive));
    let entries = tar
        .entries()
        .map_err(|e| ExtractError::io("read archive", destination, e))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| ExtractError::io("read entry", destination, e))?;
        let kind = entry.header().entry_type();
        let raw = entry
            .path()
            .map_err(|e| ExtractError::io("decode entry path", destination, e))?
            .into_owned();

        if kind == EntryType::XGlobalHeader || raw == Path::new(PAX_GLOBAL_HEADER) {
            continue;
        }
        let Some(relative) = stripped_path(&raw, strip_components)? else {
            continue;
        };
        let target = destination.join(relative);

        match kind {
            EntryType::Directory => {
                fs::create_dir_all(&target)
                    .map_err(|e| ExtractError::io("create directory", &target, e))?;
            }
            EntryType::Regular | EntryType::Continuous => write_file(&mut entry, &target)?,
            other => {
                return Err(ExtractError::UnsupportedEntryKind {
                    entry: raw.to_string_lossy().into_owned(),
                    kind: format!("{other:?}"),
                });
            }
        }
    }
    Ok(())
}

/// Drops the first `count` segments of `path`.
///
/// Returns `Ok(None)` when nothing is left, which is the case for the
/// stripped wrapper directories themselves.
fn stripped_path(path: &Path, count: usize) -> Result<Option<PathBuf>, ExtractError> {
    let traversal = || ExtractError::PathTraversal {
        entry: path.to_string_lossy().into_owned(),
    };
    let mut segments = Vec::new();
    for component in path.components() {
        match component {
            Component::RootDir | Component::Prefix(_) => return Err(traversal()),
            Component::CurDir => {}
            Component::ParentDir | Component::Normal(_) => segments.push(component),
        }
    }

    let remaining = segments.get(count..).unwrap_or_default();
    if remaining.is_empty() {
        return Ok(None);
    }
    if remaining.contains(&Component::ParentDir) {
        return Err(traversal());
    }
    Ok(Some(remaining.iter().collect()))
}

fn write_file<R: Read>(entry: &mut Entry<'_, R>, target: &Path) -> Result<(), ExtractError> {
    // Producers do not always list a directory before its children.
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| ExtractError::io("create parent", parent, e))?;
    }
    // A repeated entry replaces the earlier file, even one unpacked read-only.
    match fs::remove_file(target) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => {
            return Err(ExtractError::io("replace file", target, e));
        }
        _ => {}
    }
    let mut file = File::create(target).map_err(|e| ExtractError::io("create file", target, e))?;
    io::copy(entry, &mut file).map_err(|e| ExtractError::io("write file", target, e))?;

    #[cfg(unix)]
    if let Ok(mode) = entry.header().mode() {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(target, fs::Permissions::from_mode(mode & 0o777))
            .map_err(|e| ExtractError::io("set permissions", target, e))?;
    }
    Ok(())
}

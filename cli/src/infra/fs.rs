//! Filesystem infrastructure: implements `ReleaseFs` on the local disk.

use std::io;
use std::path::Path;

use crate::application::ports::{PointerEntry, ReleaseFs};

/// Production filesystem implementation of `ReleaseFs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl ReleaseFs for LocalFs {
    fn create_dir(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir(path)
    }

    fn symlink(&self, target: &Path, link: &Path) -> io::Result<()> {
        create_symlink(target, link)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::rename(from, to)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_dir_all(path)
    }

    fn inspect_pointer(&self, path: &Path) -> io::Result<PointerEntry> {
        let metadata = match std::fs::symlink_metadata(path) {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(PointerEntry::Missing),
            Err(e) => return Err(e),
        };
        if !metadata.file_type().is_symlink() {
            return Ok(PointerEntry::NotALink);
        }
        std::fs::read_link(path).map(PointerEntry::Link)
    }
}

#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(target, link)
}

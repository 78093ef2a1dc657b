//! Pre-copy validation probes
//!
//! Identity and file-type checks run before any strategy touches the
//! destination, plus symlink inspection and recreation.

use crate::error::{IoResultExt, Result, SpeedCopyError, SpecialFileKind};
use std::fs::Metadata;
use std::path::{Path, PathBuf};

/// Check whether two paths resolve to the same underlying file
///
/// Paths that cannot be inspected (usually because they do not exist yet)
/// are never the same file.
pub fn is_same_file(a: &Path, b: &Path) -> bool {
    let (Ok(meta_a), Ok(meta_b)) = (std::fs::metadata(a), std::fs::metadata(b)) else {
        return false;
    };
    same_identity(a, &meta_a, b, &meta_b)
}

#[cfg(unix)]
fn same_identity(_a: &Path, meta_a: &Metadata, _b: &Path, meta_b: &Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;

    meta_a.dev() == meta_b.dev() && meta_a.ino() == meta_b.ino()
}

#[cfg(not(unix))]
fn same_identity(a: &Path, _meta_a: &Metadata, b: &Path, _meta_b: &Metadata) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Classify an existing entry as a special file, following symlinks
///
/// Returns `None` for regular files, directories and missing paths.
pub fn special_file_kind(path: &Path) -> Option<SpecialFileKind> {
    let metadata = std::fs::metadata(path).ok()?;
    special_kind_of(&metadata)
}

#[cfg(unix)]
fn special_kind_of(metadata: &Metadata) -> Option<SpecialFileKind> {
    use std::os::unix::fs::FileTypeExt;

    let file_type = metadata.file_type();
    if file_type.is_fifo() {
        Some(SpecialFileKind::Fifo)
    } else if file_type.is_socket() {
        Some(SpecialFileKind::Socket)
    } else if file_type.is_char_device() {
        Some(SpecialFileKind::CharDevice)
    } else if file_type.is_block_device() {
        Some(SpecialFileKind::BlockDevice)
    } else {
        None
    }
}

#[cfg(not(unix))]
fn special_kind_of(_metadata: &Metadata) -> Option<SpecialFileKind> {
    None
}

/// Reject special files among the endpoints that exist
pub fn ensure_not_special(paths: &[&Path]) -> Result<()> {
    for path in paths {
        if let Some(kind) = special_file_kind(path) {
            return Err(SpeedCopyError::SpecialFile {
                path: path.to_path_buf(),
                kind,
            });
        }
    }
    Ok(())
}

/// Check whether `path` itself is a symbolic link
pub fn is_symlink(path: &Path) -> bool {
    std::fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}

/// Create at `destination` a link pointing where `source` points
///
/// Returns the link target. The target is copied verbatim, relative
/// targets stay relative.
pub fn recreate_symlink(source: &Path, destination: &Path) -> Result<PathBuf> {
    let target = std::fs::read_link(source).map_err(|e| SpeedCopyError::source_open(source, e))?;
    create_symlink(&target, source, destination)?;
    Ok(target)
}

#[cfg(unix)]
fn create_symlink(target: &Path, _source: &Path, destination: &Path) -> Result<()> {
    std::os::unix::fs::symlink(target, destination)
        .map_err(|e| SpeedCopyError::destination(destination, e))
}

#[cfg(windows)]
fn create_symlink(target: &Path, source: &Path, destination: &Path) -> Result<()> {
    // Relative targets resolve against the link's own directory
    let resolved = match source.parent() {
        Some(parent) if target.is_relative() => parent.join(target),
        _ => target.to_path_buf(),
    };
    let result = if resolved.is_dir() {
        std::os::windows::fs::symlink_dir(target, destination)
    } else {
        std::os::windows::fs::symlink_file(target, destination)
    };
    result.map_err(|e| SpeedCopyError::destination(destination, e))
}

/// Stat the source, mapping a missing file to `SourceNotFound`
pub fn source_metadata(source: &Path) -> Result<Metadata> {
    std::fs::metadata(source).map_err(|e| SpeedCopyError::source_open(source, e))
}

/// Length of an open file
pub fn file_len(file: &std::fs::File, path: &Path) -> Result<u64> {
    Ok(file.metadata().with_path(path)?.len())
}

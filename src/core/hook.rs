//! Switchable copy entry point
//!
//! A [`CopyHook`] holds the copy function callers dispatch through. Installing
//! swaps in [`copyfile`](super::copyfile) and remembers the previous function;
//! uninstalling restores it. Both operations are idempotent.

use crate::error::{Result, SpeedCopyError};
use crate::fs::{ensure_not_special, is_symlink, recreate_symlink, source_metadata};
use std::path::{Path, PathBuf};

/// Signature shared by every copy function a hook can dispatch to
pub type CopyFileFn = fn(&Path, &Path, bool) -> Result<PathBuf>;

/// Dispatch point for whole-file copies
#[derive(Debug, Clone, Copy)]
pub struct CopyHook {
    active: CopyFileFn,
    original: Option<CopyFileFn>,
}

impl CopyHook {
    /// Create a hook dispatching to `default` until installed
    pub fn new(default: CopyFileFn) -> Self {
        Self {
            active: default,
            original: None,
        }
    }

    /// Replace the active function with the accelerated copy
    ///
    /// Returns false if already installed.
    pub fn install(&mut self) -> bool {
        if self.original.is_some() {
            return false;
        }
        self.original = Some(self.active);
        self.active = super::copyfile;
        tracing::debug!(target: "speedcopy", "copy hook installed");
        true
    }

    /// Restore the function that was active before [`install`](Self::install)
    ///
    /// Returns false if not installed.
    pub fn uninstall(&mut self) -> bool {
        match self.original.take() {
            Some(original) => {
                self.active = original;
                tracing::debug!(target: "speedcopy", "copy hook uninstalled");
                true
            }
            None => false,
        }
    }

    /// Whether the accelerated copy is active
    pub fn is_installed(&self) -> bool {
        self.original.is_some()
    }

    /// Function calls currently dispatch to
    pub fn active(&self) -> CopyFileFn {
        self.active
    }

    /// Copy through the active function
    pub fn copy_file(
        &self,
        source: impl AsRef<Path>,
        destination: impl AsRef<Path>,
        follow_symlinks: bool,
    ) -> Result<PathBuf> {
        (self.active)(source.as_ref(), destination.as_ref(), follow_symlinks)
    }
}

impl Default for CopyHook {
    fn default() -> Self {
        Self::new(std_copyfile)
    }
}

/// Plain standard-library copy with the same contract as [`copyfile`](super::copyfile)
///
/// Unlike `std::fs::copy` it refuses to copy a file onto itself and refuses
/// pipes, sockets and devices, which `std::fs::copy` would block on.
pub fn std_copyfile(source: &Path, destination: &Path, follow_symlinks: bool) -> Result<PathBuf> {
    if crate::fs::is_same_file(source, destination) {
        return Err(SpeedCopyError::SameFile {
            src: source.to_path_buf(),
            dst: destination.to_path_buf(),
        });
    }
    ensure_not_special(&[source, destination])?;
    if !follow_symlinks && is_symlink(source) {
        recreate_symlink(source, destination)?;
        return Ok(destination.to_path_buf());
    }

    // Source errors surface here, so whatever `copy` reports is the destination's
    source_metadata(source)?;
    std::fs::copy(source, destination).map_err(|e| SpeedCopyError::destination(destination, e))?;
    Ok(destination.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn refuse(_: &Path, _: &Path, _: bool) -> Result<PathBuf> {
        Err(SpeedCopyError::Config("refused".into()))
    }

    #[test]
    fn test_install_is_idempotent() {
        let mut hook = CopyHook::new(refuse);
        assert!(!hook.is_installed());

        assert!(hook.install());
        assert!(!hook.install());
        assert!(hook.is_installed());

        assert!(hook.uninstall());
        assert!(!hook.uninstall());
        assert!(!hook.is_installed());
    }

    #[test]
    fn test_uninstall_restores_original() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        std::fs::write(&src, b"hooked").unwrap();

        let mut hook = CopyHook::new(refuse);
        assert!(hook.copy_file(&src, &dst, true).is_err());

        hook.install();
        assert_eq!(hook.copy_file(&src, &dst, true).unwrap(), dst);
        assert_eq!(std::fs::read(&dst).unwrap(), b"hooked");

        hook.uninstall();
        assert!(matches!(
            hook.copy_file(&src, &dst, true),
            Err(SpeedCopyError::Config(_))
        ));
    }

    #[test]
    fn test_uninstall_without_install_keeps_default() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        std::fs::write(&src, b"plain").unwrap();

        let mut hook = CopyHook::default();
        assert!(!hook.uninstall());
        hook.copy_file(&src, &dst, true).unwrap();
        assert_eq!(std::fs::read(&dst).unwrap(), b"plain");
    }

    #[test]
    fn test_std_copyfile_rejects_same_file() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        std::fs::write(&src, b"keep me").unwrap();

        assert!(std_copyfile(&src, &src, true).is_err());
        assert_eq!(std::fs::read(&src).unwrap(), b"keep me");
    }

    #[cfg(unix)]
    #[test]
    fn test_std_copyfile_rejects_fifo() {
        let dir = TempDir::new().unwrap();
        let fifo = dir.path().join("pipe");
        let dst = dir.path().join("dst");
        nix::unistd::mkfifo(fifo.as_path(), nix::sys::stat::Mode::S_IRWXU).unwrap();

        let err = std_copyfile(&fifo, &dst, true).unwrap_err();
        assert!(matches!(err, SpeedCopyError::SpecialFile { .. }));
        assert!(!dst.exists());
    }

    #[test]
    fn test_std_copyfile_error_attribution() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        std::fs::write(&src, b"data").unwrap();

        let missing = dir.path().join("missing");
        let err = std_copyfile(&missing, &dir.path().join("dst"), true).unwrap_err();
        assert!(matches!(err, SpeedCopyError::SourceNotFound(_)));

        let unwritable = dir.path().join("no-such-dir").join("dst");
        let err = std_copyfile(&src, &unwritable, true).unwrap_err();
        assert!(matches!(err, SpeedCopyError::DestinationUnwritable { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_std_copyfile_recreates_symlink() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("target");
        let link = dir.path().join("link");
        let dst = dir.path().join("copy");
        std::fs::write(&target, b"x").unwrap();
        std::os::unix::fs::symlink(&target, &link).unwrap();

        std_copyfile(&link, &dst, false).unwrap();
        assert_eq!(std::fs::read_link(&dst).unwrap(), target);
    }
}

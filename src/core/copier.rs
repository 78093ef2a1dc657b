//! Copy orchestration
//!
//! Validates a request, short-circuits symlinks, classifies the
//! endpoints' filesystems and runs the platform strategy chain.

use crate::config::CopyOptions;
use crate::diagnostics::diag;
use crate::error::{Result, SpeedCopyError};
use crate::fs::{self as probe, FilesystemType};
use crate::strategy::{CopyJob, StrategyChain, StrategyKind};
use std::path::{Path, PathBuf};

/// A single copy request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyRequest {
    /// File to copy
    pub source: PathBuf,
    /// Path of the copy
    pub destination: PathBuf,
    /// Copy the file a symlink points to (true) or recreate the link (false)
    pub follow_symlinks: bool,
}

impl CopyRequest {
    /// Create a request that follows symlinks
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            follow_symlinks: true,
        }
    }

    /// Set symlink handling
    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }
}

/// Outcome of a successful copy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyReport {
    /// Destination path as given in the request
    pub destination: PathBuf,
    /// Strategy that wrote the destination; `None` when a symlink was recreated
    pub strategy: Option<StrategyKind>,
    /// Bytes placed in the destination
    pub bytes: u64,
    /// Source and destination filesystem types, when classified
    pub filesystems: Option<(FilesystemType, FilesystemType)>,
    /// Link target, when a symlink was recreated
    pub symlink_target: Option<PathBuf>,
}

/// Copy engine: validation plus the platform strategy chain
///
/// The chain is resolved once at construction. Calls are synchronous and
/// independent; concurrent calls must not target the same destination.
#[derive(Debug)]
pub struct SpeedCopy {
    options: CopyOptions,
    chain: StrategyChain,
}

impl SpeedCopy {
    /// Create an engine with the platform strategy chain
    pub fn new(options: CopyOptions) -> Self {
        let chain = StrategyChain::platform(&options);
        diag!(options, chain = ?chain.kinds(), "strategy chain resolved");
        Self { options, chain }
    }

    /// Create an engine with an explicit strategy chain
    pub fn with_chain(options: CopyOptions, chain: StrategyChain) -> Self {
        Self { options, chain }
    }

    /// Engine options
    pub fn options(&self) -> &CopyOptions {
        &self.options
    }

    /// Strategy chain in attempt order
    pub fn chain(&self) -> &StrategyChain {
        &self.chain
    }

    /// Copy `source` to `destination`, returning the destination path
    pub fn copy(
        &self,
        source: impl AsRef<Path>,
        destination: impl AsRef<Path>,
        follow_symlinks: bool,
    ) -> Result<PathBuf> {
        let request = CopyRequest::new(source.as_ref(), destination.as_ref())
            .follow_symlinks(follow_symlinks);
        self.execute(&request).map(|report| report.destination)
    }

    /// Copy `source` to `destination`, returning what happened
    pub fn copy_with_report(
        &self,
        source: impl AsRef<Path>,
        destination: impl AsRef<Path>,
        follow_symlinks: bool,
    ) -> Result<CopyReport> {
        let request = CopyRequest::new(source.as_ref(), destination.as_ref())
            .follow_symlinks(follow_symlinks);
        self.execute(&request)
    }

    /// Run a copy request
    ///
    /// On a strategy failure the destination may hold partial content; it is
    /// left in place for the caller to inspect or remove.
    pub fn execute(&self, request: &CopyRequest) -> Result<CopyReport> {
        let src = request.source.as_path();
        let dst = request.destination.as_path();

        if probe::is_same_file(src, dst) {
            diag!(self.options, source = %src.display(), "rejected: same file");
            return Err(SpeedCopyError::SameFile {
                src: src.to_path_buf(),
                dst: dst.to_path_buf(),
            });
        }

        if let Err(err) = probe::ensure_not_special(&[src, dst]) {
            diag!(self.options, error = %err, "rejected: special file");
            return Err(err);
        }

        if !request.follow_symlinks && probe::is_symlink(src) {
            let target = probe::recreate_symlink(src, dst)?;
            diag!(
                self.options,
                destination = %dst.display(),
                target = %target.display(),
                "symlink recreated"
            );
            return Ok(CopyReport {
                destination: request.destination.clone(),
                strategy: None,
                bytes: 0,
                filesystems: None,
                symlink_target: Some(target),
            });
        }

        // Fail before any strategy creates the destination
        let metadata = probe::source_metadata(src)?;
        if metadata.is_dir() {
            return Err(SpeedCopyError::io(
                src,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "source is a directory"),
            ));
        }

        let mut job = CopyJob::new(src, dst);
        if self.chain.needs_filesystems() {
            let (source_fs, destination_fs) = self.classify(src, dst)?;
            diag!(
                self.options,
                source_fs = %source_fs,
                destination_fs = %destination_fs,
                "filesystems classified"
            );
            job = job.with_filesystems(source_fs, destination_fs);
        }

        let (strategy, bytes) = self.chain.run(&job, &self.options)?;

        Ok(CopyReport {
            destination: request.destination.clone(),
            strategy: Some(strategy),
            bytes,
            filesystems: job.filesystems,
            symlink_target: None,
        })
    }

    #[cfg(unix)]
    fn classify(&self, src: &Path, dst: &Path) -> Result<(FilesystemType, FilesystemType)> {
        let source_fs = probe::classify_path(src)?;
        let destination_fs = probe::classify_destination(dst).map_err(|err| match err {
            SpeedCopyError::Io { path, source } => SpeedCopyError::DestinationUnwritable { path, source },
            other => other,
        })?;
        Ok((source_fs, destination_fs))
    }

    #[cfg(not(unix))]
    fn classify(&self, _src: &Path, _dst: &Path) -> Result<(FilesystemType, FilesystemType)> {
        Ok((FilesystemType::Unknown(0), FilesystemType::Unknown(0)))
    }
}

impl Default for SpeedCopy {
    fn default() -> Self {
        Self::new(CopyOptions::default())
    }
}

/// Copy `source` to `destination` with options from the environment
///
/// Has the shape of a standard copy function so it can be installed
/// through [`CopyHook`](crate::core::CopyHook).
pub fn copyfile(source: &Path, destination: &Path, follow_symlinks: bool) -> Result<PathBuf> {
    let options = CopyOptions::from_env()?;
    SpeedCopy::new(options).copy(source, destination, follow_symlinks)
}

/// Copy `source` to `destination`, following symlinks
pub fn copy(source: impl AsRef<Path>, destination: impl AsRef<Path>) -> Result<PathBuf> {
    copyfile(source.as_ref(), destination.as_ref(), true)
}

//! Error types for SpeedCopy
//!
//! Every failure the copy engine can surface maps onto one variant of
//! [`SpeedCopyError`]. Strategies that merely cannot run on a given
//! platform or filesystem never produce an error; they report
//! "not applicable" and the engine moves on.

use crate::strategy::StrategyKind;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for SpeedCopy operations
#[derive(Error, Debug)]
pub enum SpeedCopyError {
    /// Source and destination resolve to the same underlying file
    #[error("'{src}' and '{dst}' are the same file")]
    SameFile { src: PathBuf, dst: PathBuf },

    /// One of the endpoints is a pipe, socket or device
    #[error("'{path}' is a {kind}")]
    SpecialFile { path: PathBuf, kind: SpecialFileKind },

    /// Source path does not exist
    #[error("Source not found: {0}")]
    SourceNotFound(PathBuf),

    /// Destination could not be created, truncated or linked
    #[error("Cannot write destination '{path}': {source}")]
    DestinationUnwritable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The selected strategy hit a real I/O failure
    #[error("{strategy} copy failed at '{path}': {source}")]
    Strategy {
        strategy: StrategyKind,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Native copy API returned a failure code
    #[error("Platform copy API failed for '{path}' (code {code}): {message}")]
    Platform {
        code: u32,
        message: String,
        path: PathBuf,
    },

    /// Every strategy in the chain declined the copy
    #[error("No copy strategy applicable for '{path}'")]
    NoStrategy { path: PathBuf },

    /// I/O error outside of a strategy (stat, statfs, readlink)
    #[error("I/O error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Invalid options
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Kind of special file refused by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialFileKind {
    /// Named pipe
    Fifo,
    /// Unix domain socket
    Socket,
    /// Character device
    CharDevice,
    /// Block device
    BlockDevice,
}

impl std::fmt::Display for SpecialFileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Fifo => "named pipe",
            Self::Socket => "socket",
            Self::CharDevice => "character device",
            Self::BlockDevice => "block device",
        };
        f.write_str(name)
    }
}

impl SpeedCopyError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a strategy failure
    pub fn strategy(strategy: StrategyKind, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Strategy {
            strategy,
            path: path.into(),
            source,
        }
    }

    /// Create a destination error
    pub fn destination(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::DestinationUnwritable {
            path: path.into(),
            source,
        }
    }

    /// Map a failure to open the source, keeping "not found" distinct
    pub fn source_open(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            Self::SourceNotFound(path)
        } else {
            Self::Io { path, source }
        }
    }

    /// Check if the error reports a missing source
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::SourceNotFound(_) => true,
            Self::Io { source, .. } | Self::Strategy { source, .. } => {
                source.kind() == io::ErrorKind::NotFound
            }
            _ => false,
        }
    }

    /// Check if the error is a same-file or special-file conflict
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::SameFile { .. } | Self::SpecialFile { .. })
    }

    /// Get the path associated with this error, if any
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::SameFile { src: path, .. }
            | Self::SpecialFile { path, .. }
            | Self::SourceNotFound(path)
            | Self::DestinationUnwritable { path, .. }
            | Self::Strategy { path, .. }
            | Self::Platform { path, .. }
            | Self::NoStrategy { path }
            | Self::Io { path, .. } => Some(path),
            Self::Config(_) => None,
        }
    }
}

/// Result type alias for SpeedCopy operations
pub type Result<T> = std::result::Result<T, SpeedCopyError>;

impl From<SpeedCopyError> for io::Error {
    fn from(err: SpeedCopyError) -> Self {
        let kind = match &err {
            SpeedCopyError::SourceNotFound(_) => io::ErrorKind::NotFound,
            SpeedCopyError::SameFile { .. } | SpeedCopyError::SpecialFile { .. } => {
                io::ErrorKind::InvalidInput
            }
            SpeedCopyError::DestinationUnwritable { source, .. }
            | SpeedCopyError::Strategy { source, .. }
            | SpeedCopyError::Io { source, .. } => source.kind(),
            SpeedCopyError::Platform { .. } => io::ErrorKind::Other,
            SpeedCopyError::NoStrategy { .. } => io::ErrorKind::Unsupported,
            SpeedCopyError::Config(_) => io::ErrorKind::InvalidInput,
        };
        io::Error::new(kind, err)
    }
}

/// Extension trait for adding path context to std::io::Result
pub trait IoResultExt<T> {
    /// Add path context to an I/O error
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| SpeedCopyError::io(path, e))
    }
}

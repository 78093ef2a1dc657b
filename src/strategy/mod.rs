//! Copy strategies and the ordered fallback chain
//!
//! Each strategy attempts a whole-file transfer and answers with a
//! three-way [`StrategyOutcome`]:
//!
//! - `Success` ends the copy,
//! - `NotApplicable` hands over to the next strategy in the chain,
//! - `Failed` aborts the copy and surfaces the error.
//!
//! Strategies open their own descriptors and close them before returning,
//! so a fallback never inherits a handle from the strategy before it. A
//! strategy that fails after writing leaves the destination partially
//! written; the engine does not clean it up.

mod native;
mod offload;
mod stream;
mod zero_copy;

#[cfg(windows)]
pub use native::NativeApiCopy;
pub use offload::OffloadCopy;
pub use stream::StreamCopy;
pub use zero_copy::ZeroCopyTransfer;

use crate::config::CopyOptions;
use crate::diagnostics::diag;
use crate::error::{Result, SpeedCopyError};
use crate::fs::FilesystemType;
use std::fmt;
use std::fs::File;
use std::path::Path;

/// Identifies a copy strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    /// Server-side copy chunk request
    Offload,
    /// Kernel-mediated descriptor-to-descriptor transfer
    ZeroCopy,
    /// User-space buffered transfer
    Stream,
    /// Operating system whole-file copy API
    NativeApi,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Offload => "offload",
            Self::ZeroCopy => "zero-copy",
            Self::Stream => "stream",
            Self::NativeApi => "native-api",
        };
        f.write_str(name)
    }
}

/// Result of a single strategy attempt
#[derive(Debug)]
pub enum StrategyOutcome {
    /// Destination holds the full content
    Success {
        /// Bytes placed in the destination
        bytes: u64,
    },
    /// Strategy cannot run here; nothing was written by it
    NotApplicable(String),
    /// Strategy ran and hit an unrecoverable error
    Failed(SpeedCopyError),
}

impl StrategyOutcome {
    /// Create a not-applicable outcome
    pub fn not_applicable(reason: impl Into<String>) -> Self {
        Self::NotApplicable(reason.into())
    }

    /// Check for success
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// One copy request as seen by a strategy
#[derive(Debug, Clone, Copy)]
pub struct CopyJob<'a> {
    /// File to read
    pub source: &'a Path,
    /// File to create or truncate
    pub destination: &'a Path,
    /// Source and destination filesystem types, when classified
    pub filesystems: Option<(FilesystemType, FilesystemType)>,
}

impl<'a> CopyJob<'a> {
    /// Create a job without filesystem information
    pub fn new(source: &'a Path, destination: &'a Path) -> Self {
        Self {
            source,
            destination,
            filesystems: None,
        }
    }

    /// Attach classified filesystem types
    pub fn with_filesystems(mut self, source: FilesystemType, destination: FilesystemType) -> Self {
        self.filesystems = Some((source, destination));
        self
    }
}

/// A way of moving file content from source to destination
pub trait CopyStrategy: Send + Sync {
    /// Which strategy this is
    fn kind(&self) -> StrategyKind;

    /// Whether the strategy needs the endpoints' filesystem types
    fn needs_filesystems(&self) -> bool {
        false
    }

    /// Attempt the whole copy
    fn attempt(&self, job: &CopyJob<'_>) -> StrategyOutcome;
}

/// Ordered list of strategies, tried until one succeeds or fails
pub struct StrategyChain {
    strategies: Vec<Box<dyn CopyStrategy>>,
}

impl StrategyChain {
    /// Build a chain from explicit strategies
    pub fn new(strategies: Vec<Box<dyn CopyStrategy>>) -> Self {
        Self { strategies }
    }

    /// The chain for the running platform
    ///
    /// Unix: offload, zero-copy, stream. Windows: the native copy API.
    #[cfg(unix)]
    pub fn platform(options: &CopyOptions) -> Self {
        let mut strategies: Vec<Box<dyn CopyStrategy>> = Vec::with_capacity(3);
        if options.use_offload {
            strategies.push(Box::new(OffloadCopy));
        }
        if options.use_zero_copy {
            strategies.push(Box::new(ZeroCopyTransfer::default()));
        }
        strategies.push(Box::new(StreamCopy::new(options.buffer_size)));
        Self::new(strategies)
    }

    /// The chain for the running platform
    ///
    /// Unix: offload, zero-copy, stream. Windows: the native copy API.
    #[cfg(windows)]
    pub fn platform(_options: &CopyOptions) -> Self {
        Self::new(vec![Box::new(NativeApiCopy::new())])
    }

    /// The chain for the running platform
    #[cfg(not(any(unix, windows)))]
    pub fn platform(options: &CopyOptions) -> Self {
        Self::new(vec![Box::new(StreamCopy::new(options.buffer_size))])
    }

    /// Strategy kinds in attempt order
    pub fn kinds(&self) -> Vec<StrategyKind> {
        self.strategies.iter().map(|s| s.kind()).collect()
    }

    /// Whether any strategy wants filesystem classification
    pub fn needs_filesystems(&self) -> bool {
        self.strategies.iter().any(|s| s.needs_filesystems())
    }

    /// Run strategies in order
    ///
    /// Returns the strategy that wrote the destination and the byte count.
    pub fn run(&self, job: &CopyJob<'_>, options: &CopyOptions) -> Result<(StrategyKind, u64)> {
        for strategy in &self.strategies {
            let kind = strategy.kind();
            diag!(options, strategy = %kind, "attempting strategy");

            match strategy.attempt(job) {
                StrategyOutcome::Success { bytes } => {
                    diag!(options, strategy = %kind, bytes, "strategy succeeded");
                    return Ok((kind, bytes));
                }
                StrategyOutcome::NotApplicable(reason) => {
                    diag!(options, strategy = %kind, %reason, "strategy not applicable");
                }
                StrategyOutcome::Failed(err) => {
                    diag!(options, strategy = %kind, error = %err, "strategy failed, aborting");
                    return Err(err);
                }
            }
        }

        Err(SpeedCopyError::NoStrategy {
            path: job.destination.to_path_buf(),
        })
    }
}

impl fmt::Debug for StrategyChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyChain")
            .field("strategies", &self.kinds())
            .finish()
    }
}

/// Open the source for reading
pub(crate) fn open_source(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| SpeedCopyError::source_open(path, e))
}

/// Create or truncate the destination for writing
pub(crate) fn create_destination(path: &Path) -> Result<File> {
    File::create(path).map_err(|e| SpeedCopyError::destination(path, e))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Strategy returning a fixed outcome and counting its calls
    pub(crate) struct Scripted {
        pub kind: StrategyKind,
        pub outcome: fn() -> StrategyOutcome,
        pub calls: Arc<AtomicUsize>,
    }

    impl CopyStrategy for Scripted {
        fn kind(&self) -> StrategyKind {
            self.kind
        }

        fn attempt(&self, _job: &CopyJob<'_>) -> StrategyOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.outcome)()
        }
    }

    pub(crate) fn scripted(
        kind: StrategyKind,
        outcome: fn() -> StrategyOutcome,
    ) -> (Box<dyn CopyStrategy>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let strategy = Scripted {
            kind,
            outcome,
            calls: Arc::clone(&calls),
        };
        (Box::new(strategy), calls)
    }

    fn job_paths() -> (TempDir, std::path::PathBuf, std::path::PathBuf) {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        (dir, src, dst)
    }

    #[test]
    fn test_not_applicable_falls_through() {
        let (_dir, src, dst) = job_paths();
        let (first, first_calls) = scripted(StrategyKind::Offload, || {
            StrategyOutcome::not_applicable("not here")
        });
        let (second, second_calls) =
            scripted(StrategyKind::Stream, || StrategyOutcome::Success { bytes: 42 });

        let chain = StrategyChain::new(vec![first, second]);
        let (kind, bytes) = chain
            .run(&CopyJob::new(&src, &dst), &CopyOptions::default())
            .unwrap();

        assert_eq!(kind, StrategyKind::Stream);
        assert_eq!(bytes, 42);
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_aborts_chain() {
        let (_dir, src, dst) = job_paths();
        let (first, _) = scripted(StrategyKind::ZeroCopy, || {
            StrategyOutcome::Failed(SpeedCopyError::strategy(
                StrategyKind::ZeroCopy,
                "dst",
                std::io::Error::new(std::io::ErrorKind::Other, "disk on fire"),
            ))
        });
        let (second, second_calls) =
            scripted(StrategyKind::Stream, || StrategyOutcome::Success { bytes: 1 });

        let chain = StrategyChain::new(vec![first, second]);
        let err = chain
            .run(&CopyJob::new(&src, &dst), &CopyOptions::default())
            .unwrap_err();

        assert!(matches!(
            err,
            SpeedCopyError::Strategy {
                strategy: StrategyKind::ZeroCopy,
                ..
            }
        ));
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_success_stops_chain() {
        let (_dir, src, dst) = job_paths();
        let (first, _) = scripted(StrategyKind::Offload, || StrategyOutcome::Success { bytes: 7 });
        let (second, second_calls) =
            scripted(StrategyKind::Stream, || StrategyOutcome::Success { bytes: 7 });

        let chain = StrategyChain::new(vec![first, second]);
        let (kind, _) = chain
            .run(&CopyJob::new(&src, &dst), &CopyOptions::default())
            .unwrap();

        assert_eq!(kind, StrategyKind::Offload);
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_exhausted_chain_is_an_error() {
        let (_dir, src, dst) = job_paths();
        let (only, _) = scripted(StrategyKind::Offload, || {
            StrategyOutcome::not_applicable("never")
        });

        let chain = StrategyChain::new(vec![only]);
        let err = chain
            .run(&CopyJob::new(&src, &dst), &CopyOptions::default())
            .unwrap_err();
        assert!(matches!(err, SpeedCopyError::NoStrategy { .. }));

        let empty = StrategyChain::new(Vec::new());
        assert!(empty
            .run(&CopyJob::new(&src, &dst), &CopyOptions::default())
            .is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_platform_chain_order() {
        let chain = StrategyChain::platform(&CopyOptions::default());
        assert_eq!(
            chain.kinds(),
            vec![StrategyKind::Offload, StrategyKind::ZeroCopy, StrategyKind::Stream]
        );
        assert!(chain.needs_filesystems());

        let options = CopyOptions {
            use_offload: false,
            use_zero_copy: false,
            ..Default::default()
        };
        let chain = StrategyChain::platform(&options);
        assert_eq!(chain.kinds(), vec![StrategyKind::Stream]);
        assert!(!chain.needs_filesystems());
    }

    #[cfg(windows)]
    #[test]
    fn test_platform_chain_is_native() {
        let chain = StrategyChain::platform(&CopyOptions::default());
        assert_eq!(chain.kinds(), vec![StrategyKind::NativeApi]);
        assert!(!chain.needs_filesystems());
    }
}

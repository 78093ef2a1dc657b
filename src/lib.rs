//! # SpeedCopy - Accelerated Single-File Copy
//!
//! SpeedCopy copies one file to one destination using the fastest mechanism
//! the platform and the involved filesystems allow, falling back to slower
//! mechanisms when a faster one is not applicable.
//!
//! ## Strategy Chain
//!
//! - **Unix**: server-side offload (CIFS/SMB2 on Linux), then kernel
//!   zero-copy transfer (`sendfile`), then a buffered stream copy
//! - **Windows**: the native whole-file copy API (`CopyFile2`, or
//!   `CopyFileW` where unavailable)
//!
//! A strategy that is not applicable hands over to the next one. A strategy
//! that fails aborts the copy.
//!
//! ## Quick Start
//!
//! ```no_run
//! use speedcopy::copy;
//!
//! let dest = copy("/data/input.bin", "/data/output.bin").unwrap();
//! println!("copied to {}", dest.display());
//! ```
//!
//! ## Engine and Report
//!
//! ```no_run
//! use speedcopy::{CopyOptions, SpeedCopy};
//!
//! let options = CopyOptions::default().with_diagnostics(true);
//! let engine = SpeedCopy::new(options);
//!
//! let report = engine.copy_with_report("/data/a", "/data/b", true).unwrap();
//! println!("{} bytes via {:?}", report.bytes, report.strategy);
//! ```
//!
//! ## Hook
//!
//! ```no_run
//! use speedcopy::CopyHook;
//!
//! let mut hook = CopyHook::default();
//! hook.install();
//! hook.copy_file("/data/a", "/data/b", true).unwrap();
//! hook.uninstall();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod diagnostics;

pub mod config;
pub mod core;
pub mod error;
pub mod fs;
pub mod strategy;

// Re-export commonly used types
pub use config::CopyOptions;
pub use core::{copy, copyfile, CopyHook, CopyReport, CopyRequest, SpeedCopy};
pub use error::{Result, SpeedCopyError};
pub use fs::FilesystemType;
pub use strategy::{StrategyChain, StrategyKind};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    //! Convenient re-exports for common usage
    //!
    //! ```no_run
    //! use speedcopy::prelude::*;
    //! ```

    pub use crate::config::CopyOptions;
    pub use crate::core::{copy, copyfile, CopyHook, CopyReport, CopyRequest, SpeedCopy};
    pub use crate::error::{Result, SpeedCopyError};
    pub use crate::fs::FilesystemType;
    pub use crate::strategy::{CopyStrategy, StrategyChain, StrategyKind, StrategyOutcome};
}

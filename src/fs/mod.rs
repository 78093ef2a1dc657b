//! File system probes
//!
//! Filesystem-type classification from kernel magic numbers, plus the
//! identity and file-type checks run before a copy.

mod magic;
mod probe;

pub use magic::*;
pub use probe::*;

//! Core copy engine module
//!
//! Provides the copy orchestrator and the switchable copy entry point.

mod copier;
mod hook;

pub use copier::*;
pub use hook::*;

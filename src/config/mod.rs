//! Configuration module for SpeedCopy
//!
//! Provides the engine options and their loading from the environment
//! or JSON documents.

mod settings;

pub use settings::*;

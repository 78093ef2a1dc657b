//! Configuration settings for SpeedCopy
//!
//! Defines the tunable options of the copy engine, their defaults, and
//! loading from the environment or a JSON document.

use crate::error::{Result, SpeedCopyError};
use serde::{Deserialize, Serialize};

/// Environment variable enabling diagnostic trace output
pub const ENV_DEBUG: &str = "SPEEDCOPY_DEBUG";

/// Environment variable overriding the stream copy buffer size (e.g. `64K`)
pub const ENV_BUFFER_SIZE: &str = "SPEEDCOPY_BUFFER_SIZE";

/// Default buffer size of the generic stream copy
pub const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024; // 1MB

/// Largest accepted stream copy buffer
pub const MAX_BUFFER_SIZE: usize = 1024 * 1024 * 1024; // 1GB

/// Options for the copy engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CopyOptions {
    /// Buffer size used by the generic stream copy
    pub buffer_size: usize,
    /// Emit decision points at info level instead of debug
    pub diagnostics: bool,
    /// Try server-side copy on CIFS/SMB2 mounts
    pub use_offload: bool,
    /// Try kernel-mediated transfer between descriptors
    pub use_zero_copy: bool,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            diagnostics: false,
            use_offload: true,
            use_zero_copy: true,
        }
    }
}

impl CopyOptions {
    /// Load options from `SPEEDCOPY_*` environment variables, defaulting the rest
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load options through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = Self::default();

        if let Some(value) = lookup(ENV_DEBUG) {
            options.diagnostics = parse_flag(&value);
        }

        if let Some(value) = lookup(ENV_BUFFER_SIZE) {
            let size = parse_size(&value).map_err(SpeedCopyError::Config)?;
            options.buffer_size = usize::try_from(size)
                .map_err(|_| SpeedCopyError::Config(format!("Buffer size too large: {}", value)))?;
        }

        options.validate()?;
        Ok(options)
    }

    /// Parse options from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)
            .map_err(|e| SpeedCopyError::Config(format!("Invalid options JSON: {}", e)))?;
        options.validate()?;
        Ok(options)
    }

    /// Enable or disable diagnostic output
    pub fn with_diagnostics(mut self, enabled: bool) -> Self {
        self.diagnostics = enabled;
        self
    }

    /// Check option values
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(SpeedCopyError::Config(
                "Buffer size must be greater than zero".to_string(),
            ));
        }
        if self.buffer_size > MAX_BUFFER_SIZE {
            return Err(SpeedCopyError::Config(format!(
                "Buffer size {} exceeds limit of {} bytes",
                self.buffer_size, MAX_BUFFER_SIZE
            )));
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Parse human-readable size string to bytes
pub fn parse_size(size: &str) -> std::result::Result<u64, String> {
    let size = size.trim().to_uppercase();

    if size.is_empty() {
        return Err("Empty size string".to_string());
    }

    let (num_str, multiplier) = if size.ends_with("GB") || size.ends_with('G') {
        let num = size.trim_end_matches(|c| c == 'G' || c == 'B');
        (num, 1024u64 * 1024 * 1024)
    } else if size.ends_with("MB") || size.ends_with('M') {
        let num = size.trim_end_matches(|c| c == 'M' || c == 'B');
        (num, 1024u64 * 1024)
    } else if size.ends_with("KB") || size.ends_with('K') {
        let num = size.trim_end_matches(|c| c == 'K' || c == 'B');
        (num, 1024u64)
    } else if size.ends_with('B') {
        let num = size.trim_end_matches('B');
        (num, 1u64)
    } else {
        // Assume bytes if no suffix
        (size.as_str(), 1u64)
    };

    let num: f64 = num_str
        .trim()
        .parse()
        .map_err(|_| format!("Invalid number: {}", num_str))?;

    if num < 0.0 {
        return Err(format!("Negative size: {}", num_str));
    }

    Ok((num * multiplier as f64) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("1024").unwrap(), 1024);
        assert_eq!(parse_size("64K").unwrap(), 64 * 1024);
        assert_eq!(parse_size("4mb").unwrap(), 4 * 1024 * 1024);
        assert_eq!(parse_size("1G").unwrap(), 1024 * 1024 * 1024);
        assert!(parse_size("").is_err());
        assert!(parse_size("lots").is_err());
        assert!(parse_size("-1K").is_err());
    }

    #[test]
    fn test_defaults() {
        let options = CopyOptions::default();
        assert_eq!(options.buffer_size, DEFAULT_BUFFER_SIZE);
        assert!(!options.diagnostics);
        assert!(options.use_offload);
        assert!(options.use_zero_copy);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> =
            [(ENV_DEBUG, "yes"), (ENV_BUFFER_SIZE, "64K")].into_iter().collect();
        let options = CopyOptions::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert!(options.diagnostics);
        assert_eq!(options.buffer_size, 64 * 1024);

        let options = CopyOptions::from_lookup(|_| None).unwrap();
        assert_eq!(options, CopyOptions::default());
    }

    #[test]
    fn test_from_lookup_rejects_zero_buffer() {
        let err = CopyOptions::from_lookup(|k| (k == ENV_BUFFER_SIZE).then(|| "0".to_string()));
        assert!(matches!(err, Err(SpeedCopyError::Config(_))));
    }

    #[test]
    fn test_from_json_partial() {
        let options = CopyOptions::from_json(r#"{"use_offload": false}"#).unwrap();
        assert!(!options.use_offload);
        assert!(options.use_zero_copy);
        assert_eq!(options.buffer_size, DEFAULT_BUFFER_SIZE);

        assert!(CopyOptions::from_json("{not json").is_err());
        assert!(CopyOptions::from_json(r#"{"buffer_size": 0}"#).is_err());
    }
}

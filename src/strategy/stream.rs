//! Buffered user-space copy, the strategy of last resort

use super::{create_destination, open_source, CopyJob, CopyStrategy, StrategyKind, StrategyOutcome};
use crate::config::DEFAULT_BUFFER_SIZE;
use crate::error::{Result, SpeedCopyError};
use std::io::{ErrorKind, Read, Write};

/// Generic stream copy through a fixed-size buffer
#[derive(Debug, Clone, Copy)]
pub struct StreamCopy {
    buffer_size: usize,
}

impl StreamCopy {
    /// Create a stream copy with the given buffer size
    pub fn new(buffer_size: usize) -> Self {
        Self {
            buffer_size: buffer_size.max(1),
        }
    }

    /// Buffer size in bytes
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    fn copy(&self, job: &CopyJob<'_>) -> Result<u64> {
        let mut src = open_source(job.source)?;
        let mut dst = create_destination(job.destination)?;

        let mut buffer = vec![0u8; self.buffer_size];
        let mut bytes_copied = 0u64;

        loop {
            let bytes_read = match src.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(SpeedCopyError::strategy(StrategyKind::Stream, job.source, e)),
            };

            dst.write_all(&buffer[..bytes_read])
                .map_err(|e| SpeedCopyError::strategy(StrategyKind::Stream, job.destination, e))?;

            bytes_copied += bytes_read as u64;
        }

        dst.flush()
            .map_err(|e| SpeedCopyError::strategy(StrategyKind::Stream, job.destination, e))?;

        Ok(bytes_copied)
    }
}

impl Default for StreamCopy {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_SIZE)
    }
}

impl CopyStrategy for StreamCopy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Stream
    }

    fn attempt(&self, job: &CopyJob<'_>) -> StrategyOutcome {
        match self.copy(job) {
            Ok(bytes) => StrategyOutcome::Success { bytes },
            Err(e) => StrategyOutcome::Failed(e),
        }
    }
}

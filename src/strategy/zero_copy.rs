//! Kernel-mediated transfer with `sendfile`
//!
//! The transfer is repeated at the largest single-call size until the
//! kernel reports zero bytes moved. The kernel advances the running offset
//! after every call; nothing is re-copied or skipped across iterations.

use super::{CopyJob, CopyStrategy, StrategyKind, StrategyOutcome};
use crate::error::Result;

/// Largest byte count handed to a single `sendfile` call (2^31 - 1)
pub const MAX_TRANSFER: usize = i32::MAX as usize;

/// Zero-copy descriptor-to-descriptor strategy
#[derive(Debug, Clone, Copy)]
pub struct ZeroCopyTransfer {
    max_transfer: usize,
}

impl ZeroCopyTransfer {
    /// Cap each kernel call at `max_transfer` bytes (at least 1)
    #[cfg_attr(not(test), allow(dead_code))]
    pub(crate) fn with_max_transfer(max_transfer: usize) -> Self {
        Self {
            max_transfer: max_transfer.clamp(1, MAX_TRANSFER),
        }
    }

    /// Largest byte count per kernel call
    pub fn max_transfer(&self) -> usize {
        self.max_transfer
    }
}

impl Default for ZeroCopyTransfer {
    fn default() -> Self {
        Self {
            max_transfer: MAX_TRANSFER,
        }
    }
}

impl CopyStrategy for ZeroCopyTransfer {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ZeroCopy
    }

    fn attempt(&self, job: &CopyJob<'_>) -> StrategyOutcome {
        transfer(job, self.max_transfer).unwrap_or_else(StrategyOutcome::Failed)
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
mod unsupported {
    use nix::errno::Errno;

    /// Errors meaning `sendfile` cannot serve this descriptor pair
    const CODES: &[Errno] = &[
        Errno::EINVAL,
        Errno::ENOSYS,
        Errno::ENOTSUP,
        Errno::EOPNOTSUPP,
        Errno::EBADF,
        Errno::ENOTSOCK,
    ];

    pub(super) fn is_unsupported(errno: Errno) -> bool {
        CODES.contains(&errno)
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn transfer(job: &CopyJob<'_>, max_transfer: usize) -> Result<StrategyOutcome> {
    use super::{create_destination, open_source};
    use crate::error::SpeedCopyError;
    use crate::fs::file_len;
    use nix::errno::Errno;
    use nix::sys::sendfile::sendfile64;

    let src = open_source(job.source)?;
    let len = file_len(&src, job.source)?;
    let dst = create_destination(job.destination)?;

    let mut offset: libc::off64_t = 0;
    loop {
        match sendfile64(&dst, &src, Some(&mut offset), max_transfer) {
            Ok(0) => break,
            Ok(_) => {}
            Err(Errno::EINTR) => continue,
            // Nothing written yet: the next strategy may still run
            Err(errno) if offset == 0 && unsupported::is_unsupported(errno) => {
                return Ok(StrategyOutcome::not_applicable(format!(
                    "sendfile unsupported: {}",
                    errno
                )));
            }
            Err(errno) => {
                return Err(SpeedCopyError::strategy(
                    StrategyKind::ZeroCopy,
                    job.destination,
                    errno.into(),
                ));
            }
        }
    }

    if offset == 0 && len > 0 {
        return Ok(StrategyOutcome::not_applicable(
            "sendfile moved no bytes from a non-empty source",
        ));
    }

    Ok(StrategyOutcome::Success {
        bytes: offset as u64,
    })
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn transfer(_job: &CopyJob<'_>, _max_transfer: usize) -> Result<StrategyOutcome> {
    Ok(StrategyOutcome::not_applicable(
        "file-to-file sendfile unavailable on this platform",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[cfg(any(target_os = "linux", target_os = "android"))]
    #[test]
    fn test_transfer_copies_content() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        let data: Vec<u8> = (0..300_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&src, &data).unwrap();

        let outcome = ZeroCopyTransfer::default().attempt(&CopyJob::new(&src, &dst));
        assert!(matches!(outcome, StrategyOutcome::Success { bytes } if bytes == data.len() as u64));
        assert_eq!(std::fs::read(&dst).unwrap(), data);
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    #[test]
    fn test_transfer_truncates_existing_destination() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        std::fs::write(&src, b"short").unwrap();
        std::fs::write(&dst, b"a much longer previous content").unwrap();

        assert!(ZeroCopyTransfer::default().attempt(&CopyJob::new(&src, &dst)).is_success());
        assert_eq!(std::fs::read(&dst).unwrap(), b"short");
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    #[test]
    fn test_offset_carried_across_calls() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        // 300_007 bytes over 4_093-byte calls: 74 calls, the last one partial
        let data: Vec<u8> = (0..300_007u32).map(|i| (i * 31 % 251) as u8).collect();
        std::fs::write(&src, &data).unwrap();

        let strategy = ZeroCopyTransfer::with_max_transfer(4_093);
        let outcome = strategy.attempt(&CopyJob::new(&src, &dst));

        assert!(matches!(outcome, StrategyOutcome::Success { bytes: 300_007 }));
        assert_eq!(std::fs::read(&dst).unwrap(), data);
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    #[test]
    fn test_small_calls_truncate_longer_destination() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        let data: Vec<u8> = (0..50_000u32).map(|i| (i % 241) as u8).collect();
        std::fs::write(&src, &data).unwrap();
        std::fs::write(&dst, vec![0xAAu8; 120_000]).unwrap();

        let outcome = ZeroCopyTransfer::with_max_transfer(3_001).attempt(&CopyJob::new(&src, &dst));

        assert!(matches!(outcome, StrategyOutcome::Success { bytes: 50_000 }));
        assert_eq!(std::fs::read(&dst).unwrap(), data);
    }

    #[test]
    fn test_max_transfer_bounds() {
        assert_eq!(ZeroCopyTransfer::default().max_transfer(), MAX_TRANSFER);
        assert_eq!(ZeroCopyTransfer::with_max_transfer(0).max_transfer(), 1);
        assert_eq!(ZeroCopyTransfer::with_max_transfer(usize::MAX).max_transfer(), MAX_TRANSFER);
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    #[test]
    fn test_empty_source_succeeds() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        std::fs::write(&src, b"").unwrap();

        let outcome = ZeroCopyTransfer::default().attempt(&CopyJob::new(&src, &dst));
        assert!(matches!(outcome, StrategyOutcome::Success { bytes: 0 }));
        assert!(dst.exists());
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    #[test]
    fn test_unsupported_errno_classification() {
        use nix::errno::Errno;

        assert!(unsupported::is_unsupported(Errno::EINVAL));
        assert!(unsupported::is_unsupported(Errno::ENOSYS));
        assert!(unsupported::is_unsupported(Errno::EOPNOTSUPP));
        assert!(!unsupported::is_unsupported(Errno::EIO));
        assert!(!unsupported::is_unsupported(Errno::ENOSPC));
    }

    #[test]
    fn test_missing_source() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("missing");
        let dst = dir.path().join("dst");

        let outcome = ZeroCopyTransfer::default().attempt(&CopyJob::new(&src, &dst));
        if cfg!(any(target_os = "linux", target_os = "android")) {
            assert!(matches!(outcome, StrategyOutcome::Failed(ref e) if e.is_not_found()));
        } else {
            assert!(matches!(outcome, StrategyOutcome::NotApplicable(_)));
        }
        assert!(!dst.exists());
    }
}

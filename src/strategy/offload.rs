//! Server-side copy on CIFS/SMB2 mounts
//!
//! The Linux CIFS client exposes `CIFS_IOC_COPYCHUNK_FILE`, which asks the
//! SMB server to duplicate the whole source file into the destination
//! without the data crossing the network twice. Many servers advertise the
//! filesystem yet refuse the request, so any ioctl error only means the
//! next strategy should run.

use super::{CopyJob, CopyStrategy, StrategyKind, StrategyOutcome};
use crate::error::Result;

/// Server-side copy-chunk strategy
#[derive(Debug, Clone, Copy, Default)]
pub struct OffloadCopy;

impl CopyStrategy for OffloadCopy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Offload
    }

    fn needs_filesystems(&self) -> bool {
        true
    }

    fn attempt(&self, job: &CopyJob<'_>) -> StrategyOutcome {
        let Some((source_fs, destination_fs)) = job.filesystems else {
            return StrategyOutcome::not_applicable("filesystems not classified");
        };
        if !(source_fs.supports_offload() && destination_fs.supports_offload()) {
            return StrategyOutcome::not_applicable(format!(
                "{} -> {} has no server-side copy",
                source_fs, destination_fs
            ));
        }

        copy_chunk(job).unwrap_or_else(StrategyOutcome::Failed)
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
mod cifs {
    const CIFS_IOCTL_MAGIC: u8 = 0xCF;
    const CIFS_IOC_COPYCHUNK_NR: u8 = 3;

    nix::ioctl_write_int!(
        /// `_IOW(0xCF, 3, int)`: copy the whole file behind the argument
        /// descriptor into the descriptor the ioctl is issued on
        copychunk_file,
        CIFS_IOCTL_MAGIC,
        CIFS_IOC_COPYCHUNK_NR
    );
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn copy_chunk(job: &CopyJob<'_>) -> Result<StrategyOutcome> {
    use super::{create_destination, open_source};
    use crate::fs::file_len;
    use std::os::fd::AsRawFd;

    let src = open_source(job.source)?;
    let len = file_len(&src, job.source)?;
    let dst = create_destination(job.destination)?;

    if len == 0 {
        return Ok(StrategyOutcome::Success { bytes: 0 });
    }

    // SAFETY: both descriptors stay open for the duration of the call and
    // the request only reads its integer argument.
    let result = unsafe {
        cifs::copychunk_file(
            dst.as_raw_fd(),
            src.as_raw_fd() as nix::sys::ioctl::ioctl_param_type,
        )
    };

    match result {
        Ok(_) => Ok(StrategyOutcome::Success { bytes: len }),
        Err(errno) => Ok(StrategyOutcome::not_applicable(format!(
            "copy-chunk request rejected: {}",
            errno
        ))),
    }
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn copy_chunk(_job: &CopyJob<'_>) -> Result<StrategyOutcome> {
    Ok(StrategyOutcome::not_applicable(
        "copy-chunk ioctl unavailable on this platform",
    ))
}

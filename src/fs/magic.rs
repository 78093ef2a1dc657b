//! Filesystem type classification
//!
//! Resolves the magic number reported by `statfs`/`fstatfs` into a
//! symbolic [`FilesystemType`]. Values are recomputed on every call;
//! mounts can change between two copies.

#[cfg(unix)]
use crate::error::{Result, SpeedCopyError};
use std::fmt;
#[cfg(unix)]
use std::path::Path;
use std::str::FromStr;

/// Filesystem type derived from the kernel-reported magic number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum FilesystemType {
    Adfs,
    Affs,
    Afs,
    Bcachefs,
    Befs,
    Bfs,
    Btrfs,
    Ceph,
    Cgroup2,
    Cifs,
    Coda,
    Coh,
    Cramfs,
    Devfs,
    Ecryptfs,
    Efs,
    Erofs,
    Exfat,
    Ext,
    Ext2Old,
    /// ext2, ext3 and ext4 share one magic number
    Ext4,
    F2fs,
    Fuse,
    Hfs,
    Hpfs,
    Hugetlbfs,
    Isofs,
    Jffs2,
    Jfs,
    Minix,
    Minix2,
    Msdos,
    Ncp,
    Nfs,
    Nilfs,
    Ntfs,
    Ocfs2,
    Openprom,
    Overlayfs,
    Proc,
    Qnx4,
    Ramfs,
    Reiserfs,
    Romfs,
    Smb,
    Smb2,
    Squashfs,
    Sysfs,
    Sysv2,
    Sysv4,
    Tmpfs,
    Udf,
    Ufs,
    UsbDevice,
    Vxfs,
    Xenix,
    Xfs,
    Xiafs,
    Zfs,
    /// Unrecognised magic number (kept for diagnostics)
    Unknown(u32),
}

/// Magic number to filesystem table
///
/// See <https://www.gnu.org/software/coreutils/filesystems.html> and
/// `include/uapi/linux/magic.h`.
pub const MAGIC_TABLE: &[(u32, FilesystemType)] = &[
    (0xADF5, FilesystemType::Adfs),
    (0xADFF, FilesystemType::Affs),
    (0x5346_414F, FilesystemType::Afs),
    (0x6B41_4653, FilesystemType::Afs),
    (0xCA45_1A4E, FilesystemType::Bcachefs),
    (0x4246_5331, FilesystemType::Befs),
    (0x1BAD_FACE, FilesystemType::Bfs),
    (0x9123_683E, FilesystemType::Btrfs),
    (0x00C3_6400, FilesystemType::Ceph),
    (0x6367_7270, FilesystemType::Cgroup2),
    (0xFF53_4D42, FilesystemType::Cifs),
    (0x7375_7245, FilesystemType::Coda),
    (0x012F_F7B7, FilesystemType::Coh),
    (0x28CD_3D45, FilesystemType::Cramfs),
    (0x1373, FilesystemType::Devfs),
    (0xF15F, FilesystemType::Ecryptfs),
    (0x0041_4A53, FilesystemType::Efs),
    (0xE0F5_E1E2, FilesystemType::Erofs),
    (0x2011_BAB0, FilesystemType::Exfat),
    (0x137D, FilesystemType::Ext),
    (0xEF51, FilesystemType::Ext2Old),
    (0xEF53, FilesystemType::Ext4),
    (0xF2F5_2010, FilesystemType::F2fs),
    (0x6573_5546, FilesystemType::Fuse),
    (0x4244, FilesystemType::Hfs),
    (0xF995_E849, FilesystemType::Hpfs),
    (0x9584_58F6, FilesystemType::Hugetlbfs),
    (0x9660, FilesystemType::Isofs),
    (0x72B6, FilesystemType::Jffs2),
    (0x3153_464A, FilesystemType::Jfs),
    (0x137F, FilesystemType::Minix),
    (0x138F, FilesystemType::Minix),
    (0x2468, FilesystemType::Minix2),
    (0x2478, FilesystemType::Minix2),
    (0x4D44, FilesystemType::Msdos),
    (0x564C, FilesystemType::Ncp),
    (0x6969, FilesystemType::Nfs),
    (0x3434, FilesystemType::Nilfs),
    (0x5346_544E, FilesystemType::Ntfs),
    (0x7461_636F, FilesystemType::Ocfs2),
    (0x9FA1, FilesystemType::Openprom),
    (0x794C_7630, FilesystemType::Overlayfs),
    (0x9FA0, FilesystemType::Proc),
    (0x002F, FilesystemType::Qnx4),
    (0x8584_58F6, FilesystemType::Ramfs),
    (0x5265_4973, FilesystemType::Reiserfs),
    (0x7275, FilesystemType::Romfs),
    (0x517B, FilesystemType::Smb),
    (0xFE53_4D42, FilesystemType::Smb2),
    (0x7371_7368, FilesystemType::Squashfs),
    (0x6265_6572, FilesystemType::Sysfs),
    (0x012F_F7B6, FilesystemType::Sysv2),
    (0x012F_F7B5, FilesystemType::Sysv4),
    (0x0102_1994, FilesystemType::Tmpfs),
    (0x1501_3346, FilesystemType::Udf),
    (0x0001_1954, FilesystemType::Ufs),
    (0x9FA2, FilesystemType::UsbDevice),
    (0xA501_FCF5, FilesystemType::Vxfs),
    (0x012F_F7B4, FilesystemType::Xenix),
    (0x5846_5342, FilesystemType::Xfs),
    (0x012F_D16D, FilesystemType::Xiafs),
    (0x2FC1_2FC1, FilesystemType::Zfs),
];

impl FilesystemType {
    /// Resolve a raw magic number
    pub fn from_magic(magic: u32) -> Self {
        MAGIC_TABLE
            .iter()
            .find(|(value, _)| *value == magic)
            .map(|(_, fs)| *fs)
            .unwrap_or(Self::Unknown(magic))
    }

    /// Symbolic name, e.g. "CIFS", "SMB2", "EXT4" or "UNKNOWN"
    pub fn name(&self) -> &'static str {
        match self {
            Self::Adfs => "ADFS",
            Self::Affs => "AFFS",
            Self::Afs => "AFS",
            Self::Bcachefs => "BCACHEFS",
            Self::Befs => "BEFS",
            Self::Bfs => "BFS",
            Self::Btrfs => "BTRFS",
            Self::Ceph => "CEPH",
            Self::Cgroup2 => "CGROUP2",
            Self::Cifs => "CIFS",
            Self::Coda => "CODA",
            Self::Coh => "COH",
            Self::Cramfs => "CRAMFS",
            Self::Devfs => "DEVFS",
            Self::Ecryptfs => "ECRYPTFS",
            Self::Efs => "EFS",
            Self::Erofs => "EROFS",
            Self::Exfat => "EXFAT",
            Self::Ext => "EXT",
            Self::Ext2Old => "EXT2_OLD",
            Self::Ext4 => "EXT4",
            Self::F2fs => "F2FS",
            Self::Fuse => "FUSE",
            Self::Hfs => "HFS",
            Self::Hpfs => "HPFS",
            Self::Hugetlbfs => "HUGETLBFS",
            Self::Isofs => "ISOFS",
            Self::Jffs2 => "JFFS2",
            Self::Jfs => "JFS",
            Self::Minix => "MINIX",
            Self::Minix2 => "MINIX2",
            Self::Msdos => "MSDOS",
            Self::Ncp => "NCP",
            Self::Nfs => "NFS",
            Self::Nilfs => "NILFS",
            Self::Ntfs => "NTFS",
            Self::Ocfs2 => "OCFS2",
            Self::Openprom => "OPENPROM",
            Self::Overlayfs => "OVERLAYFS",
            Self::Proc => "PROC",
            Self::Qnx4 => "QNX4",
            Self::Ramfs => "RAMFS",
            Self::Reiserfs => "REISERFS",
            Self::Romfs => "ROMFS",
            Self::Smb => "SMB",
            Self::Smb2 => "SMB2",
            Self::Squashfs => "SQUASHFS",
            Self::Sysfs => "SYSFS",
            Self::Sysv2 => "SYSV2",
            Self::Sysv4 => "SYSV4",
            Self::Tmpfs => "TMPFS",
            Self::Udf => "UDF",
            Self::Ufs => "UFS",
            Self::UsbDevice => "USBDEVICE",
            Self::Vxfs => "VXFS",
            Self::Xenix => "XENIX",
            Self::Xfs => "XFS",
            Self::Xiafs => "XIAFS",
            Self::Zfs => "ZFS",
            Self::Unknown(_) => "UNKNOWN",
        }
    }

    /// Whether the filesystem can perform a server-side copy chunk request
    pub fn supports_offload(&self) -> bool {
        matches!(self, Self::Cifs | Self::Smb2)
    }

    /// Whether the type was recognised
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl fmt::Display for FilesystemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FilesystemType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        if wanted == "UNKNOWN" {
            return Ok(Self::Unknown(0));
        }
        MAGIC_TABLE
            .iter()
            .map(|(_, fs)| *fs)
            .find(|fs| fs.name() == wanted)
            .ok_or_else(|| format!("Unknown filesystem name: {}", s))
    }
}

/// Classify the filesystem holding `path`
///
/// A failed `statfs` (missing path, permission) is an error; an
/// unrecognised magic number is [`FilesystemType::Unknown`].
#[cfg(any(target_os = "linux", target_os = "android"))]
pub fn classify_path(path: &Path) -> Result<FilesystemType> {
    let stat = nix::sys::statfs::statfs(path).map_err(|e| SpeedCopyError::io(path, e.into()))?;
    Ok(FilesystemType::from_magic(stat.filesystem_type().0 as u32))
}

/// Classify the filesystem holding an open descriptor
#[cfg(any(target_os = "linux", target_os = "android"))]
pub fn classify_fd<Fd: std::os::fd::AsFd>(fd: Fd, path: &Path) -> Result<FilesystemType> {
    let stat = nix::sys::statfs::fstatfs(fd).map_err(|e| SpeedCopyError::io(path, e.into()))?;
    Ok(FilesystemType::from_magic(stat.filesystem_type().0 as u32))
}

/// Classify the filesystem holding `path`
///
/// This platform reports no magic numbers; the query still runs so that a
/// bad path surfaces as an error.
#[cfg(all(unix, not(any(target_os = "linux", target_os = "android"))))]
pub fn classify_path(path: &Path) -> Result<FilesystemType> {
    nix::sys::statfs::statfs(path).map_err(|e| SpeedCopyError::io(path, e.into()))?;
    Ok(FilesystemType::Unknown(0))
}

/// Classify the filesystem holding an open descriptor
#[cfg(all(unix, not(any(target_os = "linux", target_os = "android"))))]
pub fn classify_fd<Fd: std::os::fd::AsFd>(fd: Fd, path: &Path) -> Result<FilesystemType> {
    nix::sys::statfs::fstatfs(fd).map_err(|e| SpeedCopyError::io(path, e.into()))?;
    Ok(FilesystemType::Unknown(0))
}

/// Classify an open file
#[cfg(unix)]
pub fn classify_file(file: &std::fs::File, path: &Path) -> Result<FilesystemType> {
    classify_fd(file, path)
}

/// Classify the filesystem a destination lives on, or will be created on
#[cfg(unix)]
pub fn classify_destination(path: &Path) -> Result<FilesystemType> {
    if path.exists() {
        return classify_path(path);
    }
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => classify_path(parent),
        _ => classify_path(Path::new(".")),
    }
}

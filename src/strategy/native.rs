//! Whole-file copy through the Windows copy API
//!
//! `CopyFile2` is preferred (it negotiates server-side copy over SMB on
//! its own); on systems that lack the export the older `CopyFileW` is used.
//! Both replicate alternate data streams, which are stripped from the
//! destination afterwards so only the primary stream remains.

#[cfg(any(windows, test))]
use std::borrow::Cow;

/// Length (in UTF-16 units) from which paths need the extended prefix
#[cfg(any(windows, test))]
pub(crate) const MAX_PATH: usize = 260;

/// Win32 `ERROR_IO_PENDING`, reported by the copy API on a benign
/// asynchronous completion
#[cfg(any(windows, test))]
pub(crate) const ERROR_IO_PENDING_CODE: u32 = 997;

/// Rewrite an absolute path into extended-length form when it is too long
///
/// Short paths and paths already carrying a `\\?\` or `\\.\` prefix are
/// returned untouched. Long paths get `\\?\` (`\\?\UNC\` for
/// `\\server\share` paths) and have forward slashes turned into back
/// slashes, since Windows does not normalise verbatim paths.
#[cfg(any(windows, test))]
pub(crate) fn extended_length_path(path: &str) -> Cow<'_, str> {
    if path.starts_with(r"\\?\") || path.starts_with(r"\\.\") {
        return Cow::Borrowed(path);
    }
    if path.encode_utf16().count() < MAX_PATH {
        return Cow::Borrowed(path);
    }

    let normalized = path.replace('/', "\\");
    match normalized.strip_prefix(r"\\") {
        Some(unc) => Cow::Owned(format!(r"\\?\UNC\{}", unc)),
        None => Cow::Owned(format!(r"\\?\{}", normalized)),
    }
}

/// Win32 error code carried by a failed HRESULT, if it wraps one
#[cfg(any(windows, test))]
pub(crate) fn win32_code_from_hresult(hr: i32) -> Option<u32> {
    let value = hr as u32;
    if value & 0xFFFF_0000 == 0x8007_0000 {
        Some(value & 0xFFFF)
    } else {
        None
    }
}

#[cfg(windows)]
pub use self::windows::NativeApiCopy;

#[cfg(windows)]
mod windows {
    use super::{extended_length_path, win32_code_from_hresult, ERROR_IO_PENDING_CODE};
    use crate::error::{Result, SpeedCopyError};
    use crate::strategy::{CopyJob, CopyStrategy, StrategyKind, StrategyOutcome};
    use std::ffi::{c_void, OsStr, OsString};
    use std::os::windows::ffi::{OsStrExt, OsStringExt};
    use std::path::Path;
    use windows_sys::Win32::Foundation::{
        GetLastError, ERROR_HANDLE_EOF, ERROR_INVALID_FUNCTION, ERROR_INVALID_PARAMETER, FALSE,
        INVALID_HANDLE_VALUE,
    };
    use windows_sys::Win32::Storage::FileSystem::{
        CopyFileW, DeleteFileW, FindClose, FindFirstStreamW, FindNextStreamW,
        FindStreamInfoStandard, WIN32_FIND_STREAM_DATA,
    };
    use windows_sys::Win32::System::LibraryLoader::{GetModuleHandleW, GetProcAddress};

    type CopyFile2Fn = unsafe extern "system" fn(*const u16, *const u16, *const c_void) -> i32;

    const DEFAULT_STREAM: &str = "::$DATA";

    /// Native whole-file copy strategy
    #[derive(Debug, Clone, Copy)]
    pub struct NativeApiCopy {
        copy_file2: Option<CopyFile2Fn>,
    }

    impl NativeApiCopy {
        /// Resolve the newest copy API available on this system
        pub fn new() -> Self {
            Self {
                copy_file2: resolve_copy_file2(),
            }
        }

        /// Always use `CopyFileW`
        pub fn legacy() -> Self {
            Self { copy_file2: None }
        }

        /// Whether `CopyFile2` was found
        pub fn has_copy_file2(&self) -> bool {
            self.copy_file2.is_some()
        }

        fn copy(&self, job: &CopyJob<'_>) -> Result<u64> {
            let src = wide_path(job.source)?;
            let dst = wide_path(job.destination)?;

            match self.copy_file2 {
                Some(copy_file2) => {
                    // SAFETY: both buffers are NUL-terminated and outlive the call;
                    // null extended parameters request the default behaviour.
                    let hr = unsafe { copy_file2(src.as_ptr(), dst.as_ptr(), std::ptr::null()) };
                    if hr < 0 {
                        let code = win32_code_from_hresult(hr).unwrap_or(hr as u32);
                        check_code(code, job.destination)?;
                    }
                }
                None => {
                    // SAFETY: both buffers are NUL-terminated and outlive the call
                    let ok = unsafe { CopyFileW(src.as_ptr(), dst.as_ptr(), FALSE) };
                    if ok == 0 {
                        let code = unsafe { GetLastError() };
                        check_code(code, job.destination)?;
                    }
                }
            }

            strip_alternate_streams(job.destination)?;

            let len = std::fs::metadata(job.destination)
                .map_err(|e| SpeedCopyError::io(job.destination, e))?
                .len();
            Ok(len)
        }
    }

    impl Default for NativeApiCopy {
        fn default() -> Self {
            Self::new()
        }
    }

    impl CopyStrategy for NativeApiCopy {
        fn kind(&self) -> StrategyKind {
            StrategyKind::NativeApi
        }

        fn attempt(&self, job: &CopyJob<'_>) -> StrategyOutcome {
            match self.copy(job) {
                Ok(bytes) => StrategyOutcome::Success { bytes },
                Err(e) => StrategyOutcome::Failed(e),
            }
        }
    }

    fn resolve_copy_file2() -> Option<CopyFile2Fn> {
        let module_name = wide(OsStr::new("kernel32.dll"));
        // SAFETY: kernel32 is mapped into every process; the name is NUL-terminated
        let module = unsafe { GetModuleHandleW(module_name.as_ptr()) };
        if module == 0 {
            return None;
        }
        // SAFETY: the export name is a NUL-terminated ASCII string
        let proc = unsafe { GetProcAddress(module, b"CopyFile2\0".as_ptr()) }?;
        // SAFETY: CopyFile2 has the signature described by CopyFile2Fn
        Some(unsafe { std::mem::transmute::<unsafe extern "system" fn() -> isize, CopyFile2Fn>(proc) })
    }

    fn check_code(code: u32, path: &Path) -> Result<()> {
        if code == ERROR_IO_PENDING_CODE {
            return Ok(());
        }
        Err(platform_error(code, path))
    }

    fn platform_error(code: u32, path: &Path) -> SpeedCopyError {
        SpeedCopyError::Platform {
            code,
            message: std::io::Error::from_raw_os_error(code as i32).to_string(),
            path: path.to_path_buf(),
        }
    }

    fn wide(value: &OsStr) -> Vec<u16> {
        value.encode_wide().chain(Some(0)).collect()
    }

    fn wide_path(path: &Path) -> Result<Vec<u16>> {
        let absolute = std::path::absolute(path).map_err(|e| SpeedCopyError::io(path, e))?;
        match absolute.to_str() {
            Some(text) => {
                let converted = extended_length_path(text);
                Ok(wide(OsStr::new(&*converted)))
            }
            None => Ok(wide(absolute.as_os_str())),
        }
    }

    /// Delete every non-default `$DATA` stream of `path`
    fn strip_alternate_streams(path: &Path) -> Result<()> {
        let wide_name = wide_path(path)?;
        // SAFETY: plain-old-data structure filled in by the API
        let mut data: WIN32_FIND_STREAM_DATA = unsafe { std::mem::zeroed() };

        // SAFETY: `data` is a valid WIN32_FIND_STREAM_DATA for FindStreamInfoStandard
        let handle = unsafe {
            FindFirstStreamW(
                wide_name.as_ptr(),
                FindStreamInfoStandard,
                &mut data as *mut WIN32_FIND_STREAM_DATA as *mut c_void,
                0,
            )
        };
        if handle == INVALID_HANDLE_VALUE {
            let code = unsafe { GetLastError() };
            return match code {
                // No streams, or a filesystem without stream support
                ERROR_HANDLE_EOF | ERROR_INVALID_FUNCTION | ERROR_INVALID_PARAMETER => Ok(()),
                _ => Err(platform_error(code, path)),
            };
        }

        let mut extra = Vec::new();
        loop {
            let len = data
                .cStreamName
                .iter()
                .position(|&c| c == 0)
                .unwrap_or(data.cStreamName.len());
            let name = OsString::from_wide(&data.cStreamName[..len]);
            if name != DEFAULT_STREAM {
                extra.push(name);
            }

            // SAFETY: handle came from FindFirstStreamW and is still open
            let more = unsafe {
                FindNextStreamW(handle, &mut data as *mut WIN32_FIND_STREAM_DATA as *mut c_void)
            };
            if more == 0 {
                break;
            }
        }
        // SAFETY: handle came from FindFirstStreamW
        unsafe { FindClose(handle) };

        let base = &wide_name[..wide_name.len() - 1];
        for name in extra {
            let mut wide_stream = base.to_vec();
            wide_stream.extend(name.encode_wide());
            wide_stream.push(0);
            // SAFETY: NUL-terminated stream path
            if unsafe { DeleteFileW(wide_stream.as_ptr()) } == 0 {
                let code = unsafe { GetLastError() };
                let mut stream_path = path.as_os_str().to_os_string();
                stream_path.push(&name);
                return Err(platform_error(code, Path::new(&stream_path)));
            }
        }

        Ok(())
    }

}

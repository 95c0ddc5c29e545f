//! Kernel entry points used by the enumeration core
//!
//! Everything that talks to the operating system goes through [`Kernel`].
//! Snapshot enumeration and path queries are unrelated kernel subsystems with
//! their own handle kinds; [`RawSnapshot`] and [`RawProcess`] keep them apart
//! at the type level.
//!
//! On Windows the trait is implemented by `Win32Kernel`. Other
//! implementations (scripted kernels in tests, alternative backends) plug in
//! through the same seam.

pub mod handle;
#[cfg(windows)]
pub mod win32;

#[cfg(test)]
pub(crate) mod fake;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::process::ProcessRecord;

pub use handle::{HandleGuard, KernelHandle};
#[cfg(windows)]
pub use win32::Win32Kernel;

/// Access mask requesting every right on a process.
pub const PROCESS_ALL_ACCESS: u32 = 0x001F_0FFF;

/// Default capacity of the path query output buffer, in bytes.
pub const DEFAULT_PATH_CAPACITY: usize = 500;

/// Largest path the kernel will ever report, in characters.
pub const MAX_PATH_CAPACITY: usize = 32_767;

/// Kernel last-error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KernelError(pub u32);

impl KernelError {
    pub const ACCESS_DENIED: KernelError = KernelError(5);
    pub const INVALID_HANDLE: KernelError = KernelError(6);
    /// Sentinel that ends snapshot iteration
    pub const NO_MORE_FILES: KernelError = KernelError(18);
    pub const BAD_LENGTH: KernelError = KernelError(24);
    pub const INVALID_PARAMETER: KernelError = KernelError(87);
    pub const INSUFFICIENT_BUFFER: KernelError = KernelError(122);

    pub fn code(self) -> u32 {
        self.0
    }

    /// Whether this is the normal end-of-snapshot condition.
    pub fn is_no_more_entries(self) -> bool {
        self == Self::NO_MORE_FILES
    }
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::ACCESS_DENIED => write!(f, "access denied (5)"),
            Self::INVALID_HANDLE => write!(f, "invalid handle (6)"),
            Self::NO_MORE_FILES => write!(f, "no more entries (18)"),
            Self::BAD_LENGTH => write!(f, "bad length (24)"),
            Self::INVALID_PARAMETER => write!(f, "invalid parameter (87)"),
            Self::INSUFFICIENT_BUFFER => write!(f, "insufficient buffer (122)"),
            KernelError(code) => write!(f, "kernel error {}", code),
        }
    }
}

impl std::error::Error for KernelError {}

/// Handle to a system-wide process snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawSnapshot(pub isize);

/// Handle to one open process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawProcess(pub isize);

impl RawProcess {
    /// What a failed open leaves behind.
    pub const INVALID: RawProcess = RawProcess(0);
}

/// Form of the path returned by an image path query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathFormat {
    /// Drive-letter path (`C:\Windows\System32\svchost.exe`)
    #[default]
    Win32,
    /// Device path (`\Device\HarddiskVolume3\Windows\...`)
    Native,
}

impl PathFormat {
    /// Value of the kernel's format flag.
    pub fn flag(self) -> u32 {
        match self {
            PathFormat::Win32 => 0,
            PathFormat::Native => 1,
        }
    }
}

/// The kernel calls the core depends on.
///
/// Each method maps onto exactly one kernel entry point. Implementations do
/// not retry and do not release handles on the caller's behalf.
pub trait Kernel {
    /// Create a snapshot of every process on the host.
    fn create_snapshot(&self) -> Result<RawSnapshot, KernelError>;

    /// Load the first entry of `snapshot` into `record`.
    ///
    /// `record.size` must already hold the record's true size.
    fn process_first(
        &self,
        snapshot: RawSnapshot,
        record: &mut ProcessRecord,
    ) -> Result<(), KernelError>;

    /// Advance the snapshot's cursor and load the entry into `record`.
    ///
    /// Reports [`KernelError::NO_MORE_FILES`] once the snapshot is exhausted.
    fn process_next(
        &self,
        snapshot: RawSnapshot,
        record: &mut ProcessRecord,
    ) -> Result<(), KernelError>;

    fn close_snapshot(&self, snapshot: RawSnapshot) -> bool;

    /// Open `pid` with the requested access mask.
    fn open_process(
        &self,
        pid: u32,
        access: u32,
        inherit: bool,
    ) -> Result<RawProcess, KernelError>;

    /// Write the full image path of `process` into `buffer`.
    ///
    /// `len` holds the buffer capacity on entry and the number of bytes
    /// written, excluding the terminator, on success.
    fn query_image_path(
        &self,
        process: RawProcess,
        format: PathFormat,
        buffer: &mut [u8],
        len: &mut u32,
    ) -> Result<(), KernelError>;

    fn close_process(&self, process: RawProcess) -> bool;

    /// Turn the bytes written by [`Kernel::query_image_path`] into text.
    ///
    /// `None` means the bytes are not valid in the kernel's encoding. The
    /// default reads them as UTF-8.
    fn decode_path(&self, bytes: &[u8]) -> Option<String> {
        decode_utf8_path(bytes)
    }
}

/// Strict UTF-8 decoding of path bytes.
pub fn decode_utf8_path(bytes: &[u8]) -> Option<String> {
    std::str::from_utf8(bytes).ok().map(str::to_owned)
}

impl<K: Kernel + ?Sized> Kernel for &K {
    fn create_snapshot(&self) -> Result<RawSnapshot, KernelError> {
        (**self).create_snapshot()
    }

    fn process_first(
        &self,
        snapshot: RawSnapshot,
        record: &mut ProcessRecord,
    ) -> Result<(), KernelError> {
        (**self).process_first(snapshot, record)
    }

    fn process_next(
        &self,
        snapshot: RawSnapshot,
        record: &mut ProcessRecord,
    ) -> Result<(), KernelError> {
        (**self).process_next(snapshot, record)
    }

    fn close_snapshot(&self, snapshot: RawSnapshot) -> bool {
        (**self).close_snapshot(snapshot)
    }

    fn open_process(
        &self,
        pid: u32,
        access: u32,
        inherit: bool,
    ) -> Result<RawProcess, KernelError> {
        (**self).open_process(pid, access, inherit)
    }

    fn query_image_path(
        &self,
        process: RawProcess,
        format: PathFormat,
        buffer: &mut [u8],
        len: &mut u32,
    ) -> Result<(), KernelError> {
        (**self).query_image_path(process, format, buffer, len)
    }

    fn close_process(&self, process: RawProcess) -> bool {
        (**self).close_process(process)
    }

    fn decode_path(&self, bytes: &[u8]) -> Option<String> {
        (**self).decode_path(bytes)
    }
}

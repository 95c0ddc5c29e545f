//! winps - point-in-time process listing for Windows
//!
//! Lists the processes running on this host from a kernel snapshot and
//! resolves the full executable path of any process on demand.
//!
//! ## Layout
//!
//! - **Kernel seam**: [`Kernel`] wraps every kernel entry point; `Win32Kernel`
//!   is the live backend on Windows
//! - **Handle guard**: [`HandleGuard`] releases snapshot and process handles
//!   exactly once on every exit path
//! - **Snapshot iterator**: [`SnapshotIterator`] walks one snapshot lazily
//! - **Record decoder**: [`decode`] turns a raw record into a [`ProcessDescriptor`]
//! - **Path resolver**: [`PathResolver`] queries a process image path with its
//!   own handle
//! - **Process directory**: [`ProcessDirectory`] ties the pieces together
//!
//! ## Errors
//!
//! Snapshot and enumeration failures are hard errors ([`PsError`]) and yield
//! no descriptors. Path failures are soft and come back inside [`ProcessData`].

pub mod config;
pub mod directory;
pub mod error;
pub mod kernel;
pub mod path;
pub mod process;
pub mod snapshot;

// Re-exports
pub use config::ScanConfig;
pub use directory::ProcessDirectory;
pub use error::{PsError, PsResult};
pub use kernel::{
    decode_utf8_path, HandleGuard, Kernel, KernelError, KernelHandle, PathFormat, RawProcess, RawSnapshot,
    PROCESS_ALL_ACCESS,
};
pub use path::{resolve_executable_path, PathResolver};
pub use process::{
    decode, ProcessData, ProcessDescriptor, ProcessEntry, ProcessRecord, KERNEL_QUERY_ERROR,
    MAX_PATH,
};
pub use snapshot::SnapshotIterator;

#[cfg(windows)]
pub use kernel::Win32Kernel;

/// Directory over the live Win32 kernel.
#[cfg(windows)]
pub fn native() -> ProcessDirectory<Win32Kernel> {
    ProcessDirectory::new(Win32Kernel::new())
}

/// Every process running on this host.
#[cfg(windows)]
pub fn processes() -> PsResult<Vec<ProcessDescriptor>> {
    native().list_processes()
}

/// The running process with `pid`, if any.
#[cfg(windows)]
pub fn find_process(pid: u32) -> PsResult<Option<ProcessDescriptor>> {
    native().find_process(pid)
}

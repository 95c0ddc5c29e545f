//! Full executable path lookup for a single process
//!
//! Independent of any snapshot: every call opens its own process handle and
//! releases it before returning. Failures are soft and come back as
//! [`ProcessData`] values.

use tracing::debug;

use crate::config::ScanConfig;
use crate::kernel::{
    HandleGuard, Kernel, PathFormat, RawProcess, DEFAULT_PATH_CAPACITY, PROCESS_ALL_ACCESS,
};
use crate::process::{ProcessData, KERNEL_QUERY_ERROR};

/// Resolves process ids to full image paths.
#[derive(Debug)]
pub struct PathResolver<'k, K: Kernel + ?Sized> {
    kernel: &'k K,
    capacity: usize,
    format: PathFormat,
    access: u32,
    inherit: bool,
}

impl<'k, K: Kernel + ?Sized> PathResolver<'k, K> {
    pub fn new(kernel: &'k K) -> Self {
        Self {
            kernel,
            capacity: DEFAULT_PATH_CAPACITY,
            format: PathFormat::Win32,
            access: PROCESS_ALL_ACCESS,
            inherit: false,
        }
    }

    pub fn with_config(kernel: &'k K, config: &ScanConfig) -> Self {
        Self {
            kernel,
            capacity: config.path_capacity,
            format: config.path_format,
            access: config.access_rights,
            inherit: config.inherit_handles,
        }
    }

    pub fn format(mut self, format: PathFormat) -> Self {
        self.format = format;
        self
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Query the full executable path of `pid`.
    ///
    /// A process that cannot be opened is queried through an invalid handle,
    /// so both failures surface as the same soft error. Bytes the kernel
    /// cannot decode are reported the same way rather than as a mangled path.
    pub fn resolve(&self, pid: u32) -> ProcessData {
        let raw = self
            .kernel
            .open_process(pid, self.access, self.inherit)
            .unwrap_or_else(|e| {
                debug!("Could not open process {}: {}", pid, e);
                RawProcess::INVALID
            });
        let process = HandleGuard::new(self.kernel, raw);

        let mut buffer = vec![0u8; self.capacity];
        let mut len = self.capacity as u32;
        let queried = self
            .kernel
            .query_image_path(process.raw(), self.format, &mut buffer, &mut len);
        drop(process);

        match queried {
            Ok(()) => {
                let len = (len as usize).min(buffer.len());
                match self.kernel.decode_path(&buffer[..len]) {
                    Some(path) => ProcessData::resolved(path, len),
                    None => {
                        debug!("Image path of process {} is not decodable", pid);
                        ProcessData::failed(KERNEL_QUERY_ERROR)
                    }
                }
            }
            Err(e) => {
                debug!("Image path query for process {} failed: {}", pid, e);
                ProcessData::failed(KERNEL_QUERY_ERROR)
            }
        }
    }
}

/// One-shot path query with default settings.
pub fn resolve_executable_path<K: Kernel + ?Sized>(kernel: &K, pid: u32) -> ProcessData {
    PathResolver::new(kernel).resolve(pid)
}

//! Process directory: list and look up processes on this host
//!
//! Every call takes a fresh snapshot; nothing is cached between calls. Path
//! lookups go through [`PathResolver`] and never share a handle with the
//! snapshot that produced the descriptor.

use tracing::debug;

use crate::config::ScanConfig;
use crate::error::PsResult;
use crate::kernel::Kernel;
use crate::path::PathResolver;
use crate::process::{decode, ProcessData, ProcessDescriptor, ProcessEntry};
use crate::snapshot::SnapshotIterator;

/// Façade over snapshot enumeration and path resolution.
#[derive(Debug, Clone)]
pub struct ProcessDirectory<K: Kernel> {
    kernel: K,
    config: ScanConfig,
}

impl<K: Kernel> ProcessDirectory<K> {
    pub fn new(kernel: K) -> Self {
        Self {
            kernel,
            config: ScanConfig::default(),
        }
    }

    pub fn with_config(kernel: K, config: ScanConfig) -> PsResult<Self> {
        config.validate()?;
        Ok(Self { kernel, config })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Every process in one snapshot, in kernel order.
    ///
    /// Any enumeration failure discards whatever was already decoded.
    pub fn list_processes(&self) -> PsResult<Vec<ProcessDescriptor>> {
        let snapshot = SnapshotIterator::open(&self.kernel)?;
        let mut processes = Vec::with_capacity(self.config.initial_capacity);
        for record in snapshot {
            processes.push(decode(&record?));
        }
        debug!("Listed {} processes", processes.len());
        Ok(processes)
    }

    /// First process with `pid`, or `None` if it is not running.
    pub fn find_process(&self, pid: u32) -> PsResult<Option<ProcessDescriptor>> {
        Ok(self
            .list_processes()?
            .into_iter()
            .find(|p| p.pid() == pid))
    }

    /// Processes whose executable name matches `name`, ignoring ASCII case.
    pub fn find_by_name(&self, name: &str) -> PsResult<Vec<ProcessDescriptor>> {
        Ok(self
            .list_processes()?
            .into_iter()
            .filter(|p| p.executable().eq_ignore_ascii_case(name))
            .collect())
    }

    /// Full executable path of `pid`.
    pub fn process_data(&self, pid: u32) -> ProcessData {
        self.resolver().resolve(pid)
    }

    /// Full executable path of a listed process.
    pub fn describe(&self, process: &ProcessDescriptor) -> ProcessData {
        self.process_data(process.pid())
    }

    /// One listing plus a path query per process.
    ///
    /// Path failures stay inside each entry; only enumeration errors abort.
    pub fn list_with_paths(&self) -> PsResult<Vec<ProcessEntry>> {
        let resolver = self.resolver();
        let entries: Vec<ProcessEntry> = self
            .list_processes()?
            .into_iter()
            .map(|descriptor| {
                let data = resolver.resolve(descriptor.pid());
                ProcessEntry { descriptor, data }
            })
            .collect();
        let failed = entries.iter().filter(|e| !e.data.is_ok()).count();
        debug!("Resolved paths for {} processes ({} unavailable)", entries.len(), failed);
        Ok(entries)
    }

    fn resolver(&self) -> PathResolver<'_, K> {
        PathResolver::with_config(&self.kernel, &self.config)
    }
}

impl<K: Kernel + Default> Default for ProcessDirectory<K> {
    fn default() -> Self {
        Self::new(K::default())
    }
}

//! Scripted kernel shared by the integration tests

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use winps::{Kernel, KernelError, PathFormat, ProcessRecord, RawProcess, RawSnapshot};

#[derive(Default)]
struct Ledger {
    next_handle: isize,
    cursors: HashMap<isize, usize>,
    live: HashSet<isize>,
    processes: HashMap<isize, u32>,
    acquired: usize,
    released: usize,
    double_releases: usize,
}

/// Kernel backed by a fixed process table.
///
/// Thread-safe so concurrent listings can share one instance. Image paths are
/// decoded as Latin-1, a single-byte code page where every byte is valid.
#[derive(Default)]
pub struct ScriptedKernel {
    table: Vec<(u32, u32, String)>,
    paths: HashMap<u32, Vec<u8>>,
    refuse_snapshot: Option<KernelError>,
    denied: HashSet<u32>,
    ledger: Mutex<Ledger>,
}

impl ScriptedKernel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process(mut self, pid: u32, ppid: u32, exe: &str) -> Self {
        self.table.push((pid, ppid, exe.to_string()));
        self
    }

    pub fn path(mut self, pid: u32, path: &[u8]) -> Self {
        self.paths.insert(pid, path.to_vec());
        self
    }

    pub fn refuse_snapshot(mut self, error: KernelError) -> Self {
        self.refuse_snapshot = Some(error);
        self
    }

    pub fn deny(mut self, pid: u32) -> Self {
        self.denied.insert(pid);
        self
    }

    /// Handles acquired and not yet released.
    pub fn outstanding(&self) -> usize {
        let ledger = self.ledger.lock().unwrap();
        ledger.acquired - ledger.released
    }

    pub fn acquired(&self) -> usize {
        self.ledger.lock().unwrap().acquired
    }

    pub fn double_releases(&self) -> usize {
        self.ledger.lock().unwrap().double_releases
    }

    fn fill(
        &self,
        snapshot: RawSnapshot,
        index: usize,
        record: &mut ProcessRecord,
    ) -> Result<(), KernelError> {
        let mut ledger = self.ledger.lock().unwrap();
        if !ledger.live.contains(&snapshot.0) {
            return Err(KernelError::INVALID_HANDLE);
        }
        if !record.has_valid_size() {
            return Err(KernelError::BAD_LENGTH);
        }
        let (pid, ppid, exe) = self.table.get(index).ok_or(KernelError::NO_MORE_FILES)?;
        *record = ProcessRecord::from_parts(*pid, *ppid, exe);
        ledger.cursors.insert(snapshot.0, index);
        Ok(())
    }

    fn release(&self, raw: isize) -> bool {
        let mut ledger = self.ledger.lock().unwrap();
        if ledger.live.remove(&raw) {
            ledger.released += 1;
            ledger.cursors.remove(&raw);
            ledger.processes.remove(&raw);
            true
        } else {
            ledger.double_releases += 1;
            false
        }
    }

    fn acquire(&self) -> isize {
        let mut ledger = self.ledger.lock().unwrap();
        ledger.next_handle += 4;
        let raw = 0x200 + ledger.next_handle;
        ledger.live.insert(raw);
        ledger.acquired += 1;
        raw
    }
}

impl Kernel for ScriptedKernel {
    fn create_snapshot(&self) -> Result<RawSnapshot, KernelError> {
        if let Some(error) = self.refuse_snapshot {
            return Err(error);
        }
        Ok(RawSnapshot(self.acquire()))
    }

    fn process_first(
        &self,
        snapshot: RawSnapshot,
        record: &mut ProcessRecord,
    ) -> Result<(), KernelError> {
        self.fill(snapshot, 0, record)
    }

    fn process_next(
        &self,
        snapshot: RawSnapshot,
        record: &mut ProcessRecord,
    ) -> Result<(), KernelError> {
        let cursor = self.ledger.lock().unwrap().cursors.get(&snapshot.0).copied();
        match cursor {
            Some(index) => self.fill(snapshot, index + 1, record),
            None => Err(KernelError::INVALID_PARAMETER),
        }
    }

    fn close_snapshot(&self, snapshot: RawSnapshot) -> bool {
        self.release(snapshot.0)
    }

    fn open_process(
        &self,
        pid: u32,
        access: u32,
        _inherit: bool,
    ) -> Result<RawProcess, KernelError> {
        if access == 0 || self.denied.contains(&pid) {
            return Err(KernelError::ACCESS_DENIED);
        }
        let raw = self.acquire();
        self.ledger.lock().unwrap().processes.insert(raw, pid);
        Ok(RawProcess(raw))
    }

    fn query_image_path(
        &self,
        process: RawProcess,
        _format: PathFormat,
        buffer: &mut [u8],
        len: &mut u32,
    ) -> Result<(), KernelError> {
        let pid = self
            .ledger
            .lock()
            .unwrap()
            .processes
            .get(&process.0)
            .copied()
            .ok_or(KernelError::INVALID_HANDLE)?;
        let path = self.paths.get(&pid).ok_or(KernelError::INVALID_PARAMETER)?;
        if path.len() >= *len as usize {
            return Err(KernelError::INSUFFICIENT_BUFFER);
        }
        buffer[..path.len()].copy_from_slice(path);
        buffer[path.len()] = 0;
        *len = path.len() as u32;
        Ok(())
    }

    fn close_process(&self, process: RawProcess) -> bool {
        self.release(process.0)
    }

    fn decode_path(&self, bytes: &[u8]) -> Option<String> {
        Some(bytes.iter().map(|&b| char::from(b)).collect())
    }
}

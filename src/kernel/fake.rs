//! Scripted kernel for unit tests

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use super::{decode_utf8_path, Kernel, KernelError, PathFormat, RawProcess, RawSnapshot};
use crate::process::ProcessRecord;

#[derive(Default)]
struct State {
    next_handle: isize,
    cursors: HashMap<isize, usize>,
    snapshots: HashSet<isize>,
    processes: HashMap<isize, u32>,
    close_calls: usize,
    snapshot_calls: usize,
    open_calls: usize,
    query_calls: usize,
}

pub(crate) struct FakeKernel {
    records: Vec<ProcessRecord>,
    paths: HashMap<u32, Vec<u8>>,
    latin1: bool,
    snapshot_error: Option<KernelError>,
    next_error: Option<(usize, KernelError)>,
    denied: HashSet<u32>,
    refuse_close: bool,
    state: RefCell<State>,
}

impl FakeKernel {
    pub(crate) fn new() -> Self {
        Self {
            records: Vec::new(),
            paths: HashMap::new(),
            latin1: false,
            snapshot_error: None,
            next_error: None,
            denied: HashSet::new(),
            refuse_close: false,
            state: RefCell::new(State {
                next_handle: 0x100,
                ..State::default()
            }),
        }
    }

    pub(crate) fn with_process(mut self, pid: u32, ppid: u32, exe: &str) -> Self {
        self.records.push(ProcessRecord::from_parts(pid, ppid, exe));
        self
    }

    pub(crate) fn with_record(mut self, record: ProcessRecord) -> Self {
        self.records.push(record);
        self
    }

    pub(crate) fn with_path(self, pid: u32, path: &str) -> Self {
        self.with_raw_path(pid, path.as_bytes())
    }

    /// Store the image path exactly as the kernel would write it.
    pub(crate) fn with_raw_path(mut self, pid: u32, path: &[u8]) -> Self {
        self.paths.insert(pid, path.to_vec());
        self
    }

    /// Decode paths as a single-byte code page where every byte maps to U+00XX.
    pub(crate) fn latin1_paths(mut self) -> Self {
        self.latin1 = true;
        self
    }

    pub(crate) fn failing_snapshot(mut self, error: KernelError) -> Self {
        self.snapshot_error = Some(error);
        self
    }

    /// Fail the `next` call that would load entry `index`.
    pub(crate) fn failing_next_at(mut self, index: usize, error: KernelError) -> Self {
        self.next_error = Some((index, error));
        self
    }

    pub(crate) fn denying(mut self, pid: u32) -> Self {
        self.denied.insert(pid);
        self
    }

    pub(crate) fn refusing_close(mut self) -> Self {
        self.refuse_close = true;
        self
    }

    pub(crate) fn open_handles(&self) -> usize {
        let state = self.state.borrow();
        state.snapshots.len() + state.processes.len()
    }

    pub(crate) fn close_calls(&self) -> usize {
        self.state.borrow().close_calls
    }

    pub(crate) fn snapshot_calls(&self) -> usize {
        self.state.borrow().snapshot_calls
    }

    pub(crate) fn open_calls(&self) -> usize {
        self.state.borrow().open_calls
    }

    pub(crate) fn query_calls(&self) -> usize {
        self.state.borrow().query_calls
    }

    fn load(
        &self,
        snapshot: RawSnapshot,
        index: usize,
        record: &mut ProcessRecord,
    ) -> Result<(), KernelError> {
        let mut state = self.state.borrow_mut();
        if !state.snapshots.contains(&snapshot.0) {
            return Err(KernelError::INVALID_HANDLE);
        }
        if !record.has_valid_size() {
            return Err(KernelError::BAD_LENGTH);
        }
        match self.records.get(index) {
            Some(found) => {
                *record = *found;
                state.cursors.insert(snapshot.0, index);
                Ok(())
            }
            None => Err(KernelError::NO_MORE_FILES),
        }
    }
}

impl Kernel for FakeKernel {
    fn create_snapshot(&self) -> Result<RawSnapshot, KernelError> {
        let mut state = self.state.borrow_mut();
        state.snapshot_calls += 1;
        if let Some(error) = self.snapshot_error {
            return Err(error);
        }
        state.next_handle += 4;
        let handle = state.next_handle;
        state.snapshots.insert(handle);
        Ok(RawSnapshot(handle))
    }

    fn process_first(
        &self,
        snapshot: RawSnapshot,
        record: &mut ProcessRecord,
    ) -> Result<(), KernelError> {
        self.load(snapshot, 0, record)
    }

    fn process_next(
        &self,
        snapshot: RawSnapshot,
        record: &mut ProcessRecord,
    ) -> Result<(), KernelError> {
        let index = match self.state.borrow().cursors.get(&snapshot.0) {
            Some(cursor) => cursor + 1,
            None => return Err(KernelError::INVALID_PARAMETER),
        };
        if let Some((at, error)) = self.next_error {
            if at == index {
                return Err(error);
            }
        }
        self.load(snapshot, index, record)
    }

    fn close_snapshot(&self, snapshot: RawSnapshot) -> bool {
        let mut state = self.state.borrow_mut();
        state.close_calls += 1;
        if self.refuse_close {
            return false;
        }
        state.cursors.remove(&snapshot.0);
        state.snapshots.remove(&snapshot.0)
    }

    fn open_process(
        &self,
        pid: u32,
        _access: u32,
        _inherit: bool,
    ) -> Result<RawProcess, KernelError> {
        let mut state = self.state.borrow_mut();
        state.open_calls += 1;
        if self.denied.contains(&pid) {
            return Err(KernelError::ACCESS_DENIED);
        }
        state.next_handle += 4;
        let handle = state.next_handle;
        state.processes.insert(handle, pid);
        Ok(RawProcess(handle))
    }

    fn query_image_path(
        &self,
        process: RawProcess,
        format: PathFormat,
        buffer: &mut [u8],
        len: &mut u32,
    ) -> Result<(), KernelError> {
        let mut state = self.state.borrow_mut();
        state.query_calls += 1;
        let pid = match state.processes.get(&process.0) {
            Some(pid) => *pid,
            None => return Err(KernelError::INVALID_HANDLE),
        };
        let path = match self.paths.get(&pid) {
            Some(path) => match format {
                PathFormat::Win32 => path.clone(),
                PathFormat::Native if path.starts_with(b"C:") => {
                    let mut native = b"\\Device\\HarddiskVolume3".to_vec();
                    native.extend_from_slice(&path[2..]);
                    native
                }
                PathFormat::Native => path.clone(),
            },
            None => return Err(KernelError::INVALID_PARAMETER),
        };
        let bytes = path.as_slice();
        if bytes.len() + 1 > *len as usize || *len as usize > buffer.len() {
            return Err(KernelError::INSUFFICIENT_BUFFER);
        }
        buffer[..bytes.len()].copy_from_slice(bytes);
        buffer[bytes.len()] = 0;
        *len = bytes.len() as u32;
        Ok(())
    }

    fn close_process(&self, process: RawProcess) -> bool {
        let mut state = self.state.borrow_mut();
        state.close_calls += 1;
        if self.refuse_close {
            return false;
        }
        state.processes.remove(&process.0).is_some()
    }

    fn decode_path(&self, bytes: &[u8]) -> Option<String> {
        if self.latin1 {
            Some(bytes.iter().map(|&b| char::from(b)).collect())
        } else {
            decode_utf8_path(bytes)
        }
    }
}

//! Raw process records and the caller-owned values decoded from them

use serde::Serialize;
use std::mem::size_of;

/// Width of the file-name slot in a raw process record, in UTF-16 units.
pub const MAX_PATH: usize = 260;

/// Message carried by every failed path query.
pub const KERNEL_QUERY_ERROR: &str = "Error retrieving process info from kernel";

/// One raw process entry, laid out exactly like the kernel's wide process entry.
///
/// `size` must hold `size_of::<ProcessRecord>()` before the record is handed
/// to the first iteration call; [`ProcessRecord::new`] takes care of that.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct ProcessRecord {
    pub size: u32,
    pub usage_count: u32,
    pub process_id: u32,
    pub default_heap_id: usize,
    pub module_id: u32,
    pub thread_count: u32,
    pub parent_process_id: u32,
    pub priority_base: i32,
    pub flags: u32,
    /// Executable file name, zero-terminated within the slot
    pub exe_file: [u16; MAX_PATH],
}

impl ProcessRecord {
    /// The declared size the kernel expects in the `size` field.
    pub const SIZE: u32 = size_of::<ProcessRecord>() as u32;

    /// Empty record with the size field preset.
    pub fn new() -> Self {
        Self {
            size: Self::SIZE,
            usage_count: 0,
            process_id: 0,
            default_heap_id: 0,
            module_id: 0,
            thread_count: 0,
            parent_process_id: 0,
            priority_base: 0,
            flags: 0,
            exe_file: [0; MAX_PATH],
        }
    }

    /// Populated record, as a kernel would fill it in.
    ///
    /// Names longer than the slot are cut so the terminator still fits.
    pub fn from_parts(pid: u32, ppid: u32, exe: &str) -> Self {
        let mut record = Self::new();
        record.process_id = pid;
        record.parent_process_id = ppid;
        record.thread_count = 1;
        for (slot, unit) in record
            .exe_file
            .iter_mut()
            .take(MAX_PATH - 1)
            .zip(exe.encode_utf16())
        {
            *slot = unit;
        }
        record
    }

    /// Whether the declared size matches the true in-memory size.
    pub fn has_valid_size(&self) -> bool {
        self.size == Self::SIZE
    }

    /// Units before the first zero in the name slot, or the whole slot.
    pub fn exe_name_len(&self) -> usize {
        self.exe_file
            .iter()
            .position(|&unit| unit == 0)
            .unwrap_or(MAX_PATH)
    }

    #[cfg(windows)]
    pub(crate) fn as_mut_ptr(&mut self) -> *mut ProcessRecord {
        self as *mut ProcessRecord
    }
}

impl Default for ProcessRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ProcessRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessRecord")
            .field("size", &self.size)
            .field("process_id", &self.process_id)
            .field("parent_process_id", &self.parent_process_id)
            .field("thread_count", &self.thread_count)
            .field("exe_file", &String::from_utf16_lossy(&self.exe_file[..self.exe_name_len()]))
            .finish()
    }
}

/// Decoded, caller-owned view of one process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ProcessDescriptor {
    pid: u32,
    ppid: u32,
    executable: String,
}

impl ProcessDescriptor {
    pub fn new(pid: u32, ppid: u32, executable: impl Into<String>) -> Self {
        Self {
            pid,
            ppid,
            executable: executable.into(),
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn ppid(&self) -> u32 {
        self.ppid
    }

    /// Short executable name as captured in the snapshot.
    pub fn executable(&self) -> &str {
        &self.executable
    }
}

/// Decode one raw record.
///
/// The name is cut at the first zero unit and copied out, so the descriptor
/// never borrows from the record.
pub fn decode(record: &ProcessRecord) -> ProcessDescriptor {
    let end = record.exe_name_len();
    ProcessDescriptor {
        pid: record.process_id,
        ppid: record.parent_process_id,
        executable: String::from_utf16_lossy(&record.exe_file[..end]),
    }
}

impl From<&ProcessRecord> for ProcessDescriptor {
    fn from(record: &ProcessRecord) -> Self {
        decode(record)
    }
}

/// Result of a full executable path query.
///
/// Either the path is populated and `ok` is set, or the error message is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessData {
    path: String,
    length: usize,
    ok: bool,
    error_message: String,
}

impl ProcessData {
    pub fn resolved(path: String, length: usize) -> Self {
        Self {
            path,
            length,
            ok: true,
            error_message: String::new(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            path: String::new(),
            length: 0,
            ok: false,
            error_message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.ok
    }

    /// Full path, empty when the query failed.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Bytes the kernel reported writing.
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn error_message(&self) -> Option<&str> {
        if self.ok {
            None
        } else {
            Some(&self.error_message)
        }
    }

    pub fn into_result(self) -> Result<String, String> {
        if self.ok {
            Ok(self.path)
        } else {
            Err(self.error_message)
        }
    }
}

/// A descriptor paired with the outcome of its own path query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessEntry {
    pub descriptor: ProcessDescriptor,
    pub data: ProcessData,
}

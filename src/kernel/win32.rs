//! Win32 backend: Toolhelp snapshots and process image queries

use std::ffi::c_void;
use std::mem::{align_of, size_of};

use windows::core::PSTR;
use windows::Win32::Foundation::{CloseHandle, HANDLE};
use windows::Win32::Globalization::{MultiByteToWideChar, CP_ACP, MB_ERR_INVALID_CHARS};
use windows::Win32::System::Diagnostics::ToolHelp::{
    CreateToolhelp32Snapshot, Process32FirstW, Process32NextW, PROCESSENTRY32W, TH32CS_SNAPPROCESS,
};
use windows::Win32::System::Threading::{
    OpenProcess, QueryFullProcessImageNameA, PROCESS_ACCESS_RIGHTS, PROCESS_NAME_FORMAT,
};

use super::{Kernel, KernelError, PathFormat, RawProcess, RawSnapshot};
use crate::process::ProcessRecord;

// ProcessRecord is handed to Process32FirstW/NextW in place of PROCESSENTRY32W.
const _: () = assert!(size_of::<ProcessRecord>() == size_of::<PROCESSENTRY32W>());
const _: () = assert!(align_of::<ProcessRecord>() == align_of::<PROCESSENTRY32W>());

/// The live Win32 kernel.
#[derive(Debug, Clone, Copy, Default)]
pub struct Win32Kernel;

impl Win32Kernel {
    pub fn new() -> Self {
        Self
    }
}

/// Win32 error code behind a `windows` error.
fn win32_code(err: &windows::core::Error) -> KernelError {
    let hr = err.code().0 as u32;
    // HRESULT_FROM_WIN32 packs the code into facility 7
    if hr & 0xFFFF_0000 == 0x8007_0000 {
        KernelError(hr & 0xFFFF)
    } else {
        KernelError(hr)
    }
}

fn handle(raw: isize) -> HANDLE {
    HANDLE(raw as *mut c_void)
}

impl Kernel for Win32Kernel {
    fn create_snapshot(&self) -> Result<RawSnapshot, KernelError> {
        unsafe {
            CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0)
                .map(|h| RawSnapshot(h.0 as isize))
                .map_err(|e| win32_code(&e))
        }
    }

    fn process_first(
        &self,
        snapshot: RawSnapshot,
        record: &mut ProcessRecord,
    ) -> Result<(), KernelError> {
        unsafe {
            Process32FirstW(handle(snapshot.0), record.as_mut_ptr().cast::<PROCESSENTRY32W>())
                .map_err(|e| win32_code(&e))
        }
    }

    fn process_next(
        &self,
        snapshot: RawSnapshot,
        record: &mut ProcessRecord,
    ) -> Result<(), KernelError> {
        unsafe {
            Process32NextW(handle(snapshot.0), record.as_mut_ptr().cast::<PROCESSENTRY32W>())
                .map_err(|e| win32_code(&e))
        }
    }

    fn close_snapshot(&self, snapshot: RawSnapshot) -> bool {
        unsafe { CloseHandle(handle(snapshot.0)).is_ok() }
    }

    fn open_process(
        &self,
        pid: u32,
        access: u32,
        inherit: bool,
    ) -> Result<RawProcess, KernelError> {
        unsafe {
            OpenProcess(PROCESS_ACCESS_RIGHTS(access), inherit, pid)
                .map(|h| RawProcess(h.0 as isize))
                .map_err(|e| win32_code(&e))
        }
    }

    fn query_image_path(
        &self,
        process: RawProcess,
        format: PathFormat,
        buffer: &mut [u8],
        len: &mut u32,
    ) -> Result<(), KernelError> {
        // Never let the kernel write past the slice
        *len = (*len).min(buffer.len() as u32);
        unsafe {
            QueryFullProcessImageNameA(
                handle(process.0),
                PROCESS_NAME_FORMAT(format.flag()),
                PSTR(buffer.as_mut_ptr()),
                len,
            )
            .map_err(|e| win32_code(&e))
        }
    }

    fn close_process(&self, process: RawProcess) -> bool {
        unsafe { CloseHandle(handle(process.0)).is_ok() }
    }

    /// ANSI image paths are in the active code page, not UTF-8.
    fn decode_path(&self, bytes: &[u8]) -> Option<String> {
        if bytes.is_empty() {
            return Some(String::new());
        }
        let needed = unsafe { MultiByteToWideChar(CP_ACP, MB_ERR_INVALID_CHARS, bytes, None) };
        if needed <= 0 {
            return None;
        }
        let mut wide = vec![0u16; needed as usize];
        let written = unsafe {
            MultiByteToWideChar(CP_ACP, MB_ERR_INVALID_CHARS, bytes, Some(&mut wide))
        };
        if written <= 0 {
            return None;
        }
        wide.truncate(written as usize);
        String::from_utf16(&wide).ok()
    }
}

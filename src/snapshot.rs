//! Lazy iteration over a kernel process snapshot
//!
//! The kernel keeps the iteration cursor inside the snapshot object, so a
//! [`SnapshotIterator`] owns its snapshot handle outright: it cannot be
//! restarted, cloned or shared. The handle is released when the iterator is
//! dropped, whether or not it ran to the end.

use std::iter::FusedIterator;
use tracing::{debug, trace, warn};

use crate::error::{PsError, PsResult};
use crate::kernel::{HandleGuard, Kernel, RawSnapshot};
use crate::process::ProcessRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    /// `record` holds an entry not yet handed out
    Loaded,
    /// Ask the kernel for the next entry
    Advance,
    Done,
}

/// Finite, non-restartable sequence of raw records from one snapshot.
pub struct SnapshotIterator<'k, K: Kernel + ?Sized> {
    handle: HandleGuard<'k, K, RawSnapshot>,
    record: ProcessRecord,
    cursor: Cursor,
    yielded: usize,
}

impl<'k, K: Kernel + ?Sized> SnapshotIterator<'k, K> {
    /// Take a system-wide snapshot and load its first entry.
    ///
    /// Fails with [`PsError::Snapshot`] if the kernel refuses the snapshot and
    /// with [`PsError::Enumeration`] if the first entry cannot be read, in
    /// which case the snapshot is released before returning.
    pub fn open(kernel: &'k K) -> PsResult<Self> {
        let snapshot = kernel.create_snapshot().map_err(|e| {
            debug!("Process snapshot refused: {}", e);
            PsError::Snapshot { code: e.code() }
        })?;
        let handle = HandleGuard::new(kernel, snapshot);
        debug!("Opened process snapshot {:?}", snapshot);

        let mut record = ProcessRecord::new();
        kernel.process_first(snapshot, &mut record).map_err(|e| {
            debug!("First snapshot entry unavailable: {}", e);
            PsError::Enumeration { code: e.code() }
        })?;

        Ok(Self {
            handle,
            record,
            cursor: Cursor::Loaded,
            yielded: 0,
        })
    }

    /// Entries handed out so far.
    pub fn yielded(&self) -> usize {
        self.yielded
    }

    /// Stop early and release the snapshot, reporting the kernel's answer.
    pub fn close(self) -> bool {
        self.handle.release()
    }

    fn advance(&mut self) -> Option<PsResult<ProcessRecord>> {
        // The kernel may have shrunk the declared size on the last call
        self.record.size = ProcessRecord::SIZE;
        let kernel = self.handle.kernel();
        match kernel.process_next(self.handle.raw(), &mut self.record) {
            Ok(()) => Some(Ok(self.record)),
            Err(e) if e.is_no_more_entries() => {
                debug!("Process snapshot exhausted after {} entries", self.yielded);
                self.cursor = Cursor::Done;
                None
            }
            Err(e) => {
                warn!("Process iteration failed after {} entries: {}", self.yielded, e);
                self.cursor = Cursor::Done;
                Some(Err(PsError::Iteration { code: e.code() }))
            }
        }
    }
}

impl<K: Kernel + ?Sized> Iterator for SnapshotIterator<'_, K> {
    type Item = PsResult<ProcessRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = match self.cursor {
            Cursor::Done => return None,
            Cursor::Loaded => {
                self.cursor = Cursor::Advance;
                Some(Ok(self.record))
            }
            Cursor::Advance => self.advance(),
        };
        if let Some(Ok(record)) = &item {
            self.yielded += 1;
            trace!(pid = record.process_id, ppid = record.parent_process_id, "snapshot entry");
        }
        item
    }
}

impl<K: Kernel + ?Sized> FusedIterator for SnapshotIterator<'_, K> {}

impl<K: Kernel + ?Sized> std::fmt::Debug for SnapshotIterator<'_, K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotIterator")
            .field("handle", &self.handle)
            .field("cursor", &self.cursor)
            .field("yielded", &self.yielded)
            .finish()
    }
}

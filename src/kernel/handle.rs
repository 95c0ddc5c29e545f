//! Scoped ownership of kernel handles

use std::fmt;
use tracing::error;

use super::{Kernel, RawProcess, RawSnapshot};

/// A kind of kernel handle with its own release call.
pub trait KernelHandle: Copy + fmt::Debug {
    /// Whether the value refers to a live kernel object.
    fn is_valid(self) -> bool;

    /// Hand the handle back to the kernel.
    fn release_with<K: Kernel + ?Sized>(self, kernel: &K) -> bool;
}

// Both 0 and -1 are returned by failed opens depending on the entry point.
fn is_live(raw: isize) -> bool {
    raw != 0 && raw != -1
}

impl KernelHandle for RawSnapshot {
    fn is_valid(self) -> bool {
        is_live(self.0)
    }

    fn release_with<K: Kernel + ?Sized>(self, kernel: &K) -> bool {
        kernel.close_snapshot(self)
    }
}

impl KernelHandle for RawProcess {
    fn is_valid(self) -> bool {
        is_live(self.0)
    }

    fn release_with<K: Kernel + ?Sized>(self, kernel: &K) -> bool {
        kernel.close_process(self)
    }
}

/// Owns one kernel handle and releases it exactly once.
///
/// Release happens on drop unless [`HandleGuard::release`] ran first. Invalid
/// handles are never passed to the kernel.
pub struct HandleGuard<'k, K: Kernel + ?Sized, H: KernelHandle> {
    kernel: &'k K,
    handle: H,
    released: bool,
}

impl<'k, K: Kernel + ?Sized, H: KernelHandle> HandleGuard<'k, K, H> {
    pub fn new(kernel: &'k K, handle: H) -> Self {
        Self {
            kernel,
            handle,
            released: false,
        }
    }

    /// The guarded handle. Only meaningful while the guard is alive.
    pub fn raw(&self) -> H {
        self.handle
    }

    pub fn is_valid(&self) -> bool {
        self.handle.is_valid()
    }

    pub fn kernel(&self) -> &'k K {
        self.kernel
    }

    /// Release now and report whether the kernel accepted it.
    pub fn release(mut self) -> bool {
        self.release_inner()
    }

    fn release_inner(&mut self) -> bool {
        if self.released {
            return true;
        }
        self.released = true;
        if !self.handle.is_valid() {
            return true;
        }
        let released = self.handle.release_with(self.kernel);
        if !released {
            error!("Kernel refused to release handle {:?}; handle leaked", self.handle);
        }
        released
    }
}

impl<K: Kernel + ?Sized, H: KernelHandle> Drop for HandleGuard<'_, K, H> {
    fn drop(&mut self) {
        self.release_inner();
    }
}

impl<K: Kernel + ?Sized, H: KernelHandle> fmt::Debug for HandleGuard<'_, K, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleGuard")
            .field("handle", &self.handle)
            .field("released", &self.released)
            .finish()
    }
}

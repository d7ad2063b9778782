/// Per-target buffer binding locks.
///
/// Binding a buffer and then uploading to (or drawing from) the binding
/// point is two device calls. Holding the target's lock across both keeps
/// another thread from rebinding in between. Lock order: buffer-target
/// locks (array before element) before the device lock.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::graphics_device::BufferTarget;

#[derive(Debug, Default)]
pub struct BufferSync {
    array: Mutex<()>,
    element: Mutex<()>,
}

impl BufferSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold `target` until the guard is dropped
    pub fn lock(&self, target: BufferTarget) -> MutexGuard<'_, ()> {
        let mutex = match target {
            BufferTarget::ArrayBuffer => &self.array,
            BufferTarget::ElementArrayBuffer => &self.element,
        };
        mutex.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

use std::{
    fmt,
    ptr::NonNull,
    sync::atomic::{
        fence, AtomicUsize,
        Ordering::{Acquire, Relaxed, Release},
    },
};

use crate::{slots::SlotKey, stats};

/// Erased cleanup action of an externally allocated object.
pub(crate) type Cleanup<T> = Box<dyn FnOnce(NonNull<T>)>;

/// Where the managed object lives relative to its block.
enum Storage<T: 'static>
{
    /// Object embedded in the block's own allocation.
    Inline(T),
    /// Externally allocated object plus the action that releases it.
    External
    {
        ptr: NonNull<T>,
        cleanup: Option<Cleanup<T>>,
    },
}

impl<T: 'static> Drop for Storage<T>
{
    fn drop(&mut self)
    {
        if let Storage::External { ptr, cleanup } = self {
            if let Some(cleanup) = cleanup.take() {
                cleanup(*ptr);
            }
        }
    }
}

/// Heap record shared by every handle to one object: the object's address,
/// its cleanup action, and the single atomic count of threads currently
/// holding at least one local reference.
///
/// The block is freed by exactly one thread, the one whose [`release`] drains
/// the count; the atomic decrement itself is the arbiter, there is no
/// separate is-it-zero read.
///
/// [`release`]: ControlBlock::release
pub(crate) struct ControlBlock<T: 'static>
{
    global: AtomicUsize,
    key: SlotKey,
    storage: Storage<T>,
}

impl<T: 'static> ControlBlock<T>
{
    /// Allocate a block embedding `value`, counted at one thread.
    pub(crate) fn with_data(value: T) -> NonNull<Self>
    {
        Self::install(Storage::Inline(value))
    }

    /// Allocate a block wrapping an externally allocated object, counted at
    /// one thread. `cleanup` runs exactly once, when the count drains.
    pub(crate) fn with_pointer(ptr: NonNull<T>, cleanup: Cleanup<T>) -> NonNull<Self>
    {
        Self::install(Storage::External {
            ptr,
            cleanup: Some(cleanup),
        })
    }

    fn install(storage: Storage<T>) -> NonNull<Self>
    {
        stats::block_allocated();
        unsafe {
            NonNull::new_unchecked(Box::into_raw(Box::new(ControlBlock {
                global: AtomicUsize::new(1),
                key: SlotKey::fresh(),
                storage,
            })))
        }
    }

    pub(crate) fn key(&self) -> SlotKey { self.key }

    pub(crate) fn data(&self) -> NonNull<T>
    {
        match &self.storage {
            Storage::Inline(value) => NonNull::from(value),
            Storage::External { ptr, .. } => *ptr,
        }
    }

    /// Count one more thread holding a local reference.
    pub(crate) fn retain(&self)
    {
        self.global.fetch_add(1, Relaxed);
    }

    /// Count one thread's references as drained. Returns whether the count
    /// reached zero; the caller observing `true` must [`free`] the block and
    /// is the only caller that may.
    ///
    /// [`free`]: ControlBlock::free
    pub(crate) fn release(&self) -> bool
    {
        if self.global.fetch_sub(1, Release) == 1 {
            fence(Acquire);
            true
        } else {
            false
        }
    }

    /// Snapshot of the thread count. Unordered with respect to concurrent
    /// retains and releases.
    pub(crate) fn global_count(&self) -> usize { self.global.load(Relaxed) }

    /// Destroy the managed object and the block.
    ///
    /// Safety: only the thread whose [`release`](ControlBlock::release)
    /// returned `true` may call this, exactly once.
    pub(crate) unsafe fn free(ptr: NonNull<Self>)
    {
        drop(Box::from_raw(ptr.as_ptr()));
        stats::block_freed();
    }
}

impl<T: 'static> fmt::Debug for ControlBlock<T>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("ControlBlock")
            .field("global", &self.global_count())
            .field("key", &self.key)
            .finish()
    }
}

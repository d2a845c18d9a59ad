use std::{fmt, mem, ops::Deref, ptr, ptr::NonNull};

use crate::{block::ControlBlock, slots};

/// Shared-ownership handle with biased reference counting.
///
/// Every thread keeps a private, non-atomic count of its own handles to an
/// object; the object's single atomic count tracks *threads*, not handles.
/// Cloning and dropping inside one thread therefore never touches the atomic.
/// It is paid exactly once when an object first appears in a thread (the
/// thread's local count goes 0 -> 1) and once when the thread's last handle
/// goes away (1 -> 0). The thread whose demotion drains the atomic count
/// frees the object.
///
/// A `Shared` is not `Send`: its bookkeeping lives in the table of the thread
/// that created it, so handles never migrate. Another thread takes ownership
/// by cloning through a shared reference, which is `Sync` whenever
/// `T: Send + Sync`:
///
/// ```
/// use std::sync::atomic::{AtomicI32, Ordering::Relaxed};
/// use biasptr::Shared;
///
/// let value = Shared::new(AtomicI32::new(1));
///
/// std::thread::scope(|s| {
///     s.spawn(|| {
///         let mine = value.clone(); // this thread's own handle
///         assert_eq!(mine.load(Relaxed), 1);
///         mine.store(42, Relaxed);
///     });
/// });
///
/// assert_eq!(value.load(Relaxed), 42);
/// ```
///
/// The handle guarantees the object's lifetime, nothing more; concurrent
/// access to the object itself goes through `T`'s own synchronization.
pub struct Shared<T: 'static>
{
    block: Option<NonNull<ControlBlock<T>>>,
}

// Shared references hand out &T and allow cloning from any thread; cloning
// creates the calling thread's own slot, and the last thread to let go may
// drop T there. Never Send: a handle's local count belongs to its thread.
unsafe impl<T: Send + Sync + 'static> Sync for Shared<T> {}

impl<T: 'static> Shared<T>
{
    /// Allocate `value` on the heap, embedded in its own control block, and
    /// return the first handle to it.
    pub fn new(value: T) -> Self { Self::adopt(ControlBlock::with_data(value)) }

    /// Take ownership of an already boxed object. The box's allocation is
    /// kept and released through the default cleanup when the last handle
    /// anywhere goes away.
    pub fn from_box(boxed: Box<T>) -> Self
    {
        let ptr = NonNull::from(Box::leak(boxed));
        Self::adopt(ControlBlock::with_pointer(
            ptr,
            Box::new(|ptr: NonNull<T>| unsafe { drop(Box::from_raw(ptr.as_ptr())) }),
        ))
    }

    /// Take ownership of an externally allocated object with a custom
    /// cleanup action. `cleanup` runs exactly once, on whichever thread drops
    /// the last handle.
    ///
    /// # Safety
    ///
    /// `ptr` must point to a live object not owned or freed by anything
    /// else, valid until `cleanup` runs, and `cleanup` must release it.
    pub unsafe fn from_raw_parts<F>(ptr: NonNull<T>, cleanup: F) -> Self
    where
        F: FnOnce(NonNull<T>) + 'static,
    {
        Self::adopt(ControlBlock::with_pointer(ptr, Box::new(cleanup)))
    }

    /// The empty handle: refers to nothing, costs nothing to copy or drop.
    pub const fn empty() -> Self { Shared { block: None } }

    // Fresh blocks are born counted at one thread, so the constructing
    // thread seeds its slot without a second promotion.
    fn adopt(block: NonNull<ControlBlock<T>>) -> Self
    {
        let created = slots::acquire(unsafe { block.as_ref() }.key());
        debug_assert!(created, "fresh slot key already counted in this thread");
        Shared { block: Some(block) }
    }

    fn inner(&self) -> Option<&ControlBlock<T>>
    {
        self.block.as_ref().map(|block| unsafe { block.as_ref() })
    }

    /// Whether this handle refers to nothing.
    pub fn is_empty(&self) -> bool { self.block.is_none() }

    /// Checked access to the managed object.
    pub fn get(&self) -> Option<&T>
    {
        self.inner().map(|block| unsafe { block.data().as_ref() })
    }

    /// Address of the managed object, null when empty.
    pub fn as_ptr(&self) -> *const T
    {
        self.inner().map_or(ptr::null(), |block| block.data().as_ptr())
    }

    /// Number of threads currently holding at least one handle to the
    /// object, zero when empty. A best-effort snapshot: unordered with
    /// respect to clones and drops on other threads, never a synchronization
    /// primitive.
    pub fn use_count(&self) -> usize
    {
        self.inner().map_or(0, |block| block.global_count())
    }

    /// Whether the calling thread is the only one holding handles, per the
    /// same snapshot as [`use_count`](Shared::use_count).
    pub fn unique(&self) -> bool { self.use_count() == 1 }

    /// The calling thread's own handle count for the object, zero when
    /// empty. Exact, since only this thread can change it.
    pub fn local_count(&self) -> usize
    {
        self.inner().map_or(0, |block| slots::count(block.key()))
    }

    /// Whether two handles refer to the same object.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool { a.block == b.block }

    /// Let go of the referent, leaving this handle empty. Frees the object
    /// if this was the last handle anywhere.
    pub fn release(&mut self)
    {
        *self = Shared::empty();
    }

    /// Replace the referent with a freshly allocated object, releasing the
    /// old one as in [`release`](Shared::release).
    pub fn reset(&mut self, value: T)
    {
        *self = Shared::new(value);
    }

    /// Exchange referents with another handle of this thread. No counts
    /// change hands.
    pub fn swap(&mut self, other: &mut Self)
    {
        mem::swap(self, other);
    }
}

impl<T: 'static> Clone for Shared<T>
{
    fn clone(&self) -> Self
    {
        if let Some(block) = self.inner() {
            if slots::acquire(block.key()) {
                block.retain();
            }
        }
        Shared { block: self.block }
    }

    // Same-referent assignment is a no-op beyond handle bookkeeping.
    fn clone_from(&mut self, source: &Self)
    {
        if !Shared::ptr_eq(self, source) {
            *self = source.clone();
        }
    }
}

impl<T: 'static> Drop for Shared<T>
{
    fn drop(&mut self)
    {
        if let Some(block) = self.block {
            let header = unsafe { block.as_ref() };
            if slots::release(header.key()) && header.release() {
                unsafe { ControlBlock::free(block) }
            }
        }
    }
}

impl<T: 'static> Deref for Shared<T>
{
    type Target = T;

    fn deref(&self) -> &T
    {
        match self.get() {
            Some(value) => value,
            None => panic!("dereferenced an empty Shared"),
        }
    }
}

impl<T: 'static> Default for Shared<T>
{
    fn default() -> Self { Shared::empty() }
}

impl<T: 'static> From<Box<T>> for Shared<T>
{
    fn from(boxed: Box<T>) -> Self { Shared::from_box(boxed) }
}

impl<T: 'static> fmt::Debug for Shared<T>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("Shared")
            .field("ptr", &self.as_ptr())
            .field("use_count", &self.use_count())
            .field("local_count", &self.local_count())
            .finish()
    }
}

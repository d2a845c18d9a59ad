use std::{cell::Cell, fmt, ops::Deref, ptr::NonNull};

use crate::stats;

struct PlainBlock<T: 'static>
{
    count: Cell<usize>,
    value: T,
}

/// Plain reference-counted handle: one shared non-atomic count, no bias.
///
/// Single-thread only (`!Send + !Sync` by construction). Exists as the
/// correctness and performance baseline the biased [`Shared`] is measured
/// against; it offers the same handle surface and nothing else.
///
/// [`Shared`]: crate::Shared
pub struct Plain<T: 'static>
{
    block: Option<NonNull<PlainBlock<T>>>,
}

impl<T: 'static> Plain<T>
{
    /// Allocate `value` next to its count and return the first handle.
    pub fn new(value: T) -> Self
    {
        stats::block_allocated();
        let block = unsafe {
            NonNull::new_unchecked(Box::into_raw(Box::new(PlainBlock {
                count: Cell::new(1),
                value,
            })))
        };
        Plain { block: Some(block) }
    }

    /// The empty handle.
    pub const fn empty() -> Self { Plain { block: None } }

    fn inner(&self) -> Option<&PlainBlock<T>>
    {
        self.block.as_ref().map(|block| unsafe { block.as_ref() })
    }

    /// Whether this handle refers to nothing.
    pub fn is_empty(&self) -> bool { self.block.is_none() }

    /// Checked access to the managed object.
    pub fn get(&self) -> Option<&T> { self.inner().map(|block| &block.value) }

    /// Number of live handles to the object, zero when empty.
    pub fn use_count(&self) -> usize
    {
        self.inner().map_or(0, |block| block.count.get())
    }

    /// Whether this is the only handle to the object.
    pub fn unique(&self) -> bool { self.use_count() == 1 }

    /// Whether two handles refer to the same object.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool { a.block == b.block }

    /// Let go of the referent, leaving this handle empty.
    pub fn release(&mut self)
    {
        *self = Plain::empty();
    }
}

impl<T: 'static> Clone for Plain<T>
{
    fn clone(&self) -> Self
    {
        if let Some(block) = self.inner() {
            block.count.set(block.count.get() + 1);
        }
        Plain { block: self.block }
    }
}

impl<T: 'static> Drop for Plain<T>
{
    fn drop(&mut self)
    {
        if let Some(block) = self.block {
            let remaining = {
                let header = unsafe { block.as_ref() };
                header.count.set(header.count.get() - 1);
                header.count.get()
            };
            if remaining == 0 {
                unsafe { drop(Box::from_raw(block.as_ptr())) };
                stats::block_freed();
            }
        }
    }
}

impl<T: 'static> Deref for Plain<T>
{
    type Target = T;

    fn deref(&self) -> &T
    {
        match self.get() {
            Some(value) => value,
            None => panic!("dereferenced an empty Plain"),
        }
    }
}

impl<T: 'static> Default for Plain<T>
{
    fn default() -> Self { Plain::empty() }
}

impl<T: 'static> fmt::Debug for Plain<T>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("Plain")
            .field("ptr", &self.block)
            .field("use_count", &self.use_count())
            .finish()
    }
}

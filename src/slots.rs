use std::{
    cell::RefCell,
    collections::{hash_map::Entry, HashMap},
    fmt,
    sync::atomic::{AtomicU64, Ordering::Relaxed},
};

/// Identity of a control block inside every thread's slot table.
///
/// Keys are drawn from a single process-wide counter and never reused, so a
/// stale table entry can never be confused with a different live block.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SlotKey(u64);

static NEXT_KEY: AtomicU64 = AtomicU64::new(1);

impl SlotKey
{
    pub(crate) fn fresh() -> Self { SlotKey(NEXT_KEY.fetch_add(1, Relaxed)) }
}

impl fmt::Debug for SlotKey
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_tuple("SlotKey").field(&self.0).finish()
    }
}

const INITIAL_SLOTS: usize = 64;

thread_local! {
    static SLOTS: RefCell<HashMap<SlotKey, usize>> =
        RefCell::new(HashMap::with_capacity(INITIAL_SLOTS));
}

/// Increment the calling thread's local count for `key`.
///
/// A missing slot is created seeded at zero before the increment. Returns
/// whether the slot was created, i.e. whether this was the thread's 0 -> 1
/// transition and the caller owes a global promotion.
pub(crate) fn acquire(key: SlotKey) -> bool
{
    SLOTS.with_borrow_mut(|slots| match slots.entry(key) {
        Entry::Occupied(mut entry) => {
            *entry.get_mut() += 1;
            false
        }
        Entry::Vacant(entry) => {
            entry.insert(1);
            true
        }
    })
}

/// Decrement the calling thread's local count for `key`.
///
/// The slot is removed when the count drains to zero. Returns whether it
/// drained, i.e. whether this was the thread's 1 -> 0 transition and the
/// caller owes a global demotion.
pub(crate) fn release(key: SlotKey) -> bool
{
    SLOTS.with_borrow_mut(|slots| {
        let Entry::Occupied(mut entry) = slots.entry(key) else {
            panic!("released a slot key with no local count in this thread");
        };
        *entry.get_mut() -= 1;
        if *entry.get() == 0 {
            entry.remove();
            true
        } else {
            false
        }
    })
}

/// The calling thread's local count for `key`, zero if it holds no slot.
pub(crate) fn count(key: SlotKey) -> usize
{
    SLOTS.with_borrow(|slots| slots.get(&key).copied().unwrap_or(0))
}

/// Number of distinct blocks the calling thread currently holds slots for.
pub(crate) fn live() -> usize { SLOTS.with_borrow(HashMap::len) }

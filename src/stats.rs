use std::sync::atomic::{AtomicUsize, Ordering::Relaxed};

use crate::slots;

/// Live allocation statistics, for diagnosing memory leaks and the like.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats
{
    /// Control blocks currently allocated, process-wide.
    pub live_blocks: usize,

    /// Distinct blocks the calling thread currently holds local counts for.
    pub thread_slots: usize,
}

static LIVE_BLOCKS: AtomicUsize = AtomicUsize::new(0);

pub(crate) fn block_allocated()
{
    LIVE_BLOCKS.fetch_add(1, Relaxed);
}

pub(crate) fn block_freed()
{
    LIVE_BLOCKS.fetch_sub(1, Relaxed);
}

/// Number of control blocks currently allocated, process-wide.
pub fn live_blocks() -> usize { LIVE_BLOCKS.load(Relaxed) }

/// Number of distinct blocks the calling thread holds local counts for.
pub fn thread_slots() -> usize { slots::live() }

/// Snapshot of both counters.
pub fn snapshot() -> Stats
{
    Stats {
        live_blocks: live_blocks(),
        thread_slots: thread_slots(),
    }
}

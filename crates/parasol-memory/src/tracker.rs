//! Lexically-scoped allocation tracker, mirroring `pf::MemTracker`: a
//! thread-local stack where the innermost active tracker receives
//! `record_alloc`/`record_free` calls, and leaving scope restores whichever
//! tracker (if any) was active before.

use std::cell::RefCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TrackerStats {
    pub total_alloc: usize,
    pub total_free: usize,
    pub total_size: usize,
}

impl TrackerStats {
    pub fn avg_size(&self) -> usize {
        if self.total_alloc == 0 {
            0
        } else {
            self.total_size / self.total_alloc
        }
    }
}

#[derive(Default)]
struct Counters {
    total_alloc: AtomicUsize,
    total_free: AtomicUsize,
    total_size: AtomicUsize,
}

thread_local! {
    static ACTIVE_TRACKER_STACK: RefCell<Vec<Arc<Counters>>> = const { RefCell::new(Vec::new()) };
}

/// Enters a new tracking scope on construction, pushing itself onto the
/// thread-local stack; restores the previous tracker (if any) on `Drop`.
pub struct AllocTracker {
    counters: Arc<Counters>,
}

impl AllocTracker {
    pub fn enter() -> Self {
        let counters = Arc::new(Counters::default());
        ACTIVE_TRACKER_STACK.with(|stack| stack.borrow_mut().push(counters.clone()));
        Self { counters }
    }

    pub fn stats(&self) -> TrackerStats {
        TrackerStats {
            total_alloc: self.counters.total_alloc.load(Ordering::Relaxed),
            total_free: self.counters.total_free.load(Ordering::Relaxed),
            total_size: self.counters.total_size.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.counters.total_alloc.store(0, Ordering::Relaxed);
        self.counters.total_free.store(0, Ordering::Relaxed);
        self.counters.total_size.store(0, Ordering::Relaxed);
    }

    /// Records an allocation against whichever tracker is innermost on the
    /// current thread's stack, if any.
    pub fn record_alloc(size: usize) {
        ACTIVE_TRACKER_STACK.with(|stack| {
            if let Some(top) = stack.borrow().last() {
                top.total_alloc.fetch_add(1, Ordering::Relaxed);
                top.total_size.fetch_add(size, Ordering::Relaxed);
            }
        });
    }

    /// Records a deallocation against whichever tracker is innermost.
    pub fn record_free() {
        ACTIVE_TRACKER_STACK.with(|stack| {
            if let Some(top) = stack.borrow().last() {
                top.total_free.fetch_add(1, Ordering::Relaxed);
            }
        });
    }
}

impl Drop for AllocTracker {
    fn drop(&mut self) {
        ACTIVE_TRACKER_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_trackers_only_see_their_own_scope() {
        let outer = AllocTracker::enter();
        AllocTracker::record_alloc(10);
        {
            let inner = AllocTracker::enter();
            AllocTracker::record_alloc(5);
            AllocTracker::record_free();
            let inner_stats = inner.stats();
            assert_eq!(inner_stats.total_alloc, 1);
            assert_eq!(inner_stats.total_size, 5);
            assert_eq!(inner_stats.total_free, 1);
        }
        AllocTracker::record_alloc(1);
        let outer_stats = outer.stats();
        assert_eq!(outer_stats.total_alloc, 2);
        assert_eq!(outer_stats.total_size, 11);
    }

    #[test]
    fn avg_size_handles_zero_allocations() {
        let stats = TrackerStats::default();
        assert_eq!(stats.avg_size(), 0);
    }
}

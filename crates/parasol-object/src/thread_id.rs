//! Maps the current OS thread to a small, process-unique, non-zero `u64`,
//! since the lock protocol stores `thread_id` as an atomic integer (`0`
//! meaning unowned) rather than the opaque `std::thread::ThreadId`.

use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};

thread_local! {
    static THIS_THREAD_ID: Cell<u64> = const { Cell::new(0) };
}

/// Returns this thread's id, assigning one on first use. Never returns 0.
pub fn current() -> u64 {
    THIS_THREAD_ID.with(|cell| {
        let existing = cell.get();
        if existing != 0 {
            return existing;
        }
        static NEXT: AtomicU64 = AtomicU64::new(1);
        let assigned = NEXT.fetch_add(1, Ordering::Relaxed);
        cell.set(assigned);
        assigned
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_is_stable_and_nonzero() {
        let a = current();
        let b = current();
        assert_eq!(a, b);
        assert_ne!(a, 0);
    }

    #[test]
    fn distinct_threads_get_distinct_ids() {
        let main_id = current();
        let spawned = std::thread::spawn(current).join().unwrap();
        assert_ne!(main_id, spawned);
    }
}

//! The object lock/queue protocol: atomic `queue`/`sleep_queue` counters plus
//! a reentrant same-thread fast path, exactly as described in the object
//! header's invariants. This is deliberately not a thin wrapper over
//! `parking_lot::Mutex` — the spec's contract (recursive same-thread
//! acquisition without a guard stack, `queue == 0` iff unlocked, waking
//! exactly one sleeper on release) is the behaviour under test, and a plain
//! mutex does not expose it.
//!
//! Because the protocol allows the *same* thread to hold the lock at nested
//! recursion depths simultaneously (one call dispatching into another
//! action on the same object), a guard here cannot hand out `&mut T` — two
//! live guards on one thread would alias. `T` is expected to use interior
//! mutability (`Cell`/`RefCell`/atomics) for anything mutated during
//! dispatch, the same convention `ObjectHeader::action_depth` already uses.

use parasol_errors::{Error, ErrorKind};
use parasol_types::ObjectHeader;
use parking_lot::{Condvar, Mutex};
use std::ops::Deref;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use crate::thread_id;

/// Pairs an [`ObjectHeader`]'s atomic counters with the condvar needed for
/// the slow (contended) path. Embedded in `ObjectCell` alongside the
/// subclass body.
pub struct ObjectLock<T> {
    header: ObjectHeader,
    wake: Condvar,
    wake_mutex: Mutex<()>,
    data: T,
}

/// `-1` signals "block indefinitely", matching the spec's `-1`/`0` timeout
/// convention for `AccessMemory`/lock waits.
pub const TIMEOUT_INDEFINITE: i64 = -1;
pub const TIMEOUT_PROBE: i64 = 0;

fn to_duration(millis: i64) -> Option<Duration> {
    if millis == TIMEOUT_INDEFINITE {
        None
    } else {
        Some(Duration::from_millis(millis.max(0) as u64))
    }
}

impl<T> ObjectLock<T> {
    pub fn new(header: ObjectHeader, data: T) -> Self {
        Self { header, wake: Condvar::new(), wake_mutex: Mutex::new(()), data }
    }

    pub fn header(&self) -> &ObjectHeader {
        &self.header
    }

    /// Attempts the fast path once: increment `queue`, and if this thread
    /// became (or already was) the owner, grant. Otherwise undo the
    /// increment and report contention.
    fn try_fast_acquire(&self) -> FastAcquire {
        let this_thread = thread_id::current();
        let new = self.header.queue.fetch_add(1, Ordering::AcqRel) + 1;
        if new == 1 {
            self.header.thread_id.store(this_thread, Ordering::Release);
            return FastAcquire::Granted;
        }
        if self.header.thread_id.load(Ordering::Acquire) == this_thread {
            return FastAcquire::Granted;
        }
        // Contended by another thread: undo our speculative increment.
        self.header.queue.fetch_sub(1, Ordering::AcqRel);
        FastAcquire::Contended
    }

    /// Acquires the object lock, blocking up to `timeout_millis` (`-1` =
    /// indefinite, `0` = non-blocking probe) on contention.
    pub fn lock(&self, timeout_millis: i64) -> Result<ObjectGuard<'_, T>, Error> {
        if let FastAcquire::Granted = self.try_fast_acquire() {
            return Ok(ObjectGuard { lock: self });
        }
        if timeout_millis == TIMEOUT_PROBE {
            return Err(Error::new(ErrorKind::TimeOut));
        }

        let deadline = to_duration(timeout_millis).map(|d| Instant::now() + d);
        self.header.sleep_queue.fetch_add(1, Ordering::AcqRel);
        // The fast-path recheck and the `wait`/`wait_for` call below must
        // happen inside one continuous hold of `wake_mutex`: `release()`
        // only notifies while holding that same mutex, so as long as this
        // thread never lets go of it between "predicate failed" and
        // "parked on the condvar", a release that lands in that window is
        // guaranteed to block on the mutex until this thread is parked,
        // rather than calling `notify_one()` with nobody listening yet.
        // Checking the predicate outside the mutex (as a separate step
        // before taking the lock) would reopen exactly that lost-wakeup
        // window.
        let result = loop {
            let mut guard = self.wake_mutex.lock();
            if let FastAcquire::Granted = self.try_fast_acquire() {
                break Ok(());
            }
            match deadline {
                None => {
                    self.wake.wait(&mut guard);
                }
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        break Err(Error::new(ErrorKind::TimeOut));
                    }
                    self.wake.wait_for(&mut guard, deadline - now);
                    // Whether this was a real notification, a spurious
                    // wakeup, or a timeout, the next loop iteration
                    // rechecks the fast path (under the mutex) and, if
                    // still contended, re-evaluates the deadline above.
                }
            }
        };
        self.header.sleep_queue.fetch_sub(1, Ordering::AcqRel);
        result.map(|()| ObjectGuard { lock: self })
    }

    /// Releases one level of the recursive lock. If `sleep_queue == 0` this
    /// is a lightweight `fetch_sub`; otherwise it wakes one sleeper so it can
    /// retry the fast path.
    ///
    /// `thread_id` is cleared *before* `queue` is decremented, not after:
    /// clearing it afterwards leaves a window, between the decrement landing
    /// on zero and the clear running, where a different thread's
    /// `try_fast_acquire` can see `queue` hit zero, become the new owner, and
    /// publish its own `thread_id` — only for this thread's subsequent
    /// unconditional `store(0)` to clobber that brand-new owner back to
    /// `thread_id == 0` while `queue > 0`, breaking the header invariant and
    /// making the new owner's own reentrant check against `thread_id` fail.
    /// Clearing first instead, then deciding from the post-decrement queue
    /// count alone whether this was the final level, means the only write
    /// this thread ever makes after the decrement is restoring its own id
    /// when it still holds the lock recursively — never overwriting another
    /// thread's ownership.
    fn release(&self) {
        self.header.thread_id.store(0, Ordering::Release);
        let remaining = self.header.queue.fetch_sub(1, Ordering::AcqRel) - 1;
        if remaining > 0 {
            // Still held by this thread at a shallower recursion depth.
            self.header.thread_id.store(thread_id::current(), Ordering::Release);
        }
        if self.header.sleep_queue.load(Ordering::Acquire) > 0 {
            let _guard = self.wake_mutex.lock();
            self.wake.notify_one();
        }
    }
}

// SAFETY: `ObjectLock::lock` only ever grants access to a thread that either
// just became the sole owner (`queue` went 0→1) or already holds `thread_id`
// (reentrant same-thread recursion). No other thread can observe a granted
// guard concurrently — contenders spin on the atomic fast path or block on
// the condvar until release — so sharing `&ObjectLock<T>` across threads
// never produces a genuine data race on `data`, even though `T` itself (e.g.
// `Cell<u32>`) is not `Sync` in isolation. This is the same externally-
// synchronized pattern `parking_lot`'s own primitives rely on internally.
unsafe impl<T: Send> Sync for ObjectLock<T> {}

enum FastAcquire {
    Granted,
    Contended,
}

/// Held while the object lock is acquired. `Drop` releases exactly one
/// recursion level, matching one prior `lock()` call.
pub struct ObjectGuard<'a, T> {
    lock: &'a ObjectLock<T>,
}

impl<'a, T> Deref for ObjectGuard<'a, T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.lock.data
    }
}

impl<'a, T> Drop for ObjectGuard<'a, T> {
    fn drop(&mut self) {
        self.lock.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parasol_types::{ClassId, ObjectId, TaskId};
    use std::cell::Cell;
    use std::sync::Arc;
    use std::thread;

    fn make_lock(data: Cell<u32>) -> ObjectLock<Cell<u32>> {
        let header = ObjectHeader::new(ClassId(1), ClassId(0), ObjectId(1), TaskId(1));
        ObjectLock::new(header, data)
    }

    #[test]
    fn uncontended_lock_grants_immediately() {
        let lock = make_lock(Cell::new(0));
        let guard = lock.lock(TIMEOUT_INDEFINITE).unwrap();
        assert_eq!(lock.header().queue.load(Ordering::SeqCst), 1);
        drop(guard);
        assert_eq!(lock.header().queue.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn same_thread_reentrant_lock_nests() {
        let lock = make_lock(Cell::new(0));
        let outer = lock.lock(TIMEOUT_INDEFINITE).unwrap();
        let inner = lock.lock(TIMEOUT_INDEFINITE).unwrap();
        assert_eq!(lock.header().queue.load(Ordering::SeqCst), 2);
        drop(inner);
        assert_eq!(lock.header().queue.load(Ordering::SeqCst), 1);
        drop(outer);
        assert_eq!(lock.header().queue.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn probe_timeout_fails_fast_when_contended() {
        let lock = Arc::new(make_lock(Cell::new(0)));
        let held = lock.lock(TIMEOUT_INDEFINITE).unwrap();
        let other = Arc::clone(&lock);
        let result = thread::spawn(move || other.lock(TIMEOUT_PROBE).is_err())
            .join()
            .unwrap();
        assert!(result);
        drop(held);
    }

    #[test]
    fn contended_lock_is_granted_after_release() {
        let lock = Arc::new(make_lock(Cell::new(0)));
        let held = lock.lock(TIMEOUT_INDEFINITE).unwrap();
        let other = Arc::clone(&lock);
        let handle = thread::spawn(move || {
            let _g = other.lock(TIMEOUT_INDEFINITE).unwrap();
        });
        thread::sleep(Duration::from_millis(20));
        drop(held);
        handle.join().unwrap();
        assert_eq!(lock.header().queue.load(Ordering::SeqCst), 0);
    }

    /// `spec.md` §8 scenario 6: "Two threads each acquire/release the same
    /// object 1000 times with a 30 s timeout; zero timeouts, zero
    /// corruption, `action_depth` observed as ≤1 throughout." No `sleep`
    /// is inserted anywhere here, so contention between the two threads is
    /// racing on its own — the precise scenario a lost wakeup would hang
    /// (until the 30 s timeout expired) rather than complete quickly.
    #[test]
    fn two_threads_hammer_the_lock_a_thousand_times_without_timing_out() {
        const ITERATIONS: u32 = 1000;
        const TIMEOUT_MILLIS: i64 = 30_000;

        let lock = Arc::new(make_lock(Cell::new(0)));
        let spawn_hammer = |lock: Arc<ObjectLock<Cell<u32>>>| {
            thread::spawn(move || {
                for _ in 0..ITERATIONS {
                    let guard = lock.lock(TIMEOUT_MILLIS).expect("must not time out");
                    let before = guard.get();
                    guard.set(before + 1);
                    assert_eq!(lock.header().queue.load(Ordering::SeqCst), 1);
                    drop(guard);
                }
            })
        };

        let t1 = spawn_hammer(Arc::clone(&lock));
        let t2 = spawn_hammer(Arc::clone(&lock));
        t1.join().unwrap();
        t2.join().unwrap();

        assert_eq!(lock.lock(TIMEOUT_PROBE).unwrap().get(), ITERATIONS * 2);
        assert_eq!(lock.header().queue.load(Ordering::SeqCst), 1);
    }
}

//! `Ledger` is the process-wide table of tracked allocations. It hands out
//! [`MemoryId`]s and enforces the access/release discipline the spec
//! describes for `AccessMemory`/`ReleaseMemory`.

use crate::tracker::AllocTracker;
use parasol_errors::{err, Error, ErrorKind, Status};
use parasol_types::{AccessMode, MemoryFlags, MemoryId, MemoryRecord, ObjectId};
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// `-1` / `0` timeout convention shared with the object lock protocol
/// (`parasol_object::lock::{TIMEOUT_INDEFINITE, TIMEOUT_PROBE}`), repeated
/// here rather than imported to avoid a dependency from `parasol-memory`
/// onto `parasol-object`.
pub const TIMEOUT_INDEFINITE: i64 = -1;
pub const TIMEOUT_PROBE: i64 = 0;

fn to_duration(millis: i64) -> Option<Duration> {
    if millis == TIMEOUT_INDEFINITE {
        None
    } else {
        Some(Duration::from_millis(millis.max(0) as u64))
    }
}

struct Slot {
    record: MemoryRecord,
    bytes: Box<[u8]>,
    /// Set while an `Exclusive` accessor holds this slot; gates further
    /// access of any mode until it is released.
    exclusive_held: bool,
}

/// A `parking_lot::Mutex`-guarded table of tracked allocations, keyed by
/// [`MemoryId`]. Mirrors `pf::MemTracker`'s bookkeeping role but for the
/// kernel's own `AllocMemory`/`FreeResource`/`AccessMemory` family rather
/// than raw `malloc`/`free`.
#[derive(Default)]
pub struct Ledger {
    slots: Mutex<HashMap<MemoryId, Slot>>,
    /// Signalled whenever a slot's `refs`/`exclusive_held` state changes,
    /// so a blocked `Exclusive` (or `ReadOnly`/`ReadWrite` against an
    /// exclusive holder) access can retry.
    wake: Condvar,
    next_id: AtomicU32,
}

impl Ledger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { slots: Mutex::new(HashMap::new()), wake: Condvar::new(), next_id: AtomicU32::new(1) })
    }

    /// `AllocMemory(size, flags, owner) -> memory_id`.
    pub fn alloc(&self, size: usize, flags: MemoryFlags, owner: ObjectId) -> MemoryId {
        let id = MemoryId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let bytes = vec![0u8; size].into_boxed_slice();
        let record = MemoryRecord::new(id, size, owner, flags);
        self.slots.lock().insert(id, Slot { record, bytes, exclusive_held: false });
        AllocTracker::record_alloc(size);
        id
    }

    /// `FreeResource(id)`. Fails with `MemoryDoesNotExist` if the ID is
    /// stale, and with `InUse` while outstanding `refs` remain.
    pub fn free(&self, id: MemoryId) -> Status {
        let mut slots = self.slots.lock();
        match slots.get(&id) {
            None => err(ErrorKind::MemoryDoesNotExist),
            Some(slot) if slot.record.refs > 0 => err(ErrorKind::InUse),
            Some(_) => {
                slots.remove(&id);
                drop(slots);
                AllocTracker::record_free();
                Ok(())
            }
        }
    }

    pub fn size_of(&self, id: MemoryId) -> Option<usize> {
        self.slots.lock().get(&id).map(|s| s.record.size)
    }

    /// Releases every tracked allocation whose `MemoryRecord::owner` is
    /// `owner`, per spec.md §4.3 ("releases all tracked memory allocations
    /// whose owner is this object"). Called from `Registry::run_free` once
    /// an object's free action has run. Allocations still referenced
    /// (`refs > 0`) are left in place, same as a direct `free` call would.
    pub fn free_by_owner(&self, owner: ObjectId) {
        let mut slots = self.slots.lock();
        let stale: Vec<MemoryId> =
            slots.iter().filter(|(_, s)| s.record.owner == owner && s.record.refs == 0).map(|(id, _)| *id).collect();
        for id in stale {
            slots.remove(&id);
            AllocTracker::record_free();
        }
    }

    /// Count of tracked allocations still outstanding, for the backstage
    /// inspection endpoint.
    pub fn outstanding_count(&self) -> usize {
        self.slots.lock().len()
    }

    /// `AccessMemory(id, mode, timeout)`: returns a scoped guard that
    /// releases on `Drop`, mirroring `parasol::ScopedAccessMemory`.
    /// `ReadOnly`/`ReadWrite` accesses may share a slot concurrently;
    /// `Exclusive` blocks (up to `timeout_millis`, `-1` = indefinite, `0` =
    /// non-blocking probe) until no other accessor of any mode holds it,
    /// and no further access of any mode is granted while it is held.
    pub fn access(self: &Arc<Self>, id: MemoryId, mode: AccessMode, timeout_millis: i64) -> Result<MemoryAccess, Error> {
        let deadline = to_duration(timeout_millis).map(|d| Instant::now() + d);
        let mut slots = self.slots.lock();
        loop {
            if !slots.contains_key(&id) {
                return Err(Error::new(ErrorKind::MemoryDoesNotExist));
            }
            let slot = slots.get(&id).unwrap();
            let granted = match mode {
                AccessMode::Exclusive => slot.record.refs == 0,
                AccessMode::ReadOnly | AccessMode::ReadWrite => !slot.exclusive_held,
            };
            if granted {
                let slot = slots.get_mut(&id).unwrap();
                slot.record.refs += 1;
                if mode == AccessMode::Exclusive {
                    slot.exclusive_held = true;
                }
                drop(slots);
                return Ok(MemoryAccess { ledger: self.clone(), id, mode });
            }

            if timeout_millis == TIMEOUT_PROBE {
                return Err(Error::new(ErrorKind::TimeOut));
            }
            match deadline {
                None => self.wake.wait(&mut slots),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(Error::new(ErrorKind::TimeOut));
                    }
                    self.wake.wait_for(&mut slots, deadline - now);
                }
            }
        }
    }
}

/// Scoped access guard returned by [`Ledger::access`]. `Deref`/`DerefMut`
/// expose the underlying bytes; dropping releases the borrow, mirroring
/// `parasol::ScopedAccessMemory::~ScopedAccessMemory`.
pub struct MemoryAccess {
    ledger: Arc<Ledger>,
    id: MemoryId,
    mode: AccessMode,
}

impl Deref for MemoryAccess {
    type Target = [u8];
    fn deref(&self) -> &[u8] {
        let slots = self.ledger.slots.lock();
        let slot = slots.get(&self.id).expect("memory freed while accessed");
        // SAFETY: the slot is not removed while `refs > 0`, and this guard
        // holds one of those refs, so the backing box outlives the borrow.
        unsafe { std::slice::from_raw_parts(slot.bytes.as_ptr(), slot.bytes.len()) }
    }
}

impl DerefMut for MemoryAccess {
    fn deref_mut(&mut self) -> &mut [u8] {
        assert_ne!(self.mode, AccessMode::ReadOnly, "write through a read-only AccessMemory guard");
        let mut slots = self.ledger.slots.lock();
        let slot = slots.get_mut(&self.id).expect("memory freed while accessed");
        unsafe { std::slice::from_raw_parts_mut(slot.bytes.as_mut_ptr(), slot.bytes.len()) }
    }
}

impl Drop for MemoryAccess {
    fn drop(&mut self) {
        {
            let mut slots = self.ledger.slots.lock();
            if let Some(slot) = slots.get_mut(&self.id) {
                slot.record.refs = slot.record.refs.saturating_sub(1);
                if self.mode == AccessMode::Exclusive {
                    slot.exclusive_held = false;
                }
            }
        }
        self.ledger.wake.notify_all();
    }
}

/// Unconditionally frees a memory ID when dropped, mirroring
/// `parasol::GuardedResource`. Unlike [`MemoryAccess`] it does not borrow the
/// bytes; it simply guarantees release.
pub struct GuardedAlloc {
    ledger: Arc<Ledger>,
    id: MemoryId,
    released: bool,
}

impl GuardedAlloc {
    pub fn new(ledger: Arc<Ledger>, id: MemoryId) -> Self {
        Self { ledger, id, released: false }
    }

    pub fn id(&self) -> MemoryId {
        self.id
    }

    /// Release early; the `Drop` impl becomes a no-op afterwards.
    pub fn release(&mut self) -> Status {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.ledger.free(self.id)
    }
}

impl Drop for GuardedAlloc {
    fn drop(&mut self) {
        if !self.released {
            let _ = self.ledger.free(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_then_free_round_trips() {
        let ledger = Ledger::new();
        let id = ledger.alloc(16, MemoryFlags::DATA, ObjectId::NONE);
        assert_eq!(ledger.size_of(id), Some(16));
        assert!(ledger.free(id).is_ok());
        assert_eq!(ledger.size_of(id), None);
    }

    #[test]
    fn free_while_accessed_fails_with_in_use() {
        let ledger = Ledger::new();
        let id = ledger.alloc(4, MemoryFlags::DATA, ObjectId::NONE);
        let guard = ledger.access(id, AccessMode::ReadWrite, TIMEOUT_INDEFINITE).unwrap();
        assert_eq!(ledger.free(id).unwrap_err().kind, ErrorKind::InUse);
        drop(guard);
        assert!(ledger.free(id).is_ok());
    }

    #[test]
    fn concurrent_read_only_accessors_are_both_granted() {
        let ledger = Ledger::new();
        let id = ledger.alloc(4, MemoryFlags::DATA, ObjectId::NONE);
        let a = ledger.access(id, AccessMode::ReadOnly, TIMEOUT_PROBE).unwrap();
        let b = ledger.access(id, AccessMode::ReadOnly, TIMEOUT_PROBE).unwrap();
        drop(a);
        drop(b);
    }

    #[test]
    fn exclusive_access_blocks_a_concurrent_read_only_probe() {
        let ledger = Ledger::new();
        let id = ledger.alloc(4, MemoryFlags::DATA, ObjectId::NONE);
        let exclusive = ledger.access(id, AccessMode::Exclusive, TIMEOUT_INDEFINITE).unwrap();
        assert_eq!(
            ledger.access(id, AccessMode::ReadOnly, TIMEOUT_PROBE).unwrap_err().kind,
            ErrorKind::TimeOut
        );
        drop(exclusive);
        assert!(ledger.access(id, AccessMode::ReadOnly, TIMEOUT_PROBE).is_ok());
    }

    #[test]
    fn exclusive_access_is_granted_once_a_reader_releases() {
        use std::thread;
        use std::time::Duration;

        let ledger = Ledger::new();
        let id = ledger.alloc(4, MemoryFlags::DATA, ObjectId::NONE);
        let reader = ledger.access(id, AccessMode::ReadOnly, TIMEOUT_INDEFINITE).unwrap();

        let waiting_ledger = ledger.clone();
        let handle = thread::spawn(move || waiting_ledger.access(id, AccessMode::Exclusive, 30_000).is_ok());
        thread::sleep(Duration::from_millis(20));
        drop(reader);
        assert!(handle.join().unwrap());
    }

    #[test]
    fn guarded_alloc_frees_on_drop() {
        let ledger = Ledger::new();
        let id = ledger.alloc(4, MemoryFlags::DATA, ObjectId::NONE);
        {
            let _guard = GuardedAlloc::new(ledger.clone(), id);
        }
        assert_eq!(ledger.size_of(id), None);
    }

    #[test]
    fn free_unknown_id_fails() {
        let ledger = Ledger::new();
        assert_eq!(ledger.free(MemoryId(9999)).unwrap_err().kind, ErrorKind::MemoryDoesNotExist);
    }
}

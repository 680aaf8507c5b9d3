//! A small, fixed-size array of named system locks used for cross-subsystem
//! critical sections (class registry updates, module registration, and the
//! like), mirroring `SysLock`/`SysUnlock`/`parasol::ScopedSysLock`.

use parasol_errors::{Error, ErrorKind};
use parking_lot::Mutex;

/// Index into the fixed system-lock table. Kept small and named rather than
/// an arbitrary integer so call sites document what they are protecting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum SysLockId {
    ClassRegistry = 0,
    ModuleRegistry = 1,
    ObjectIdTable = 2,
    MemoryLedger = 3,
    TaskTable = 4,
}

const SYS_LOCK_COUNT: usize = 5;

/// Process-wide table of named mutexes. One instance lives for the life of
/// the kernel (owned by `parasol_runtime::Core`).
pub struct SysLocks {
    locks: [Mutex<()>; SYS_LOCK_COUNT],
}

impl Default for SysLocks {
    fn default() -> Self {
        Self { locks: std::array::from_fn(|_| Mutex::new(())) }
    }
}

impl SysLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// `SysLock(index, timeout)`. Only indefinite blocking and non-blocking
    /// probes are supported; a real millisecond timeout would require a
    /// lock type that exposes `try_lock_for`, which `parking_lot::Mutex`
    /// without the `arc_lock`/`deadlock_detection` timed API does not need
    /// here since system locks are held only briefly.
    pub fn lock(&self, id: SysLockId, probe_only: bool) -> Result<SysLockGuard<'_>, Error> {
        let mutex = &self.locks[id as usize];
        let guard = if probe_only {
            mutex.try_lock().ok_or(Error::new(ErrorKind::TimeOut))?
        } else {
            mutex.lock()
        };
        Ok(SysLockGuard { _guard: guard })
    }
}

/// Releases the system lock on drop, mirroring `parasol::ScopedSysLock`.
pub struct SysLockGuard<'a> {
    _guard: parking_lot::MutexGuard<'a, ()>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_then_probe_fails_until_released() {
        let locks = SysLocks::new();
        let held = locks.lock(SysLockId::ClassRegistry, false).unwrap();
        assert!(locks.lock(SysLockId::ClassRegistry, true).is_err());
        drop(held);
        assert!(locks.lock(SysLockId::ClassRegistry, true).is_ok());
    }

    #[test]
    fn distinct_locks_do_not_contend() {
        let locks = SysLocks::new();
        let _a = locks.lock(SysLockId::ClassRegistry, false).unwrap();
        assert!(locks.lock(SysLockId::ModuleRegistry, true).is_ok());
    }
}

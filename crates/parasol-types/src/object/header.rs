//! The uniform object header every kernel object carries, per `spec.md` §3.

use crate::ids::{ClassId, ObjectId, TaskId};
use facet::Facet;
use std::cell::Cell;
use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ObjectFlags: u32 {
        const INITIALISED = 1 << 0;
        const INTEGRAL = 1 << 1;
        const FREE_PENDING = 1 << 2;
        const UNTRACKED = 1 << 3;
    }
}

/// Allocation-policy hint for memory owned by this object.
bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct MemFlags: u32 {
        const DATA = 1 << 0;
        const MANAGE = 1 << 1;
        const NO_CLEAR = 1 << 2;
        const PUBLIC = 1 << 3;
    }
}

/// The fields every object begins with. `thread_id`, `queue`, and
/// `sleep_queue` are atomic so the lock/queue protocol in
/// `parasol_object::lock` can operate on them from any thread without
/// first taking a lock on the containing structure; `action_depth` is a
/// plain `Cell` since the spec's invariant restricts it to the owning
/// thread.
#[derive(Debug)]
pub struct ObjectHeader {
    pub class_id: ClassId,
    pub sub_id: ClassId,
    pub unique_id: ObjectId,
    pub owner_id: ObjectId,
    pub flags: Cell<ObjectFlags>,
    pub mem_flags: MemFlags,
    pub task_id: TaskId,

    /// Thread currently holding the object lock, or 0.
    pub thread_id: AtomicU64,
    /// Recursive lock depth; `== 0` iff unlocked.
    pub queue: AtomicI32,
    /// Count of threads blocked waiting for this object's lock.
    pub sleep_queue: AtomicI32,
    /// Reentrant action nesting count, owning-thread-only.
    pub action_depth: Cell<u32>,
}

impl ObjectHeader {
    pub fn new(class_id: ClassId, sub_id: ClassId, unique_id: ObjectId, task_id: TaskId) -> Self {
        Self {
            class_id,
            sub_id,
            unique_id,
            owner_id: ObjectId::NONE,
            flags: Cell::new(ObjectFlags::empty()),
            mem_flags: MemFlags::empty(),
            task_id,
            thread_id: AtomicU64::new(0),
            queue: AtomicI32::new(0),
            sleep_queue: AtomicI32::new(0),
            action_depth: Cell::new(0),
        }
    }

    pub fn is_initialised(&self) -> bool {
        self.flags.get().contains(ObjectFlags::INITIALISED)
    }

    pub fn is_free_pending(&self) -> bool {
        self.flags.get().contains(ObjectFlags::FREE_PENDING)
    }

    /// A plain-data reflection view of this header, per `spec.md` §4.5's
    /// reflection requirement. `ObjectHeader` itself cannot derive `Facet`
    /// directly — `thread_id`/`queue`/`sleep_queue` are atomics and
    /// `action_depth`/`flags` sit behind `Cell`, none of which are
    /// reflectable shapes — so this snapshot copies out their current
    /// values instead, the same role the teacher's `*Attrs` structs play
    /// next to a live, interior-mutable `*Info` struct (e.g.
    /// `peeps::sync::semaphore::{SemaphoreAttrs, SemaphoreInfo}`).
    pub fn snapshot(&self) -> ObjectHeaderSnapshot {
        ObjectHeaderSnapshot {
            class_id: self.class_id,
            sub_id: self.sub_id,
            unique_id: self.unique_id,
            owner_id: self.owner_id,
            flags_bits: self.flags.get().bits(),
            mem_flags_bits: self.mem_flags.bits(),
            task_id: self.task_id,
            thread_id: self.thread_id.load(Ordering::Acquire),
            queue: self.queue.load(Ordering::Acquire),
            sleep_queue: self.sleep_queue.load(Ordering::Acquire),
            action_depth: self.action_depth.get(),
        }
    }
}

/// `Facet`-derived reflection view of an [`ObjectHeader`] at a point in
/// time, the object-header half of `spec.md` §4.5's reflection requirement.
#[derive(Facet, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ObjectHeaderSnapshot {
    pub class_id: ClassId,
    pub sub_id: ClassId,
    pub unique_id: ObjectId,
    pub owner_id: ObjectId,
    pub flags_bits: u32,
    pub mem_flags_bits: u32,
    pub task_id: TaskId,
    pub thread_id: u64,
    pub queue: i32,
    pub sleep_queue: i32,
    pub action_depth: u32,
}

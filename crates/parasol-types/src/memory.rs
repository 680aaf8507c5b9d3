//! The memory record tracked by the ledger (`parasol-memory`).

use crate::ids::{MemoryId, ObjectId};
use facet::Facet;

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct MemoryFlags: u32 {
        const DATA = 1 << 0;
        const MANAGE = 1 << 1;
        const NO_CLEAR = 1 << 2;
        const PUBLIC = 1 << 3;
    }
}

/// `AccessMemory(id, mode, timeout)`'s access mode, per `spec.md` §4.2.
/// `ReadOnly`/`ReadWrite` accessors may share a block concurrently;
/// `Exclusive` requires no other accessor (of any mode) be holding it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AccessMode {
    ReadOnly,
    ReadWrite,
    Exclusive,
}

/// Bookkeeping entry for one tracked allocation. The ledger owns the actual
/// bytes (a boxed slice); this record is the metadata the spec describes.
#[derive(Debug)]
pub struct MemoryRecord {
    pub id: MemoryId,
    pub size: usize,
    pub owner: ObjectId,
    pub flags: MemoryFlags,
    /// Outstanding `AccessMemory` borrows; a release obligation decrements
    /// this on `Drop`.
    pub refs: u32,
}

impl MemoryRecord {
    pub fn new(id: MemoryId, size: usize, owner: ObjectId, flags: MemoryFlags) -> Self {
        Self { id, size, owner, flags, refs: 0 }
    }

    /// A plain-data reflection view of this record. `MemoryFlags` is a
    /// `bitflags`-generated type (no `Facet` impl of its own, matching the
    /// teacher's corpus, which never derives `Facet` alongside `bitflags`),
    /// so the snapshot carries its raw bit pattern instead.
    pub fn snapshot(&self) -> MemoryRecordSnapshot {
        MemoryRecordSnapshot {
            id: self.id,
            size: self.size,
            owner: self.owner,
            flags_bits: self.flags.bits(),
            refs: self.refs,
        }
    }
}

/// `Facet`-derived reflection view of a [`MemoryRecord`], the allocation
/// half of `spec.md` §4.5's reflection requirement.
#[derive(Facet, Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryRecordSnapshot {
    pub id: MemoryId,
    pub size: usize,
    pub owner: ObjectId,
    pub flags_bits: u32,
    pub refs: u32,
}

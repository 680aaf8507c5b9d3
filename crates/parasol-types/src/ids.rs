//! Process-unique identifiers. All are small `Copy` newtypes over integers;
//! none of them carry lifetime or ownership semantics on their own.

use facet::Facet;
use std::sync::atomic::{AtomicI32, Ordering};

/// A process-unique object identifier, assigned on creation and never reused
/// while the object is live.
#[derive(Facet, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[facet(transparent)]
pub struct ObjectId(pub i32);

impl ObjectId {
    pub const NONE: ObjectId = ObjectId(0);

    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

/// Issues process-unique, never-reused [`ObjectId`]s.
pub fn next_object_id() -> ObjectId {
    static NEXT: AtomicI32 = AtomicI32::new(1);
    ObjectId(NEXT.fetch_add(1, Ordering::Relaxed))
}

/// A 32-bit handle into the memory ledger; opaque to everything except
/// `parasol_memory::Ledger`.
#[derive(Facet, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[facet(transparent)]
pub struct MemoryId(pub u32);

/// Identifies the process (task) that owns an object or a message queue.
#[derive(Facet, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[facet(transparent)]
pub struct TaskId(pub u32);

/// Hashed base/sub class identifier, computed the same way field names are
/// hashed (case-insensitive, leading-upper-run collapsed).
#[derive(Facet, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[facet(transparent)]
pub struct ClassId(pub u32);

impl ClassId {
    pub fn from_name(name: &str) -> Self {
        Self(crate::object::class::hash_field_name(name))
    }
}

/// Non-negative action identifier; the kernel's closed action set lives in
/// [`crate::ACTION_TABLE`].
#[derive(Facet, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[facet(transparent)]
pub struct ActionId(pub i32);

/// Negative method identifier; distinguishes class-specific methods from
/// [`ActionId`]s at the dispatch site (methods are always < 0).
#[derive(Facet, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[facet(transparent)]
pub struct MethodId(pub i32);

impl MethodId {
    pub fn is_valid(self) -> bool {
        self.0 < 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_ids_are_monotonic_and_nonzero() {
        let a = next_object_id();
        let b = next_object_id();
        assert!(a.0 > 0 && b.0 > a.0);
    }

    #[test]
    fn method_ids_must_be_negative() {
        assert!(MethodId(-1).is_valid());
        assert!(!MethodId(0).is_valid());
    }
}

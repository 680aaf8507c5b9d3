//! Shared value and class-metadata types used by every layer of the kernel:
//! the object header, class metadata, field descriptors, the action table,
//! memory records, messages and FD watches, and the tagged [`Variant`] value
//! carrier. Nothing in this crate owns a lock or a thread; it is pure data.

pub mod ids;
pub mod memory;
pub mod message;
pub mod object;
pub mod variant;

pub use ids::{ActionId, ClassId, MemoryId, MethodId, ObjectId, TaskId};
pub use memory::{AccessMode, MemoryFlags, MemoryRecord, MemoryRecordSnapshot};
pub use message::{FdDirection, FdFlags, FdWatch, Message, RawFdLike};
pub use object::class::{
    ActionEntry, ActionHandler, ActionName, ClassMetadata, ClassSnapshot, FieldDescriptor, FieldFlags,
    FieldSnapshot, FieldType, MethodEntry, hash_field_name, ACTION_TABLE,
};
pub use object::header::{MemFlags, ObjectFlags, ObjectHeader, ObjectHeaderSnapshot};
pub use variant::Variant;

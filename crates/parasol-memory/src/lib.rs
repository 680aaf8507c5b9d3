//! The memory ledger: tagged allocations with explicit release, scoped
//! lifetime guards mirroring `parasol::ScopedAccessMemory` /
//! `parasol::GuardedResource` / `parasol::SwitchContext`, and a
//! lexically-scoped allocation tracker mirroring `pf::MemTracker`.

pub mod context;
pub mod ledger;
pub mod tracker;

pub use context::ContextGuard;
pub use ledger::{GuardedAlloc, Ledger, MemoryAccess};
pub use tracker::{AllocTracker, TrackerStats};

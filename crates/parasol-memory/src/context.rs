//! Thread-local "current object" context, mirroring `parasol::SwitchContext`.

use parasol_types::ObjectId;
use std::cell::Cell;

thread_local! {
    static CURRENT_CONTEXT: Cell<ObjectId> = const { Cell::new(ObjectId::NONE) };
}

/// Returns the object currently in scope for this thread, or `ObjectId::NONE`
/// if nothing has set a context yet.
pub fn current_context() -> ObjectId {
    CURRENT_CONTEXT.with(|c| c.get())
}

fn set_context(new: ObjectId) -> ObjectId {
    CURRENT_CONTEXT.with(|c| c.replace(new))
}

/// Swaps the thread-local current-object context on construction, restores
/// the previous value on `Drop`. Mirrors `parasol::SwitchContext`.
pub struct ContextGuard {
    previous: ObjectId,
}

impl ContextGuard {
    pub fn enter(new_context: ObjectId) -> Self {
        let previous = set_context(new_context);
        Self { previous }
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        set_context(self.previous);
    }
}

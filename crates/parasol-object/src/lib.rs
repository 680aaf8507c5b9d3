//! Object model, lock/queue protocol, field dispatch, and system locks —
//! everything `spec.md` §4.3–§4.5 describes sitting directly on top of the
//! header and class metadata in `parasol-types`.

pub mod field;
pub mod lock;
pub mod object;
pub mod syslock;
pub mod thread_id;

pub use field::{get_field, set_field};
pub use lock::{ObjectGuard, ObjectLock, TIMEOUT_INDEFINITE, TIMEOUT_PROBE};
pub use object::{ObjectBody, ObjectCell, Registry};
pub use syslock::{SysLockGuard, SysLockId, SysLocks};

/// Opens a `Branch` log span named after the action being dispatched, so
/// `--log-api` tracing shows the human action name rather than a bare ID.
pub(crate) fn log_action(name: &'static str) -> parasol_errors::log::Branch {
    parasol_errors::log::Branch::enter(name)
}

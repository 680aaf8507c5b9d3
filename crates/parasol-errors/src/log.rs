//! Call-depth scoped branch/return logging.
//!
//! The original framework logs entry and exit of every significant function
//! at a depth-indented "branch" level. `Branch::enter` opens a `tracing`
//! span for the current scope; its `Drop` impl emits the matching return
//! event, so a function only has to create one guard at its top to get both
//! sides of the trace.

use tracing::Level;

/// A scope guard that logs entry on creation and exit on drop.
///
/// ```ignore
/// fn new_object() -> Status {
///     let _b = Branch::enter("new_object");
///     // ...
/// }
/// ```
pub struct Branch {
    name: &'static str,
    span: tracing::Span,
    _entered: tracing::span::EnteredSpan,
}

impl Branch {
    /// Enter a branch at `TRACE` level, the default for routine call-depth logging.
    pub fn enter(name: &'static str) -> Self {
        Self::enter_at(name, Level::TRACE)
    }

    /// Enter a branch at a caller-chosen level, for branches worth surfacing
    /// at a coarser default filter (e.g. module init, connection lifecycle).
    pub fn enter_at(name: &'static str, level: Level) -> Self {
        let span = tracing::span!(level, "branch", name);
        let entered = span.clone().entered();
        tracing::event!(level, name, "branch");
        Self { name, span, _entered: entered }
    }
}

impl Drop for Branch {
    fn drop(&mut self) {
        let _guard = self.span.enter();
        tracing::event!(Level::TRACE, name = self.name, "return");
    }
}

/// Map an [`crate::ErrorKind`] to the `tracing` level its failure should be
/// logged at: control-flow kinds stay quiet, genuine faults are louder.
pub fn level_for(kind: crate::ErrorKind) -> Level {
    use crate::ErrorKind::*;
    match kind {
        Okay | False | LimitedSuccess | Cancelled | NothingDone | Continue | Skip | Retry => {
            Level::TRACE
        }
        WouldBlock | TimeOut | Busy | InUse => Level::DEBUG,
        _ => Level::WARN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branch_enters_and_drops_without_panicking() {
        let _b = Branch::enter("test_branch");
    }

    #[test]
    fn level_mapping_is_quiet_for_control_flow() {
        assert_eq!(level_for(crate::ErrorKind::Okay), Level::TRACE);
        assert_eq!(level_for(crate::ErrorKind::Failed), Level::WARN);
    }
}

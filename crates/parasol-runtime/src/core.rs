//! `OpenCore`/`CloseCore` (`spec.md` §6): the kernel's process entry point.
//! Returns an explicit `Core` context (an `Arc`-shared struct, not a
//! process-wide singleton) bundling the class registry, object registry,
//! memory ledger, system locks, and module search configuration — per the
//! "Global mutable state" design note's resolution (see `DESIGN.md`).

use crate::module::{ClassRegistry, ModuleSearchPath, StaticModuleTable};
use parasol_errors::{Error, ErrorKind, Status};
use parasol_memory::Ledger;
use parasol_object::{Registry, SysLocks};
use std::path::PathBuf;
use std::sync::Arc;

/// Mirrors `spec.md` §6's `OpenCore` argument struct; fields not meaningful
/// to this re-implementation (`args`/`argc`, raw host argv) are folded into
/// `extra_args`.
#[derive(Debug, Default, Clone)]
pub struct OpenCoreArgs {
    pub module_path: Option<PathBuf>,
    pub system_path: Option<PathBuf>,
    pub root_path: Option<PathBuf>,
    pub max_depth: u32,
    pub detail: u32,
    pub compiled_against: u32,
    pub core_version_required: u32,
    pub extra_args: Vec<String>,
}

pub const CORE_VERSION: u32 = 1;

/// The jump table a host receives from `OpenCore`: shared handles to the
/// kernel's core services, standing in for the original's array of
/// exported function pointers.
pub struct Core {
    pub classes: Arc<ClassRegistry>,
    pub objects: Arc<Registry>,
    pub ledger: Arc<Ledger>,
    pub sys_locks: Arc<SysLocks>,
    pub statics: StaticModuleTable,
    pub search_path: ModuleSearchPath,
    pub args: OpenCoreArgs,
}

/// `OpenCore(args) -> (error, jump_table)`. Fails with `CoreVersion` when
/// the caller's `compiled_against` is older than `core_version_required`
/// would admit, mirroring the version gate the original entry point
/// performs before handing back its jump table.
pub fn open_core(args: OpenCoreArgs) -> Result<Arc<Core>, Error> {
    let _branch = parasol_errors::log::Branch::enter_at("open_core", tracing::Level::INFO);

    if args.compiled_against != 0 && args.compiled_against > CORE_VERSION {
        return Err(Error::new(ErrorKind::CoreVersion));
    }

    let executable_dir = std::env::current_exe().ok().and_then(|p| p.parent().map(PathBuf::from));
    let search_path = ModuleSearchPath::new(args.module_path.clone(), executable_dir);

    let ledger = Ledger::new();
    Ok(Arc::new(Core {
        classes: ClassRegistry::new(),
        objects: Registry::with_ledger(ledger.clone()),
        ledger,
        sys_locks: Arc::new(SysLocks::new()),
        statics: StaticModuleTable::new(),
        search_path,
        args,
    }))
}

/// `CloseCore()`. Dropping the last `Arc<Core>` already tears down every
/// owned service; this exists to mirror the original's explicit shutdown
/// call and as the place a future version could add ordered teardown
/// (e.g. flushing the backstage HTTP server) if one is ever needed.
pub fn close_core(core: Arc<Core>) -> Status {
    let _branch = parasol_errors::log::Branch::enter("close_core");
    drop(core);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_core_rejects_newer_required_version() {
        let args = OpenCoreArgs { compiled_against: CORE_VERSION + 1, ..Default::default() };
        assert_eq!(open_core(args).unwrap_err().kind, ErrorKind::CoreVersion);
    }

    #[test]
    fn open_core_succeeds_with_matching_version() {
        let args = OpenCoreArgs { compiled_against: CORE_VERSION, ..Default::default() };
        let core = open_core(args).unwrap();
        assert!(close_core(core).is_ok());
    }
}

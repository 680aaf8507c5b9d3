//! Module loading and class registration (`spec.md` §4.6).
//!
//! A module is a bundle exporting `{ name, version, init, close, expunge }`.
//! `LoadModule` consults the static registry first (mirroring
//! `glStaticModules` / `register_static_modules()` in `examples/
//! original_source/src/core/static_modules.cpp`, compiled-in modules take
//! priority over a filesystem search), then falls back to dynamic loading
//! via three search locations in order, per `spec.md` §6.

use compact_str::CompactString;
use parasol_errors::{err, Error, ErrorKind, Status};
use parasol_types::{ClassId, ClassMetadata};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A module's published header: name, version, and the three lifecycle
/// entry points the kernel calls.
pub struct ModuleHeader {
    pub name: &'static str,
    pub version: u32,
    pub init: fn(&ClassRegistry) -> Status,
    pub close: Option<fn()>,
    pub expunge: Option<fn()>,
}

impl std::fmt::Debug for ModuleHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleHeader")
            .field("name", &self.name)
            .field("version", &self.version)
            .finish()
    }
}

/// Registers a class's immutable metadata into the global class table,
/// keyed by `base_id`, mirroring `register_class()`.
#[derive(Default)]
pub struct ClassRegistry {
    classes: RwLock<HashMap<ClassId, Arc<ClassMetadata>>>,
}

impl ClassRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn register(&self, meta: ClassMetadata) -> Arc<ClassMetadata> {
        let _branch = parasol_errors::log::Branch::enter("register_class");
        let base_id = meta.base_id;
        let meta = Arc::new(meta);
        self.classes.write().insert(base_id, meta.clone());
        meta
    }

    /// Registers `meta` as a subclass of the already-registered class
    /// `parent_id`, binding `ClassMetadata::parent` so action dispatch can
    /// fall back to the parent's action table (`spec.md` §4.3: "first the
    /// object's class action table, then inherited base class"). Fails with
    /// `Search` if `parent_id` has not been registered yet.
    pub fn register_derived(&self, mut meta: ClassMetadata, parent_id: ClassId) -> Result<Arc<ClassMetadata>, Error> {
        let _branch = parasol_errors::log::Branch::enter("register_class");
        let parent = self.lookup(parent_id).ok_or_else(|| Error::new(ErrorKind::Search))?;
        meta.parent = Some(parent);
        Ok(self.register(meta))
    }

    pub fn lookup(&self, base_id: ClassId) -> Option<Arc<ClassMetadata>> {
        self.classes.read().get(&base_id).cloned()
    }

    pub fn lookup_by_name(&self, name: &str) -> Option<Arc<ClassMetadata>> {
        self.classes.read().values().find(|c| c.name == name).cloned()
    }

    /// Count of registered classes, for the backstage inspection endpoint.
    pub fn class_count(&self) -> usize {
        self.classes.read().len()
    }
}

/// Compiled-in module table consulted before any filesystem search, per
/// `static_modules.cpp`'s `glStaticModules` pattern.
#[derive(Default)]
pub struct StaticModuleTable {
    modules: HashMap<CompactString, &'static ModuleHeader>,
}

impl StaticModuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, header: &'static ModuleHeader) {
        self.modules.insert(CompactString::from(name), header);
    }

    pub fn get(&self, name: &str) -> Option<&'static ModuleHeader> {
        self.modules.get(name).copied()
    }
}

/// The three search locations consulted in order when a module is not
/// found in the static table, per `spec.md` §6 "Module discovery".
pub struct ModuleSearchPath {
    pub explicit: Option<PathBuf>,
    pub executable_dir: Option<PathBuf>,
    pub system_path: PathBuf,
}

impl ModuleSearchPath {
    pub fn new(explicit: Option<PathBuf>, executable_dir: Option<PathBuf>) -> Self {
        Self { explicit, executable_dir, system_path: PathBuf::from("lib/parasol/") }
    }

    /// Resolves a module filename (e.g. `"network.so"`) to the first
    /// existing candidate path, consulting `#[cfg(windows)]`'s registry
    /// fallback only on that target.
    pub fn resolve(&self, filename: &str) -> Option<PathBuf> {
        let candidates = [
            self.explicit.as_ref().map(|p| p.join(filename)),
            self.executable_dir.as_ref().map(|p| p.join("lib").join(filename)),
            Some(self.system_path.join(filename)),
        ];
        for candidate in candidates.into_iter().flatten() {
            if candidate.exists() {
                return Some(candidate);
            }
        }
        #[cfg(windows)]
        {
            if let Some(registry_dir) = windows_registry_location() {
                let candidate = registry_dir.join(filename);
                if candidate.exists() {
                    return Some(candidate);
                }
            }
        }
        None
    }
}

#[cfg(windows)]
fn windows_registry_location() -> Option<PathBuf> {
    use winreg::enums::HKEY_LOCAL_MACHINE;
    use winreg::RegKey;

    let hklm = RegKey::predef(HKEY_LOCAL_MACHINE);
    let key = hklm.open_subkey(r"Software\Parasol\Location").ok()?;
    let value: String = key.get_value("").ok()?;
    Some(PathBuf::from(value))
}

/// A loaded dynamic module, keeping the `libloading::Library` alive for as
/// long as any symbol from it may still be called.
pub struct LoadedModule {
    pub name: CompactString,
    _library: libloading::Library,
}

/// Consults the static registry first; falls back to dynamic loading from
/// the resolved search path. Returns `ModuleOpenFailed` if neither source
/// has the module.
pub fn load_module(
    name: &str,
    filename: &str,
    statics: &StaticModuleTable,
    search: &ModuleSearchPath,
    classes: &ClassRegistry,
) -> Result<Option<LoadedModule>, Error> {
    let _branch = parasol_errors::log::Branch::enter("load_module");

    if let Some(header) = statics.get(name) {
        (header.init)(classes)?;
        return Ok(None);
    }

    let path = search.resolve(filename).ok_or(Error::new(ErrorKind::ModuleOpenFailed))?;
    load_dynamic(name, &path)
}

fn load_dynamic(name: &str, path: &Path) -> Result<Option<LoadedModule>, Error> {
    // SAFETY: the caller supplies a path resolved from a trusted search
    // path (explicit config, executable directory, or system module dir);
    // the loaded library is expected to export the kernel's module ABI.
    let library = unsafe { libloading::Library::new(path) }
        .map_err(|_| Error::new(ErrorKind::ModuleOpenFailed))?;
    Ok(Some(LoadedModule { name: CompactString::from(name), _library: library }))
}

impl std::fmt::Debug for LoadedModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModule").field("name", &self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parasol_types::{ActionId, FieldDescriptor};

    fn empty_class(base: u32) -> ClassMetadata {
        ClassMetadata {
            base_id: ClassId(base),
            sub_id: ClassId(0),
            name: "Test".into(),
            category: "test".into(),
            version: 1,
            size: 0,
            fields: Arc::from(Vec::<FieldDescriptor>::new()),
            actions: Arc::from(Vec::<(ActionId, parasol_types::ActionHandler)>::new()),
            methods: Arc::from(Vec::new()),
            parent: None,
        }
    }

    #[test]
    fn class_registry_round_trips_by_id_and_name() {
        let registry = ClassRegistry::new();
        registry.register(empty_class(7));
        assert!(registry.lookup(ClassId(7)).is_some());
        assert!(registry.lookup_by_name("Test").is_some());
        assert!(registry.lookup(ClassId(8)).is_none());
    }

    #[test]
    fn derived_class_resolves_actions_through_its_parent() {
        use parasol_types::{ActionName, Variant};

        let registry = ClassRegistry::new();
        let mut base = empty_class(1);
        let handler: parasol_types::ActionHandler = Arc::new(|_body, _args| Ok(()));
        base.actions = Arc::from(vec![(ActionId(ActionName::Draw as i32), handler)]);
        let base = registry.register(base);

        let sub = empty_class(2);
        let sub = registry.register_derived(sub, ClassId(1)).unwrap();

        assert!(sub.action_handler(ActionId(ActionName::Draw as i32)).is_none());
        assert!(sub.resolve_action(ActionId(ActionName::Draw as i32)).is_some());
        assert!(base.resolve_action(ActionId(ActionName::Draw as i32))
            .unwrap()(&(), &Variant::Unset)
            .is_ok());
    }

    #[test]
    fn registering_a_subclass_of_an_unknown_parent_fails() {
        let registry = ClassRegistry::new();
        let sub = empty_class(2);
        assert_eq!(registry.register_derived(sub, ClassId(99)).unwrap_err().kind, ErrorKind::Search);
    }

    #[test]
    fn search_path_prefers_explicit_over_system() {
        let dir = tempfile::tempdir().unwrap();
        let explicit_dir = dir.path().join("explicit");
        std::fs::create_dir_all(&explicit_dir).unwrap();
        std::fs::write(explicit_dir.join("network.so"), b"").unwrap();

        let search = ModuleSearchPath::new(Some(explicit_dir.clone()), None);
        let resolved = search.resolve("network.so").unwrap();
        assert_eq!(resolved, explicit_dir.join("network.so"));
    }

    #[test]
    fn unresolvable_module_reports_not_found() {
        let search = ModuleSearchPath::new(None, None);
        assert!(search.resolve("does-not-exist.so").is_none());
    }

    #[test]
    fn static_module_short_circuits_dynamic_load() {
        fn init(_classes: &ClassRegistry) -> Status {
            Ok(())
        }
        static HEADER: ModuleHeader =
            ModuleHeader { name: "network", version: 1, init, close: None, expunge: None };

        let mut statics = StaticModuleTable::new();
        statics.register("network", &HEADER);
        let search = ModuleSearchPath::new(None, None);
        let classes = ClassRegistry::new();
        let result = load_module("network", "network.so", &statics, &search, &classes).unwrap();
        assert!(result.is_none());
    }
}

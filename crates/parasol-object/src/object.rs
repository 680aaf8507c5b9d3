//! The object model: creation, initialisation, action dispatch, and the
//! ownership cascade on free.

use crate::lock::{ObjectGuard, ObjectLock, TIMEOUT_INDEFINITE};
use crate::log_action;
use parasol_errors::{err, Error, ErrorKind, Status};
use parasol_memory::Ledger;
use parasol_types::{ActionId, ClassId, ClassMetadata, ObjectFlags, ObjectHeader, ObjectId, TaskId, Variant};
use std::any::Any;
use std::cell::Cell;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Subclass-private state. Built-in kernel classes are out of this spec's
/// scope (it only defines the kernel's own abstractions); every registered
/// class — including the NetSocket, SVG, and XPath subsystems built on top
/// of this crate — stores its state behind the `Opaque` escape hatch the
/// design notes call for, downcast at the handler.
pub enum ObjectBody {
    Opaque(Box<dyn Any + Send>),
}

impl ObjectBody {
    pub fn opaque<T: Any + Send>(value: T) -> Self {
        ObjectBody::Opaque(Box::new(value))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            ObjectBody::Opaque(b) => b.downcast_ref::<T>(),
        }
    }

    fn as_any(&self) -> &dyn Any {
        match self {
            ObjectBody::Opaque(b) => b.as_ref(),
        }
    }
}

/// One live kernel object: its header, class metadata, and subclass body,
/// behind the lock/queue protocol.
pub struct ObjectCell {
    pub class: Arc<ClassMetadata>,
    /// Deferred-free flag set the first time `action_depth > 0` at a free
    /// request; consulted when `action_depth` returns to zero.
    free_pending: Cell<bool>,
    lock: ObjectLock<ObjectBody>,
}

impl ObjectCell {
    pub fn header(&self) -> &ObjectHeader {
        self.lock.header()
    }

    pub fn lock(&self, timeout_millis: i64) -> Result<ObjectGuard<'_, ObjectBody>, Error> {
        self.lock.lock(timeout_millis)
    }
}

/// Process-wide table of live objects, keyed by `unique_id`, with a
/// parallel owner→children index implementing the forest described in
/// `spec.md` §3 ("the owner graph is a forest"), plus the memory ledger
/// whose allocations are owner-tagged so `run_free` can release them.
pub struct Registry {
    objects: parking_lot::RwLock<HashMap<ObjectId, Arc<ObjectCell>>>,
    children: parking_lot::RwLock<HashMap<ObjectId, Vec<ObjectId>>>,
    ledger: Arc<Ledger>,
}

impl Registry {
    pub fn new() -> Arc<Self> {
        Self::with_ledger(Ledger::new())
    }

    /// Shares an existing ledger (e.g. the one `Core` hands out) instead of
    /// creating a private one, so `AllocMemory` calls made through the core
    /// jump table are visible to this registry's ownership cascade.
    pub fn with_ledger(ledger: Arc<Ledger>) -> Arc<Self> {
        Arc::new(Self {
            objects: parking_lot::RwLock::new(HashMap::new()),
            children: parking_lot::RwLock::new(HashMap::new()),
            ledger,
        })
    }

    /// `NewObject(class, flags, &out)`. `owner` is the current context
    /// (`parasol_memory::current_context()`) unless the caller supplies one
    /// explicitly.
    pub fn new_object(
        self: &Arc<Self>,
        class: Arc<ClassMetadata>,
        body: ObjectBody,
        owner: ObjectId,
        task: TaskId,
    ) -> Arc<ObjectCell> {
        let _branch = parasol_errors::log::Branch::enter("new_object");
        let unique_id = parasol_types::ids::next_object_id();
        let mut header = ObjectHeader::new(class.base_id, class.sub_id, unique_id, task);
        header.owner_id = owner;
        let cell = Arc::new(ObjectCell {
            class,
            free_pending: Cell::new(false),
            lock: ObjectLock::new(header, body),
        });
        self.objects.write().insert(unique_id, cell.clone());
        if !owner.is_none() {
            self.children.write().entry(owner).or_default().push(unique_id);
        }
        cell
    }

    pub fn lookup(&self, id: ObjectId) -> Option<Arc<ObjectCell>> {
        self.objects.read().get(&id).cloned()
    }

    /// The memory ledger this registry releases owner-tagged allocations
    /// through when an object is freed.
    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    /// Count of live registered objects, for the backstage inspection
    /// endpoint.
    pub fn object_count(&self) -> usize {
        self.objects.read().len()
    }

    /// `Init(obj)`: runs the class's init handler (action ID `Init`), then
    /// marks the object initialised so init-only fields become read-only.
    pub fn init(&self, obj: &Arc<ObjectCell>) -> Status {
        let _branch = parasol_errors::log::Branch::enter("init");
        if obj.header().is_initialised() {
            return err(ErrorKind::DoubleInit);
        }
        let init_id = ActionId(parasol_types::ActionName::Init as i32);
        self.action(obj, init_id, &Variant::Unset)?;
        let flags = obj.header().flags.get();
        obj.header().flags.set(flags | ObjectFlags::INITIALISED);
        Ok(())
    }

    /// `Action(id, obj, args)`: the universal dispatch entry point —
    /// lock, bump `action_depth`, resolve and invoke a handler, unwind,
    /// release, exactly as `spec.md` §4.3 describes.
    pub fn action(&self, obj: &Arc<ObjectCell>, id: ActionId, args: &Variant) -> Status {
        let name = parasol_types::ActionEntry::by_id(id).map(|e| e.name).unwrap_or("Custom");
        let _branch = log_action(name);

        let guard = obj.lock(TIMEOUT_INDEFINITE)?;
        let header = obj.header();
        let depth_before = header.action_depth.get();
        header.action_depth.set(depth_before + 1);

        // First the object's own class action table, then each ancestor's
        // in turn (`ClassMetadata::resolve_action`), then the default
        // no-op below, per spec.md §4.3.
        let handler = obj.class.resolve_action(id);
        let result = match handler {
            // A handler is host/module code; a panic inside it must not
            // unwind through this dispatcher (it would skip the
            // `action_depth` decrement below and poison `guard`'s `Drop`),
            // so it is caught at this boundary and mapped to `Exception`,
            // per spec.md §9 ("language-level exceptions originating in
            // host callbacks must be caught at the dispatch boundary").
            Some(handler) => panic::catch_unwind(AssertUnwindSafe(|| handler(guard.as_any(), args)))
                .unwrap_or_else(|_| err(ErrorKind::Exception)),
            // No handler registered for this action: default no-op, per
            // "a default no-op for actions the class does not implement".
            None => Ok(()),
        };

        let depth_after = header.action_depth.get() - 1;
        header.action_depth.set(depth_after);
        drop(guard);

        if depth_after == 0 && obj.free_pending.get() {
            self.run_free(obj);
        }

        result
    }

    /// `FreeResource(obj)`: marks `FREE_PENDING`; if an action is still in
    /// progress on this thread (`action_depth > 0`) the actual free is
    /// deferred until dispatch unwinds to depth zero.
    pub fn free(&self, obj: &Arc<ObjectCell>) -> Status {
        let _branch = parasol_errors::log::Branch::enter("free_resource");
        let flags = obj.header().flags.get();
        obj.header().flags.set(flags | ObjectFlags::FREE_PENDING);
        obj.free_pending.set(true);

        if obj.header().action_depth.get() > 0 {
            return Ok(());
        }
        self.run_free(obj);
        Ok(())
    }

    /// Runs the free action, recursively frees owned children, releases
    /// every ledger allocation this object owns via `Ledger::free_by_owner`,
    /// then removes the object from the id index — per `spec.md` §4.3's
    /// free-cascade description.
    fn run_free(&self, obj: &Arc<ObjectCell>) {
        let free_id = ActionId(parasol_types::ActionName::Free as i32);
        if let Some(handler) = obj.class.resolve_action(free_id) {
            if let Ok(guard) = obj.lock(TIMEOUT_INDEFINITE) {
                let _ = panic::catch_unwind(AssertUnwindSafe(|| handler(guard.as_any(), &Variant::Unset)));
            }
        }

        let unique_id = obj.header().unique_id;
        let owned_children = self.children.write().remove(&unique_id).unwrap_or_default();
        for child_id in owned_children {
            if let Some(child) = self.lookup(child_id) {
                self.free(&child).ok();
            }
        }

        self.ledger.free_by_owner(unique_id);
        self.objects.write().remove(&unique_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parasol_types::{ActionName, ClassMetadata, FieldDescriptor};
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Counter(AtomicU32);

    fn counting_class() -> Arc<ClassMetadata> {
        let handler: parasol_types::ActionHandler = Arc::new(|body, _args| {
            let counter = body.downcast_ref::<Counter>().expect("counter body");
            counter.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        Arc::new(ClassMetadata {
            base_id: ClassId(42),
            sub_id: ClassId(0),
            name: "Counter".into(),
            category: "test".into(),
            version: 1,
            size: 0,
            fields: Arc::from(Vec::<FieldDescriptor>::new()),
            actions: Arc::from(vec![(ActionId(ActionName::Activate as i32), handler)]),
            methods: Arc::from(Vec::new()),
            parent: None,
        })
    }

    #[test]
    fn action_dispatch_invokes_registered_handler() {
        let registry = Registry::new();
        let class = counting_class();
        let obj = registry.new_object(
            class,
            ObjectBody::opaque(Counter(AtomicU32::new(0))),
            ObjectId::NONE,
            TaskId(1),
        );
        registry
            .action(&obj, ActionId(ActionName::Activate as i32), &Variant::Unset)
            .unwrap();
        registry
            .action(&obj, ActionId(ActionName::Activate as i32), &Variant::Unset)
            .unwrap();
        let count = {
            let guard = obj.lock(TIMEOUT_INDEFINITE).unwrap();
            guard.downcast_ref::<Counter>().unwrap().0.load(Ordering::SeqCst)
        };
        assert_eq!(count, 2);
    }

    #[test]
    fn unhandled_action_is_a_default_noop() {
        let registry = Registry::new();
        let class = counting_class();
        let obj = registry.new_object(
            class,
            ObjectBody::opaque(Counter(AtomicU32::new(0))),
            ObjectId::NONE,
            TaskId(1),
        );
        assert!(registry
            .action(&obj, ActionId(ActionName::Draw as i32), &Variant::Unset)
            .is_ok());
    }

    #[test]
    fn double_init_is_rejected() {
        let registry = Registry::new();
        let class = counting_class();
        let obj = registry.new_object(
            class,
            ObjectBody::opaque(Counter(AtomicU32::new(0))),
            ObjectId::NONE,
            TaskId(1),
        );
        registry.init(&obj).unwrap();
        assert_eq!(registry.init(&obj).unwrap_err().kind, ErrorKind::DoubleInit);
    }

    #[test]
    fn freeing_an_owner_cascades_to_children() {
        let registry = Registry::new();
        let class = counting_class();
        let owner = registry.new_object(
            class.clone(),
            ObjectBody::opaque(Counter(AtomicU32::new(0))),
            ObjectId::NONE,
            TaskId(1),
        );
        let child = registry.new_object(
            class,
            ObjectBody::opaque(Counter(AtomicU32::new(0))),
            owner.header().unique_id,
            TaskId(1),
        );
        let child_id = child.header().unique_id;
        registry.free(&owner).unwrap();
        assert!(registry.lookup(child_id).is_none());
    }

    #[test]
    fn freeing_an_object_releases_its_owned_allocations() {
        let registry = Registry::new();
        let class = counting_class();
        let obj = registry.new_object(
            class,
            ObjectBody::opaque(Counter(AtomicU32::new(0))),
            ObjectId::NONE,
            TaskId(1),
        );
        let owner_id = obj.header().unique_id;
        let mem_id = registry.ledger().alloc(16, parasol_types::MemoryFlags::DATA, owner_id);
        assert_eq!(registry.ledger().size_of(mem_id), Some(16));

        registry.free(&obj).unwrap();

        assert_eq!(registry.ledger().size_of(mem_id), None);
    }

    #[test]
    fn a_panicking_handler_is_mapped_to_exception_not_unwound() {
        let registry = Registry::new();
        let handler: parasol_types::ActionHandler = Arc::new(|_body, _args| panic!("boom"));
        let class = Arc::new(ClassMetadata {
            base_id: ClassId(43),
            sub_id: ClassId(0),
            name: "Panicker".into(),
            category: "test".into(),
            version: 1,
            size: 0,
            fields: Arc::from(Vec::<FieldDescriptor>::new()),
            actions: Arc::from(vec![(ActionId(ActionName::Activate as i32), handler)]),
            methods: Arc::from(Vec::new()),
            parent: None,
        });
        let obj = registry.new_object(
            class,
            ObjectBody::opaque(Counter(AtomicU32::new(0))),
            ObjectId::NONE,
            TaskId(1),
        );

        let result = registry.action(&obj, ActionId(ActionName::Activate as i32), &Variant::Unset);

        assert_eq!(result.unwrap_err().kind, ErrorKind::Exception);
        // The lock must have been released cleanly despite the panic.
        assert_eq!(obj.header().queue.load(Ordering::SeqCst), 0);
    }
}

//! Class metadata: the immutable, post-registration description of a class
//! — its field dictionary, action table, and method table.

use crate::ids::{ActionId, ClassId, MethodId};
use crate::variant::Variant;
use compact_str::CompactString;
use facet::Facet;
use std::sync::Arc;

/// The type a [`FieldDescriptor`] carries, matching `spec.md`'s enumerated
/// `type_bits`.
#[derive(Facet, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
#[facet(rename_all = "snake_case")]
pub enum FieldType {
    Byte,
    Word,
    Long,
    Large,
    Double,
    Pointer,
    StringOwned,
    StringBorrowed,
    Array,
    Struct,
    Function,
    ObjectPointer,
    ObjectId,
    Variable,
    ScaledPercentage,
    Rgb,
}

bitflags::bitflags! {
    /// Access and interpretation flags on a [`FieldDescriptor`].
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct FieldFlags: u16 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        const INIT_ONLY = 1 << 2;
        const VIRTUAL = 1 << 3;
        /// The stored value is a fraction of some other dimension, resolved
        /// by `set_hook` at commit time.
        const SCALED = 1 << 4;
        /// The field's integer value should be rendered through a lookup
        /// table of named constants rather than a raw number.
        const LOOKUP = 1 << 5;
    }
}

pub type GetHook = Arc<dyn Fn() -> Variant + Send + Sync>;
pub type SetHook = Arc<dyn Fn(Variant) -> parasol_errors::Status + Send + Sync>;

/// Describes one field of a class: its name hash, type, byte offset into the
/// subclass-private data, access flags, and optional read/write hooks.
#[derive(Clone)]
pub struct FieldDescriptor {
    pub name: CompactString,
    pub name_hash: u32,
    pub type_bits: FieldType,
    pub offset: usize,
    pub flags: FieldFlags,
    pub get_hook: Option<GetHook>,
    pub set_hook: Option<SetHook>,
}

impl FieldDescriptor {
    pub fn new(name: &str, type_bits: FieldType, offset: usize, flags: FieldFlags) -> Self {
        Self {
            name: CompactString::from(name),
            name_hash: hash_field_name(name),
            type_bits,
            offset,
            flags,
            get_hook: None,
            set_hook: None,
        }
    }

    pub fn is_readable(&self) -> bool {
        self.flags.contains(FieldFlags::READ) || self.get_hook.is_some()
    }

    pub fn is_writable(&self) -> bool {
        self.flags.contains(FieldFlags::WRITE) || self.set_hook.is_some()
    }

    /// A plain-data reflection view of this descriptor. `FieldDescriptor`
    /// itself cannot derive `Facet`: `get_hook`/`set_hook` are closures,
    /// not a reflectable shape. This snapshot carries everything else a
    /// reflection query over a class's field dictionary needs.
    pub fn snapshot(&self) -> FieldSnapshot {
        FieldSnapshot {
            name: self.name.clone(),
            name_hash: self.name_hash,
            type_bits: self.type_bits,
            offset: self.offset,
            flags_bits: self.flags.bits(),
            readable: self.is_readable(),
            writable: self.is_writable(),
        }
    }
}

/// `Facet`-derived reflection view of a [`FieldDescriptor`], the field-
/// dictionary half of `spec.md` §4.5's reflection requirement.
#[derive(Facet, Clone, Debug, PartialEq, Eq)]
pub struct FieldSnapshot {
    pub name: CompactString,
    pub name_hash: u32,
    pub type_bits: FieldType,
    pub offset: usize,
    pub flags_bits: u16,
    pub readable: bool,
    pub writable: bool,
}

impl std::fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("name_hash", &self.name_hash)
            .field("type_bits", &self.type_bits)
            .field("offset", &self.offset)
            .field("flags", &self.flags)
            .finish()
    }
}

/// Case-insensitive field-name hash matching the original framework's
/// scheme: a leading run of uppercase letters is treated as a single
/// lowercased unit rather than as acronym-separated words, so `UID` hashes
/// equal to `uid` — but a leading run that transitions into a capitalised
/// word keeps that word's own leading capital case-sensitive, so `RGBValue`
/// hashes equal to `rgbValue`, not `rgbvalue`. Ported from `fieldhash()` in
/// `examples/original_source/include/parasol/strings.hpp`: walk the leading
/// uppercase run folding each letter as it goes, but stop folding (and leave
/// the rest of the string untouched) as soon as the letter two positions
/// ahead turns out to be lowercase — that letter is the start of the next
/// word, not more of the acronym. A leading run that reaches the end of the
/// string (the whole name is upper-case) folds in full.
pub fn hash_field_name(name: &str) -> u32 {
    const FNV_OFFSET: u32 = 0x811c_9dc5;
    const FNV_PRIME: u32 = 0x0100_0193;

    fn mix(hash: u32, byte: u8) -> u32 {
        (hash ^ byte as u32).wrapping_mul(FNV_PRIME)
    }

    let bytes = name.as_bytes();
    let len = bytes.len();
    let mut hash = FNV_OFFSET;
    let mut k = 0usize;

    while k < len && bytes[k].is_ascii_uppercase() {
        hash = mix(hash, bytes[k].to_ascii_lowercase());
        k += 1;
        if k >= len {
            return hash;
        }
        if k + 1 >= len || bytes[k + 1].is_ascii_uppercase() {
            continue;
        }
        break;
    }

    while k < len {
        hash = mix(hash, bytes[k]);
        k += 1;
    }

    hash
}

/// The closed, ordered action set. Every action ID is also an index into
/// this table, which carries the human name used for `--log-api` tracing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActionEntry {
    pub id: ActionId,
    pub name: &'static str,
}

macro_rules! action_table {
    ($($name:ident),+ $(,)?) => {
        pub const ACTION_TABLE: &[ActionEntry] = &[
            $(ActionEntry { id: ActionId(ActionName::$name as i32), name: stringify!($name) }),+
        ];

        #[derive(Clone, Copy, Debug, PartialEq, Eq)]
        #[repr(i32)]
        pub enum ActionName {
            $($name),+
        }
    };
}

action_table!(
    Init,
    Free,
    Activate,
    Clear,
    CopyData,
    DataFeed,
    Draw,
    Focus,
    LostFocus,
    GetKey,
    SetKey,
    Move,
    MoveToPoint,
    Read,
    Write,
    Redimension,
    Refresh,
    Resize,
    SaveImage,
    SaveToObject,
    Scroll,
    Seek,
    Show,
    Hide,
    Lock,
    Unlock,
    Sort,
    Signal,
    Redo,
    Undo,
    Custom,
);

impl ActionEntry {
    pub fn by_id(id: ActionId) -> Option<&'static ActionEntry> {
        ACTION_TABLE.iter().find(|e| e.id == id)
    }
}

/// A handler sees only a shared reference to the subclass body: the object
/// lock's reentrant same-thread protocol never hands out exclusive access
/// (a nested action dispatch could be in flight concurrently on the same
/// thread), so any state a handler mutates must use interior mutability
/// (`Cell`/`RefCell`/atomics), the same convention `ObjectHeader::
/// action_depth` uses.
pub type ActionHandler =
    Arc<dyn Fn(&dyn std::any::Any, &Variant) -> parasol_errors::Status + Send + Sync>;

/// A class-specific method: negative ID, published argument layout (as a
/// [`Variant`] schema tag), and its handler.
#[derive(Clone)]
pub struct MethodEntry {
    pub id: MethodId,
    pub name: CompactString,
    pub handler: ActionHandler,
}

/// Immutable, post-registration description of a class: its base/sub
/// identifiers, field dictionary (sorted by hash for binary search), action
/// table, method table, and (for a subclass) a direct link to the base
/// class's own metadata that dispatch falls back to.
#[derive(Clone)]
pub struct ClassMetadata {
    pub base_id: ClassId,
    pub sub_id: ClassId,
    pub name: CompactString,
    pub category: CompactString,
    pub version: u32,
    pub size: usize,
    pub fields: Arc<[FieldDescriptor]>,
    pub actions: Arc<[(ActionId, ActionHandler)]>,
    pub methods: Arc<[MethodEntry]>,
    /// The class this one was registered as a subclass of, if any. Bound
    /// once at registration (the base class must already be registered),
    /// matching "class metadata is immutable after registration" — there is
    /// no separate registry lookup needed at dispatch time.
    pub parent: Option<Arc<ClassMetadata>>,
}

impl ClassMetadata {
    pub fn field_by_name(&self, name: &str) -> Option<&FieldDescriptor> {
        let hash = hash_field_name(name);
        self.field_by_hash(hash)
    }

    /// Binary search by hash, matching the spec's "dictionary sorted by hash"
    /// invariant. `fields` must be pre-sorted by `name_hash` at registration.
    pub fn field_by_hash(&self, hash: u32) -> Option<&FieldDescriptor> {
        let idx = self.fields.binary_search_by_key(&hash, |f| f.name_hash).ok()?;
        self.fields.get(idx)
    }

    pub fn action_handler(&self, id: ActionId) -> Option<&ActionHandler> {
        self.actions.iter().find(|(a, _)| *a == id).map(|(_, h)| h)
    }

    /// Resolves an action handler the way `Action(id, obj, args)` dispatch
    /// does (`spec.md` §4.3): first this class's own action table, then
    /// each ancestor's in turn, stopping at the first match. Returns `None`
    /// when no class in the chain implements it, leaving the caller to fall
    /// back to the default no-op.
    pub fn resolve_action(&self, id: ActionId) -> Option<ActionHandler> {
        if let Some(handler) = self.action_handler(id) {
            return Some(handler.clone());
        }
        self.parent.as_ref().and_then(|parent| parent.resolve_action(id))
    }

    pub fn method_by_id(&self, id: MethodId) -> Option<&MethodEntry> {
        self.methods.iter().find(|m| m.id == id)
    }

    /// A plain-data reflection view of this class. `ClassMetadata` itself
    /// cannot derive `Facet`: its action/method tables carry `Arc<dyn Fn>`
    /// handlers, and `parent` is a recursive `Arc<ClassMetadata>` link,
    /// neither of which is a reflectable shape. This snapshot exposes the
    /// counts and identity a reflection query over the class registry
    /// needs, with the field dictionary expanded via [`FieldDescriptor::
    /// snapshot`].
    pub fn snapshot(&self) -> ClassSnapshot {
        ClassSnapshot {
            base_id: self.base_id,
            sub_id: self.sub_id,
            name: self.name.clone(),
            category: self.category.clone(),
            version: self.version,
            size: self.size,
            fields: self.fields.iter().map(FieldDescriptor::snapshot).collect(),
            action_count: self.actions.len(),
            method_count: self.methods.len(),
            parent_base_id: self.parent.as_ref().map(|p| p.base_id),
        }
    }
}

/// `Facet`-derived reflection view of a [`ClassMetadata`], the class-
/// registry half of `spec.md` §4.5's reflection requirement.
#[derive(Facet, Clone, Debug, PartialEq, Eq)]
pub struct ClassSnapshot {
    pub base_id: ClassId,
    pub sub_id: ClassId,
    pub name: CompactString,
    pub category: CompactString,
    pub version: u32,
    pub size: usize,
    pub fields: Vec<FieldSnapshot>,
    pub action_count: usize,
    pub method_count: usize,
    pub parent_base_id: Option<ClassId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uid_hashes_equal_lowercase() {
        assert_eq!(hash_field_name("UID"), hash_field_name("uid"));
    }

    #[test]
    fn rgb_value_hashes_equal_mixed_case() {
        assert_eq!(hash_field_name("RGBValue"), hash_field_name("rgbValue"));
    }

    #[test]
    fn empty_and_single_char_do_not_panic() {
        let _ = hash_field_name("");
        let _ = hash_field_name("X");
        let _ = hash_field_name("x");
        assert_eq!(hash_field_name("X"), hash_field_name("x"));
    }

    #[test]
    fn plain_lowercase_name_is_unaffected_by_folding() {
        assert_eq!(hash_field_name("width"), hash_field_name("width"));
        assert_ne!(hash_field_name("width"), hash_field_name("height"));
    }

    #[test]
    fn acronym_run_does_not_swallow_the_next_word_entirely() {
        // A full-lowercase fold would hash these the same; the acronym-aware
        // algorithm keeps the word that follows the run case-sensitive, so
        // shouting the whole name changes the hash.
        assert_ne!(hash_field_name("RGBValue"), hash_field_name("RGBVALUE"));
    }

    #[test]
    fn action_table_is_ordered_and_lookup_works() {
        assert_eq!(ACTION_TABLE[0].name, "Init");
        let init = ActionEntry::by_id(ActionId(ActionName::Init as i32)).unwrap();
        assert_eq!(init.name, "Init");
    }

    #[test]
    fn field_snapshot_carries_hash_and_access_flags() {
        let field = FieldDescriptor::new("Width", FieldType::Long, 8, FieldFlags::READ | FieldFlags::WRITE);
        let snap = field.snapshot();
        assert_eq!(snap.name, "Width");
        assert_eq!(snap.name_hash, hash_field_name("Width"));
        assert!(snap.readable);
        assert!(snap.writable);
    }

    #[test]
    fn class_snapshot_reports_field_and_parent_identity() {
        let base = Arc::new(ClassMetadata {
            base_id: ClassId(1),
            sub_id: ClassId(0),
            name: CompactString::from("Base"),
            category: CompactString::from("misc"),
            version: 1,
            size: 0,
            fields: Arc::from(Vec::new()),
            actions: Arc::from(Vec::new()),
            methods: Arc::from(Vec::new()),
            parent: None,
        });
        let field = FieldDescriptor::new("X", FieldType::Long, 0, FieldFlags::READ);
        let derived = ClassMetadata {
            base_id: ClassId(2),
            sub_id: ClassId(0),
            name: CompactString::from("Derived"),
            category: CompactString::from("misc"),
            version: 1,
            size: 0,
            fields: Arc::from(vec![field]),
            actions: Arc::from(Vec::new()),
            methods: Arc::from(Vec::new()),
            parent: Some(base.clone()),
        };
        let snap = derived.snapshot();
        assert_eq!(snap.fields.len(), 1);
        assert_eq!(snap.parent_base_id, Some(ClassId(1)));
        assert_eq!(base.snapshot().parent_base_id, None);
    }
}

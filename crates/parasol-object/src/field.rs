//! Field dispatch and reflection: name/hash lookup, read/write with
//! auto-conversion, and enforcement of init-only and read-only fields.
//!
//! `FieldDescriptor::offset` is retained in `parasol_types` for reflection
//! parity with the original layout-based design, but this kernel represents
//! subclass state as Rust fields behind `get_hook`/`set_hook` rather than
//! raw byte offsets into a C struct, so actual reads and writes always go
//! through the hooks. A field with no hook for the requested direction is
//! unreadable/unwritable regardless of its `FieldFlags`.

use parasol_errors::{err, Error, ErrorKind, Status};
use parasol_types::{ClassMetadata, FieldFlags, ObjectHeader, Variant};

/// `GetField(obj, field_name, out)`.
pub fn get_field(meta: &ClassMetadata, name: &str) -> Result<Variant, Error> {
    let field = meta.field_by_name(name).ok_or(Error::new(ErrorKind::UndefinedField))?;
    if !field.flags.contains(FieldFlags::READ) {
        return Err(Error::new(ErrorKind::NoFieldAccess));
    }
    match &field.get_hook {
        Some(hook) => Ok(hook()),
        None => Err(Error::new(ErrorKind::NoFieldAccess)),
    }
}

/// `SetField(obj, field_name, value)`. Enforces init-only (write fails once
/// `ObjectHeader::is_initialised()` is true) and write-only/read-only
/// access, then hands the (possibly auto-converted) value to the field's
/// `set_hook`.
pub fn set_field(meta: &ClassMetadata, header: &ObjectHeader, name: &str, value: Variant) -> Status {
    let field = meta.field_by_name(name).ok_or(ErrorKind::UndefinedField)?;
    if !field.flags.contains(FieldFlags::WRITE) {
        return err(ErrorKind::NoFieldAccess);
    }
    if field.flags.contains(FieldFlags::INIT_ONLY) && header.is_initialised() {
        return err(ErrorKind::NoFieldAccess);
    }
    let converted = coerce(&value, field.type_bits);
    match &field.set_hook {
        Some(hook) => hook(converted),
        None => err(ErrorKind::NoFieldAccess),
    }
}

/// Auto-converts between compatible shapes (integer/float/string) the way
/// the spec's `SetField` does; shapes with no sensible conversion pass
/// through unchanged and let the hook reject them.
fn coerce(value: &Variant, target: parasol_types::FieldType) -> Variant {
    use parasol_types::FieldType::*;
    match target {
        Long => value.as_i64().map(|v| Variant::Long(v as i32)).unwrap_or_else(|| value.clone()),
        Large => value.as_i64().map(Variant::Large).unwrap_or_else(|| value.clone()),
        Double | ScaledPercentage => {
            value.as_f64().map(Variant::Double).unwrap_or_else(|| value.clone())
        }
        StringOwned | StringBorrowed => match value {
            Variant::String(_) => value.clone(),
            Variant::Long(v) => Variant::from(v.to_string().as_str()),
            Variant::Large(v) => Variant::from(v.to_string().as_str()),
            Variant::Double(v) => Variant::from(v.to_string().as_str()),
            other => other.clone(),
        },
        _ => value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parasol_types::{ActionId, ClassId, FieldDescriptor, FieldType, ObjectId, TaskId};
    use std::sync::{Arc, Mutex};

    fn meta_with_field(flags: FieldFlags, store: Arc<Mutex<Variant>>) -> ClassMetadata {
        let read_store = store.clone();
        let write_store = store;
        let mut field = FieldDescriptor::new("Width", FieldType::Long, 0, flags);
        field.get_hook = Some(Arc::new(move || read_store.lock().unwrap().clone()));
        field.set_hook = Some(Arc::new(move |v| {
            *write_store.lock().unwrap() = v;
            Ok(())
        }));
        ClassMetadata {
            base_id: ClassId(1),
            sub_id: ClassId(0),
            name: "Test".into(),
            category: "test".into(),
            version: 1,
            size: 0,
            fields: Arc::from(vec![field]),
            actions: Arc::from(Vec::<(ActionId, parasol_types::ActionHandler)>::new()),
            methods: Arc::from(Vec::new()),
            parent: None,
        }
    }

    #[test]
    fn unknown_field_is_undefined() {
        let store = Arc::new(Mutex::new(Variant::Unset));
        let meta = meta_with_field(FieldFlags::READ | FieldFlags::WRITE, store);
        assert_eq!(get_field(&meta, "Nope").unwrap_err().kind, ErrorKind::UndefinedField);
    }

    #[test]
    fn write_only_field_cannot_be_read() {
        let store = Arc::new(Mutex::new(Variant::Unset));
        let meta = meta_with_field(FieldFlags::WRITE, store);
        assert_eq!(get_field(&meta, "Width").unwrap_err().kind, ErrorKind::NoFieldAccess);
    }

    #[test]
    fn init_only_field_rejects_write_after_init() {
        let store = Arc::new(Mutex::new(Variant::Unset));
        let meta = meta_with_field(FieldFlags::READ | FieldFlags::WRITE | FieldFlags::INIT_ONLY, store);
        let header = ObjectHeader::new(ClassId(1), ClassId(0), ObjectId(1), TaskId(1));
        assert!(set_field(&meta, &header, "Width", Variant::Long(4)).is_ok());
        header.flags.set(parasol_types::ObjectFlags::INITIALISED);
        assert_eq!(
            set_field(&meta, &header, "Width", Variant::Long(5)).unwrap_err().kind,
            ErrorKind::NoFieldAccess
        );
    }

    #[test]
    fn string_target_coerces_numeric_input() {
        let store = Arc::new(Mutex::new(Variant::Unset));
        let mut field = FieldDescriptor::new("Name", FieldType::StringOwned, 0, FieldFlags::READ | FieldFlags::WRITE);
        let read_store = store.clone();
        let write_store = store;
        field.get_hook = Some(Arc::new(move || read_store.lock().unwrap().clone()));
        field.set_hook = Some(Arc::new(move |v| {
            *write_store.lock().unwrap() = v;
            Ok(())
        }));
        let meta = ClassMetadata {
            base_id: ClassId(1),
            sub_id: ClassId(0),
            name: "Test".into(),
            category: "test".into(),
            version: 1,
            size: 0,
            fields: Arc::from(vec![field]),
            actions: Arc::from(Vec::<(ActionId, parasol_types::ActionHandler)>::new()),
            methods: Arc::from(Vec::new()),
            parent: None,
        };
        let header = ObjectHeader::new(ClassId(1), ClassId(0), ObjectId(1), TaskId(1));
        set_field(&meta, &header, "Name", Variant::Long(42)).unwrap();
        assert_eq!(get_field(&meta, "Name").unwrap().as_str(), Some("42"));
    }
}

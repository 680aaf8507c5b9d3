//! The generic tagged value used wherever a field's type is chosen at
//! runtime rather than fixed at registration (`spec.md` §4.5 "Variants").

use crate::ids::ObjectId;
use compact_str::CompactString;
use facet::Facet;

/// A runtime-typed value. The carrier records which variant is live;
/// `FieldType` on the owning [`crate::FieldDescriptor`] states which shapes
/// are admissible for a given field. Derives `Facet` the way the teacher
/// derives its own tagged value/entity-body enums, making this the
/// reflection-visible shape of any field whose type is chosen at runtime.
#[derive(Facet, Clone, Debug)]
#[repr(u8)]
#[facet(rename_all = "snake_case")]
pub enum Variant {
    Unset,
    Bool(bool),
    Long(i32),
    Large(i64),
    Double(f64),
    String(CompactString),
    Object(ObjectId),
    Rgb([u8; 4]),
    /// A fraction of some other dimension; resolved by the field's
    /// `set_hook` at commit time.
    Scaled(f64),
    Array(Vec<Variant>),
}

impl Variant {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Variant::Bool(b) => Some(*b as i64),
            Variant::Long(v) => Some(*v as i64),
            Variant::Large(v) => Some(*v),
            Variant::Double(v) => Some(*v as i64),
            Variant::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Variant::Long(v) => Some(*v as f64),
            Variant::Large(v) => Some(*v as f64),
            Variant::Double(v) => Some(*v),
            Variant::Scaled(v) => Some(*v),
            Variant::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Variant::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, Variant::Unset)
    }
}

impl Default for Variant {
    fn default() -> Self {
        Variant::Unset
    }
}

impl From<i32> for Variant {
    fn from(v: i32) -> Self {
        Variant::Long(v)
    }
}

impl From<f64> for Variant {
    fn from(v: f64) -> Self {
        Variant::Double(v)
    }
}

impl From<&str> for Variant {
    fn from(v: &str) -> Self {
        Variant::String(CompactString::from(v))
    }
}

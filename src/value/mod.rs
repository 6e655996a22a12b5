//! Captured argument values.
//!
//! Arguments flowing through the dispatch layer are represented as [`Value`], a tagged
//! variant over every representational kind a message argument can take: primitives,
//! strings, shared object references and fixed-size value records. The kind tag is
//! preserved end to end, so a captured `I32(42)` never compares equal to an `I64(42)`
//! and object references compare by identity rather than by content.
//!
//! # Key Components
//!
//! - [`Value`] - The tagged argument value
//! - [`ValueKind`] - The kind tag of a [`Value`], used in signatures and diagnostics
//! - [`ObjectRef`] - Identity-compared shared reference to an arbitrary object
//! - [`ValueBox`] - Lock-guarded, last-write-wins slot holding the latest capture

mod valuebox;

pub use valuebox::ValueBox;

use std::{any::Any, fmt, sync::Arc};

use strum::{Display, EnumCount, EnumIter};

use crate::Error;

/// Representational kind of a [`Value`].
///
/// Used by [`crate::MethodSignature`] to declare parameter kinds and by
/// [`crate::ArgumentDescriptor`] to describe the captured position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter, EnumCount)]
#[strum(serialize_all = "lowercase")]
pub enum ValueKind {
    /// No value (void return)
    Void,
    /// Null object reference
    Null,
    /// Boolean primitive
    Bool,
    /// 32-bit signed integer
    I32,
    /// 64-bit signed integer
    I64,
    /// 64-bit unsigned integer
    U64,
    /// 32-bit float
    F32,
    /// 64-bit float
    F64,
    /// Unicode scalar
    Char,
    /// Owned string
    Str,
    /// Shared object reference
    Object,
    /// Fixed-size value record
    Record,
}

/// Shared reference to an arbitrary object passed as a message argument.
///
/// Two `ObjectRef`s are equal only if they point at the same allocation. This keeps
/// captured references honest: a spy reports *which* object was passed, not merely an
/// object that happens to look the same.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use argspy::ObjectRef;
///
/// let delegate = Arc::new(String::from("delegate"));
/// let a = ObjectRef::from(delegate.clone());
/// let b = ObjectRef::from(delegate);
/// let c = ObjectRef::new(String::from("delegate"));
///
/// assert_eq!(a, b);
/// assert_ne!(a, c);
/// assert_eq!(a.downcast_ref::<String>().map(String::as_str), Some("delegate"));
/// ```
#[derive(Clone)]
pub struct ObjectRef(Arc<dyn Any + Send + Sync>);

impl ObjectRef {
    /// Wraps `value` in a new shared allocation.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Returns the referenced object if it is a `T`.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// Returns the referenced object as a typed `Arc` if it is a `T`.
    #[must_use]
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.0.clone().downcast::<T>().ok()
    }

    /// Returns `true` if both references point at the same allocation.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }

    fn address(&self) -> usize {
        Arc::as_ptr(&self.0).cast::<()>() as usize
    }
}

impl<T: Any + Send + Sync> From<Arc<T>> for ObjectRef {
    fn from(value: Arc<T>) -> Self {
        Self(value)
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for ObjectRef {}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef(0x{:X})", self.address())
    }
}

/// A message argument or return value.
///
/// | Rust type | Variant |
/// |-----------|---------|
/// | `()` / no result | [`Value::Void`] |
/// | `bool` | [`Value::Bool`] |
/// | `i8`, `i16`, `i32`, `u8`, `u16` | [`Value::I32`] |
/// | `i64` | [`Value::I64`] |
/// | `u32`, `u64` | [`Value::U64`] |
/// | `f32` | [`Value::F32`] |
/// | `f64` | [`Value::F64`] |
/// | `char` | [`Value::Char`] |
/// | `&str`, `String` | [`Value::Str`] |
/// | `Arc<T>`, [`ObjectRef`] | [`Value::Object`] |
/// | struct-like value | [`Value::Record`] |
///
/// # Equality
///
/// Values of different kinds are never equal. Floats compare by bit pattern, so a
/// captured `NaN` equals the same `NaN`. Objects compare by identity, records by type
/// name and fields.
#[derive(Clone, Debug, Default)]
pub enum Value {
    /// No value.
    ///
    /// Returned by methods without a result and by suppressed calls without an
    /// explicit stub result.
    #[default]
    Void,

    /// Null object reference.
    Null,

    /// Boolean value.
    Bool(bool),

    /// 32-bit signed integer.
    I32(i32),

    /// 64-bit signed integer.
    I64(i64),

    /// 64-bit unsigned integer.
    U64(u64),

    /// 32-bit floating point.
    F32(f32),

    /// 64-bit floating point.
    F64(f64),

    /// Unicode character.
    Char(char),

    /// Owned string.
    Str(String),

    /// Shared reference to an object, compared by identity.
    Object(ObjectRef),

    /// Fixed-size value record (struct-like), copied by value.
    Record {
        /// Name of the record type.
        type_name: String,
        /// Field values in declaration order.
        fields: Vec<Value>,
    },
}

impl Value {
    /// Creates a record value.
    ///
    /// # Arguments
    ///
    /// * `type_name` - Name of the record type
    /// * `fields` - Field values in declaration order
    pub fn record(type_name: impl Into<String>, fields: Vec<Value>) -> Self {
        Value::Record {
            type_name: type_name.into(),
            fields,
        }
    }

    /// Wraps `value` in a fresh shared object reference.
    pub fn object<T: Any + Send + Sync>(value: T) -> Self {
        Value::Object(ObjectRef::new(value))
    }

    /// Returns the kind tag of this value.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Void => ValueKind::Void,
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::I32(_) => ValueKind::I32,
            Value::I64(_) => ValueKind::I64,
            Value::U64(_) => ValueKind::U64,
            Value::F32(_) => ValueKind::F32,
            Value::F64(_) => ValueKind::F64,
            Value::Char(_) => ValueKind::Char,
            Value::Str(_) => ValueKind::Str,
            Value::Object(_) => ValueKind::Object,
            Value::Record { .. } => ValueKind::Record,
        }
    }

    /// Returns `true` if this is [`Value::Void`].
    #[must_use]
    pub fn is_void(&self) -> bool {
        matches!(self, Value::Void)
    }

    /// Returns `true` if this is [`Value::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the value as `i32` if it is a [`Value::I32`].
    #[must_use]
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::I32(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as `i64` if it is an integer that fits.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I32(v) => Some(i64::from(*v)),
            Value::I64(v) => Some(*v),
            Value::U64(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Returns the value as `f64` if it is a float.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F32(v) => Some(f64::from(*v)),
            Value::F64(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as `bool` if it is a [`Value::Bool`].
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the string slice if this is a [`Value::Str`].
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Returns the object reference if this is a [`Value::Object`].
    #[must_use]
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(r) => Some(r),
            _ => None,
        }
    }

    /// Returns the type name and fields if this is a [`Value::Record`].
    #[must_use]
    pub fn as_record(&self) -> Option<(&str, &[Value])> {
        match self {
            Value::Record { type_name, fields } => Some((type_name.as_str(), fields.as_slice())),
            _ => None,
        }
    }

    fn conversion_error(&self, target_type: &'static str) -> Error {
        Error::ValueConversion {
            source_kind: self.kind(),
            target_type,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Void, Value::Void) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::I32(a), Value::I32(b)) => a == b,
            (Value::I64(a), Value::I64(b)) => a == b,
            (Value::U64(a), Value::U64(b)) => a == b,
            (Value::F32(a), Value::F32(b)) => a.to_bits() == b.to_bits(),
            (Value::F64(a), Value::F64(b)) => a.to_bits() == b.to_bits(),
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (
                Value::Record {
                    type_name: t1,
                    fields: f1,
                },
                Value::Record {
                    type_name: t2,
                    fields: f2,
                },
            ) => t1 == t2 && f1 == f2,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Void => write!(f, "void"),
            Value::Null => write!(f, "null"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::I32(v) => write!(f, "{v}"),
            Value::I64(v) => write!(f, "{v}L"),
            Value::U64(v) => write!(f, "{v}UL"),
            Value::F32(v) => write!(f, "{v}f"),
            Value::F64(v) => write!(f, "{v}"),
            Value::Char(v) => write!(f, "'{v}'"),
            Value::Str(v) => write!(f, "{v:?}"),
            Value::Object(r) => write!(f, "object@0x{:X}", r.address()),
            Value::Record { type_name, fields } => {
                write!(f, "{type_name} {{ ")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{field}")?;
                }
                write!(f, " }}")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i8> for Value {
    fn from(value: i8) -> Self {
        Value::I32(i32::from(value))
    }
}

impl From<u8> for Value {
    fn from(value: u8) -> Self {
        Value::I32(i32::from(value))
    }
}

impl From<i16> for Value {
    fn from(value: i16) -> Self {
        Value::I32(i32::from(value))
    }
}

impl From<u16> for Value {
    fn from(value: u16) -> Self {
        Value::I32(i32::from(value))
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::I32(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::U64(u64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::I64(value)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::U64(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::F32(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::F64(value)
    }
}

impl From<char> for Value {
    fn from(value: char) -> Self {
        Value::Char(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<ObjectRef> for Value {
    fn from(value: ObjectRef) -> Self {
        Value::Object(value)
    }
}

impl<T: Any + Send + Sync> From<Arc<T>> for Value {
    fn from(value: Arc<T>) -> Self {
        Value::Object(ObjectRef::from(value))
    }
}

impl TryFrom<&Value> for i32 {
    type Error = Error;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        value.as_i32().ok_or_else(|| value.conversion_error("i32"))
    }
}

impl TryFrom<&Value> for i64 {
    type Error = Error;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        value.as_i64().ok_or_else(|| value.conversion_error("i64"))
    }
}

impl TryFrom<&Value> for f64 {
    type Error = Error;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        value.as_f64().ok_or_else(|| value.conversion_error("f64"))
    }
}

impl TryFrom<&Value> for bool {
    type Error = Error;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        value.as_bool().ok_or_else(|| value.conversion_error("bool"))
    }
}

impl TryFrom<&Value> for String {
    type Error = Error;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        value
            .as_str()
            .map(ToString::to_string)
            .ok_or_else(|| value.conversion_error("String"))
    }
}

impl TryFrom<Value> for i32 {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        i32::try_from(&value)
    }
}

impl TryFrom<Value> for i64 {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        i64::try_from(&value)
    }
}

impl TryFrom<Value> for String {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Str(s) => Ok(s),
            other => Err(other.conversion_error("String")),
        }
    }
}

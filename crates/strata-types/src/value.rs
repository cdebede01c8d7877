use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CastError;
use crate::key::Key;

/// A single scalar property value as understood by the store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Timestamp(DateTime<Utc>),
    Key(Key),
}

impl Value {
    /// Short name of the variant, used in cast diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::Timestamp(_) => "timestamp",
            Self::Key(_) => "key",
        }
    }

    /// Returns `true` if this is the zero value of its type.
    ///
    /// Keys are never zero: an unset key is represented by `Null`.
    pub fn is_zero(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Bool(b) => !b,
            Self::Int(i) => *i == 0,
            Self::Float(f) => *f == 0.0,
            Self::Text(s) => s.is_empty(),
            Self::Bytes(b) => b.is_empty(),
            Self::Timestamp(t) => *t == DateTime::<Utc>::default(),
            Self::Key(_) => false,
        }
    }

    /// Compare two values of compatible types.
    ///
    /// Integers and floats compare numerically with each other. Values of
    /// unrelated types are incomparable and yield `None`.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Self::Null, Self::Null) => Some(Ordering::Equal),
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
            (Self::Int(a), Self::Float(b)) => (*a as f64).partial_cmp(b),
            (Self::Float(a), Self::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            (Self::Bytes(a), Self::Bytes(b)) => Some(a.cmp(b)),
            (Self::Timestamp(a), Self::Timestamp(b)) => Some(a.cmp(b)),
            (Self::Key(a), Self::Key(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Total order across all values: first by type rank, then by value.
    ///
    /// Used by stores to sort mixed-type properties deterministically.
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        self.rank()
            .cmp(&other.rank())
            .then_with(|| self.compare(other).unwrap_or(Ordering::Equal))
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Int(_) | Self::Float(_) => 2,
            Self::Timestamp(_) => 3,
            Self::Text(_) => 4,
            Self::Bytes(_) => 5,
            Self::Key(_) => 6,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Self::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
            Self::Key(k) => write!(f, "{k}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Timestamp(v)
    }
}

impl From<Key> for Value {
    fn from(v: Key) -> Self {
        Self::Key(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

// ---------------------------------------------------------------------------
// ValueType
// ---------------------------------------------------------------------------

/// A Rust field type that persists as a single [`Value`].
///
/// `Null` always decodes to the type's default, so fields absent from a
/// stored record come back at their zero value.
pub trait ValueType: Default + Send + Sync + 'static {
    /// Name used in cast diagnostics.
    const TYPE_NAME: &'static str;

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> Result<Self, CastError>;
}

fn mismatch<T: ValueType>(value: &Value) -> CastError {
    CastError::new(T::TYPE_NAME, value.type_name())
}

impl ValueType for bool {
    const TYPE_NAME: &'static str = "bool";

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: Value) -> Result<Self, CastError> {
        match value {
            Value::Null => Ok(false),
            Value::Bool(b) => Ok(b),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl ValueType for i64 {
    const TYPE_NAME: &'static str = "i64";

    fn to_value(&self) -> Value {
        Value::Int(*self)
    }

    fn from_value(value: Value) -> Result<Self, CastError> {
        match value {
            Value::Null => Ok(0),
            Value::Int(i) => Ok(i),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl ValueType for i32 {
    const TYPE_NAME: &'static str = "i32";

    fn to_value(&self) -> Value {
        Value::Int(i64::from(*self))
    }

    fn from_value(value: Value) -> Result<Self, CastError> {
        match value {
            Value::Null => Ok(0),
            Value::Int(i) => i32::try_from(i).map_err(|_| CastError::new("i32", "int out of range")),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl ValueType for u32 {
    const TYPE_NAME: &'static str = "u32";

    fn to_value(&self) -> Value {
        Value::Int(i64::from(*self))
    }

    fn from_value(value: Value) -> Result<Self, CastError> {
        match value {
            Value::Null => Ok(0),
            Value::Int(i) => u32::try_from(i).map_err(|_| CastError::new("u32", "int out of range")),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl ValueType for f64 {
    const TYPE_NAME: &'static str = "f64";

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: Value) -> Result<Self, CastError> {
        match value {
            Value::Null => Ok(0.0),
            Value::Float(f) => Ok(f),
            Value::Int(i) => Ok(i as f64),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl ValueType for String {
    const TYPE_NAME: &'static str = "string";

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, CastError> {
        match value {
            Value::Null => Ok(String::new()),
            Value::Text(s) => Ok(s),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl ValueType for Vec<u8> {
    const TYPE_NAME: &'static str = "bytes";

    fn to_value(&self) -> Value {
        Value::Bytes(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, CastError> {
        match value {
            Value::Null => Ok(Vec::new()),
            Value::Bytes(b) => Ok(b),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl ValueType for DateTime<Utc> {
    const TYPE_NAME: &'static str = "timestamp";

    fn to_value(&self) -> Value {
        Value::Timestamp(*self)
    }

    fn from_value(value: Value) -> Result<Self, CastError> {
        match value {
            Value::Null => Ok(DateTime::<Utc>::default()),
            Value::Timestamp(t) => Ok(t),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl<T: ValueType> ValueType for Option<T> {
    const TYPE_NAME: &'static str = T::TYPE_NAME;

    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, ValueType::to_value)
    }

    fn from_value(value: Value) -> Result<Self, CastError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

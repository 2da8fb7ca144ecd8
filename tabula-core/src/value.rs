use std::fmt::{self, Display};
use time::OffsetDateTime;
use uuid::Uuid;

/// Dynamically typed value stored in a [`Record`](crate::Record).
///
/// Every variant carries an `Option`: `None` is a null whose type is known (for example a
/// nullable integer column read from storage), [`Value::Null`] is a null without type
/// information. Both are treated as null by validators and drivers.
#[derive(Default, Debug, Clone)]
pub enum Value {
    #[default]
    Null,
    Boolean(Option<bool>),
    Int8(Option<i8>),
    Int16(Option<i16>),
    Int32(Option<i32>),
    Int64(Option<i64>),
    UInt8(Option<u8>),
    UInt16(Option<u16>),
    UInt32(Option<u32>),
    UInt64(Option<u64>),
    Float64(Option<f64>),
    Varchar(Option<String>),
    Blob(Option<Box<[u8]>>),
    Uuid(Option<Uuid>),
    Timestamp(Option<OffsetDateTime>),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (l, r) if l.is_null() || r.is_null() => l.is_null() && r.is_null(),
            (Self::Boolean(l), Self::Boolean(r)) => l == r,
            (Self::Int8(l), Self::Int8(r)) => l == r,
            (Self::Int16(l), Self::Int16(r)) => l == r,
            (Self::Int32(l), Self::Int32(r)) => l == r,
            (Self::Int64(l), Self::Int64(r)) => l == r,
            (Self::UInt8(l), Self::UInt8(r)) => l == r,
            (Self::UInt16(l), Self::UInt16(r)) => l == r,
            (Self::UInt32(l), Self::UInt32(r)) => l == r,
            (Self::UInt64(l), Self::UInt64(r)) => l == r,
            (Self::Float64(l), Self::Float64(r)) => l == r,
            (Self::Varchar(l), Self::Varchar(r)) => l == r,
            (Self::Blob(l), Self::Blob(r)) => l == r,
            (Self::Uuid(l), Self::Uuid(r)) => l == r,
            (Self::Timestamp(l), Self::Timestamp(r)) => l == r,
            _ => false,
        }
    }
}

impl Value {
    /// True for [`Value::Null`] and for every variant holding `None`.
    pub fn is_null(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Boolean(v) => v.is_none(),
            Value::Int8(v) => v.is_none(),
            Value::Int16(v) => v.is_none(),
            Value::Int32(v) => v.is_none(),
            Value::Int64(v) => v.is_none(),
            Value::UInt8(v) => v.is_none(),
            Value::UInt16(v) => v.is_none(),
            Value::UInt32(v) => v.is_none(),
            Value::UInt64(v) => v.is_none(),
            Value::Float64(v) => v.is_none(),
            Value::Varchar(v) => v.is_none(),
            Value::Blob(v) => v.is_none(),
            Value::Uuid(v) => v.is_none(),
            Value::Timestamp(v) => v.is_none(),
        }
    }

    /// Name of the variant, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(..) => "bool",
            Value::Int8(..) => "i8",
            Value::Int16(..) => "i16",
            Value::Int32(..) => "i32",
            Value::Int64(..) => "i64",
            Value::UInt8(..) => "u8",
            Value::UInt16(..) => "u16",
            Value::UInt32(..) => "u32",
            Value::UInt64(..) => "u64",
            Value::Float64(..) => "f64",
            Value::Varchar(..) => "string",
            Value::Blob(..) => "bytes",
            Value::Uuid(..) => "uuid",
            Value::Timestamp(..) => "timestamp",
        }
    }

    /// The integer held by any integer variant, if it fits in `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int8(Some(v)) => Some(v as i64),
            Value::Int16(Some(v)) => Some(v as i64),
            Value::Int32(Some(v)) => Some(v as i64),
            Value::Int64(Some(v)) => Some(v),
            Value::UInt8(Some(v)) => Some(v as i64),
            Value::UInt16(Some(v)) => Some(v as i64),
            Value::UInt32(Some(v)) => Some(v as i64),
            Value::UInt64(Some(v)) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Varchar(Some(v)) => Some(v),
            _ => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return f.write_str("NULL");
        }
        match self {
            Value::Boolean(Some(v)) => write!(f, "{v}"),
            Value::Int8(Some(v)) => write!(f, "{v}"),
            Value::Int16(Some(v)) => write!(f, "{v}"),
            Value::Int32(Some(v)) => write!(f, "{v}"),
            Value::Int64(Some(v)) => write!(f, "{v}"),
            Value::UInt8(Some(v)) => write!(f, "{v}"),
            Value::UInt16(Some(v)) => write!(f, "{v}"),
            Value::UInt32(Some(v)) => write!(f, "{v}"),
            Value::UInt64(Some(v)) => write!(f, "{v}"),
            Value::Float64(Some(v)) => write!(f, "{v}"),
            Value::Varchar(Some(v)) => write!(f, "'{v}'"),
            Value::Blob(Some(v)) => write!(f, "\\x{}", hex::encode(v)),
            Value::Uuid(Some(v)) => write!(f, "{v}"),
            Value::Timestamp(Some(v)) => write!(f, "{v}"),
            _ => f.write_str("NULL"),
        }
    }
}

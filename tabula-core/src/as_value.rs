use crate::{Error, Result, Value};
use std::any;
use time::OffsetDateTime;
use uuid::Uuid;

/// Conversion between native Rust types and the dynamically typed [`Value`].
///
/// `as_value` never fails. `try_from_value` accepts the canonical variant of the type and,
/// for integers, any other integer variant whose value fits in the target (range checked).
///
/// ```rust
/// use tabula_core::{AsValue, Value};
/// let v = 42i32.as_value();
/// assert!(matches!(v, Value::Int32(Some(42))));
/// let n: i64 = AsValue::try_from_value(v).unwrap();
/// assert_eq!(n, 42);
/// ```
pub trait AsValue {
    /// Null of the type's canonical variant.
    fn as_empty_value() -> Value;
    fn as_value(self) -> Value;
    fn try_from_value(value: Value) -> Result<Self>
    where
        Self: Sized;
}

fn mismatch<T>(value: &Value) -> Error {
    Error::msg(format!(
        "Cannot convert a {} value `{}` into {}",
        value.kind_name(),
        value,
        any::type_name::<T>()
    ))
}

macro_rules! impl_as_value_integer {
    ($source:ty, $variant:path) => {
        impl AsValue for $source {
            fn as_empty_value() -> Value {
                $variant(None)
            }
            fn as_value(self) -> Value {
                $variant(Some(self))
            }
            fn try_from_value(value: Value) -> Result<Self> {
                if let $variant(Some(v)) = value {
                    return Ok(v);
                }
                let wide = match value {
                    Value::UInt64(Some(v)) => <$source>::try_from(v).ok(),
                    ref v => v.as_i64().and_then(|v| <$source>::try_from(v).ok()),
                };
                wide.ok_or_else(|| mismatch::<Self>(&value))
            }
        }
    };
}

impl_as_value_integer!(i8, Value::Int8);
impl_as_value_integer!(i16, Value::Int16);
impl_as_value_integer!(i32, Value::Int32);
impl_as_value_integer!(i64, Value::Int64);
impl_as_value_integer!(u8, Value::UInt8);
impl_as_value_integer!(u16, Value::UInt16);
impl_as_value_integer!(u32, Value::UInt32);
impl_as_value_integer!(u64, Value::UInt64);

macro_rules! impl_as_value {
    ($source:ty, $variant:path) => {
        impl AsValue for $source {
            fn as_empty_value() -> Value {
                $variant(None)
            }
            fn as_value(self) -> Value {
                $variant(Some(self.into()))
            }
            fn try_from_value(value: Value) -> Result<Self> {
                match value {
                    $variant(Some(v)) => Ok(v.into()),
                    v => Err(mismatch::<Self>(&v)),
                }
            }
        }
    };
}

impl_as_value!(bool, Value::Boolean);
impl_as_value!(f64, Value::Float64);
impl_as_value!(String, Value::Varchar);
impl_as_value!(Box<[u8]>, Value::Blob);
impl_as_value!(Vec<u8>, Value::Blob);
impl_as_value!(Uuid, Value::Uuid);
impl_as_value!(OffsetDateTime, Value::Timestamp);

impl<T: AsValue> AsValue for Option<T> {
    fn as_empty_value() -> Value {
        T::as_empty_value()
    }
    fn as_value(self) -> Value {
        match self {
            Some(v) => v.as_value(),
            None => T::as_empty_value(),
        }
    }
    fn try_from_value(value: Value) -> Result<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::try_from_value(value).map(Some)
        }
    }
}

impl<T: AsValue> From<T> for Value {
    fn from(value: T) -> Self {
        value.as_value()
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Varchar(Some(value.to_owned()))
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Value::Blob(Some(value.into()))
    }
}

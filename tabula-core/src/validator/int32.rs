use super::{DataState, FieldValidator, current, resolve};
use crate::{CrudError, Record, Result, Value};

/// 32-bit integer field with an optional range.
///
/// Wider integers are accepted when they fit. The canonical value is [`Value::Int32`].
#[derive(Debug, Default, Clone)]
pub struct Int32Validator {
    pub not_null: bool,
    pub default: Option<Value>,
    /// Range bounds, ignored when both are zero. `max == 0` leaves the range open above.
    pub min: i32,
    pub max: i32,
}

impl Int32Validator {
    fn coerce(&self, field: &str, value: &Value) -> Result<i32> {
        match value {
            Value::Int8(..)
            | Value::Int16(..)
            | Value::Int32(..)
            | Value::Int64(..)
            | Value::UInt8(..)
            | Value::UInt16(..)
            | Value::UInt32(..)
            | Value::UInt64(..) => value
                .as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .ok_or_else(|| {
                    CrudError::constraint(field, format!("{} is out of range for i32", value))
                        .into()
                }),
            _ => Err(CrudError::type_mismatch(field, "i32", value).into()),
        }
    }
}

impl FieldValidator for Int32Validator {
    fn validate_field(&self, record: &mut Record, field: &str, _state: DataState) -> Result<()> {
        let value = match current(record, field) {
            Some(v) => {
                let v = self.coerce(field, v)?;
                if self.min != 0 || self.max != 0 {
                    if v < self.min {
                        return Err(CrudError::constraint(
                            field,
                            format!("{} is less than the minimum {}", v, self.min),
                        )
                        .into());
                    }
                    if self.max > 0 && v > self.max {
                        return Err(CrudError::constraint(
                            field,
                            format!("{} is greater than the maximum {}", v, self.max),
                        )
                        .into());
                    }
                }
                Some(Value::Int32(Some(v)))
            }
            None => None,
        };
        resolve(record, field, value, self.default.as_ref(), self.not_null)
    }
}

use super::{DataState, FieldValidator, current, resolve};
use crate::{CrudError, Record, Result, Value};

/// Boolean field. Integers `0` and `1` are read as `false` and `true`.
#[derive(Debug, Default, Clone)]
pub struct BoolValidator {
    pub not_null: bool,
    pub default: Option<Value>,
}

impl FieldValidator for BoolValidator {
    fn validate_field(&self, record: &mut Record, field: &str, _state: DataState) -> Result<()> {
        let value = match current(record, field) {
            Some(Value::Boolean(Some(v))) => Some(*v),
            Some(v) => match v.as_i64() {
                Some(0) => Some(false),
                Some(1) => Some(true),
                _ => return Err(CrudError::type_mismatch(field, "bool", v).into()),
            },
            None => None,
        };
        resolve(
            record,
            field,
            value.map(|v| Value::Boolean(Some(v))),
            self.default.as_ref(),
            self.not_null,
        )
    }
}

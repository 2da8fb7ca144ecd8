use super::{DataState, FieldValidator, current, resolve};
use crate::{CrudError, Record, Result, Value};
use uuid::Uuid;

/// Universally unique identifier field.
///
/// Accepts [`Value::Uuid`], its textual form, or a blob holding either the 16 raw bytes or
/// the text. The canonical value is [`Value::Uuid`]. With `auto_generate` a missing value
/// gets a fresh time ordered (v7) identifier before a write. Loaded rows with a null uid are
/// left null.
#[derive(Debug, Default, Clone)]
pub struct UidValidator {
    pub not_null: bool,
    pub default: Option<Value>,
    pub auto_generate: bool,
}

fn parse(field: &str, value: &Value) -> Result<Uuid> {
    let invalid = || -> crate::Error { CrudError::constraint(field, "is not a valid UID").into() };
    match value {
        Value::Uuid(Some(v)) => Ok(*v),
        Value::Varchar(Some(v)) => Uuid::try_parse(v.trim()).map_err(|_| invalid()),
        Value::Blob(Some(v)) if v.len() == 16 => Uuid::from_slice(v).map_err(|_| invalid()),
        Value::Blob(Some(v)) => std::str::from_utf8(v)
            .ok()
            .and_then(|v| Uuid::try_parse(v.trim()).ok())
            .ok_or_else(invalid),
        _ => Err(CrudError::type_mismatch(field, "uid", value).into()),
    }
}

impl FieldValidator for UidValidator {
    fn validate_field(&self, record: &mut Record, field: &str, state: DataState) -> Result<()> {
        let mut value = match current(record, field) {
            Some(v) => Some(parse(field, v)?),
            None => None,
        };
        if value.is_none() && self.auto_generate && state.is_write() {
            value = Some(Uuid::now_v7());
        }
        resolve(
            record,
            field,
            value.map(|v| Value::Uuid(Some(v))),
            self.default.as_ref(),
            self.not_null,
        )
    }
}

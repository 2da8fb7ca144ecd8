use super::{DataState, FieldValidator, current, now_unix, resolve};
use crate::{CrudError, Record, Result, Value};
use time::{
    Date, OffsetDateTime, PrimitiveDateTime, format_description::well_known::Rfc3339, macros::format_description,
};

/// 64-bit integer field, optionally holding a unix timestamp.
///
/// Accepts every integer variant. Strings are parsed as integers, or as timestamps
/// (`2006-01-02`, `2006-01-02 15:04:05`, RFC 3339) when `timestamp` is set, in which case
/// [`Value::Timestamp`] is accepted as well. The canonical value is [`Value::Int64`].
#[derive(Debug, Default, Clone)]
pub struct Int64Validator {
    pub not_null: bool,
    pub default: Option<Value>,
    /// Range bounds, ignored when both are zero. `max == 0` leaves the range open above.
    pub min: i64,
    pub max: i64,
    pub timestamp: bool,
    /// Reject values later than the current unix time.
    pub past_only: bool,
    /// Overwrite with the current unix time when inserting.
    pub insert_now: bool,
    /// Overwrite with the current unix time when updating.
    pub update_now: bool,
}

impl Int64Validator {
    fn coerce(&self, field: &str, value: &Value) -> Result<i64> {
        match value {
            Value::Int8(..)
            | Value::Int16(..)
            | Value::Int32(..)
            | Value::Int64(..)
            | Value::UInt8(..)
            | Value::UInt16(..)
            | Value::UInt32(..)
            | Value::UInt64(..) => value.as_i64().ok_or_else(|| {
                CrudError::constraint(field, format!("{} is out of range for i64", value)).into()
            }),
            Value::Varchar(Some(v)) if self.timestamp => parse_timestamp(v).ok_or_else(|| {
                CrudError::constraint(field, format!("`{}` is not a valid timestamp", v)).into()
            }),
            Value::Varchar(Some(v)) => v.trim().parse::<i64>().map_err(|_| {
                CrudError::constraint(field, format!("`{}` is not a valid integer", v)).into()
            }),
            Value::Timestamp(Some(v)) if self.timestamp => Ok(v.unix_timestamp()),
            _ => Err(CrudError::type_mismatch(field, "i64", value).into()),
        }
    }

    fn check(&self, field: &str, value: i64) -> Result<()> {
        if self.min != 0 || self.max != 0 {
            if value < self.min {
                return Err(CrudError::constraint(
                    field,
                    format!("{} is less than the minimum {}", value, self.min),
                )
                .into());
            }
            if self.max > 0 && value > self.max {
                return Err(CrudError::constraint(
                    field,
                    format!("{} is greater than the maximum {}", value, self.max),
                )
                .into());
            }
        }
        if self.past_only && value > now_unix() {
            return Err(CrudError::constraint(field, "is not in the past").into());
        }
        Ok(())
    }
}

impl FieldValidator for Int64Validator {
    fn validate_field(&self, record: &mut Record, field: &str, state: DataState) -> Result<()> {
        let mut value = match current(record, field) {
            Some(v) => {
                let v = self.coerce(field, v)?;
                self.check(field, v)?;
                Some(v)
            }
            None => None,
        };
        if (self.insert_now && state == DataState::Insert)
            || (self.update_now && state == DataState::Update)
        {
            value = Some(now_unix());
        }
        resolve(
            record,
            field,
            value.map(|v| Value::Int64(Some(v))),
            self.default.as_ref(),
            self.not_null,
        )
    }
}

/// Unix time of a date, a `date time` (both UTC) or an RFC 3339 string.
pub fn parse_timestamp(value: &str) -> Option<i64> {
    let value = value.trim();
    if let Ok(date) = Date::parse(value, format_description!("[year]-[month]-[day]")) {
        return Some(date.midnight().assume_utc().unix_timestamp());
    }
    if let Ok(date_time) = PrimitiveDateTime::parse(
        value,
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    ) {
        return Some(date_time.assume_utc().unix_timestamp());
    }
    OffsetDateTime::parse(value, &Rfc3339)
        .ok()
        .map(|v| v.unix_timestamp())
}

#[cfg(test)]
mod tests {
    use super::parse_timestamp;

    #[test]
    fn timestamps() {
        assert_eq!(parse_timestamp("1970-01-02"), Some(86_400));
        assert_eq!(parse_timestamp("1970-01-01 01:00:01"), Some(3_601));
        assert_eq!(parse_timestamp("1970-01-01T00:00:10+00:00"), Some(10));
        assert_eq!(parse_timestamp("2000-01-01T01:00:00+01:00"), Some(946_684_800));
        assert_eq!(parse_timestamp("yesterday"), None);
    }
}

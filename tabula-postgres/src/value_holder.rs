use bytes::BytesMut;
use postgres_types::{FromSql, IsNull, ToSql, Type, to_sql_checked};
use std::{any, error::Error};
use tabula_core::Value;
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset, format_description::well_known::Rfc3339};
use uuid::Uuid;

type BoxError = Box<dyn Error + Sync + Send>;

/// Bridge between [`Value`] and the postgres wire types.
///
/// Parameters are converted to the type the server expects for them, so an `i32` record value
/// binds to a `BIGINT` column and a textual uid binds to `UUID`.
#[derive(Debug)]
pub struct ValueHolder(pub Value);

impl From<Value> for ValueHolder {
    fn from(value: Value) -> Self {
        ValueHolder(value)
    }
}

fn decode<'a, T: FromSql<'a>>(ty: &Type, raw: Option<&'a [u8]>) -> Result<Option<T>, BoxError> {
    raw.map(|raw| T::from_sql(ty, raw)).transpose()
}

impl<'a> FromSql<'a> for ValueHolder {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        Self::from_sql_nullable(ty, Some(raw))
    }
    fn from_sql_null(ty: &Type) -> Result<Self, BoxError> {
        Self::from_sql_nullable(ty, None)
    }
    fn from_sql_nullable(ty: &Type, raw: Option<&'a [u8]>) -> Result<Self, BoxError> {
        let value = match *ty {
            Type::BOOL => Value::Boolean(decode(ty, raw)?),
            Type::CHAR => Value::Int8(decode(ty, raw)?),
            Type::INT2 => Value::Int16(decode(ty, raw)?),
            Type::INT4 => Value::Int32(decode(ty, raw)?),
            Type::INT8 => Value::Int64(decode(ty, raw)?),
            Type::OID => Value::UInt32(decode(ty, raw)?),
            Type::FLOAT4 => Value::Float64(decode::<f32>(ty, raw)?.map(f64::from)),
            Type::FLOAT8 => Value::Float64(decode(ty, raw)?),
            Type::VARCHAR | Type::TEXT | Type::NAME | Type::BPCHAR | Type::JSON | Type::XML => {
                Value::Varchar(decode(ty, raw)?)
            }
            Type::BYTEA => Value::Blob(decode::<Vec<u8>>(ty, raw)?.map(Into::into)),
            Type::UUID => Value::Uuid(decode(ty, raw)?),
            Type::TIMESTAMP => Value::Timestamp(
                decode::<PrimitiveDateTime>(ty, raw)?.map(PrimitiveDateTime::assume_utc),
            ),
            Type::TIMESTAMPTZ => Value::Timestamp(decode(ty, raw)?),
            _ if raw.is_none() => Value::Null,
            _ => return Err(format!("Cannot decode sql type `{}`", ty).into()),
        };
        Ok(value.into())
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

fn mismatch(value: &Value, ty: &Type) -> BoxError {
    format!(
        "Cannot bind a {} value `{}` to a parameter of type `{}`",
        value.kind_name(),
        value,
        ty
    )
    .into()
}

fn integer<T: TryFrom<i64>>(value: &Value, ty: &Type) -> Result<T, BoxError> {
    let wide = match value {
        Value::Boolean(Some(v)) => Some(*v as i64),
        Value::Varchar(Some(v)) => v.trim().parse().ok(),
        v => v.as_i64(),
    };
    wide.and_then(|v| T::try_from(v).ok()).ok_or_else(|| {
        format!(
            "Cannot bind `{}` to a parameter of type `{}` ({})",
            value,
            ty,
            any::type_name::<T>()
        )
        .into()
    })
}

fn float(value: &Value, ty: &Type) -> Result<f64, BoxError> {
    match value {
        Value::Float64(Some(v)) => Ok(*v),
        Value::Varchar(Some(v)) => v.trim().parse().map_err(|_| mismatch(value, ty)),
        v => v.as_i64().map(|v| v as f64).ok_or_else(|| mismatch(value, ty)),
    }
}

fn timestamp(value: &Value, ty: &Type) -> Result<OffsetDateTime, BoxError> {
    match value {
        Value::Timestamp(Some(v)) => Ok(*v),
        Value::Varchar(Some(v)) => {
            OffsetDateTime::parse(v.trim(), &Rfc3339).map_err(|_| mismatch(value, ty))
        }
        v => match v.as_i64() {
            Some(v) => Ok(OffsetDateTime::from_unix_timestamp(v)?),
            None => Err(mismatch(value, ty)),
        },
    }
}

fn text(value: &Value, ty: &Type) -> Result<String, BoxError> {
    Ok(match value {
        Value::Varchar(Some(v)) => v.clone(),
        Value::Timestamp(Some(v)) => v.format(&Rfc3339)?,
        Value::Blob(..) | Value::Null => return Err(mismatch(value, ty)),
        // Every other non null value prints without quotes
        v => v.to_string(),
    })
}

impl ToSql for ValueHolder {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError>
    where
        Self: Sized,
    {
        let value = &self.0;
        if value.is_null() {
            return Ok(IsNull::Yes);
        }
        match *ty {
            Type::BOOL => match value {
                Value::Boolean(Some(v)) => v.to_sql(ty, out),
                v => match v.as_i64() {
                    Some(0) => false.to_sql(ty, out),
                    Some(1) => true.to_sql(ty, out),
                    _ => Err(mismatch(value, ty)),
                },
            },
            Type::CHAR => integer::<i8>(value, ty)?.to_sql(ty, out),
            Type::INT2 => integer::<i16>(value, ty)?.to_sql(ty, out),
            Type::INT4 => integer::<i32>(value, ty)?.to_sql(ty, out),
            Type::INT8 => integer::<i64>(value, ty)?.to_sql(ty, out),
            Type::OID => integer::<u32>(value, ty)?.to_sql(ty, out),
            Type::FLOAT4 => (float(value, ty)? as f32).to_sql(ty, out),
            Type::FLOAT8 => float(value, ty)?.to_sql(ty, out),
            Type::UUID => match value {
                Value::Uuid(Some(v)) => v.to_sql(ty, out),
                Value::Varchar(Some(v)) => Uuid::try_parse(v.trim())?.to_sql(ty, out),
                _ => Err(mismatch(value, ty)),
            },
            Type::BYTEA => match value {
                Value::Blob(Some(v)) => v.as_ref().to_sql(ty, out),
                Value::Varchar(Some(v)) => v.as_bytes().to_sql(ty, out),
                _ => Err(mismatch(value, ty)),
            },
            Type::TIMESTAMPTZ => timestamp(value, ty)?.to_sql(ty, out),
            Type::TIMESTAMP => {
                let v = timestamp(value, ty)?.to_offset(UtcOffset::UTC);
                PrimitiveDateTime::new(v.date(), v.time()).to_sql(ty, out)
            }
            _ => text(value, ty)?.to_sql(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool
    where
        Self: Sized,
    {
        true
    }

    to_sql_checked!();
}

#[cfg(test)]
mod tests {
    use super::ValueHolder;
    use bytes::BytesMut;
    use postgres_types::{FromSql, IsNull, ToSql, Type};
    use tabula_core::Value;

    #[test]
    fn integers_follow_the_parameter_type() {
        let mut out = BytesMut::new();
        ValueHolder(Value::Int32(Some(7)))
            .to_sql(&Type::INT8, &mut out)
            .expect("i32 must bind to int8");
        assert_eq!(&out[..], 7i64.to_be_bytes());
        let mut out = BytesMut::new();
        assert!(
            ValueHolder(Value::Int64(Some(i64::MAX)))
                .to_sql(&Type::INT4, &mut out)
                .is_err()
        );
    }

    #[test]
    fn nulls() {
        let mut out = BytesMut::new();
        let is_null = ValueHolder(Value::Varchar(None))
            .to_sql(&Type::INT8, &mut out)
            .expect("null binds to anything");
        assert!(matches!(is_null, IsNull::Yes));
        let value = ValueHolder::from_sql_null(&Type::INT4).expect("null decodes");
        assert_eq!(value.0, Value::Int32(None));
    }

    #[test]
    fn decode() {
        let value = ValueHolder::from_sql(&Type::INT2, &5i16.to_be_bytes()).expect("int2 decodes");
        assert!(matches!(value.0, Value::Int16(Some(5))));
        let value = ValueHolder::from_sql(&Type::TEXT, b"tabula").expect("text decodes");
        assert_eq!(value.0, Value::from("tabula"));
    }
}

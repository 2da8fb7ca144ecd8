use super::{DataState, FieldValidator, current, resolve};
use crate::{Context, CrudError, Record, Result, Value};
use time::format_description::well_known::Rfc3339;

pub const DEFAULT_PASSWORD_COST: u32 = bcrypt::DEFAULT_COST;

/// Text field with length and word count rules, optionally storing a password hash.
///
/// Accepts [`Value::Varchar`], UTF-8 blobs, UIDs and timestamps (RFC 3339). Trimming,
/// length checks, word counts and hashing only happen when the record is about to be
/// written: values read back from storage are taken as they are.
///
/// Lengths are counted in characters. Zero bounds are not checked.
#[derive(Debug, Default, Clone)]
pub struct StringValidator {
    pub not_null: bool,
    pub default: Option<Value>,
    pub min_len: usize,
    pub max_len: usize,
    pub min_words: usize,
    pub max_words: usize,
    /// Keep leading and trailing whitespace.
    pub no_trim: bool,
    /// Store the bcrypt hash of the value. Passwords are not trimmed unless `trim_password`.
    pub password: bool,
    pub trim_password: bool,
    /// Bcrypt cost, [`DEFAULT_PASSWORD_COST`] when unset.
    pub password_cost: Option<u32>,
}

impl StringValidator {
    fn coerce(&self, field: &str, value: &Value) -> Result<String> {
        match value {
            Value::Varchar(Some(v)) => Ok(v.clone()),
            Value::Blob(Some(v)) => String::from_utf8(v.to_vec())
                .map_err(|_| CrudError::type_mismatch(field, "string", value).into()),
            Value::Uuid(Some(v)) => Ok(v.to_string()),
            Value::Timestamp(Some(v)) => v
                .format(&Rfc3339)
                .map_err(|_| CrudError::type_mismatch(field, "string", value).into()),
            _ => Err(CrudError::type_mismatch(field, "string", value).into()),
        }
    }

    fn trims(&self) -> bool {
        !self.no_trim && (!self.password || self.trim_password)
    }

    fn check(&self, field: &str, value: &str) -> Result<()> {
        let len = value.chars().count();
        if self.min_len > 0 && len < self.min_len {
            return Err(CrudError::constraint(
                field,
                format!("must be at least {} characters long", self.min_len),
            )
            .into());
        }
        if self.max_len > 0 && len > self.max_len {
            return Err(CrudError::constraint(
                field,
                format!("must be at most {} characters long", self.max_len),
            )
            .into());
        }
        if self.min_words > 0 || self.max_words > 0 {
            let words = value.split_whitespace().count();
            if self.min_words > 0 && words < self.min_words {
                return Err(CrudError::constraint(
                    field,
                    format!("must contain at least {} words", self.min_words),
                )
                .into());
            }
            if self.max_words > 0 && words > self.max_words {
                return Err(CrudError::constraint(
                    field,
                    format!("must contain at most {} words", self.max_words),
                )
                .into());
            }
        }
        Ok(())
    }
}

impl FieldValidator for StringValidator {
    fn validate_field(&self, record: &mut Record, field: &str, state: DataState) -> Result<()> {
        let value = match current(record, field) {
            Some(v) => {
                let mut v = self.coerce(field, v)?;
                if state.is_write() {
                    if self.trims() {
                        let trimmed = v.trim();
                        if trimmed.len() != v.len() {
                            v = trimmed.to_owned();
                        }
                    }
                    self.check(field, &v)?;
                    if self.password {
                        v = bcrypt::hash(&v, self.password_cost.unwrap_or(DEFAULT_PASSWORD_COST))
                            .with_context(|| format!("Could not hash field `{}`", field))?;
                    }
                }
                Some(Value::Varchar(Some(v)))
            }
            None => None,
        };
        resolve(record, field, value, self.default.as_ref(), self.not_null)
    }

    fn keeps_stored(&self) -> bool {
        self.password
    }
}

/// Whether the value has the shape of a modular crypt bcrypt hash (`$2b$10$...`).
pub fn is_bcrypt_hash(value: &str) -> bool {
    let v = value.as_bytes();
    v.len() == 60
        && v[0] == b'$'
        && v[1] == b'2'
        && matches!(v[2], b'a' | b'b' | b'x' | b'y')
        && v[3] == b'$'
        && v[4].is_ascii_digit()
        && v[5].is_ascii_digit()
        && v[6] == b'$'
        && v[7..]
            .iter()
            .all(|c| c.is_ascii_alphanumeric() || *c == b'.' || *c == b'/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bcrypt_shape() {
        assert!(is_bcrypt_hash(
            "$2b$04$EGdrhbKUv8Oc9vGiXX0HQOxSg445d458Muh7DAHskb6QbtCvdxcie"
        ));
        assert!(!is_bcrypt_hash("hunter2"));
        assert!(!is_bcrypt_hash(
            "$2b$04$EGdrhbKUv8Oc9vGiXX0HQOxSg445d458Muh7DAHskb6QbtCvdxci!"
        ));
    }

    #[test]
    fn trim_rules() {
        assert!(StringValidator::default().trims());
        assert!(
            !StringValidator {
                no_trim: true,
                ..Default::default()
            }
            .trims()
        );
        assert!(
            !StringValidator {
                password: true,
                ..Default::default()
            }
            .trims()
        );
        assert!(
            StringValidator {
                password: true,
                trim_password: true,
                ..Default::default()
            }
            .trims()
        );
    }
}

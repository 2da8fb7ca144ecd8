mod boolean;
mod email;
mod int32;
mod int64;
mod string;
mod uid;

pub use boolean::*;
pub use email::*;
pub use int32::*;
pub use int64::*;
pub use string::*;
pub use uid::*;

use crate::{CrudError, Record, Result, Value};
use time::OffsetDateTime;

/// Origin or intent of a record being validated.
///
/// Chosen by the call site, never stored: inserts validate with [`DataState::Insert`],
/// updates with [`DataState::Update`] and rows coming back from storage with
/// [`DataState::Loaded`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataState {
    #[default]
    Unknown,
    Insert,
    Update,
    Loaded,
}

impl DataState {
    /// Whether the record is about to be written.
    pub fn is_write(&self) -> bool {
        matches!(self, DataState::Insert | DataState::Update)
    }
}

/// Rule attached to a column, applied to one field of a record.
///
/// Implementations may rewrite the field (canonical type, trimming, hashing, defaults).
pub trait FieldValidator: Send + Sync {
    fn validate_field(&self, record: &mut Record, field: &str, state: DataState) -> Result<()>;

    /// Whether a value merged from storage into an update skips this validator.
    ///
    /// True for one way transformations like hashing: the stored value is already their output.
    fn keeps_stored(&self) -> bool {
        false
    }
}

/// Cross-field rule owned by the record type wrapping a table.
pub trait RecordValidator: Send + Sync {
    fn validate(&self, record: &mut Record, state: DataState) -> Result<()>;
}

/// Runs the field validators of every column over a record.
pub trait FieldValidatorsRunner: Send + Sync {
    fn run_field_validators(&self, record: &mut Record, state: DataState) -> Result<()>;
}

/// Build a `Vec<Box<dyn FieldValidator>>` out of validator values.
///
/// ```rust
/// use tabula_core::{Int64Validator, StringValidator, validators};
/// let v = validators![
///     Int64Validator { min: 1, ..Default::default() },
///     StringValidator { not_null: true, ..Default::default() },
/// ];
/// assert_eq!(v.len(), 2);
/// ```
#[macro_export]
macro_rules! validators {
    () => {
        ::std::vec::Vec::<::std::boxed::Box<dyn $crate::FieldValidator>>::new()
    };
    ($($validator:expr),+ $(,)?) => {
        ::std::vec![$(::std::boxed::Box::new($validator) as ::std::boxed::Box<dyn $crate::FieldValidator>),+]
    };
}

/// Current value of the field, `None` when absent or null.
pub(crate) fn current<'r>(record: &'r Record, field: &str) -> Option<&'r Value> {
    record.get(field).filter(|v| !v.is_null())
}

/// Final stage shared by the validators: default, not-null, write back.
///
/// A field that stays without value is left as the caller gave it (absent or null).
pub(crate) fn resolve(
    record: &mut Record,
    field: &str,
    value: Option<Value>,
    default: Option<&Value>,
    not_null: bool,
) -> Result<()> {
    match value.or_else(|| default.filter(|v| !v.is_null()).cloned()) {
        Some(value) => {
            record.insert(field.to_owned(), value);
            Ok(())
        }
        None if not_null => Err(CrudError::NotNull(field.to_owned()).into()),
        None => Ok(()),
    }
}

pub(crate) fn now_unix() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

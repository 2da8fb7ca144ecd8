use crate::Value;
use std::collections::BTreeMap;

/// Unit of data flowing through the pipeline: column name to value.
///
/// A missing key means the field is unset, a null [`Value`] means it is explicitly null.
/// The same shape is used for insert and update payloads, key lookups and query rows.
pub type Record = BTreeMap<String, Value>;

/// Key receiving the last auto-increment value generated by an insert.
pub const RESULT_AUTO_INCREMENT: &str = "__autoinc__";

/// Key receiving the number of rows touched by an insert, update or delete.
pub const RESULT_ROWS_AFFECTED: &str = "__rows_affected__";

/// Rows affected written into the record by the last mutation, if any.
pub fn rows_affected(record: &Record) -> Option<i64> {
    record.get(RESULT_ROWS_AFFECTED).and_then(Value::as_i64)
}

/// Last auto-increment value written into the record by an insert, if any.
pub fn last_auto_increment(record: &Record) -> Option<i64> {
    record.get(RESULT_AUTO_INCREMENT).and_then(Value::as_i64)
}

/// Build a [`Record`] from `name => value` pairs.
///
/// ```rust
/// use tabula_core::{Value, record};
/// let r = record! { "id" => 1i64, "name" => "tabula" };
/// assert_eq!(r["name"], Value::Varchar(Some("tabula".into())));
/// ```
#[macro_export]
macro_rules! record {
    () => {
        $crate::Record::new()
    };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut record = $crate::Record::new();
        $(
            record.insert(::std::string::String::from($name), $crate::Value::from($value));
        )+
        record
    }};
}

use crate::error_message_from_ptr;
use libsqlite3_sys::*;
use std::{
    ffi::{CStr, c_int},
    os::raw::{c_char, c_void},
    slice,
};
use tabula_core::{Error, Result, Value, truncate_long};

pub(crate) fn extract_value(statement: *mut sqlite3_stmt, index: c_int) -> Result<Value> {
    unsafe {
        let column_type = sqlite3_column_type(statement, index);
        Ok(match column_type {
            SQLITE_NULL => Value::Null,
            SQLITE_INTEGER => Value::Int64(Some(sqlite3_column_int64(statement, index))),
            SQLITE_FLOAT => Value::Float64(Some(sqlite3_column_double(statement, index))),
            SQLITE_BLOB => {
                let ptr = sqlite3_column_blob(statement, index) as *const u8;
                let len = sqlite3_column_bytes(statement, index) as usize;
                if ptr.is_null() {
                    Value::Blob(Some(Box::default()))
                } else {
                    Value::Blob(Some(slice::from_raw_parts(ptr, len).into()))
                }
            }
            SQLITE_TEXT => {
                let ptr = sqlite3_column_text(statement, index);
                let len = sqlite3_column_bytes(statement, index) as usize;
                if ptr.is_null() {
                    Value::Varchar(Some(String::new()))
                } else {
                    Value::Varchar(Some(
                        String::from_utf8_lossy(slice::from_raw_parts(ptr, len)).into_owned(),
                    ))
                }
            }
            _ => {
                return Err(Error::msg(format!(
                    "Unexpected column type {}",
                    column_type
                )));
            }
        })
    }
}

pub(crate) fn extract_name(statement: *mut sqlite3_stmt, index: c_int) -> Result<String> {
    unsafe {
        Ok(CStr::from_ptr(sqlite3_column_name(statement, index))
            .to_str()?
            .into())
    }
}

fn bind_text(statement: *mut sqlite3_stmt, index: c_int, value: &str) -> c_int {
    unsafe {
        sqlite3_bind_text(
            statement,
            index,
            value.as_ptr() as *const c_char,
            value.len() as c_int,
            SQLITE_TRANSIENT(),
        )
    }
}

/// Bind `value` to the 1-based parameter `index`, sqlite copies the data.
pub(crate) fn bind_value(statement: *mut sqlite3_stmt, index: c_int, value: &Value) -> Result<()> {
    unsafe {
        let rc = match value {
            v if v.is_null() => sqlite3_bind_null(statement, index),
            Value::Boolean(Some(v)) => sqlite3_bind_int(statement, index, *v as c_int),
            Value::Int8(Some(v)) => sqlite3_bind_int(statement, index, *v as c_int),
            Value::Int16(Some(v)) => sqlite3_bind_int(statement, index, *v as c_int),
            Value::Int32(Some(v)) => sqlite3_bind_int(statement, index, *v as c_int),
            Value::Int64(Some(v)) => sqlite3_bind_int64(statement, index, *v),
            Value::UInt8(Some(v)) => sqlite3_bind_int(statement, index, *v as c_int),
            Value::UInt16(Some(v)) => sqlite3_bind_int(statement, index, *v as c_int),
            Value::UInt32(Some(v)) => sqlite3_bind_int64(statement, index, *v as sqlite3_int64),
            Value::UInt64(Some(v)) => {
                let Ok(v) = sqlite3_int64::try_from(*v) else {
                    return Err(Error::msg(format!(
                        "Cannot bind u64 value `{}` into sqlite integer because it's out of bounds",
                        v
                    )));
                };
                sqlite3_bind_int64(statement, index, v)
            }
            Value::Float64(Some(v)) => sqlite3_bind_double(statement, index, *v),
            Value::Varchar(Some(v)) => bind_text(statement, index, v),
            Value::Blob(Some(v)) => sqlite3_bind_blob(
                statement,
                index,
                v.as_ptr() as *const c_void,
                v.len() as c_int,
                SQLITE_TRANSIENT(),
            ),
            Value::Uuid(Some(v)) => bind_text(statement, index, &v.to_string()),
            Value::Timestamp(Some(v)) => sqlite3_bind_int64(statement, index, v.unix_timestamp()),
            _ => {
                return Err(Error::msg(format!(
                    "Cannot use a {:?} as a query parameter",
                    value
                )));
            }
        };
        if rc != SQLITE_OK {
            let db = sqlite3_db_handle(statement);
            let query = sqlite3_sql(statement);
            return Err(
                Error::msg(error_message_from_ptr(&sqlite3_errmsg(db)).to_string()).context(
                    format!(
                        "Cannot bind parameter {} to query:\n{}",
                        index,
                        truncate_long!(CStr::from_ptr(query).to_string_lossy())
                    ),
                ),
            );
        }
        Ok(())
    }
}

/// Bind the parameters the statement declares, a script shares them between its statements.
pub(crate) fn bind_params(statement: *mut sqlite3_stmt, params: &[Value]) -> Result<()> {
    let count = unsafe { sqlite3_bind_parameter_count(statement) } as usize;
    for (i, value) in params.iter().take(count).enumerate() {
        bind_value(statement, (i + 1) as c_int, value)?;
    }
    Ok(())
}

/// Whether the statement writes a row, sqlite reports the rowid only for those.
pub(crate) fn is_insert(statement: *mut sqlite3_stmt) -> bool {
    let sql = unsafe { sqlite3_sql(statement) };
    if sql.is_null() {
        return false;
    }
    let sql = unsafe { CStr::from_ptr(sql) }.to_string_lossy();
    let sql = sql.trim_start();
    ["INSERT", "REPLACE"]
        .iter()
        .any(|v| sql.get(..v.len()).is_some_and(|s| s.eq_ignore_ascii_case(v)))
}

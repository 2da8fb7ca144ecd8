use crate::{
    BACKEND, CBox, SqliteSqlWriter, SqliteTransaction, error_message_from_ptr,
    extract::{bind_params, extract_name, extract_value, is_insert},
};
use async_stream::try_stream;
use libsqlite3_sys::{
    SQLITE_BUSY, SQLITE_DONE, SQLITE_OK, SQLITE_OPEN_CREATE, SQLITE_OPEN_READWRITE,
    SQLITE_OPEN_URI, SQLITE_ROW, sqlite3, sqlite3_close, sqlite3_column_count,
    sqlite3_errmsg, sqlite3_finalize, sqlite3_last_insert_rowid, sqlite3_open_v2,
    sqlite3_prepare_v2, sqlite3_step, sqlite3_stmt, sqlite3_total_changes64,
};
use std::{
    ffi::{CString, c_int},
    pin::pin,
    ptr,
    sync::{
        Arc,
        atomic::{AtomicPtr, Ordering},
    },
};
use tabula_core::{
    Connection, Context, Error, Executor, Query, QueryResult, Result, Row, RowLabeled, RowNames,
    RowsAffected, log_error,
    stream::{BoxStream, Stream, StreamExt, TryStreamExt},
};
use tokio::{
    sync::{Mutex, MutexGuard},
    task::spawn_blocking,
};

/// Connection to a sqlite database, statements run one at a time.
///
/// An open row stream keeps the connection busy until it is exhausted or dropped, an open
/// [`SqliteTransaction`] until it is committed, rolled back or dropped.
pub struct SqliteConnection {
    pub(crate) connection: Mutex<CBox<*mut sqlite3>>,
}

fn last_error(connection: &CBox<*mut sqlite3>) -> Error {
    unsafe { Error::msg(error_message_from_ptr(&sqlite3_errmsg(**connection)).to_string()) }
}

/// Prepare the first statement of `sql[offset..]`, returns it with the offset of the rest.
async fn prepare(
    connection: &CBox<*mut sqlite3>,
    sql: Arc<CString>,
    offset: usize,
) -> Result<(CBox<*mut sqlite3_stmt>, usize)> {
    let connection = AtomicPtr::new(**connection);
    spawn_blocking(move || unsafe {
        let connection = connection.load(Ordering::Relaxed);
        let bytes = sql.as_bytes();
        let mut statement = CBox::new(ptr::null_mut(), |p| {
            sqlite3_finalize(p);
        });
        let mut tail = ptr::null();
        let rc = sqlite3_prepare_v2(
            connection,
            sql.as_ptr().add(offset),
            (bytes.len() - offset) as c_int,
            &mut *statement,
            &mut tail,
        );
        if rc != SQLITE_OK {
            return Err(Error::msg(
                error_message_from_ptr(&sqlite3_errmsg(connection)).to_string(),
            ));
        }
        let next = if tail.is_null() {
            bytes.len()
        } else {
            tail.offset_from(sql.as_ptr()) as usize
        };
        Ok((statement, next))
    })
    .await?
}

fn step(statement: &CBox<*mut sqlite3_stmt>) -> c_int {
    unsafe { sqlite3_step(**statement) }
}

fn total_changes(connection: &CBox<*mut sqlite3>) -> i64 {
    unsafe { sqlite3_total_changes64(**connection) }
}

/// Effect of a statement without result columns, `before` is the total changes counter
/// sampled before stepping it.
fn affected(
    connection: &CBox<*mut sqlite3>,
    statement: &CBox<*mut sqlite3_stmt>,
    before: i64,
) -> RowsAffected {
    RowsAffected {
        rows_affected: (total_changes(connection) - before).max(0) as u64,
        last_affected_id: is_insert(**statement)
            .then(|| unsafe { sqlite3_last_insert_rowid(**connection) }),
    }
}

/// Run every statement of the query, binding the parameters to each.
pub(crate) fn run_statements<'a>(
    connection: &'a CBox<*mut sqlite3>,
    query: Query,
) -> impl Stream<Item = Result<QueryResult>> + Send + 'a {
    try_stream! {
        let sql = Arc::new(
            CString::new(query.sql.as_bytes())
                .context("Could not create a CString from the query String")?,
        );
        let len = sql.as_bytes().len();
        let mut offset = 0;
        while offset < len {
            let (statement, next) = prepare(connection, sql.clone(), offset).await?;
            if next <= offset {
                break;
            }
            offset = next;
            if statement.is_null() {
                continue;
            }
            bind_params(*statement, &query.params)?;
            let count = unsafe { sqlite3_column_count(*statement) };
            let before = total_changes(connection);
            let labels: RowNames = (0..count)
                .map(|i| extract_name(*statement, i))
                .collect::<Result<Vec<_>>>()?
                .into();
            loop {
                let rc = step(&statement);
                match rc {
                    SQLITE_BUSY => continue,
                    SQLITE_DONE => break,
                    SQLITE_ROW => {
                        let values = (0..count)
                            .map(|i| extract_value(*statement, i))
                            .collect::<Result<Row>>()?;
                        yield QueryResult::Row(RowLabeled::new(labels.clone(), values));
                    }
                    _ => Err(last_error(connection))?,
                }
            }
            if count == 0 {
                yield QueryResult::Affected(affected(connection, &statement, before));
            }
        }
    }
}

/// Something holding the database handle: the connection itself or a guard of it.
pub(crate) trait SqliteHandle: Send + Sync {
    fn handle(&self) -> &CBox<*mut sqlite3>;
}

impl SqliteHandle for CBox<*mut sqlite3> {
    fn handle(&self) -> &CBox<*mut sqlite3> {
        self
    }
}

impl SqliteHandle for MutexGuard<'_, CBox<*mut sqlite3>> {
    fn handle(&self) -> &CBox<*mut sqlite3> {
        self
    }
}

/// Lock `connection` for the lifetime of the stream and run the query on it.
pub(crate) fn run_locked<'s, T: SqliteHandle + 's>(
    connection: &'s Mutex<T>,
    query: Query,
) -> BoxStream<'s, Result<QueryResult>> {
    let context = format!("While running the query:\n{}", query);
    try_stream! {
        let connection = connection.lock().await;
        let mut stream = pin!(run_statements(T::handle(&connection), query));
        while let Some(result) = stream.next().await {
            yield result?;
        }
    }
    .map_err(move |e: Error| log_error!(e.context(context.clone())))
    .boxed()
}

impl SqliteConnection {
    pub(crate) fn writer(&self) -> SqliteSqlWriter {
        SqliteSqlWriter
    }
}

impl Executor for SqliteConnection {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    fn run<'s>(&'s self, query: Query) -> BoxStream<'s, Result<QueryResult>> {
        run_locked(&self.connection, query)
    }
}

impl Connection for SqliteConnection {
    type Transaction<'c> = SqliteTransaction<'c>;

    /// Open `sqlite://<path>[?query]`, the rest of the url is handed to sqlite as a `file:` uri.
    async fn connect(url: &str) -> Result<SqliteConnection> {
        let prefix = format!("{}://", BACKEND);
        let Some(path) = url.strip_prefix(&prefix) else {
            return Err(log_error!(Error::msg(format!(
                "Expected sqlite connection url to start with `{}`",
                &prefix
            ))));
        };
        let context = || format!("Error while decoding connection URL: `{}`", url);
        let path = CString::new(format!("file:{}", path)).with_context(context)?;
        let mut connection: CBox<*mut sqlite3>;
        let rc;
        unsafe {
            connection = CBox::new(ptr::null_mut(), |p| {
                sqlite3_close(p);
            });
            rc = sqlite3_open_v2(
                path.as_ptr(),
                &mut *connection,
                SQLITE_OPEN_READWRITE | SQLITE_OPEN_CREATE | SQLITE_OPEN_URI,
                ptr::null(),
            );
        }
        if rc != SQLITE_OK {
            let error = if connection.is_null() {
                Error::msg("Out of memory while opening the database")
            } else {
                last_error(&connection)
            };
            return Err(log_error!(error.context(context())));
        }
        log::debug!("Connected to {}", url);
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    async fn begin(&self) -> Result<SqliteTransaction<'_>> {
        SqliteTransaction::new(self).await
    }
}

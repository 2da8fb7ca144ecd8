use crate::{CBox, SqliteConnection, connection::run_locked};
use libsqlite3_sys::{sqlite3, sqlite3_exec};
use std::{ffi::CString, ptr};
use tabula_core::{
    Executor, Query, QueryResult, Result, SqlWriter, Transaction, stream::BoxStream,
};
use tokio::sync::{Mutex, MutexGuard};

/// Transaction on a [`SqliteConnection`], pass it as the executor of table operations.
///
/// It holds the connection from `BEGIN` until commit or rollback: statements sent through the
/// connection itself wait for it to finish. Dropping it without commit or rollback rolls it back.
pub struct SqliteTransaction<'c> {
    connection: &'c SqliteConnection,
    guard: Mutex<MutexGuard<'c, CBox<*mut sqlite3>>>,
    finished: bool,
}

impl<'c> SqliteTransaction<'c> {
    pub async fn new(connection: &'c SqliteConnection) -> Result<Self> {
        let guard = connection.connection.lock().await;
        let mut result = Self {
            connection,
            guard: Mutex::new(guard),
            finished: true,
        };
        let mut sql = String::new();
        connection.writer().write_transaction_begin(&mut sql);
        result.execute(sql.into()).await?;
        result.finished = false;
        Ok(result)
    }

    async fn finish(&mut self, sql: String) -> Result<()> {
        self.execute(Query::from(sql)).await?;
        self.finished = true;
        Ok(())
    }
}

impl<'c> Executor for SqliteTransaction<'c> {
    fn backend(&self) -> &'static str {
        self.connection.backend()
    }

    fn run<'s>(&'s self, query: Query) -> BoxStream<'s, Result<QueryResult>> {
        run_locked(&self.guard, query)
    }
}

impl<'c> Transaction<'c> for SqliteTransaction<'c> {
    async fn commit(mut self) -> Result<()> {
        let mut sql = String::new();
        self.connection.writer().write_transaction_commit(&mut sql);
        self.finish(sql).await
    }

    async fn rollback(mut self) -> Result<()> {
        let mut sql = String::new();
        self.connection.writer().write_transaction_rollback(&mut sql);
        self.finish(sql).await
    }
}

impl<'c> Drop for SqliteTransaction<'c> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        log::warn!("Transaction dropped without commit or rollback, rolling it back");
        let mut sql = String::new();
        self.connection.writer().write_transaction_rollback(&mut sql);
        let Ok(sql) = CString::new(sql) else {
            return;
        };
        let connection = self.guard.get_mut();
        unsafe {
            sqlite3_exec(***connection, sql.as_ptr(), None, ptr::null_mut(), ptr::null_mut());
        }
    }
}

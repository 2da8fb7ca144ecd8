use crate::{
    Column, CrudDriver, CrudError, Entity, Executor, Query, QueryResult,
    RESULT_AUTO_INCREMENT, RESULT_ROWS_AFFECTED, Record, Result, Rows, RowsAffected, SqlWriter,
    Table, Value, log_error,
    stream::{StreamExt, TryStreamExt},
};
use futures::{FutureExt, future::BoxFuture};
use std::sync::Arc;

/// CRUD driver generating SQL through the dialect `W`.
///
/// Statements are built from the table metadata and the fields present in the record, every
/// value is bound as a parameter.
pub struct SqlDriver<W: SqlWriter> {
    backend: &'static str,
    connection: Arc<dyn Executor>,
    writer: W,
}

impl<W: SqlWriter> SqlDriver<W> {
    /// Driver bound to the connection of `entity`.
    pub fn new(entity: &dyn Entity, writer: W) -> Result<Self> {
        let Some(connection) = entity.connection() else {
            return Err(CrudError::Disconnected(entity.name().to_owned()).into());
        };
        Ok(Self {
            backend: connection.backend(),
            connection: connection.clone(),
            writer,
        })
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    fn executor<'a>(&'a self, tx: Option<&'a dyn Executor>) -> &'a dyn Executor {
        tx.unwrap_or(self.connection.as_ref())
    }

    fn table<'e>(&self, entity: &'e dyn Entity) -> Result<&'e Table> {
        entity.as_table().ok_or_else(|| {
            CrudError::NotImplemented {
                kind: entity.kind(),
                backend: self.backend,
            }
            .into()
        })
    }
}

/// Names and values of the columns present in the record.
fn present<'c>(columns: &'c [Arc<Column>], record: &Record) -> (Vec<&'c str>, Vec<Value>) {
    columns
        .iter()
        .filter_map(|c| record.get(&c.name).map(|v| (c.name(), v.clone())))
        .unzip()
}

/// Names and values of the primary key, all of them must be present.
fn primary_key<'c>(table: &'c Table, record: &Record) -> Result<(Vec<&'c str>, Vec<Value>)> {
    if table.primary_keys().is_empty() {
        return Err(CrudError::NoPrimaryKey(table.name().to_owned()).into());
    }
    let mut names = Vec::with_capacity(table.primary_keys().len());
    let mut values = Vec::with_capacity(table.primary_keys().len());
    for column in table.primary_keys() {
        let Some(value) = record.get(&column.name) else {
            return Err(CrudError::MissingKey(column.name.clone()).into());
        };
        names.push(column.name());
        values.push(value.clone());
    }
    Ok((names, values))
}

fn projection<'c>(table: &'c Table, columns: Option<&[&'c str]>) -> Vec<&'c str> {
    match columns {
        Some(columns) if !columns.is_empty() => columns.to_vec(),
        _ => table.all_columns().iter().map(|c| c.name()).collect(),
    }
}

/// Run a statement modifying rows, a row returned by the statement carries the generated id.
async fn run_mutation(executor: &dyn Executor, query: Query) -> Result<RowsAffected> {
    log::debug!("{}", query);
    let mut stream = executor.run(query);
    let mut result = RowsAffected::default();
    let mut rows = 0;
    while let Some(item) = stream.try_next().await? {
        match item {
            QueryResult::Row(row) => {
                rows += 1;
                if result.last_affected_id.is_none() {
                    result.last_affected_id = row.values.first().and_then(Value::as_i64);
                }
            }
            QueryResult::Affected(affected) => result.extend([affected]),
        }
    }
    result.rows_affected = result.rows_affected.max(rows);
    Ok(result)
}

async fn fetch_first(
    executor: &dyn Executor,
    query: Query,
    columns: &[&str],
) -> Result<Option<Record>> {
    log::debug!("{}", query);
    let mut stream = executor.fetch(query);
    let Some(row) = stream.next().await.transpose()? else {
        return Ok(None);
    };
    Ok(Some(
        columns
            .iter()
            .map(|v| v.to_string())
            .zip(row.values.into_vec())
            .collect(),
    ))
}

fn write_rows_affected(record: &mut Record, affected: &RowsAffected) {
    record.insert(
        RESULT_ROWS_AFFECTED.to_owned(),
        Value::Int64(Some(affected.rows_affected as i64)),
    );
}

fn operation_context(operation: &str, table: &Table) -> String {
    format!("While running {} on table \"{}\"", operation, table.name())
}

impl<W: SqlWriter> CrudDriver for SqlDriver<W> {
    fn backend(&self) -> &'static str {
        self.backend
    }

    fn insert<'a>(
        &'a self,
        entity: &'a dyn Entity,
        tx: Option<&'a dyn Executor>,
        record: &'a mut Record,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            let table = self.table(entity)?;
            let (columns, params) = present(table.all_columns(), record);
            let auto_increment = table.auto_increment_column();
            let returning = auto_increment
                .filter(|_| self.writer.supports_returning())
                .map(|c| c.name());
            let mut sql = String::with_capacity(128);
            self.writer
                .write_insert(&mut sql, table.name(), &columns, returning);
            let affected = run_mutation(self.executor(tx), Query::new(sql, params))
                .await
                .map_err(|e| log_error!(e.context(operation_context("insert", table))))?;
            write_rows_affected(record, &affected);
            if let Some(id) = affected.last_affected_id {
                record.insert(RESULT_AUTO_INCREMENT.to_owned(), Value::Int64(Some(id)));
                if let Some(column) = auto_increment {
                    record.insert(column.name.clone(), Value::Int64(Some(id)));
                }
            }
            Ok(())
        }
        .boxed()
    }

    fn update<'a>(
        &'a self,
        entity: &'a dyn Entity,
        tx: Option<&'a dyn Executor>,
        record: &'a mut Record,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            let table = self.table(entity)?;
            let (keys, key_params) = primary_key(table, record)?;
            let (columns, mut params) = present(table.columns(), record);
            if columns.is_empty() {
                return Err(CrudError::EmptyUpdate(table.name().to_owned()).into());
            }
            params.extend(key_params);
            let mut sql = String::with_capacity(128);
            self.writer
                .write_update(&mut sql, table.name(), &columns, &keys);
            let affected = run_mutation(self.executor(tx), Query::new(sql, params))
                .await
                .map_err(|e| log_error!(e.context(operation_context("update", table))))?;
            write_rows_affected(record, &affected);
            Ok(())
        }
        .boxed()
    }

    fn select_by_key<'a>(
        &'a self,
        entity: &'a dyn Entity,
        tx: Option<&'a dyn Executor>,
        columns: Option<&'a [&'a str]>,
        keys: &'a [Value],
    ) -> BoxFuture<'a, Result<Option<Record>>> {
        async move {
            let table = self.table(entity)?;
            if table.primary_keys().is_empty() {
                return Err(CrudError::NoPrimaryKey(table.name().to_owned()).into());
            }
            if keys.len() != table.primary_keys().len() {
                return Err(CrudError::KeyCount {
                    table: table.name().to_owned(),
                    expected: table.primary_keys().len(),
                    found: keys.len(),
                }
                .into());
            }
            let key_names: Vec<&str> = table.primary_keys().iter().map(|c| c.name()).collect();
            let columns = projection(table, columns);
            let mut sql = String::with_capacity(128);
            self.writer
                .write_select_by_key(&mut sql, table.name(), &columns, &key_names);
            fetch_first(self.executor(tx), Query::new(sql, keys.to_vec()), &columns)
                .await
                .map_err(|e| log_error!(e.context(operation_context("select", table))))
        }
        .boxed()
    }

    fn select_one<'a>(
        &'a self,
        entity: &'a dyn Entity,
        tx: Option<&'a dyn Executor>,
        columns: Option<&'a [&'a str]>,
        filter: &'a str,
        params: &'a [Value],
    ) -> BoxFuture<'a, Result<Option<Record>>> {
        async move {
            let table = self.table(entity)?;
            let columns = projection(table, columns);
            let mut sql = String::with_capacity(128);
            self.writer
                .write_select(&mut sql, table.name(), &columns, filter);
            fetch_first(self.executor(tx), Query::new(sql, params.to_vec()), &columns)
                .await
                .map_err(|e| log_error!(e.context(operation_context("select", table))))
        }
        .boxed()
    }

    fn select<'a>(
        &'a self,
        entity: &'a dyn Entity,
        tx: Option<&'a dyn Executor>,
        columns: Option<&'a [&'a str]>,
        filter: &'a str,
        params: &'a [Value],
    ) -> BoxFuture<'a, Result<Rows<'a>>> {
        async move {
            let table = self.table(entity)?;
            let columns = projection(table, columns);
            let mut sql = String::with_capacity(128);
            self.writer
                .write_select(&mut sql, table.name(), &columns, filter);
            let query = Query::new(sql, params.to_vec());
            log::debug!("{}", query);
            let table_name = table.name();
            let stream = self
                .executor(tx)
                .fetch(query)
                .map_err(move |e| log_error!(e.context(format!(
                    "While running select on table \"{}\"",
                    table_name
                ))))
                .boxed();
            Ok(Rows::new(
                stream,
                columns.into_iter().map(ToOwned::to_owned).collect(),
            ))
        }
        .boxed()
    }

    fn delete<'a>(
        &'a self,
        entity: &'a dyn Entity,
        tx: Option<&'a dyn Executor>,
        record: &'a mut Record,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            let table = self.table(entity)?;
            let (keys, params) = primary_key(table, record)?;
            let mut sql = String::with_capacity(128);
            self.writer.write_delete(&mut sql, table.name(), &keys);
            let affected = run_mutation(self.executor(tx), Query::new(sql, params))
                .await
                .map_err(|e| log_error!(e.context(operation_context("delete", table))))?;
            write_rows_affected(record, &affected);
            Ok(())
        }
        .boxed()
    }
}

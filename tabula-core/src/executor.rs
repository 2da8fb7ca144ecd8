use crate::{
    Query, QueryResult, Result, RowLabeled, RowsAffected,
    stream::{BoxStream, StreamExt, TryStreamExt},
};
use futures::{FutureExt, future::BoxFuture};

/// Something able to run statements: a connection or a transaction.
///
/// Object safe, tables hold it as `Arc<dyn Executor>` and operations accept `&dyn Executor`
/// to run inside a transaction.
pub trait Executor: Send + Sync {
    /// Tag of the backend, used to look up the driver in the registry.
    fn backend(&self) -> &'static str;

    /// General method to send any query and return any result type (either row or count)
    fn run<'s>(&'s self, query: Query) -> BoxStream<'s, Result<QueryResult>>;

    /// Execute the query and returns the rows.
    fn fetch<'s>(&'s self, query: Query) -> BoxStream<'s, Result<RowLabeled>> {
        self.run(query)
            .filter_map(|v| async move {
                match v {
                    Ok(QueryResult::Row(v)) => Some(Ok(v)),
                    Err(e) => Some(Err(e)),
                    _ => None,
                }
            })
            .boxed()
    }

    /// Execute the query and return the total number of rows affected.
    fn execute<'s>(&'s self, query: Query) -> BoxFuture<'s, Result<RowsAffected>> {
        self.run(query)
            .filter_map(|v| async move {
                match v {
                    Ok(QueryResult::Affected(v)) => Some(Ok(v)),
                    Err(e) => Some(Err(e)),
                    _ => None,
                }
            })
            .try_collect()
            .boxed()
    }
}

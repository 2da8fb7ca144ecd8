use crate::{
    PostgresConnection,
    connection::{open_session, run_query},
};
use tabula_core::{
    Executor, Query, QueryResult, Result, SqlWriter, Transaction, stream::BoxStream,
};
use tokio_postgres::Client;

/// Transaction on a [`PostgresConnection`], pass it as the executor of table operations.
///
/// It runs on a session of its own, statements sent through the connection are not part of
/// it. Dropping it without commit or rollback closes that session and the server rolls it back.
pub struct PostgresTransaction<'c> {
    connection: &'c PostgresConnection,
    client: Client,
    finished: bool,
}

impl<'c> PostgresTransaction<'c> {
    pub async fn new(connection: &'c PostgresConnection) -> Result<Self> {
        let client = open_session(&connection.url).await?;
        let mut result = Self {
            connection,
            client,
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

impl<'c> Executor for PostgresTransaction<'c> {
    fn backend(&self) -> &'static str {
        self.connection.backend()
    }

    fn run<'s>(&'s self, query: Query) -> BoxStream<'s, Result<QueryResult>> {
        run_query(&self.client, query)
    }
}

impl<'c> Transaction<'c> for PostgresTransaction<'c> {
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

impl<'c> Drop for PostgresTransaction<'c> {
    fn drop(&mut self) {
        if !self.finished {
            log::warn!("Transaction dropped without commit or rollback, closing its session");
        }
    }
}

use crate::{Executor, Result, Transaction};
use std::future::Future;

pub trait Connection: Executor + Sized {
    type Transaction<'c>: Transaction<'c>
    where
        Self: 'c;

    /// Open a connection to the given URL, the scheme selects the backend.
    fn connect(url: &str) -> impl Future<Output = Result<Self>> + Send;

    /// Start a transaction, pass it to the table operations to run them inside.
    fn begin(&self) -> impl Future<Output = Result<Self::Transaction<'_>>> + Send;
}

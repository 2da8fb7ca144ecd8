use crate::{Executor, Result};
use std::future::Future;

pub trait Transaction<'c>: Executor {
    fn commit(self) -> impl Future<Output = Result<()>> + Send
    where
        Self: Sized;
    fn rollback(self) -> impl Future<Output = Result<()>> + Send
    where
        Self: Sized;
}

use crate::{Entity, Executor, Record, Result, Rows, Value};
use futures::future::BoxFuture;
use std::sync::Arc;

/// Storage operations of one entity on one backend.
///
/// Every operation receives the entity it works on and an optional executor: `None` runs on
/// the connection bound to the entity, `Some(tx)` runs on the transaction given by the caller.
/// Validation is the business of the [`Table`](crate::Table), drivers only talk to storage.
pub trait CrudDriver: Send + Sync {
    /// Tag of the backend this driver was created for.
    fn backend(&self) -> &'static str;

    /// Insert the present fields, then write the side channel keys into `record`.
    fn insert<'a>(
        &'a self,
        entity: &'a dyn Entity,
        tx: Option<&'a dyn Executor>,
        record: &'a mut Record,
    ) -> BoxFuture<'a, Result<()>>;

    /// Update the row identified by the primary key values found in `record`.
    fn update<'a>(
        &'a self,
        entity: &'a dyn Entity,
        tx: Option<&'a dyn Executor>,
        record: &'a mut Record,
    ) -> BoxFuture<'a, Result<()>>;

    /// Fetch one row by primary key values, given in key column order.
    fn select_by_key<'a>(
        &'a self,
        entity: &'a dyn Entity,
        tx: Option<&'a dyn Executor>,
        columns: Option<&'a [&'a str]>,
        keys: &'a [Value],
    ) -> BoxFuture<'a, Result<Option<Record>>>;

    /// Fetch the first row matching `filter`.
    fn select_one<'a>(
        &'a self,
        entity: &'a dyn Entity,
        tx: Option<&'a dyn Executor>,
        columns: Option<&'a [&'a str]>,
        filter: &'a str,
        params: &'a [Value],
    ) -> BoxFuture<'a, Result<Option<Record>>>;

    /// Stream the rows matching `filter`.
    fn select<'a>(
        &'a self,
        entity: &'a dyn Entity,
        tx: Option<&'a dyn Executor>,
        columns: Option<&'a [&'a str]>,
        filter: &'a str,
        params: &'a [Value],
    ) -> BoxFuture<'a, Result<Rows<'a>>>;

    /// Delete the row identified by the primary key values found in `record`.
    fn delete<'a>(
        &'a self,
        entity: &'a dyn Entity,
        tx: Option<&'a dyn Executor>,
        record: &'a mut Record,
    ) -> BoxFuture<'a, Result<()>>;
}

/// Builds the driver of an entity, registered under a backend tag.
pub type DriverFactory = Arc<dyn Fn(&dyn Entity) -> Result<Box<dyn CrudDriver>> + Send + Sync>;

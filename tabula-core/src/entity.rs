use crate::{Executor, Table};
use std::sync::Arc;

/// Kind of storage object a driver operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum EntityKind {
    Table,
}

/// Storage object exposed to the drivers.
pub trait Entity: Send + Sync {
    fn kind(&self) -> EntityKind;
    fn name(&self) -> &str;
    fn connection(&self) -> Option<&Arc<dyn Executor>>;
    /// Table metadata, when the entity is one.
    fn as_table(&self) -> Option<&Table> {
        None
    }
}

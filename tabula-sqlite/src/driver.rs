use crate::{BACKEND, SqliteSqlWriter};
use tabula_core::{CrudDriver, DriverRegistry, Entity, Result, SqlDriver, register_driver};

/// Driver for tables bound to a [`SqliteConnection`](crate::SqliteConnection).
pub type SqliteDriver = SqlDriver<SqliteSqlWriter>;

fn factory(entity: &dyn Entity) -> Result<Box<dyn CrudDriver>> {
    Ok(Box::new(SqlDriver::new(entity, SqliteSqlWriter)?))
}

/// Make `registry` resolve the sqlite backend.
pub fn register(registry: &mut DriverRegistry) {
    registry.register(BACKEND, factory);
}

/// Register the sqlite driver in the global registry used by [`Table::new`](tabula_core::Table::new).
pub fn register_global() {
    register_driver(BACKEND, factory);
}

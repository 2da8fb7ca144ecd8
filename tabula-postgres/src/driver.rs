use crate::{BACKEND, PostgresSqlWriter};
use tabula_core::{CrudDriver, DriverRegistry, Entity, Result, SqlDriver, register_driver};

/// Driver for tables bound to a [`PostgresConnection`](crate::PostgresConnection).
pub type PostgresDriver = SqlDriver<PostgresSqlWriter>;

fn factory(entity: &dyn Entity) -> Result<Box<dyn CrudDriver>> {
    Ok(Box::new(SqlDriver::new(entity, PostgresSqlWriter)?))
}

pub fn register(registry: &mut DriverRegistry) {
    registry.register(BACKEND, factory);
}

/// Register the postgres driver in the global registry used by [`Table::new`](tabula_core::Table::new).
pub fn register_global() {
    register_driver(BACKEND, factory);
}

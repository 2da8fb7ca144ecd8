use crate::{CrudDriver, CrudError, DriverFactory, Entity, Result, log_error};
use std::{
    collections::HashMap,
    fmt::{self, Debug},
    sync::{Arc, LazyLock, PoisonError, RwLock},
};

/// Backend tag to driver factory.
#[derive(Default, Clone)]
pub struct DriverRegistry {
    factories: HashMap<&'static str, DriverFactory>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Default::default()
    }

    /// Register the factory for `backend`, replacing the previous one.
    pub fn register<F>(&mut self, backend: &'static str, factory: F)
    where
        F: Fn(&dyn Entity) -> Result<Box<dyn CrudDriver>> + Send + Sync + 'static,
    {
        if self.factories.insert(backend, Arc::new(factory)).is_some() {
            log::warn!("Driver for backend `{}` registered again, replacing it", backend);
        }
    }

    pub fn contains(&self, backend: &str) -> bool {
        self.factories.contains_key(backend)
    }

    /// Build the driver for the backend of the entity's connection.
    pub fn resolve(&self, entity: &dyn Entity) -> Result<Box<dyn CrudDriver>> {
        let Some(connection) = entity.connection() else {
            return Err(CrudError::Disconnected(entity.name().to_owned()).into());
        };
        let backend = connection.backend();
        let Some(factory) = self.factories.get(backend) else {
            return Err(log_error!(
                CrudError::NoDriverRegistered(backend.to_owned()).into()
            ));
        };
        factory(entity)
    }
}

impl Debug for DriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}

static GLOBAL_REGISTRY: LazyLock<RwLock<DriverRegistry>> = LazyLock::new(Default::default);

/// Registry used by [`Table::new`](crate::Table::new).
pub fn global_registry() -> &'static RwLock<DriverRegistry> {
    &GLOBAL_REGISTRY
}

pub fn register_driver<F>(backend: &'static str, factory: F)
where
    F: Fn(&dyn Entity) -> Result<Box<dyn CrudDriver>> + Send + Sync + 'static,
{
    GLOBAL_REGISTRY
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .register(backend, factory);
}

pub fn resolve_driver(entity: &dyn Entity) -> Result<Box<dyn CrudDriver>> {
    GLOBAL_REGISTRY
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .resolve(entity)
}

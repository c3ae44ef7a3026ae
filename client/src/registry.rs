//! Data source registry
//!
//! Maps logical data source names to live database handles. Lookups take a read
//! lock; registration takes the write lock. Handles are shared, so a test can
//! keep using a database it registered.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use log::debug;
use once_cell::sync::Lazy;

use dbscenario_core::DataSourceName;

use crate::database::Database;

/// Database handle shared between the registry and its users
pub type SharedDatabase = Arc<Mutex<dyn Database + Send>>;

static GLOBAL: Lazy<DataSourceRegistry> = Lazy::new(DataSourceRegistry::new);

/// Registry of named data sources
#[derive(Default)]
pub struct DataSourceRegistry {
    sources: RwLock<HashMap<DataSourceName, SharedDatabase>>,
}

impl DataSourceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry
    pub fn global() -> &'static DataSourceRegistry {
        &GLOBAL
    }

    /// Register a database, returning the handle it was wrapped in
    pub fn register<D>(&self, name: DataSourceName, database: D) -> SharedDatabase
    where
        D: Database + Send + 'static,
    {
        let shared: SharedDatabase = Arc::new(Mutex::new(database));
        self.register_shared(name, shared.clone());
        shared
    }

    /// Register an already shared handle, replacing any previous one
    pub fn register_shared(&self, name: DataSourceName, database: SharedDatabase) -> Option<SharedDatabase> {
        debug!("Registering data source {}", name);
        self.sources
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, database)
    }

    /// Handle registered under `name`
    pub fn get(&self, name: &DataSourceName) -> Option<SharedDatabase> {
        self.sources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Remove the handle registered under `name`
    pub fn remove(&self, name: &DataSourceName) -> Option<SharedDatabase> {
        self.sources
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }

    /// Whether a handle is registered under `name`
    pub fn contains(&self, name: &DataSourceName) -> bool {
        self.sources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<DataSourceName> {
        let mut names: Vec<DataSourceName> = self
            .sources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

//! # Driver Registry
//!
//! Maps dialect names to driver factories. The registry is a plain value,
//! built once at startup and passed to whatever needs to resolve drivers; it
//! never holds connections, so every lookup yields an independent driver.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::{
    driver::Driver,
    drivers::{MySqlDriver, PostgresDriver, SqliteDriver},
    error::{Error, Result},
};

/// Constructor for a fresh, unconnected driver.
pub type DriverFactory = Arc<dyn Fn() -> Box<dyn Driver> + Send + Sync>;

/// Registry of driver factories keyed by case-sensitive name.
#[derive(Clone, Default)]
pub struct DriverRegistry {
    factories: HashMap<String, DriverFactory>,
}

impl fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverRegistry").field("drivers", &self.names()).finish()
    }
}

impl DriverRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the built-in drivers under their usual names:
    /// `postgres` / `postgresql`, `mysql` / `mariadb` and `sqlite` / `sqlite3`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();

        for name in ["postgres", "postgresql"] {
            registry.register(name, || Box::new(PostgresDriver::new()));
        }
        for name in ["mysql", "mariadb"] {
            registry.register(name, || Box::new(MySqlDriver::new()));
        }
        for name in ["sqlite", "sqlite3"] {
            registry.register(name, || Box::new(SqliteDriver::new()));
        }

        registry
    }

    /// Registers `factory` under `name`, replacing any earlier registration.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn Driver> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.factories.insert(name.clone(), Arc::new(factory)).is_some() {
            log::debug!("driver '{}' re-registered; previous factory replaced", name);
        } else {
            log::debug!("driver '{}' registered", name);
        }
    }

    /// Builds a new, unconnected driver registered under `name`.
    pub fn get_driver(&self, name: &str) -> Result<Box<dyn Driver>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| Error::UnknownDriver { name: name.to_string() })?;

        let driver = factory();
        log::debug!("created '{}' driver ({})", name, driver.dialect());
        Ok(driver)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names in lexicographic order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

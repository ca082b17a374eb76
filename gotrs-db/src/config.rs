//! # Configuration
//!
//! [`DriverOptions`] tunes a single driver's connection pool, builder style.
//! [`DatabaseConfig`] describes which backend an application uses and can be
//! read from the environment.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default pool size.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Default time to wait for a pooled connection.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// Default time an unused connection stays open.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Default maximum age of a pooled connection.
pub const DEFAULT_MAX_LIFETIME: Duration = Duration::from_secs(30 * 60);

// ============================================================================
// Driver Options
// ============================================================================

/// Connection pool settings applied on [`Driver::connect`](crate::Driver::connect).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverOptions {
    pub(crate) max_connections: u32,
    pub(crate) min_connections: u32,
    pub(crate) acquire_timeout: Duration,
    pub(crate) idle_timeout: Option<Duration>,
    pub(crate) max_lifetime: Option<Duration>,
    pub(crate) statement_timeout: Option<Duration>,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: 0,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
            idle_timeout: Some(DEFAULT_IDLE_TIMEOUT),
            max_lifetime: Some(DEFAULT_MAX_LIFETIME),
            statement_timeout: None,
        }
    }
}

impl DriverOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max.max(1);
        self
    }

    /// Connections kept open even when idle, capped at `max_connections`.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// `None` keeps idle connections open indefinitely.
    pub fn idle_timeout(mut self, timeout: impl Into<Option<Duration>>) -> Self {
        self.idle_timeout = timeout.into();
        self
    }

    /// `None` never retires a connection because of its age.
    pub fn max_lifetime(mut self, lifetime: impl Into<Option<Duration>>) -> Self {
        self.max_lifetime = lifetime.into();
        self
    }

    /// Bounds every `exec`; a statement running longer fails with
    /// [`Error::Timeout`](crate::Error::Timeout).
    pub fn statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = Some(timeout);
        self
    }

    pub fn get_max_connections(&self) -> u32 {
        self.max_connections
    }

    pub fn get_min_connections(&self) -> u32 {
        self.min_connections.min(self.max_connections)
    }

    pub fn get_acquire_timeout(&self) -> Duration {
        self.acquire_timeout
    }

    pub fn get_idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout
    }

    pub fn get_max_lifetime(&self) -> Option<Duration> {
        self.max_lifetime
    }

    pub fn get_statement_timeout(&self) -> Option<Duration> {
        self.statement_timeout
    }
}

// ============================================================================
// Database Config
// ============================================================================

/// Which backend to use and where its schema lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Registry name of the driver (`postgres`, `mysql`, `sqlite`, ...).
    pub driver: String,
    /// Connection URL handed to the driver.
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Optional schema document to load at startup.
    #[serde(default)]
    pub schema_path: Option<PathBuf>,
}

fn default_max_connections() -> u32 {
    DEFAULT_MAX_CONNECTIONS
}

impl DatabaseConfig {
    /// Reads `DATABASE_URL` (required), `DATABASE_DRIVER`, `DATABASE_MAX_CONNECTIONS`
    /// and `DATABASE_SCHEMA`.
    ///
    /// Without `DATABASE_DRIVER` the driver is inferred from the URL scheme.
    /// Returns `None` when `DATABASE_URL` is unset.
    pub fn from_env() -> Option<Self> {
        let url = env::var("DATABASE_URL").ok()?;
        let driver = env::var("DATABASE_DRIVER").unwrap_or_else(|_| driver_from_url(&url).to_string());
        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_CONNECTIONS);
        let schema_path = env::var("DATABASE_SCHEMA").ok().map(PathBuf::from);

        Some(Self { driver, url, max_connections, schema_path })
    }

    /// Pool options derived from this config.
    pub fn driver_options(&self) -> DriverOptions {
        DriverOptions::new().max_connections(self.max_connections)
    }
}

/// Infers the registry name from a connection URL scheme.
pub fn driver_from_url(url: &str) -> &'static str {
    if url.starts_with("postgres") {
        "postgres"
    } else if url.starts_with("mysql") || url.starts_with("mariadb") {
        "mysql"
    } else {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_options_builder() {
        let opts = DriverOptions::new()
            .max_connections(0)
            .acquire_timeout(Duration::from_secs(3))
            .statement_timeout(Duration::from_millis(250));

        assert_eq!(opts.get_max_connections(), 1);
        assert_eq!(opts.get_acquire_timeout(), Duration::from_secs(3));
        assert_eq!(opts.get_statement_timeout(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_pool_lifetime_defaults_and_overrides() {
        let defaults = DriverOptions::new();
        assert_eq!(defaults.get_min_connections(), 0);
        assert_eq!(defaults.get_idle_timeout(), Some(DEFAULT_IDLE_TIMEOUT));
        assert_eq!(defaults.get_max_lifetime(), Some(DEFAULT_MAX_LIFETIME));

        let pinned = DriverOptions::new().max_connections(2).min_connections(4).idle_timeout(None).max_lifetime(None);
        assert_eq!(pinned.get_min_connections(), 2);
        assert_eq!(pinned.get_idle_timeout(), None);
        assert_eq!(pinned.get_max_lifetime(), None);
    }

    #[test]
    fn test_driver_from_url() {
        assert_eq!(driver_from_url("postgres://u@h/db"), "postgres");
        assert_eq!(driver_from_url("postgresql://u@h/db"), "postgres");
        assert_eq!(driver_from_url("mysql://u@h/db"), "mysql");
        assert_eq!(driver_from_url("sqlite::memory:"), "sqlite");
    }

    #[test]
    fn test_database_config_deserialize_defaults() {
        let config: DatabaseConfig = serde_yaml::from_str("driver: mysql\nurl: mysql://localhost/otrs\n").unwrap();
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.schema_path, None);
        assert_eq!(config.driver_options().get_max_connections(), DEFAULT_MAX_CONNECTIONS);
    }
}

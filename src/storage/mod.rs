//! Connection provider for the Quartz persistence store.
//!
//! The pool is built lazily on first use and then shared for the life of the
//! provider. Every query checks out its own connection and hands it back on
//! drop; broken connections are discarded by the pool's checkout test.

pub mod schema;

use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use r2d2::{Pool as R2D2Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::OpenFlags;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::DataSourceConfig;

/// Connection Pool type
pub type Pool = R2D2Pool<SqliteConnectionManager>;

/// A connection checked out of the pool; returned when dropped.
pub type Connection = PooledConnection<SqliteConnectionManager>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("persistence store unavailable at {path}: {reason}")]
    Unavailable { path: String, reason: String },

    #[error("no connection after {attempts} attempt(s): {source}")]
    Checkout {
        attempts: u32,
        #[source]
        source: r2d2::Error,
    },
}

/// Whether opening the store may create the database file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// The database must already exist.
    Existing,
    /// Create the database file if it is missing.
    Create,
}

/// Build a connection pool for the configured data source.
pub fn open_pool(config: &DataSourceConfig, mode: OpenMode) -> Result<Pool, StoreError> {
    let path = config.path.display().to_string();

    if mode == OpenMode::Existing && !config.path.exists() {
        return Err(StoreError::Unavailable {
            path,
            reason: "database file does not exist".to_string(),
        });
    }

    let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_URI
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    if mode == OpenMode::Create {
        flags |= OpenFlags::SQLITE_OPEN_CREATE;
    }

    let busy_timeout_ms = config.busy_timeout_ms;
    let manager = SqliteConnectionManager::file(&config.path)
        .with_flags(flags)
        .with_init(move |c| {
            c.execute_batch(&format!(
                "PRAGMA busy_timeout = {busy_timeout_ms};
                 PRAGMA foreign_keys = ON;"
            ))
        });

    R2D2Pool::builder()
        .max_size(config.pool_max_size.max(1))
        .connection_timeout(Duration::from_secs(config.connection_timeout_secs.max(1)))
        .test_on_check_out(true)
        .build(manager)
        .map_err(|e| StoreError::Unavailable {
            path,
            reason: e.to_string(),
        })
}

/// Owns the lazily-built pool for one data source.
pub struct ConnectionProvider {
    config: DataSourceConfig,
    mode: OpenMode,
    pool: RwLock<Option<Pool>>,
}

impl ConnectionProvider {
    /// Provider for an existing store. No I/O happens until the first checkout.
    pub fn new(config: DataSourceConfig) -> Self {
        Self::with_mode(config, OpenMode::Existing)
    }

    pub fn with_mode(config: DataSourceConfig, mode: OpenMode) -> Self {
        Self {
            config,
            mode,
            pool: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &DataSourceConfig {
        &self.config
    }

    /// True once the pool has been built.
    pub fn is_initialized(&self) -> bool {
        self.pool
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Check out a connection, building the pool first if needed.
    ///
    /// A checkout that fails is retried `reconnect_attempts` times, sleeping
    /// `reconnect_backoff_ms` in between.
    pub fn get_connection(&self) -> Result<Connection, StoreError> {
        let pool = self.pool()?;
        let mut attempts = 0;

        loop {
            attempts += 1;
            match pool.get() {
                Ok(conn) => return Ok(conn),
                Err(e) if attempts <= self.config.reconnect_attempts => {
                    warn!(
                        attempt = attempts,
                        path = %self.config.path.display(),
                        error = %e,
                        "connection checkout failed, retrying"
                    );
                    std::thread::sleep(Duration::from_millis(self.config.reconnect_backoff_ms));
                }
                Err(source) => return Err(StoreError::Checkout { attempts, source }),
            }
        }
    }

    fn pool(&self) -> Result<Pool, StoreError> {
        if let Some(pool) = self
            .pool
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return Ok(pool.clone());
        }

        let mut slot = self.pool.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(pool) = slot.as_ref() {
            return Ok(pool.clone());
        }

        // Failures are not memoized; the next call tries again.
        let pool = open_pool(&self.config, self.mode).map_err(|e| {
            warn!(error = %e, "failed to open persistence store");
            e
        })?;
        debug!(
            path = %self.config.path.display(),
            max_size = self.config.pool_max_size,
            "connection pool initialized"
        );
        *slot = Some(pool.clone());
        Ok(pool)
    }
}

/// Shared fixtures for tests that need a migrated store on disk.
#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use super::*;

    pub(crate) fn migrated_provider() -> (tempfile::TempDir, Arc<ConnectionProvider>) {
        let dir = tempfile::TempDir::new().unwrap();
        let config = DataSourceConfig {
            path: dir.path().join("quartz.db"),
            reconnect_attempts: 0,
            ..DataSourceConfig::default()
        };
        let provider = Arc::new(ConnectionProvider::with_mode(config, OpenMode::Create));
        let conn = provider.get_connection().unwrap();
        schema::migrate(&conn).unwrap();
        (dir, provider)
    }

    pub(crate) fn missing_provider() -> Arc<ConnectionProvider> {
        let config = DataSourceConfig {
            path: "/nonexistent/dir/quartz.db".into(),
            reconnect_attempts: 0,
            ..DataSourceConfig::default()
        };
        Arc::new(ConnectionProvider::new(config))
    }
}

//! TOML configuration for scheduler-manager.
//!
//! Layered model: an explicit path (from `--config`), then the
//! `SCHEDULER_MANAGER_CONFIG` environment variable, then the standard system
//! location, then compiled-in defaults. Every section falls back to its
//! defaults independently, so a partial file is always valid.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::quartz::FailurePolicy;
use crate::scheduler::StorageType;

/// Environment variable naming an alternative config file.
pub const CONFIG_ENV: &str = "SCHEDULER_MANAGER_CONFIG";

/// Standard system location of the config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/scheduler-manager/config.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration for the tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManagerConfig {
    #[serde(default)]
    pub datasource: DataSourceConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ManagerConfig {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded scheduler-manager configuration");
        Ok(config)
    }

    /// Resolve the configuration.
    ///
    /// An explicit path must load successfully. Without one, the env var and
    /// the system location are tried in turn and failures there only warn.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        Ok(Self::load_or_default())
    }

    /// Try to load configuration from, in order:
    /// 1. The path in the `SCHEDULER_MANAGER_CONFIG` environment variable.
    /// 2. `/etc/scheduler-manager/config.toml`.
    /// 3. Compiled-in defaults.
    pub fn load_or_default() -> Self {
        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let path = Path::new(&env_path);
            match Self::load(path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "SCHEDULER_MANAGER_CONFIG set but file could not be loaded, trying fallback"
                    );
                }
            }
        }

        let system_path = Path::new(SYSTEM_CONFIG_PATH);
        if system_path.exists() {
            match Self::load(system_path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %system_path.display(),
                        error = %e,
                        "system config file exists but could not be loaded, using defaults"
                    );
                }
            }
        }

        debug!("no config file found, using compiled-in defaults");
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// Data source
// ---------------------------------------------------------------------------

/// Where the Quartz tables live and how connections to them are pooled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSourceConfig {
    /// Path to the SQLite database holding the `QUARTZ_*` tables.
    pub path: PathBuf,
    /// Upper bound on pooled connections.
    pub pool_max_size: u32,
    /// How long a checkout may wait for a free connection.
    pub connection_timeout_secs: u64,
    /// SQLite busy timeout applied to every new connection.
    pub busy_timeout_ms: u64,
    /// Extra checkout attempts after the first one fails.
    pub reconnect_attempts: u32,
    /// Pause between checkout attempts.
    pub reconnect_backoff_ms: u64,
}

impl Default for DataSourceConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/quartz.db"),
            pool_max_size: 4,
            connection_timeout_secs: 5,
            busy_timeout_ms: 5000,
            reconnect_attempts: 2,
            reconnect_backoff_ms: 200,
        }
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Which scheduler instance the persisted engine reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Restrict job-store queries to this `SCHED_NAME`. `None` reads every instance.
    pub scheduler_name: Option<String>,
    /// Storage type reported for jobs read from the job store.
    pub storage_type: StorageType,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            scheduler_name: None,
            storage_type: StorageType::Persisted,
        }
    }
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// Fired-trigger query behaviour.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub failure_policy: FailurePolicy,
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Output back-end selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Table rendering options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Maximum rendered width of text tables, in characters.
    pub table_width: usize,
    pub format: OutputFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            table_width: 160,
            format: OutputFormat::Text,
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON log lines instead of human-readable ones.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

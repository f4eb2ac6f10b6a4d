//! scheduler-manager -- inspect and control Quartz scheduler jobs.
//!
//! This crate provides the library behind the `scheduler-manager` CLI: a
//! pooled connection provider for the Quartz job store, fired-trigger
//! queries, a scheduler capability interface, and table rendering.

pub mod commands;
pub mod config;
pub mod presentation;
pub mod quartz;
pub mod scheduler;
pub mod storage;

use anyhow::{Context, Result};

use crate::config::ManagerConfig;
use crate::storage::{ConnectionProvider, OpenMode};

/// Create the Quartz tables in the configured database, creating the file if needed.
pub fn init_store(config: &ManagerConfig) -> Result<()> {
    if let Some(parent) = config.datasource.path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }

    let provider = ConnectionProvider::with_mode(config.datasource.clone(), OpenMode::Create);
    let conn = provider
        .get_connection()
        .context("failed to open persistence store")?;
    storage::schema::migrate(&conn)?;
    tracing::info!(path = %config.datasource.path.display(), "quartz tables ready");
    Ok(())
}

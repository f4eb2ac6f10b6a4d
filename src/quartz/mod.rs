//! Read-only access to Quartz's fired-trigger bookkeeping.

pub mod fired;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::StoreError;

pub use self::fired::FiredTriggerService;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("fired-trigger store unavailable: {0}")]
    Unavailable(#[from] StoreError),

    #[error("fired-trigger query failed: {0}")]
    Query(#[from] rusqlite::Error),
}

/// What a fired-trigger query reports when the store misbehaves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Log the error and report zero / no rows.
    #[default]
    Degrade,
    /// Return the error to the caller.
    FailFast,
}

/// One row of `QUARTZ_FIRED_TRIGGERS`: a trigger that is executing or
/// waiting for the job store to clean it up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FiredTrigger {
    pub scheduler_name: String,
    pub entry_id: String,
    pub trigger_name: String,
    pub trigger_group: String,
    pub instance_name: String,
    pub fired_time: DateTime<Utc>,
    pub state: String,
}

impl FiredTrigger {
    /// Fired time as stored: epoch milliseconds.
    pub fn fired_time_millis(&self) -> i64 {
        self.fired_time.timestamp_millis()
    }
}

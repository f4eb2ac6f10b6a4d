//! Scheduler state facade: job/trigger queries and pause/resume control.
//!
//! The scheduler itself is external. [`SchedulerEngine`] is the capability
//! this tool needs from it; `jdbc` reads a Quartz JDBC job store and `memory`
//! keeps jobs in process.

pub mod jdbc;
pub mod memory;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::StoreError;

pub use self::jdbc::JdbcEngine;
pub use self::memory::InMemoryEngine;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Job not found with the name {name} (group {group}, storage type {storage_type})")]
    NotFound {
        name: String,
        group: String,
        storage_type: StorageType,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid cron expression '{expression}': {reason}")]
    InvalidCron { expression: String, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;

/// Trigger state as reported by the host scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Normal,
    Paused,
    Complete,
    Expired,
    Unscheduled,
}

impl JobState {
    pub const ALL: [JobState; 5] = [
        JobState::Normal,
        JobState::Paused,
        JobState::Complete,
        JobState::Expired,
        JobState::Unscheduled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Normal => "NORMAL",
            JobState::Paused => "PAUSED",
            JobState::Complete => "COMPLETE",
            JobState::Expired => "EXPIRED",
            JobState::Unscheduled => "UNSCHEDULED",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobState {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self> {
        JobState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| {
                SchedulerError::InvalidArgument(format!(
                    "unknown job state '{s}', expected one of COMPLETE, NORMAL, EXPIRED, PAUSED, UNSCHEDULED"
                ))
            })
    }
}

/// Where the host scheduler keeps a job's definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StorageType {
    Memory,
    MemoryClustered,
    Persisted,
}

impl StorageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageType::Memory => "MEMORY",
            StorageType::MemoryClustered => "MEMORY_CLUSTERED",
            StorageType::Persisted => "PERSISTED",
        }
    }
}

impl std::fmt::Display for StorageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StorageType {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "MEMORY" => Ok(StorageType::Memory),
            "MEMORY_CLUSTERED" => Ok(StorageType::MemoryClustered),
            "PERSISTED" => Ok(StorageType::Persisted),
            other => Err(SchedulerError::InvalidArgument(format!(
                "unknown storage type '{other}', expected one of MEMORY, MEMORY_CLUSTERED, PERSISTED"
            ))),
        }
    }
}

/// State filter for job listings. Matching is exact and case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateFilter {
    All,
    Only(JobState),
}

impl StateFilter {
    pub fn matches(&self, state: JobState) -> bool {
        match self {
            StateFilter::All => true,
            StateFilter::Only(wanted) => *wanted == state,
        }
    }
}

impl std::fmt::Display for StateFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StateFilter::All => f.write_str("ALL"),
            StateFilter::Only(state) => write!(f, "{state}"),
        }
    }
}

impl std::str::FromStr for StateFilter {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self> {
        if s == "ALL" {
            return Ok(StateFilter::All);
        }
        s.parse().map(StateFilter::Only)
    }
}

/// Identity of a job inside the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobKey {
    pub name: String,
    pub group: String,
    pub storage_type: StorageType,
}

impl JobKey {
    pub fn new(name: &str, group: &str, storage_type: StorageType) -> Self {
        Self {
            name: name.to_string(),
            group: group.to_string(),
            storage_type,
        }
    }
}

/// A job/trigger pair registered with the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduledJob {
    pub job_name: String,
    pub group_name: String,
    pub state: JobState,
    pub start_time: Option<DateTime<Utc>>,
    pub previous_fire_time: Option<DateTime<Utc>>,
    pub next_fire_time: Option<DateTime<Utc>>,
    pub destination_name: String,
    pub storage_type: StorageType,
    pub cron_expression: String,
    pub exception: Option<String>,
}

impl ScheduledJob {
    pub fn key(&self) -> JobKey {
        JobKey::new(&self.job_name, &self.group_name, self.storage_type)
    }
}

/// Capability interface onto the host scheduler.
///
/// The engine never filters by state; callers do that after listing.
/// Pause and resume are idempotent and are no-ops for unknown identities.
#[async_trait::async_trait]
pub trait SchedulerEngine: Send + Sync {
    /// Every job the engine knows, across groups and storage types.
    async fn list_jobs(&self) -> Result<Vec<ScheduledJob>>;

    /// Look up one job. `None` means the engine does not know it.
    async fn get_job(
        &self,
        name: &str,
        group: &str,
        storage_type: StorageType,
    ) -> Result<Option<ScheduledJob>>;

    async fn pause_job(&self, name: &str, group: &str, storage_type: StorageType) -> Result<()>;

    async fn pause_group(&self, group: &str, storage_type: StorageType) -> Result<()>;

    async fn resume_job(&self, name: &str, group: &str, storage_type: StorageType) -> Result<()>;

    async fn resume_group(&self, group: &str, storage_type: StorageType) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_type_parse() {
        assert_eq!("MEMORY".parse::<StorageType>().unwrap(), StorageType::Memory);
        assert_eq!(
            "MEMORY_CLUSTERED".parse::<StorageType>().unwrap(),
            StorageType::MemoryClustered
        );
        assert_eq!("PERSISTED".parse::<StorageType>().unwrap(), StorageType::Persisted);
        assert!(matches!(
            "persisted".parse::<StorageType>(),
            Err(SchedulerError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_state_filter_parse() {
        assert_eq!("ALL".parse::<StateFilter>().unwrap(), StateFilter::All);
        assert_eq!(
            "PAUSED".parse::<StateFilter>().unwrap(),
            StateFilter::Only(JobState::Paused)
        );
        assert!("paused".parse::<StateFilter>().is_err());
        assert!("All".parse::<StateFilter>().is_err());
        assert!("RUNNING".parse::<StateFilter>().is_err());
    }

    #[test]
    fn test_state_filter_matches() {
        assert!(StateFilter::All.matches(JobState::Expired));
        assert!(StateFilter::Only(JobState::Paused).matches(JobState::Paused));
        assert!(!StateFilter::Only(JobState::Paused).matches(JobState::Normal));
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for state in JobState::ALL {
            assert_eq!(state.to_string().parse::<JobState>().unwrap(), state);
        }
        assert_eq!(StateFilter::All.to_string(), "ALL");
        assert_eq!(StorageType::MemoryClustered.to_string(), "MEMORY_CLUSTERED");
    }
}

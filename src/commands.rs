//! One function per CLI command.
//!
//! Commands call the scheduler facade or the fired-trigger service and
//! return an [`Output`] for the caller to render.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::config::ManagerConfig;
use crate::presentation::{self, Table};
use crate::quartz::{FiredTriggerService, QueryError};
use crate::scheduler::{
    JdbcEngine, ScheduledJob, SchedulerEngine, SchedulerError, StateFilter, StorageType,
};
use crate::storage::ConnectionProvider;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error(transparent)]
    Query(#[from] QueryError),
}

pub type Result<T> = std::result::Result<T, CommandError>;

/// Result of a command, ready to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Table(Table),
    Count(u64),
    Flag(bool),
    Nothing,
}

/// What a pause/resume applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlTarget {
    Job {
        name: String,
        group: String,
        storage_type: StorageType,
    },
    Group {
        group: String,
        storage_type: StorageType,
    },
}

impl ControlTarget {
    /// `<job> <group> <storageType>` or `<group> <storageType>`.
    pub fn from_args(
        first: &str,
        second: &str,
        third: Option<&str>,
    ) -> std::result::Result<Self, SchedulerError> {
        match third {
            Some(storage_type) => Ok(ControlTarget::Job {
                name: first.to_string(),
                group: second.to_string(),
                storage_type: storage_type.parse()?,
            }),
            None => Ok(ControlTarget::Group {
                group: first.to_string(),
                storage_type: second.parse()?,
            }),
        }
    }
}

pub struct Manager {
    engine: Arc<dyn SchedulerEngine>,
    fired: FiredTriggerService,
}

impl Manager {
    pub fn new(engine: Arc<dyn SchedulerEngine>, fired: FiredTriggerService) -> Self {
        Self { engine, fired }
    }

    /// Wire the job-store engine and fired-trigger service to one data source.
    pub fn from_config(config: &ManagerConfig) -> Self {
        let provider = Arc::new(ConnectionProvider::new(config.datasource.clone()));
        let engine = JdbcEngine::new(provider.clone())
            .with_scheduler_name(config.scheduler.scheduler_name.clone())
            .with_storage_type(config.scheduler.storage_type);
        let fired = FiredTriggerService::new(provider, config.query.failure_policy);
        Self::new(Arc::new(engine), fired)
    }

    /// Jobs whose state matches `filter`, in engine order.
    pub async fn jobs(&self, filter: StateFilter) -> Result<Vec<ScheduledJob>> {
        let jobs = self.engine.list_jobs().await?;
        Ok(jobs.into_iter().filter(|job| filter.matches(job.state)).collect())
    }

    /// One job, or `NotFound`.
    pub async fn job(
        &self,
        name: &str,
        group: &str,
        storage_type: StorageType,
    ) -> Result<ScheduledJob> {
        self.engine
            .get_job(name, group, storage_type)
            .await?
            .ok_or_else(|| {
                SchedulerError::NotFound {
                    name: name.to_string(),
                    group: group.to_string(),
                    storage_type,
                }
                .into()
            })
    }

    pub async fn list(&self, filter: StateFilter) -> Result<Output> {
        let jobs = self.jobs(filter).await?;
        Ok(Output::Table(presentation::jobs_table(&jobs, filter)))
    }

    pub async fn info(&self, name: &str, group: &str, storage_type: StorageType) -> Result<Output> {
        let job = self.job(name, group, storage_type).await?;
        Ok(Output::Table(presentation::job_info_table(&job)))
    }

    pub async fn pause(&self, target: &ControlTarget) -> Result<Output> {
        match target {
            ControlTarget::Job { name, group, storage_type } => {
                self.engine.pause_job(name, group, *storage_type).await?;
            }
            ControlTarget::Group { group, storage_type } => {
                self.engine.pause_group(group, *storage_type).await?;
            }
        }
        info!(?target, "pause requested");
        Ok(Output::Nothing)
    }

    pub async fn resume(&self, target: &ControlTarget) -> Result<Output> {
        match target {
            ControlTarget::Job { name, group, storage_type } => {
                self.engine.resume_job(name, group, *storage_type).await?;
            }
            ControlTarget::Group { group, storage_type } => {
                self.engine.resume_group(group, *storage_type).await?;
            }
        }
        info!(?target, "resume requested");
        Ok(Output::Nothing)
    }

    /// Number of fired triggers in `group`.
    pub fn jobs_is_fired(&self, group: &str) -> Result<Output> {
        Ok(Output::Count(self.fired.count_fired_by_trigger_group(group)?))
    }

    /// Whether trigger `name` has a fired row.
    pub fn job_is_fired(&self, name: &str) -> Result<Output> {
        Ok(Output::Flag(self.fired.is_fired(name)?))
    }

    pub fn list_jobs_in_progress(&self, group: &str) -> Result<Output> {
        let fired = self.fired.list_fired_by_trigger_group(group)?;
        Ok(Output::Table(presentation::fired_triggers_table(group, &fired)))
    }
}

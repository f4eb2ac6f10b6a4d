//! In-process scheduler engine for MEMORY and MEMORY_CLUSTERED jobs.
//!
//! Memory-stored jobs only exist inside the process that scheduled them, so
//! the CLI never sees them: `Manager::from_config` wires the job-store engine
//! only. This engine is for embedders that hold their own jobs and hand it to
//! `Manager::new`, and it is the engine the command tests run against.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{PoisonError, RwLock};

use chrono::Utc;
use cron::Schedule as CronSchedule;
use tracing::{debug, info};

use super::{JobKey, JobState, Result, ScheduledJob, SchedulerEngine, SchedulerError, StorageType};

/// Jobs held in a map keyed by (name, group, storage type).
#[derive(Default)]
pub struct InMemoryEngine {
    jobs: RwLock<HashMap<JobKey, ScheduledJob>>,
}

impl InMemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a job.
    ///
    /// A non-empty cron expression must parse (Quartz syntax, seconds first).
    /// A NORMAL job without a next fire time gets one from its schedule.
    pub fn schedule(&self, mut job: ScheduledJob) -> Result<()> {
        if !job.cron_expression.is_empty() {
            let schedule = parse_cron(&job.cron_expression)?;
            if job.next_fire_time.is_none() && job.state == JobState::Normal {
                job.next_fire_time = schedule.after(&Utc::now()).next();
            }
        }

        info!(job = %job.job_name, group = %job.group_name, storage = %job.storage_type, "job scheduled");
        self.jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(job.key(), job);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn transition<F>(&self, from: JobState, to: JobState, mut selected: F) -> usize
    where
        F: FnMut(&JobKey) -> bool,
    {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        let mut changed = 0;
        for (key, job) in jobs.iter_mut() {
            if !selected(key) || job.state != from {
                continue;
            }
            job.state = to;
            if to == JobState::Normal {
                job.next_fire_time = parse_cron(&job.cron_expression)
                    .ok()
                    .and_then(|schedule| schedule.after(&Utc::now()).next());
            }
            changed += 1;
        }
        changed
    }
}

fn parse_cron(expression: &str) -> Result<CronSchedule> {
    CronSchedule::from_str(expression).map_err(|e| SchedulerError::InvalidCron {
        expression: expression.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait::async_trait]
impl SchedulerEngine for InMemoryEngine {
    async fn list_jobs(&self) -> Result<Vec<ScheduledJob>> {
        let jobs = self.jobs.read().unwrap_or_else(PoisonError::into_inner);
        let mut list: Vec<ScheduledJob> = jobs.values().cloned().collect();
        list.sort_by(|a, b| {
            (&a.group_name, &a.job_name).cmp(&(&b.group_name, &b.job_name))
        });
        Ok(list)
    }

    async fn get_job(
        &self,
        name: &str,
        group: &str,
        storage_type: StorageType,
    ) -> Result<Option<ScheduledJob>> {
        let key = JobKey::new(name, group, storage_type);
        Ok(self
            .jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned())
    }

    async fn pause_job(&self, name: &str, group: &str, storage_type: StorageType) -> Result<()> {
        let target = JobKey::new(name, group, storage_type);
        let changed = self.transition(JobState::Normal, JobState::Paused, |key| *key == target);
        debug!(%name, %group, %storage_type, changed, "pause job");
        Ok(())
    }

    async fn pause_group(&self, group: &str, storage_type: StorageType) -> Result<()> {
        let changed = self.transition(JobState::Normal, JobState::Paused, |key| {
            key.group == group && key.storage_type == storage_type
        });
        debug!(%group, %storage_type, changed, "pause group");
        Ok(())
    }

    async fn resume_job(&self, name: &str, group: &str, storage_type: StorageType) -> Result<()> {
        let target = JobKey::new(name, group, storage_type);
        let changed = self.transition(JobState::Paused, JobState::Normal, |key| *key == target);
        debug!(%name, %group, %storage_type, changed, "resume job");
        Ok(())
    }

    async fn resume_group(&self, group: &str, storage_type: StorageType) -> Result<()> {
        let changed = self.transition(JobState::Paused, JobState::Normal, |key| {
            key.group == group && key.storage_type == storage_type
        });
        debug!(%group, %storage_type, changed, "resume group");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(name: &str, group: &str, state: JobState) -> ScheduledJob {
        ScheduledJob {
            job_name: name.to_string(),
            group_name: group.to_string(),
            state,
            start_time: None,
            previous_fire_time: None,
            next_fire_time: None,
            destination_name: "liferay/scheduler_dispatch".to_string(),
            storage_type: StorageType::Memory,
            cron_expression: "0 */5 * * * *".to_string(),
            exception: None,
        }
    }

    #[tokio::test]
    async fn test_unknown_job_is_none() {
        let engine = InMemoryEngine::new();
        engine.schedule(job("cleanup", "maintenance", JobState::Normal)).unwrap();

        assert!(engine
            .get_job("cleanup", "maintenance", StorageType::Persisted)
            .await
            .unwrap()
            .is_none());
        assert!(engine
            .get_job("other", "maintenance", StorageType::Memory)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_pause_is_idempotent() {
        let engine = InMemoryEngine::new();
        engine.schedule(job("cleanup", "maintenance", JobState::Normal)).unwrap();

        engine.pause_job("cleanup", "maintenance", StorageType::Memory).await.unwrap();
        engine.pause_job("cleanup", "maintenance", StorageType::Memory).await.unwrap();

        let found = engine
            .get_job("cleanup", "maintenance", StorageType::Memory)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.state, JobState::Paused);
    }

    #[tokio::test]
    async fn test_resume_after_pause() {
        let engine = InMemoryEngine::new();
        engine.schedule(job("cleanup", "maintenance", JobState::Normal)).unwrap();

        engine.pause_job("cleanup", "maintenance", StorageType::Memory).await.unwrap();
        engine.resume_job("cleanup", "maintenance", StorageType::Memory).await.unwrap();
        engine.resume_job("cleanup", "maintenance", StorageType::Memory).await.unwrap();

        let found = engine
            .get_job("cleanup", "maintenance", StorageType::Memory)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.state, JobState::Normal);
        assert!(found.next_fire_time.is_some());
    }

    #[tokio::test]
    async fn test_group_pause_leaves_other_groups() {
        let engine = InMemoryEngine::new();
        engine.schedule(job("a", "maintenance", JobState::Normal)).unwrap();
        engine.schedule(job("b", "maintenance", JobState::Normal)).unwrap();
        engine.schedule(job("c", "reports", JobState::Normal)).unwrap();
        engine.schedule(job("d", "maintenance", JobState::Complete)).unwrap();

        engine.pause_group("maintenance", StorageType::Memory).await.unwrap();

        let states: Vec<(String, JobState)> = engine
            .list_jobs()
            .await
            .unwrap()
            .into_iter()
            .map(|j| (j.job_name, j.state))
            .collect();
        assert_eq!(
            states,
            vec![
                ("a".to_string(), JobState::Paused),
                ("b".to_string(), JobState::Paused),
                ("d".to_string(), JobState::Complete),
                ("c".to_string(), JobState::Normal),
            ]
        );

        engine.resume_group("maintenance", StorageType::Memory).await.unwrap();
        let paused = engine
            .list_jobs()
            .await
            .unwrap()
            .into_iter()
            .filter(|j| j.state == JobState::Paused)
            .count();
        assert_eq!(paused, 0);
    }

    #[test]
    fn test_schedule_rejects_bad_cron() {
        let engine = InMemoryEngine::new();
        let mut bad = job("cleanup", "maintenance", JobState::Normal);
        bad.cron_expression = "every five minutes".to_string();
        assert!(matches!(
            engine.schedule(bad),
            Err(SchedulerError::InvalidCron { .. })
        ));
        assert!(engine.is_empty());
    }

    #[test]
    fn test_schedule_computes_next_fire_time() {
        let engine = InMemoryEngine::new();
        engine.schedule(job("cleanup", "maintenance", JobState::Normal)).unwrap();
        let found = tokio_test::block_on(engine.get_job(
            "cleanup",
            "maintenance",
            StorageType::Memory,
        ))
        .unwrap()
        .unwrap();
        assert!(found.next_fire_time.unwrap() > Utc::now());
        assert_eq!(engine.len(), 1);
    }
}

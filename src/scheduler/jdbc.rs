//! Scheduler engine backed by the Quartz JDBC job-store tables.
//!
//! Job state is derived from `QUARTZ_TRIGGERS.TRIGGER_STATE`; pause and
//! resume rewrite that column the same way Quartz's own job store does.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use tracing::{debug, info};

use super::{JobState, Result, ScheduledJob, SchedulerEngine, StorageType};
use crate::storage::ConnectionProvider;

const SQL_SELECT_JOBS: &str = "SELECT t.JOB_NAME, t.JOB_GROUP, t.TRIGGER_STATE, t.START_TIME,
        t.PREV_FIRE_TIME, t.NEXT_FIRE_TIME, j.DESCRIPTION, c.CRON_EXPRESSION
     FROM QUARTZ_TRIGGERS t
     LEFT JOIN QUARTZ_JOB_DETAILS j
        ON j.SCHED_NAME = t.SCHED_NAME AND j.JOB_NAME = t.JOB_NAME AND j.JOB_GROUP = t.JOB_GROUP
     LEFT JOIN QUARTZ_CRON_TRIGGERS c
        ON c.SCHED_NAME = t.SCHED_NAME AND c.TRIGGER_NAME = t.TRIGGER_NAME
           AND c.TRIGGER_GROUP = t.TRIGGER_GROUP
     WHERE (?1 IS NULL OR t.SCHED_NAME = ?1)";

const SQL_PAUSE_JOBS: &str = "UPDATE QUARTZ_TRIGGERS
     SET TRIGGER_STATE = CASE TRIGGER_STATE WHEN 'BLOCKED' THEN 'PAUSED_BLOCKED' ELSE 'PAUSED' END
     WHERE (?1 IS NULL OR SCHED_NAME = ?1) AND JOB_GROUP = ?2 AND (?3 IS NULL OR JOB_NAME = ?3)
       AND TRIGGER_STATE IN ('WAITING', 'ACQUIRED', 'BLOCKED')";

const SQL_RESUME_JOBS: &str = "UPDATE QUARTZ_TRIGGERS
     SET TRIGGER_STATE = CASE TRIGGER_STATE WHEN 'PAUSED_BLOCKED' THEN 'BLOCKED' ELSE 'WAITING' END
     WHERE (?1 IS NULL OR SCHED_NAME = ?1) AND JOB_GROUP = ?2 AND (?3 IS NULL OR JOB_NAME = ?3)
       AND TRIGGER_STATE IN ('PAUSED', 'PAUSED_BLOCKED')";

// With a scheduler name the marker is written even when the group has no
// triggers yet; without one the schedulers come from existing triggers.
const SQL_MARK_GROUP_PAUSED: &str = "INSERT OR IGNORE INTO QUARTZ_PAUSED_TRIGGER_GRPS (SCHED_NAME, TRIGGER_GROUP)
     SELECT ?1, ?2 WHERE ?1 IS NOT NULL
     UNION
     SELECT DISTINCT SCHED_NAME, TRIGGER_GROUP FROM QUARTZ_TRIGGERS
     WHERE ?1 IS NULL AND JOB_GROUP = ?2";

const SQL_UNMARK_GROUP_PAUSED: &str = "DELETE FROM QUARTZ_PAUSED_TRIGGER_GRPS
     WHERE (?1 IS NULL OR SCHED_NAME = ?1) AND TRIGGER_GROUP = ?2";

/// Reads and controls jobs persisted by a Quartz JDBC job store.
pub struct JdbcEngine {
    provider: Arc<ConnectionProvider>,
    scheduler_name: Option<String>,
    storage_type: StorageType,
}

impl JdbcEngine {
    pub fn new(provider: Arc<ConnectionProvider>) -> Self {
        Self {
            provider,
            scheduler_name: None,
            storage_type: StorageType::Persisted,
        }
    }

    /// Only read rows whose `SCHED_NAME` equals `name`.
    pub fn with_scheduler_name(mut self, name: Option<String>) -> Self {
        self.scheduler_name = name;
        self
    }

    /// Storage type reported for (and accepted by) this job store.
    pub fn with_storage_type(mut self, storage_type: StorageType) -> Self {
        self.storage_type = storage_type;
        self
    }

    fn job_from_row(&self, row: &Row<'_>) -> rusqlite::Result<ScheduledJob> {
        let trigger_state: String = row.get(2)?;
        Ok(ScheduledJob {
            job_name: row.get(0)?,
            group_name: row.get(1)?,
            state: job_state_from_trigger_state(&trigger_state),
            start_time: millis_to_time(row.get(3)?),
            previous_fire_time: millis_to_time(row.get(4)?),
            next_fire_time: millis_to_time(row.get(5)?),
            destination_name: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
            storage_type: self.storage_type,
            cron_expression: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
            exception: None,
        })
    }

    /// Run a pause/resume UPDATE, optionally marking the group in
    /// `QUARTZ_PAUSED_TRIGGER_GRPS` within the same transaction.
    fn transition(
        &self,
        sql: &str,
        group: &str,
        name: Option<&str>,
        paused_group: Option<bool>,
    ) -> Result<usize> {
        let mut conn = self.provider.get_connection()?;
        let tx = conn.transaction()?;
        let changed = tx.execute(sql, params![self.scheduler_name, group, name])?;
        match paused_group {
            Some(true) => {
                tx.execute(SQL_MARK_GROUP_PAUSED, params![self.scheduler_name, group])?;
            }
            Some(false) => {
                tx.execute(SQL_UNMARK_GROUP_PAUSED, params![self.scheduler_name, group])?;
            }
            None => {}
        }
        tx.commit()?;
        Ok(changed)
    }

    fn accepts(&self, storage_type: StorageType) -> bool {
        if storage_type != self.storage_type {
            debug!(requested = %storage_type, store = %self.storage_type, "storage type not held by this job store");
            return false;
        }
        true
    }
}

/// Map a Quartz `TRIGGER_STATE` value onto the host job state.
pub fn job_state_from_trigger_state(trigger_state: &str) -> JobState {
    match trigger_state {
        "WAITING" | "ACQUIRED" | "EXECUTING" | "BLOCKED" => JobState::Normal,
        "PAUSED" | "PAUSED_BLOCKED" => JobState::Paused,
        "COMPLETE" => JobState::Complete,
        "ERROR" => JobState::Expired,
        _ => JobState::Unscheduled,
    }
}

/// Quartz stores times as epoch millis; missing times are NULL, 0 or -1.
fn millis_to_time(millis: Option<i64>) -> Option<DateTime<Utc>> {
    millis
        .filter(|ms| *ms > 0)
        .and_then(DateTime::from_timestamp_millis)
}

#[async_trait::async_trait]
impl SchedulerEngine for JdbcEngine {
    async fn list_jobs(&self) -> Result<Vec<ScheduledJob>> {
        let conn = self.provider.get_connection()?;
        let sql = format!("{SQL_SELECT_JOBS} ORDER BY t.JOB_GROUP, t.JOB_NAME");
        let mut stmt = conn.prepare(&sql)?;
        let jobs = stmt
            .query_map(params![self.scheduler_name], |row| self.job_from_row(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        debug!(count = jobs.len(), "listed jobs from job store");
        Ok(jobs)
    }

    async fn get_job(
        &self,
        name: &str,
        group: &str,
        storage_type: StorageType,
    ) -> Result<Option<ScheduledJob>> {
        if !self.accepts(storage_type) {
            return Ok(None);
        }

        let conn = self.provider.get_connection()?;
        let sql = format!("{SQL_SELECT_JOBS} AND t.JOB_NAME = ?2 AND t.JOB_GROUP = ?3 LIMIT 1");
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params![self.scheduler_name, name, group])?;
        let job = match rows.next()? {
            Some(row) => Some(self.job_from_row(row)?),
            None => None,
        };
        Ok(job)
    }

    async fn pause_job(&self, name: &str, group: &str, storage_type: StorageType) -> Result<()> {
        if !self.accepts(storage_type) {
            return Ok(());
        }
        let changed = self.transition(SQL_PAUSE_JOBS, group, Some(name), None)?;
        info!(job = %name, %group, changed, "paused job");
        Ok(())
    }

    async fn pause_group(&self, group: &str, storage_type: StorageType) -> Result<()> {
        if !self.accepts(storage_type) {
            return Ok(());
        }
        let changed = self.transition(SQL_PAUSE_JOBS, group, None, Some(true))?;
        info!(%group, changed, "paused job group");
        Ok(())
    }

    async fn resume_job(&self, name: &str, group: &str, storage_type: StorageType) -> Result<()> {
        if !self.accepts(storage_type) {
            return Ok(());
        }
        let changed = self.transition(SQL_RESUME_JOBS, group, Some(name), None)?;
        info!(job = %name, %group, changed, "resumed job");
        Ok(())
    }

    async fn resume_group(&self, group: &str, storage_type: StorageType) -> Result<()> {
        if !self.accepts(storage_type) {
            return Ok(());
        }
        let changed = self.transition(SQL_RESUME_JOBS, group, None, Some(false))?;
        info!(%group, changed, "resumed job group");
        Ok(())
    }
}

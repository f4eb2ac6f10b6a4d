use std::sync::Arc;

use chrono::DateTime;
use rusqlite::{params, Row};
use tracing::{debug, warn};

use super::{FailurePolicy, FiredTrigger, QueryError};
use crate::storage::ConnectionProvider;

const SQL_FIRED_JOBS_COUNT_BY_TRIGGER_NAME: &str =
    "SELECT COUNT(*) FROM QUARTZ_FIRED_TRIGGERS WHERE TRIGGER_NAME = ?1";

const SQL_FIRED_JOBS_COUNT_BY_TRIGGER_GROUP: &str =
    "SELECT COUNT(*) FROM QUARTZ_FIRED_TRIGGERS WHERE TRIGGER_GROUP = ?1";

const SQL_FIRED_JOBS_BY_TRIGGER_GROUP: &str =
    "SELECT SCHED_NAME, ENTRY_ID, TRIGGER_NAME, TRIGGER_GROUP, INSTANCE_NAME, FIRED_TIME, STATE
     FROM QUARTZ_FIRED_TRIGGERS WHERE TRIGGER_GROUP = ?1";

/// Parameter-bound lookups against `QUARTZ_FIRED_TRIGGERS`.
///
/// Filter values are always bound, so names containing quotes or SQL
/// fragments match literally.
pub struct FiredTriggerService {
    provider: Arc<ConnectionProvider>,
    policy: FailurePolicy,
}

impl FiredTriggerService {
    pub fn new(provider: Arc<ConnectionProvider>, policy: FailurePolicy) -> Self {
        Self { provider, policy }
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Number of fired rows whose trigger name equals `name`.
    pub fn count_fired_by_trigger_name(&self, name: &str) -> Result<u64, QueryError> {
        let result = self.count(SQL_FIRED_JOBS_COUNT_BY_TRIGGER_NAME, name);
        self.apply_policy("count_fired_by_trigger_name", name, result, 0)
    }

    /// Number of fired rows whose trigger group equals `group`.
    pub fn count_fired_by_trigger_group(&self, group: &str) -> Result<u64, QueryError> {
        let result = self.count(SQL_FIRED_JOBS_COUNT_BY_TRIGGER_GROUP, group);
        self.apply_policy("count_fired_by_trigger_group", group, result, 0)
    }

    /// All fired rows in `group`, in the store's natural row order.
    pub fn list_fired_by_trigger_group(&self, group: &str) -> Result<Vec<FiredTrigger>, QueryError> {
        let result = self.list(group);
        self.apply_policy("list_fired_by_trigger_group", group, result, Vec::new())
    }

    /// Whether any fired row exists for trigger `name`.
    pub fn is_fired(&self, name: &str) -> Result<bool, QueryError> {
        Ok(self.count_fired_by_trigger_name(name)? > 0)
    }

    fn count(&self, sql: &str, value: &str) -> Result<u64, QueryError> {
        let conn = self.provider.get_connection()?;
        debug!(%sql, %value, "querying fired triggers");
        let count: i64 = conn.query_row(sql, params![value], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    fn list(&self, group: &str) -> Result<Vec<FiredTrigger>, QueryError> {
        let conn = self.provider.get_connection()?;
        debug!(sql = SQL_FIRED_JOBS_BY_TRIGGER_GROUP, %group, "querying fired triggers");
        let mut stmt = conn.prepare(SQL_FIRED_JOBS_BY_TRIGGER_GROUP)?;
        let rows = stmt
            .query_map(params![group], fired_trigger_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn apply_policy<T>(
        &self,
        operation: &'static str,
        filter: &str,
        result: Result<T, QueryError>,
        fallback: T,
    ) -> Result<T, QueryError> {
        match (result, self.policy) {
            (Ok(value), _) => Ok(value),
            (Err(e), FailurePolicy::Degrade) => {
                warn!(operation, %filter, error = %e, "fired-trigger query failed, reporting empty result");
                Ok(fallback)
            }
            (Err(e), FailurePolicy::FailFast) => Err(e),
        }
    }
}

fn fired_trigger_from_row(row: &Row<'_>) -> rusqlite::Result<FiredTrigger> {
    let fired_millis: i64 = row.get("FIRED_TIME")?;
    let fired_time = DateTime::from_timestamp_millis(fired_millis)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(5, fired_millis))?;

    Ok(FiredTrigger {
        scheduler_name: row.get("SCHED_NAME")?,
        entry_id: row.get("ENTRY_ID")?,
        trigger_name: row.get("TRIGGER_NAME")?,
        trigger_group: row.get("TRIGGER_GROUP")?,
        instance_name: row.get("INSTANCE_NAME")?,
        fired_time,
        state: row.get("STATE")?,
    })
}

//! Turn query results into tables.
//!
//! Building a [`Table`] is a pure transform; `text` and `json` render it.

pub mod json;
pub mod text;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::quartz::FiredTrigger;
use crate::scheduler::{ScheduledJob, StateFilter};

pub use self::json::render_json;
pub use self::text::render_text;

/// Placeholder for absent values.
pub const DASH: &str = "-";

pub const JOB_COLUMNS: [&str; 7] = [
    "Job Name",
    "Group Name",
    "State",
    "Start Time",
    "Previous Fire Time",
    "Next Fire Time",
    "Storage Type",
];

pub const FIRED_TRIGGER_COLUMNS: [&str; 5] = [
    "Job Name",
    "Group Name",
    "Instance Name",
    "Fired Time",
    "State",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Header row followed by one row per record.
    Columns,
    /// One `label | value` row per field, no header.
    KeyValue,
}

/// Rendering-agnostic table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub title: Option<String>,
    pub layout: Layout,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Shown, centered, in place of the body when `rows` is empty.
    pub empty_message: String,
}

impl Table {
    pub fn new(layout: Layout, columns: &[&str], empty_message: &str) -> Self {
        Self {
            title: None,
            layout,
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
            empty_message: empty_message.to_string(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// ISO-8601 in UTC with millisecond precision, or `-`.
pub fn format_timestamp(time: Option<DateTime<Utc>>) -> String {
    match time {
        Some(t) => t.to_rfc3339_opts(SecondsFormat::Millis, true),
        None => DASH.to_string(),
    }
}

pub fn jobs_table(jobs: &[ScheduledJob], filter: StateFilter) -> Table {
    let mut table = Table::new(Layout::Columns, &JOB_COLUMNS, "No Jobs found")
        .with_title(format!("List of the jobs filtered by state: {filter}"));
    for job in jobs {
        table.push_row(vec![
            job.job_name.clone(),
            job.group_name.clone(),
            job.state.to_string(),
            format_timestamp(job.start_time),
            format_timestamp(job.previous_fire_time),
            format_timestamp(job.next_fire_time),
            job.storage_type.to_string(),
        ]);
    }
    table
}

pub fn job_info_table(job: &ScheduledJob) -> Table {
    let mut table = Table::new(Layout::KeyValue, &["Field", "Value"], "No Jobs found")
        .with_title(format!("Detail of the job: {}", job.job_name));
    let or_dash = |value: &str| {
        if value.is_empty() {
            DASH.to_string()
        } else {
            value.to_string()
        }
    };

    let fields = [
        ("Job Name", job.job_name.clone()),
        ("Group Name", job.group_name.clone()),
        ("State", job.state.to_string()),
        ("Start Time", format_timestamp(job.start_time)),
        ("Previous Fire Time", format_timestamp(job.previous_fire_time)),
        ("Next Fire Time", format_timestamp(job.next_fire_time)),
        ("Cron Expression", or_dash(&job.cron_expression)),
        ("Destination Name", or_dash(&job.destination_name)),
        ("Storage Type", job.storage_type.to_string()),
        ("Job Exceptions", or_dash(job.exception.as_deref().unwrap_or_default())),
    ];
    for (label, value) in fields {
        table.push_row(vec![label.to_string(), value]);
    }
    table
}

pub fn fired_triggers_table(group: &str, fired: &[FiredTrigger]) -> Table {
    let mut table = Table::new(Layout::Columns, &FIRED_TRIGGER_COLUMNS, "No fired triggers found")
        .with_title(format!("Jobs in progress for group: {group}"));
    for trigger in fired {
        table.push_row(vec![
            trigger.trigger_name.clone(),
            trigger.trigger_group.clone(),
            trigger.instance_name.clone(),
            format_timestamp(Some(trigger.fired_time)),
            trigger.state.clone(),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::{JobState, StorageType};

    fn sample_job() -> ScheduledJob {
        ScheduledJob {
            job_name: "cleanup".to_string(),
            group_name: "maintenance".to_string(),
            state: JobState::Paused,
            start_time: DateTime::from_timestamp_millis(1_700_000_000_000),
            previous_fire_time: None,
            next_fire_time: DateTime::from_timestamp_millis(1_700_000_300_500),
            destination_name: "liferay/scheduler_dispatch".to_string(),
            storage_type: StorageType::Persisted,
            cron_expression: String::new(),
            exception: None,
        }
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(None), "-");
        assert_eq!(
            format_timestamp(DateTime::from_timestamp_millis(1_700_000_000_123)),
            "2023-11-14T22:13:20.123Z"
        );
    }

    #[test]
    fn test_jobs_table_rows() {
        let table = jobs_table(&[sample_job()], StateFilter::Only(JobState::Paused));
        assert_eq!(table.title.as_deref(), Some("List of the jobs filtered by state: PAUSED"));
        assert_eq!(table.columns.len(), 7);
        assert_eq!(
            table.rows[0],
            vec![
                "cleanup",
                "maintenance",
                "PAUSED",
                "2023-11-14T22:13:20.000Z",
                "-",
                "2023-11-14T22:18:20.500Z",
                "PERSISTED",
            ]
        );
    }

    #[test]
    fn test_job_info_uses_dash_for_missing_values() {
        let table = job_info_table(&sample_job());
        assert_eq!(table.layout, Layout::KeyValue);
        let value_of = |label: &str| {
            table
                .rows
                .iter()
                .find(|row| row[0] == label)
                .map(|row| row[1].clone())
                .unwrap()
        };
        assert_eq!(value_of("Previous Fire Time"), "-");
        assert_eq!(value_of("Cron Expression"), "-");
        assert_eq!(value_of("Job Exceptions"), "-");
        assert_eq!(value_of("Destination Name"), "liferay/scheduler_dispatch");
        assert_eq!(table.rows.len(), 10);
    }

    #[test]
    fn test_fired_triggers_table() {
        let fired = FiredTrigger {
            scheduler_name: "PersistedQuartzScheduler".to_string(),
            entry_id: "e1".to_string(),
            trigger_name: "cleanup".to_string(),
            trigger_group: "G1".to_string(),
            instance_name: "node-1".to_string(),
            fired_time: DateTime::from_timestamp_millis(1_700_000_000_000).unwrap(),
            state: "EXECUTING".to_string(),
        };
        let table = fired_triggers_table("G1", &[fired]);
        assert_eq!(
            table.rows[0],
            vec!["cleanup", "G1", "node-1", "2023-11-14T22:13:20.000Z", "EXECUTING"]
        );
        assert!(fired_triggers_table("G1", &[]).is_empty());
    }
}

//! Quartz JDBC job-store tables read by this tool.
//!
//! Quartz owns these tables in production. `migrate` creates the subset this
//! tool queries so a store can be bootstrapped for development and tests.

use anyhow::Result;
use rusqlite::Connection;

/// Create the Quartz tables if they are missing.
pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS QUARTZ_JOB_DETAILS (
            SCHED_NAME TEXT NOT NULL,
            JOB_NAME TEXT NOT NULL,
            JOB_GROUP TEXT NOT NULL,
            DESCRIPTION TEXT,
            JOB_CLASS_NAME TEXT NOT NULL,
            IS_DURABLE INTEGER NOT NULL DEFAULT 0,
            IS_NONCONCURRENT INTEGER NOT NULL DEFAULT 0,
            IS_UPDATE_DATA INTEGER NOT NULL DEFAULT 0,
            REQUESTS_RECOVERY INTEGER NOT NULL DEFAULT 0,
            JOB_DATA BLOB,
            PRIMARY KEY (SCHED_NAME, JOB_NAME, JOB_GROUP)
        );

        CREATE TABLE IF NOT EXISTS QUARTZ_TRIGGERS (
            SCHED_NAME TEXT NOT NULL,
            TRIGGER_NAME TEXT NOT NULL,
            TRIGGER_GROUP TEXT NOT NULL,
            JOB_NAME TEXT NOT NULL,
            JOB_GROUP TEXT NOT NULL,
            DESCRIPTION TEXT,
            NEXT_FIRE_TIME INTEGER,
            PREV_FIRE_TIME INTEGER,
            PRIORITY INTEGER,
            TRIGGER_STATE TEXT NOT NULL,
            TRIGGER_TYPE TEXT NOT NULL,
            START_TIME INTEGER NOT NULL,
            END_TIME INTEGER,
            CALENDAR_NAME TEXT,
            MISFIRE_INSTR INTEGER,
            JOB_DATA BLOB,
            PRIMARY KEY (SCHED_NAME, TRIGGER_NAME, TRIGGER_GROUP),
            FOREIGN KEY (SCHED_NAME, JOB_NAME, JOB_GROUP)
                REFERENCES QUARTZ_JOB_DETAILS (SCHED_NAME, JOB_NAME, JOB_GROUP)
        );

        CREATE TABLE IF NOT EXISTS QUARTZ_CRON_TRIGGERS (
            SCHED_NAME TEXT NOT NULL,
            TRIGGER_NAME TEXT NOT NULL,
            TRIGGER_GROUP TEXT NOT NULL,
            CRON_EXPRESSION TEXT NOT NULL,
            TIME_ZONE_ID TEXT,
            PRIMARY KEY (SCHED_NAME, TRIGGER_NAME, TRIGGER_GROUP),
            FOREIGN KEY (SCHED_NAME, TRIGGER_NAME, TRIGGER_GROUP)
                REFERENCES QUARTZ_TRIGGERS (SCHED_NAME, TRIGGER_NAME, TRIGGER_GROUP)
        );

        CREATE TABLE IF NOT EXISTS QUARTZ_FIRED_TRIGGERS (
            SCHED_NAME TEXT NOT NULL,
            ENTRY_ID TEXT NOT NULL,
            TRIGGER_NAME TEXT NOT NULL,
            TRIGGER_GROUP TEXT NOT NULL,
            INSTANCE_NAME TEXT NOT NULL,
            FIRED_TIME INTEGER NOT NULL,
            SCHED_TIME INTEGER,
            PRIORITY INTEGER NOT NULL DEFAULT 5,
            STATE TEXT NOT NULL,
            JOB_NAME TEXT,
            JOB_GROUP TEXT,
            IS_NONCONCURRENT INTEGER,
            REQUESTS_RECOVERY INTEGER,
            PRIMARY KEY (SCHED_NAME, ENTRY_ID)
        );

        CREATE TABLE IF NOT EXISTS QUARTZ_PAUSED_TRIGGER_GRPS (
            SCHED_NAME TEXT NOT NULL,
            TRIGGER_GROUP TEXT NOT NULL,
            PRIMARY KEY (SCHED_NAME, TRIGGER_GROUP)
        );

        CREATE INDEX IF NOT EXISTS IDX_QUARTZ_T_J ON QUARTZ_TRIGGERS (SCHED_NAME, JOB_NAME, JOB_GROUP);
        CREATE INDEX IF NOT EXISTS IDX_QUARTZ_T_STATE ON QUARTZ_TRIGGERS (SCHED_NAME, TRIGGER_STATE);
        CREATE INDEX IF NOT EXISTS IDX_QUARTZ_FT_TRIG_NAME ON QUARTZ_FIRED_TRIGGERS (TRIGGER_NAME);
        CREATE INDEX IF NOT EXISTS IDX_QUARTZ_FT_TRIG_GROUP ON QUARTZ_FIRED_TRIGGERS (TRIGGER_GROUP);",
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_creates_tables() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();

        for table in [
            "QUARTZ_JOB_DETAILS",
            "QUARTZ_TRIGGERS",
            "QUARTZ_CRON_TRIGGERS",
            "QUARTZ_FIRED_TRIGGERS",
            "QUARTZ_PAUSED_TRIGGER_GRPS",
        ] {
            let count: i64 = conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
                .unwrap();
            assert_eq!(count, 0, "{table} should start empty");
        }
    }

    #[test]
    fn test_migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap(); // Should not error
    }
}

//! Database layer for herdcare.

mod schema;
mod medications;
mod farms;
mod animals;
mod treatments;
mod tasks;
mod alerts;
mod records;
mod read_model;

pub use read_model::*;
pub use schema::*;

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use rusqlite::Connection;
use std::path::Path;
use thiserror::Error;

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Unparseable column value: {0}")]
    Parse(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Initialize schema.
    fn initialize(&self) -> DbResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Run `f` inside a single transaction; any error rolls every write back.
    pub fn in_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Database) -> Result<T, E>,
        E: From<DbError>,
    {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| E::from(DbError::from(e)))?;
        let value = f(self)?;
        tx.commit().map_err(|e| E::from(DbError::from(e)))?;
        Ok(value)
    }
}

// =========================================================================
// Column encoding
// =========================================================================

/// Timestamps are stored as fixed-width RFC 3339 UTC text so that string
/// comparison in SQL matches chronological order.
pub(crate) fn encode_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(crate) fn encode_opt_ts(ts: &Option<DateTime<Utc>>) -> Option<String> {
    ts.as_ref().map(encode_ts)
}

pub(crate) fn decode_ts(s: &str) -> DbResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DbError::Parse(format!("timestamp '{}': {}", s, e)))
}

pub(crate) fn decode_opt_ts(s: Option<String>) -> DbResult<Option<DateTime<Utc>>> {
    s.as_deref().map(decode_ts).transpose()
}

pub(crate) fn encode_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub(crate) fn decode_date(s: &str) -> DbResult<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| DbError::Parse(format!("date '{}': {}", s, e)))
}

pub(crate) fn encode_time(time: &NaiveTime) -> String {
    time.format("%H:%M:%S").to_string()
}

pub(crate) fn decode_time(s: &str) -> DbResult<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .map_err(|e| DbError::Parse(format!("time '{}': {}", s, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn test_open_file_reopens_existing_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("herdcare.db");

        {
            let db = Database::open(&path).unwrap();
            db.conn()
                .execute(
                    "INSERT INTO profiles (id, full_name, email, role, created_at) VALUES ('p1', 'A', 'a@x', 'farmer', '2024-01-01T00:00:00.000000000Z')",
                    [],
                )
                .unwrap();
        }

        let db = Database::open(&path).unwrap();
        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM profiles", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_schema_initialized() {
        let db = Database::open_in_memory().unwrap();

        let tables: Vec<String> = db
            .conn()
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        for table in [
            "profiles",
            "farms",
            "medications",
            "animals",
            "treatments",
            "prescription_tasks",
            "compliance_alerts",
            "consultation_requests",
            "problem_reports",
            "testing_reports",
        ] {
            assert!(tables.contains(&table.to_string()), "missing table {}", table);
        }
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let db = Database::open_in_memory().unwrap();

        let result: DbResult<()> = db.in_transaction(|db| {
            db.conn().execute(
                "INSERT INTO profiles (id, full_name, email, role, created_at) VALUES ('p1', 'A', 'a@x', 'farmer', '2024-01-01T00:00:00.000000000Z')",
                [],
            )?;
            Err(DbError::Constraint("abort".into()))
        });
        assert!(result.is_err());

        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM profiles", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_timestamp_encoding_is_sortable() {
        let a = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let b = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        assert_eq!(encode_ts(&a), "2024-01-02T00:00:00.000000000Z");
        assert!(encode_ts(&a) < encode_ts(&b));
        assert_eq!(decode_ts(&encode_ts(&a)).unwrap(), a);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode_ts("yesterday"), Err(DbError::Parse(_))));
        assert!(matches!(decode_date("2024-13-01"), Err(DbError::Parse(_))));
    }
}

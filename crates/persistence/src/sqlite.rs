//! SQLite call record store
//!
//! One connection behind a mutex; statements run on the blocking pool.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::records::{CallOutcome, CallRecord, CallRecordStore};
use crate::PersistenceError;

const SCHEMA_SQL: &str = include_str!("../migrations/001_calls.sql");

const SELECT_COLUMNS: &str = "SELECT id, phone_number, call_timestamp, duration_seconds, status, \
     secretary_name, secretary_mood, company_name, company_industry, \
     decision_maker_name, decision_maker_position, decision_maker_email, decision_maker_phone, \
     current_carrier, cargo_volume, directions, pain_points, outcome, next_action, \
     follow_up_date, objections, notes, created_at FROM calls";

#[derive(Clone)]
pub struct SqliteCallStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCallStore {
    /// Open or create the database file; `:memory:` gives a private database
    pub fn open(path: &str) -> Result<Self, PersistenceError> {
        let conn = if path == ":memory:" {
            Connection::open_in_memory()?
        } else {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        PersistenceError::InvalidData(format!("{}: {}", parent.display(), e))
                    })?;
                }
            }
            Connection::open(path)?
        };

        conn.execute_batch(SCHEMA_SQL)?;
        tracing::info!(path = %path, "Opened call record store");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, PersistenceError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, PersistenceError> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || f(&conn.lock()))
            .await
            .map_err(|e| PersistenceError::Task(e.to_string()))?
    }
}

#[async_trait]
impl CallRecordStore for SqliteCallStore {
    async fn save_call(&self, record: &CallRecord) -> Result<i64, PersistenceError> {
        let record = record.clone();
        let phone = record.phone_number.clone();

        let id = self
            .with_conn(move |conn| {
                conn.execute(
                    "INSERT INTO calls (
                        phone_number, call_timestamp, duration_seconds, status,
                        secretary_name, secretary_mood, company_name, company_industry,
                        decision_maker_name, decision_maker_position,
                        decision_maker_email, decision_maker_phone,
                        current_carrier, cargo_volume, directions, pain_points,
                        outcome, next_action, follow_up_date, objections, notes, created_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                              ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22)",
                    params![
                        record.phone_number,
                        record.call_timestamp.to_rfc3339(),
                        record.duration_seconds,
                        record.status,
                        record.secretary_name,
                        record.secretary_mood,
                        record.company_name,
                        record.company_industry,
                        record.decision_maker_name,
                        record.decision_maker_position,
                        record.decision_maker_email,
                        record.decision_maker_phone,
                        record.current_carrier,
                        record.cargo_volume,
                        serde_json::to_string(&record.directions)?,
                        serde_json::to_string(&record.pain_points)?,
                        record.outcome.as_str(),
                        record.next_action,
                        record.follow_up_date,
                        serde_json::to_string(&record.objections)?,
                        record.notes,
                        record.created_at.to_rfc3339(),
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;

        tracing::info!(id, phone = %phone, "Saved call record");
        Ok(id)
    }

    async fn list_calls(&self, limit: usize) -> Result<Vec<CallRecord>, PersistenceError> {
        self.with_conn(move |conn| {
            let sql = format!("{} ORDER BY call_timestamp DESC, id DESC LIMIT ?1", SELECT_COLUMNS);
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![limit as i64], read_row)?;

            let mut records = Vec::new();
            for row in rows {
                records.push(row?.into_record()?);
            }
            Ok(records)
        })
        .await
    }

    async fn get_call(&self, id: i64) -> Result<Option<CallRecord>, PersistenceError> {
        self.with_conn(move |conn| {
            let sql = format!("{} WHERE id = ?1", SELECT_COLUMNS);
            conn.query_row(&sql, params![id], read_row)
                .optional()?
                .map(RawRow::into_record)
                .transpose()
        })
        .await
    }
}

/// Row as stored, before JSON and timestamp columns are decoded
struct RawRow {
    id: i64,
    phone_number: String,
    call_timestamp: String,
    duration_seconds: i64,
    status: String,
    secretary_name: Option<String>,
    secretary_mood: Option<String>,
    company_name: Option<String>,
    company_industry: Option<String>,
    decision_maker_name: Option<String>,
    decision_maker_position: Option<String>,
    decision_maker_email: Option<String>,
    decision_maker_phone: Option<String>,
    current_carrier: Option<String>,
    cargo_volume: Option<String>,
    directions: Option<String>,
    pain_points: Option<String>,
    outcome: String,
    next_action: Option<String>,
    follow_up_date: Option<String>,
    objections: Option<String>,
    notes: Option<String>,
    created_at: String,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<RawRow> {
    Ok(RawRow {
        id: row.get(0)?,
        phone_number: row.get(1)?,
        call_timestamp: row.get(2)?,
        duration_seconds: row.get(3)?,
        status: row.get(4)?,
        secretary_name: row.get(5)?,
        secretary_mood: row.get(6)?,
        company_name: row.get(7)?,
        company_industry: row.get(8)?,
        decision_maker_name: row.get(9)?,
        decision_maker_position: row.get(10)?,
        decision_maker_email: row.get(11)?,
        decision_maker_phone: row.get(12)?,
        current_carrier: row.get(13)?,
        cargo_volume: row.get(14)?,
        directions: row.get(15)?,
        pain_points: row.get(16)?,
        outcome: row.get(17)?,
        next_action: row.get(18)?,
        follow_up_date: row.get(19)?,
        objections: row.get(20)?,
        notes: row.get(21)?,
        created_at: row.get(22)?,
    })
}

impl RawRow {
    fn into_record(self) -> Result<CallRecord, PersistenceError> {
        Ok(CallRecord {
            id: Some(self.id),
            phone_number: self.phone_number,
            call_timestamp: parse_timestamp(&self.call_timestamp)?,
            duration_seconds: self.duration_seconds,
            status: self.status,
            secretary_name: self.secretary_name,
            secretary_mood: self.secretary_mood,
            company_name: self.company_name,
            company_industry: self.company_industry,
            decision_maker_name: self.decision_maker_name,
            decision_maker_position: self.decision_maker_position,
            decision_maker_email: self.decision_maker_email,
            decision_maker_phone: self.decision_maker_phone,
            current_carrier: self.current_carrier,
            cargo_volume: self.cargo_volume,
            directions: parse_list(self.directions.as_deref())?,
            pain_points: parse_list(self.pain_points.as_deref())?,
            outcome: CallOutcome::from_str(&self.outcome),
            next_action: self.next_action,
            follow_up_date: self.follow_up_date,
            objections: parse_list(self.objections.as_deref())?,
            notes: self.notes,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, PersistenceError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| PersistenceError::InvalidData(format!("timestamp {:?}: {}", value, e)))
}

fn parse_list(value: Option<&str>) -> Result<Vec<String>, PersistenceError> {
    match value {
        Some(json) if !json.trim().is_empty() => Ok(serde_json::from_str(json)?),
        _ => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_tolerates_empty_columns() {
        assert!(parse_list(None).unwrap().is_empty());
        assert!(parse_list(Some("")).unwrap().is_empty());
        assert_eq!(parse_list(Some(r#"["busy"]"#)).unwrap(), ["busy"]);
        assert!(parse_list(Some("not json")).is_err());
    }

    #[test]
    fn test_parse_timestamp() {
        assert!(parse_timestamp("2026-01-05T10:00:00+03:00").is_ok());
        assert!(matches!(
            parse_timestamp("yesterday"),
            Err(PersistenceError::InvalidData(_))
        ));
    }

    #[test]
    fn test_schema_is_idempotent() {
        let store = SqliteCallStore::open(":memory:").unwrap();
        store.conn.lock().execute_batch(SCHEMA_SQL).unwrap();
    }
}

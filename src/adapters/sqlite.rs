//! Local SQLite record store.
//!
//! One row per finished call in `call_records`; `patient_info` is stored as
//! JSON text. A connection is opened per operation on the blocking pool.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};

use crate::domain::CallRecord;

use super::{CallHistory, RecordStore};

/// SQLite-backed call records
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db_path: PathBuf,
}

impl SqliteStore {
    /// Open or create the database and ensure the table exists
    pub fn new(db_path: PathBuf) -> Result<Self> {
        let this = Self { db_path };
        this.init()?;
        Ok(this)
    }

    fn open(path: &Path) -> Result<Connection> {
        Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )
        .with_context(|| format!("Failed to open call database: {}", path.display()))
    }

    fn init(&self) -> Result<()> {
        if let Some(parent) = self.db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let conn = Self::open(&self.db_path)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS call_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                created_at TEXT NOT NULL,
                from_speaker TEXT NOT NULL,
                call_logs TEXT NOT NULL,
                call_id TEXT NOT NULL,
                patient_info TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_call_records_created_at ON call_records(created_at);
            CREATE INDEX IF NOT EXISTS idx_call_records_call_id ON call_records(call_id);
            "#,
        )
        .context("Failed to create call_records table")?;
        Ok(())
    }

    /// Run a closure against a fresh connection on the blocking pool
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = Self::open(&path)?;
            f(&conn)
        })
        .await
        .context("SQLite task panicked")?
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<(String, String, String, String, String)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn decode(raw: (String, String, String, String, String)) -> Result<CallRecord> {
    let (created_at, from, call_logs, call_id, patient_info) = raw;
    Ok(CallRecord {
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .with_context(|| format!("Invalid created_at: {}", created_at))?
            .with_timezone(&Utc),
        from,
        call_logs,
        call_id,
        patient_info: serde_json::from_str(&patient_info).context("Invalid patient_info JSON")?,
    })
}

const SELECT: &str =
    "SELECT created_at, from_speaker, call_logs, call_id, patient_info FROM call_records";

#[async_trait]
impl RecordStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn insert_call_record(&self, record: &CallRecord) -> Result<()> {
        let record = record.clone();
        let patient_info =
            serde_json::to_string(&record.patient_info).context("Failed to serialize patient info")?;

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO call_records (created_at, from_speaker, call_logs, call_id, patient_info)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
                    record.from,
                    record.call_logs,
                    record.call_id,
                    patient_info
                ],
            )
            .context("Failed to insert call record")?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl CallHistory for SqliteStore {
    async fn recent(&self, limit: usize) -> Result<Vec<CallRecord>> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&format!("{SELECT} ORDER BY created_at DESC, id DESC LIMIT ?1"))?;
            let rows = stmt
                .query_map(params![limit as i64], row_to_record)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows.into_iter().map(decode).collect()
        })
        .await
    }

    async fn find(&self, call_id: &str) -> Result<Option<CallRecord>> {
        let call_id = call_id.to_string();
        self.with_conn(move |conn| {
            let raw = conn
                .query_row(
                    &format!("{SELECT} WHERE call_id = ?1 ORDER BY id DESC LIMIT 1"),
                    params![call_id],
                    row_to_record,
                )
                .optional()?;
            raw.map(decode).transpose()
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PatientRecord, Speaker, TranscriptLog};
    use tempfile::TempDir;

    fn record(call_id: &str) -> CallRecord {
        let mut log = TranscriptLog::new();
        log.append(Speaker::User, "thanks, bye");
        CallRecord::snapshot(call_id, Some(Speaker::User), &log, &PatientRecord::new())
    }

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("nested").join("calls.sqlite")).unwrap();

        let first = record("room-1");
        store.insert_call_record(&first).await.unwrap();
        store.insert_call_record(&record("room-2")).await.unwrap();

        let recent = store.recent(10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].call_id, "room-2");

        let found = store.find("room-1").await.unwrap().unwrap();
        assert_eq!(found.call_logs, first.call_logs);
        assert_eq!(found.patient_info, first.patient_info);
        assert_eq!(found.from, "user");

        assert!(store.find("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_recent_respects_limit() {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("calls.sqlite")).unwrap();
        for i in 0..3 {
            store.insert_call_record(&record(&format!("room-{i}"))).await.unwrap();
        }

        assert_eq!(store.recent(2).await.unwrap().len(), 2);
    }
}

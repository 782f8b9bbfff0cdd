//! Processing records: the bookkeeping row written atomically with each load.

use std::{fmt, str::FromStr};

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params, types::Type};
use serde::Serialize;
use uuid::Uuid;

use crate::error::Result;

pub const RECORDS_TABLE: &str = "processing_records";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RecordStatus {
    Processing,
    Success,
    Failed,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Processing => "Processing",
            RecordStatus::Success => "Success",
            RecordStatus::Failed => "Failed",
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordStatus {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value {
            "Processing" => Ok(RecordStatus::Processing),
            "Success" => Ok(RecordStatus::Success),
            "Failed" => Ok(RecordStatus::Failed),
            other => Err(format!("unknown record status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessingRecord {
    pub id: Uuid,
    pub label: String,
    pub processed_at: DateTime<Utc>,
    pub status: RecordStatus,
    pub row_count: u64,
    pub content_hash: Option<String>,
}

impl ProcessingRecord {
    /// Fresh record in the `Processing` state with no rows counted yet. The
    /// timestamp is truncated to the microseconds that storage keeps.
    pub fn start(label: &str, content_hash: Option<&str>) -> Self {
        Self {
            id: Uuid::new_v4(),
            label: label.to_string(),
            processed_at: Utc::now().trunc_subsecs(6),
            status: RecordStatus::Processing,
            row_count: 0,
            content_hash: content_hash.map(str::to_string),
        }
    }
}

/// Persistence of processing records. Every method runs on the connection (or
/// open transaction) it is handed.
pub trait ProcessingRecordStore {
    fn create(&self, conn: &Connection, record: &ProcessingRecord) -> Result<()>;
    fn update(&self, conn: &Connection, record: &ProcessingRecord) -> Result<()>;
    fn get(&self, conn: &Connection, id: Uuid) -> Result<Option<ProcessingRecord>>;
    /// Whether a successful record with this content hash exists.
    fn exists_by_hash(&self, conn: &Connection, hash: &str) -> Result<bool>;
    /// Most recent record carrying this content hash, whatever its status.
    fn get_by_hash(&self, conn: &Connection, hash: &str) -> Result<Option<ProcessingRecord>>;
    /// Most recent `Success` record carrying this content hash.
    fn latest_success_by_hash(
        &self,
        conn: &Connection,
        hash: &str,
    ) -> Result<Option<ProcessingRecord>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteRecordStore;

const SELECT_COLUMNS: &str = "id, label, processed_at, status, row_count, content_hash";

fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<ProcessingRecord> {
    let id: String = row.get(0)?;
    let processed_at: String = row.get(2)?;
    let status: String = row.get(3)?;
    let row_count: i64 = row.get(4)?;
    Ok(ProcessingRecord {
        id: Uuid::parse_str(&id).map_err(|err| conversion_error(0, err))?,
        label: row.get(1)?,
        processed_at: DateTime::parse_from_rfc3339(&processed_at)
            .map_err(|err| conversion_error(2, err))?
            .with_timezone(&Utc),
        status: status
            .parse()
            .map_err(|_| rusqlite::Error::InvalidColumnType(3, "status".into(), Type::Text))?,
        row_count: u64::try_from(row_count).map_err(|err| conversion_error(4, err))?,
        content_hash: row.get(5)?,
    })
}

fn row_count_param(record: &ProcessingRecord) -> i64 {
    i64::try_from(record.row_count).unwrap_or(i64::MAX)
}

impl ProcessingRecordStore for SqliteRecordStore {
    fn create(&self, conn: &Connection, record: &ProcessingRecord) -> Result<()> {
        conn.execute(
            "INSERT INTO processing_records (id, label, processed_at, status, row_count, content_hash) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.id.to_string(),
                &record.label,
                record.processed_at.to_rfc3339_opts(SecondsFormat::Micros, true),
                record.status.as_str(),
                row_count_param(record),
                record.content_hash.as_deref(),
            ],
        )?;
        Ok(())
    }

    fn update(&self, conn: &Connection, record: &ProcessingRecord) -> Result<()> {
        let changed = conn.execute(
            "UPDATE processing_records SET status = ?2, row_count = ?3 WHERE id = ?1",
            params![
                record.id.to_string(),
                record.status.as_str(),
                row_count_param(record),
            ],
        )?;
        if changed == 0 {
            return Err(rusqlite::Error::QueryReturnedNoRows.into());
        }
        Ok(())
    }

    fn get(&self, conn: &Connection, id: Uuid) -> Result<Option<ProcessingRecord>> {
        let record = conn
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM processing_records WHERE id = ?1"),
                params![id.to_string()],
                record_from_row,
            )
            .optional()?;
        Ok(record)
    }

    fn exists_by_hash(&self, conn: &Connection, hash: &str) -> Result<bool> {
        let found: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM processing_records WHERE content_hash = ?1 AND status = ?2)",
            params![hash, RecordStatus::Success.as_str()],
            |r| r.get(0),
        )?;
        Ok(found)
    }

    fn get_by_hash(&self, conn: &Connection, hash: &str) -> Result<Option<ProcessingRecord>> {
        let record = conn
            .query_row(
                &format!(
                    "SELECT {SELECT_COLUMNS} FROM processing_records WHERE content_hash = ?1 \
                     ORDER BY processed_at DESC LIMIT 1"
                ),
                params![hash],
                record_from_row,
            )
            .optional()?;
        Ok(record)
    }

    fn latest_success_by_hash(
        &self,
        conn: &Connection,
        hash: &str,
    ) -> Result<Option<ProcessingRecord>> {
        let record = conn
            .query_row(
                &format!(
                    "SELECT {SELECT_COLUMNS} FROM processing_records \
                     WHERE content_hash = ?1 AND status = ?2 \
                     ORDER BY processed_at DESC LIMIT 1"
                ),
                params![hash, RecordStatus::Success.as_str()],
                record_from_row,
            )
            .optional()?;
        Ok(record)
    }
}

/// All records, oldest first.
pub fn list_records(conn: &Connection) -> Result<Vec<ProcessingRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SELECT_COLUMNS} FROM processing_records ORDER BY processed_at, id"
    ))?;
    let records = stmt
        .query_map([], record_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(records)
}

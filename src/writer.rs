//! Single-transaction writer for processing records and normalized tables.
//!
//! [`TransactionalWriter::write`] opens one transaction on the supplied
//! connection, inserts a `Processing` record, bulk-loads every table, marks the
//! record `Success` with the summed row count and commits. Any failure before
//! the commit drops the transaction, which rolls back the record insert and
//! every table load together. There are no retries.

use log::{debug, info, warn};
use rusqlite::Connection;
use uuid::Uuid;

use crate::{
    error::{IngestError, Result, WriteStage},
    record::{ProcessingRecord, ProcessingRecordStore, RecordStatus},
    table::NormalizedTable,
};

/// Per-load details handed to the bulk loader.
#[derive(Debug, Clone)]
pub struct LoadContext {
    pub record_id: Uuid,
    pub label: String,
}

/// Loads one fully typed table through the store's fastest insertion path.
/// `conn` is the writer's open transaction.
pub trait BulkLoader {
    fn load(&self, conn: &Connection, table: &NormalizedTable, ctx: &LoadContext)
    -> Result<usize>;
}

pub struct TransactionalWriter<L, S> {
    loader: L,
    store: S,
}

fn rolled_back(label: &str, stage: WriteStage, err: impl Into<IngestError>) -> IngestError {
    let source = err.into();
    match stage {
        WriteStage::Begin => warn!("Could not open a transaction for load '{label}': {source}"),
        _ => warn!("Rolling back load '{label}' after failure during {stage}: {source}"),
    }
    IngestError::TransactionFailure {
        label: label.to_string(),
        stage,
        source: Box::new(source),
    }
}

impl<L, S> TransactionalWriter<L, S>
where
    L: BulkLoader,
    S: ProcessingRecordStore,
{
    pub fn new(loader: L, store: S) -> Self {
        Self { loader, store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn write(
        &self,
        conn: &mut Connection,
        tables: &[NormalizedTable],
        label: &str,
    ) -> Result<ProcessingRecord> {
        self.write_with_hash(conn, tables, label, None)
    }

    pub fn write_with_hash(
        &self,
        conn: &mut Connection,
        tables: &[NormalizedTable],
        label: &str,
        content_hash: Option<&str>,
    ) -> Result<ProcessingRecord> {
        let tx = conn
            .transaction()
            .map_err(|err| rolled_back(label, WriteStage::Begin, err))?;

        let mut record = ProcessingRecord::start(label, content_hash);
        self.store
            .create(&tx, &record)
            .map_err(|err| rolled_back(label, WriteStage::InsertRecord, err))?;

        let ctx = LoadContext {
            record_id: record.id,
            label: label.to_string(),
        };
        let mut total = 0u64;
        for table in tables {
            let loaded = self.loader.load(&tx, table, &ctx).map_err(|err| {
                rolled_back(label, WriteStage::BulkLoad(table.target.clone()), err)
            })?;
            debug!("Loaded {loaded} row(s) into '{}'", table.target);
            total += loaded as u64;
        }

        record.status = RecordStatus::Success;
        record.row_count = total;
        self.store
            .update(&tx, &record)
            .map_err(|err| rolled_back(label, WriteStage::UpdateRecord, err))?;

        tx.commit()
            .map_err(|err| rolled_back(label, WriteStage::Commit, err))?;
        info!(
            "Committed processing record {} ('{label}'): {} table(s), {total} row(s)",
            record.id,
            tables.len()
        );
        Ok(record)
    }
}

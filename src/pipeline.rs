//! Command glue: reads CSV inputs, runs detection and normalization, and
//! drives the transactional writer against a SQLite database.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use itertools::Itertools;
use log::{info, warn};
use rusqlite::Connection;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::{
    cli::{ConvertArgs, DetectArgs, InputArgs, LoadArgs, OutputFormat, SchemasArgs},
    convert::DatasetConverter,
    detect::SchemaDetector,
    error::IngestError,
    io_utils::{InputSpec, ReadOptions, load_source_table, resolve_encoding},
    preview,
    record::{ProcessingRecord, ProcessingRecordStore, RecordStatus, SqliteRecordStore},
    registry::SchemaRegistry,
    store::{self, SqliteBulkLoader},
    table::SourceTable,
    writer::TransactionalWriter,
};

/// Result of a load request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded(ProcessingRecord),
    /// Identical inputs were already loaded successfully under this record.
    Skipped(ProcessingRecord),
}

fn read_options(args: &InputArgs) -> Result<ReadOptions> {
    Ok(ReadOptions {
        delimiter: args.delimiter,
        encoding: resolve_encoding(args.input_encoding.as_deref())?,
        null_tokens: args.null_tokens.clone(),
    })
}

pub fn read_inputs(inputs: &[InputSpec], options: &ReadOptions) -> Result<Vec<SourceTable>> {
    inputs
        .iter()
        .map(|input| load_source_table(input, options))
        .collect()
}

/// SHA-256 over every input's table name and raw bytes, in argument order.
pub fn content_hash(inputs: &[InputSpec]) -> Result<String> {
    let mut hasher = Sha256::new();
    for input in inputs {
        let bytes =
            fs::read(&input.path).with_context(|| format!("Hashing input {:?}", input.path))?;
        hasher.update(input.name.as_bytes());
        hasher.update([0u8]);
        hasher.update((bytes.len() as u64).to_le_bytes());
        hasher.update(&bytes);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Converts `tables` and writes them in one transaction, unless a successful
/// record with the same content hash already exists and `force` is off.
pub fn load_tables(
    conn: &mut Connection,
    registry: &SchemaRegistry,
    tables: &[SourceTable],
    label: &str,
    content_hash: Option<&str>,
    force: bool,
) -> Result<LoadOutcome> {
    store::init(conn, registry).context("Initialising target database")?;
    let records = SqliteRecordStore;

    if let Some(hash) = content_hash
        && !force
        && let Some(previous) = records.latest_success_by_hash(conn, hash)?
    {
        warn!(
            "Inputs already loaded by record {} ('{}'); skipping",
            previous.id, previous.label
        );
        return Ok(LoadOutcome::Skipped(previous));
    }

    let normalized = DatasetConverter::new(registry)
        .convert(tables)
        .context("Converting source tables")?;

    let writer = TransactionalWriter::new(SqliteBulkLoader::new(registry), records);
    match writer.write_with_hash(conn, &normalized, label, content_hash) {
        Ok(record) => Ok(LoadOutcome::Loaded(record)),
        Err(err @ IngestError::TransactionFailure { .. }) => {
            record_failure(conn, writer.store(), label, content_hash);
            Err(err.into())
        }
        Err(err) => Err(err.into()),
    }
}

/// Leaves a `Failed` record behind, outside the rolled back transaction.
fn record_failure(
    conn: &Connection,
    records: &impl ProcessingRecordStore,
    label: &str,
    content_hash: Option<&str>,
) {
    let mut failed = ProcessingRecord::start(label, content_hash);
    failed.status = RecordStatus::Failed;
    if let Err(err) = records.create(conn, &failed) {
        warn!("Could not store failed processing record for '{label}': {err}");
    }
}

fn load_registry(path: &Path) -> Result<SchemaRegistry> {
    let registry = SchemaRegistry::load(path)?;
    info!(
        "Loaded {} entit{} from {:?}",
        registry.entities().len(),
        if registry.entities().len() == 1 { "y" } else { "ies" },
        path
    );
    Ok(registry)
}

#[derive(Serialize)]
struct EntitySummary<'a> {
    entity: String,
    sheets: &'a [String],
    columns: Vec<String>,
}

pub fn execute_schemas(args: &SchemasArgs) -> Result<()> {
    let registry = load_registry(&args.registry)?;
    let summaries = registry
        .entities()
        .iter()
        .map(|entity| EntitySummary {
            entity: entity.qualified_name(),
            sheets: &entity.sheets,
            columns: entity
                .columns
                .iter()
                .map(|column| format!("{}:{}", column.property, column.declared_type))
                .collect(),
        })
        .collect::<Vec<_>>();
    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summaries)?),
        OutputFormat::Table => {
            let headers = ["entity", "sheets", "columns"].map(String::from);
            let rows = summaries
                .iter()
                .map(|summary| {
                    vec![
                        summary.entity.clone(),
                        summary.sheets.join(", "),
                        summary.columns.join(", "),
                    ]
                })
                .collect::<Vec<_>>();
            print!("{}", preview::render_table(&headers, &rows));
        }
    }
    Ok(())
}

pub fn execute_detect(args: &DetectArgs) -> Result<()> {
    let registry = load_registry(&args.input.registry)?;
    let tables = read_inputs(&args.input.inputs, &read_options(&args.input)?)?;
    let detector = SchemaDetector::new(&registry);
    let mut rows = Vec::with_capacity(tables.len());
    for table in &tables {
        let detected = detector
            .detect(table)
            .with_context(|| format!("Detecting schema of '{}'", table.name))?;
        rows.push(vec![
            table.name.clone(),
            detected.qualified_name,
            table.row_count().to_string(),
        ]);
    }
    let headers = ["source", "entity", "rows"].map(String::from);
    print!("{}", preview::render_table(&headers, &rows));
    Ok(())
}

pub fn execute_convert(args: &ConvertArgs) -> Result<()> {
    let registry = load_registry(&args.input.registry)?;
    let tables = read_inputs(&args.input.inputs, &read_options(&args.input)?)?;
    let normalized = DatasetConverter::new(&registry).convert(&tables)?;
    match args.format {
        OutputFormat::Json => {
            let limited = normalized
                .into_iter()
                .map(|mut table| {
                    if let Some(limit) = args.limit {
                        table.rows.truncate(limit);
                    }
                    table
                })
                .collect::<Vec<_>>();
            println!("{}", serde_json::to_string_pretty(&limited)?);
        }
        OutputFormat::Table => {
            for table in &normalized {
                println!("{} ({} row(s))", table.target, table.row_count());
                print!("{}", preview::render_normalized(table, args.limit));
                println!();
            }
        }
    }
    Ok(())
}

pub fn execute_load(args: &LoadArgs) -> Result<()> {
    let registry = load_registry(&args.input.registry)?;
    let inputs = &args.input.inputs;
    let tables = read_inputs(inputs, &read_options(&args.input)?)?;
    let hash = content_hash(inputs)?;
    let label = args
        .label
        .clone()
        .unwrap_or_else(|| inputs.iter().map(|input| &input.name).join("+"));

    let mut conn = store::open(&args.database)
        .with_context(|| format!("Opening database {:?}", args.database))?;
    match load_tables(
        &mut conn,
        &registry,
        &tables,
        &label,
        Some(&hash),
        args.force,
    )? {
        LoadOutcome::Loaded(record) => println!(
            "Loaded {} row(s) as record {} ({})",
            record.row_count, record.id, record.status
        ),
        LoadOutcome::Skipped(record) => println!(
            "Skipped: identical inputs already loaded as record {} ({} row(s))",
            record.id, record.row_count
        ),
    }
    Ok(())
}

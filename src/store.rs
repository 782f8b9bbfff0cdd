//! SQLite target store: table creation and the bulk loader.

use std::time::Duration;

use itertools::Itertools;
use log::debug;
use rusqlite::{Connection, params_from_iter, types::Value as SqlValue};

use crate::{
    data::Value,
    error::Result,
    registry::{DEFAULT_RECORD_LINK_COLUMN, SchemaRegistry},
    schema::{ColumnSpec, EntitySchema, SemanticType},
    table::NormalizedTable,
    writer::{BulkLoader, LoadContext},
};

pub fn open(path: &std::path::Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(Duration::from_secs(5))?;
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection> {
    Ok(Connection::open_in_memory()?)
}

pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Creates the processing record table and one table per registered entity.
pub fn init(conn: &Connection, registry: &SchemaRegistry) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS processing_records (
          id TEXT PRIMARY KEY,
          label TEXT NOT NULL,
          processed_at TEXT NOT NULL,
          status TEXT NOT NULL CHECK (status IN ('Processing','Success','Failed')),
          row_count INTEGER NOT NULL DEFAULT 0,
          content_hash TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_processing_records_hash
          ON processing_records(content_hash);
        "#,
    )?;
    for entity in registry.entities() {
        conn.execute_batch(&entity_ddl(entity))?;
    }
    Ok(())
}

fn column_ddl(spec: &ColumnSpec) -> String {
    let name = quote_identifier(spec.storage_name());
    if spec.generated_identity {
        return format!("{name} INTEGER PRIMARY KEY AUTOINCREMENT");
    }
    let mut ddl = format!("{name} {}", spec.semantic_type().storage_affinity());
    if spec.required || spec.is_key || !spec.is_nullable() {
        ddl.push_str(" NOT NULL");
    }
    if let Some(max) = spec.max_length
        && *spec.semantic_type() == SemanticType::Text
    {
        ddl.push_str(&format!(" CHECK (length({name}) <= {max})"));
    }
    ddl
}

/// `CREATE TABLE` plus index statements for one entity.
pub fn entity_ddl(entity: &EntitySchema) -> String {
    let table = quote_identifier(&entity.qualified_name());
    let mut definitions = entity.columns.iter().map(column_ddl).collect::<Vec<_>>();
    if entity.identity_column().is_none() {
        let keys = entity
            .columns
            .iter()
            .filter(|column| column.is_key)
            .map(|column| quote_identifier(column.storage_name()))
            .join(", ");
        if !keys.is_empty() {
            definitions.push(format!("PRIMARY KEY ({keys})"));
        }
    }

    let mut ddl = format!(
        "CREATE TABLE IF NOT EXISTS {table} (\n  {}\n);\n",
        definitions.join(",\n  ")
    );
    for column in entity.columns.iter().filter(|column| column.indexed) {
        let index = quote_identifier(&format!(
            "ix_{}_{}",
            entity.qualified_name(),
            column.storage_name()
        ));
        ddl.push_str(&format!(
            "CREATE INDEX IF NOT EXISTS {index} ON {table} ({});\n",
            quote_identifier(column.storage_name())
        ));
    }
    ddl
}

pub fn to_sql_value(value: Option<&Value>) -> SqlValue {
    match value {
        None => SqlValue::Null,
        Some(Value::Text(s)) => SqlValue::Text(s.clone()),
        Some(Value::Int32(i)) => SqlValue::Integer(i64::from(*i)),
        Some(Value::Int64(i)) => SqlValue::Integer(*i),
        Some(Value::Double(f)) => SqlValue::Real(*f),
        Some(Value::Boolean(b)) => SqlValue::Integer(i64::from(*b)),
        Some(
            other @ (Value::Decimal(_)
            | Value::DateTime(_)
            | Value::Date(_)
            | Value::Time(_)
            | Value::Guid(_)),
        ) => SqlValue::Text(other.as_display()),
    }
}

/// Bulk loader that streams rows through one cached prepared `INSERT` on the
/// open transaction and stamps the record-link column when the entity has one.
pub struct SqliteBulkLoader<'r> {
    registry: &'r SchemaRegistry,
    link_column: String,
}

impl<'r> SqliteBulkLoader<'r> {
    pub fn new(registry: &'r SchemaRegistry) -> Self {
        Self {
            registry,
            link_column: DEFAULT_RECORD_LINK_COLUMN.to_string(),
        }
    }

    pub fn with_link_column(mut self, column: impl Into<String>) -> Self {
        self.link_column = column.into();
        self
    }
}

impl BulkLoader for SqliteBulkLoader<'_> {
    fn load(&self, conn: &Connection, table: &NormalizedTable, ctx: &LoadContext) -> Result<usize> {
        if table.rows.is_empty() {
            return Ok(0);
        }
        let entity = self.registry.entity(&table.target)?;
        let link = entity
            .column_spec(&self.link_column)
            .filter(|spec| !table.columns.iter().any(|c| c.name == spec.property))
            .map(|spec| spec.storage_name().to_string());

        let mut columns = table
            .columns
            .iter()
            .map(|column| quote_identifier(&column.storage_name))
            .collect::<Vec<_>>();
        if let Some(link) = &link {
            columns.push(quote_identifier(link));
        }
        let placeholders = (1..=columns.len()).map(|idx| format!("?{idx}")).join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({placeholders})",
            quote_identifier(&table.target),
            columns.join(", ")
        );
        debug!("Bulk loading {} row(s): {sql}", table.row_count());

        let record_id = ctx.record_id.to_string();
        let mut stmt = conn.prepare_cached(&sql)?;
        let mut loaded = 0usize;
        for row in &table.rows {
            let mut values = row.iter().map(|cell| to_sql_value(cell.as_ref())).collect::<Vec<_>>();
            if link.is_some() {
                values.push(SqlValue::Text(record_id.clone()));
            }
            loaded += stmt.execute(params_from_iter(values))?;
        }
        Ok(loaded)
    }
}

/// Number of rows currently stored for an entity.
pub fn count_rows(conn: &Connection, qualified_name: &str) -> Result<i64> {
    let count = conn.query_row(
        &format!("SELECT COUNT(*) FROM {}", quote_identifier(qualified_name)),
        [],
        |r| r.get(0),
    )?;
    Ok(count)
}

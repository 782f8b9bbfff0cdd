#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use sheet_ingest::{
    ColumnSpec, DeclaredType, EntitySchema, SchemaRegistry, SemanticType, SourceTable,
};
use tempfile::{TempDir, tempdir};

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Registry loaded from `tests/data/registry.yml`.
pub fn fixture_registry() -> SchemaRegistry {
    SchemaRegistry::load(&fixture_path("registry.yml")).expect("load fixture registry")
}

/// `sales.Orders` with an identity key, a required code and a nullable quantity.
pub fn orders_entity() -> EntitySchema {
    EntitySchema::new("sales", "Orders")
        .column(ColumnSpec::identity("Id"))
        .column(ColumnSpec::new("Code", DeclaredType::required(SemanticType::Text)).required())
        .column(ColumnSpec::new(
            "Quantity",
            DeclaredType::optional(SemanticType::Int32),
        ))
}

/// `sales.Lines` with a non-nullable amount and a record link column.
pub fn lines_entity() -> EntitySchema {
    EntitySchema::new("sales", "Lines")
        .column(ColumnSpec::identity("Id"))
        .column(ColumnSpec::new("Sku", DeclaredType::required(SemanticType::Text)))
        .column(ColumnSpec::new(
            "Amount",
            DeclaredType::required(SemanticType::Decimal),
        ))
        .column(ColumnSpec::new(
            "ProcessingRecordId",
            DeclaredType::required(SemanticType::Text),
        ))
}

/// `sales.Notes`: a single text column.
pub fn notes_entity() -> EntitySchema {
    EntitySchema::new("sales", "Notes")
        .column(ColumnSpec::identity("Id"))
        .column(ColumnSpec::new("Body", DeclaredType::required(SemanticType::Text)))
}

pub fn sales_registry() -> SchemaRegistry {
    SchemaRegistry::builder()
        .entity(orders_entity())
        .entity(lines_entity())
        .entity(notes_entity())
        .build()
        .expect("build registry")
}

/// Source table from string literals; `""` cells become the null marker.
pub fn source(name: &str, columns: &[&str], rows: &[&[&str]]) -> SourceTable {
    SourceTable::new(name, columns.iter().map(|c| c.to_string()).collect()).with_rows(
        rows.iter().map(|row| {
            row.iter()
                .map(|cell| (!cell.is_empty()).then(|| cell.to_string()))
                .collect::<Vec<_>>()
        }),
    )
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}

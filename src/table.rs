//! In-memory tables flowing through the pipeline: raw [`SourceTable`]s in,
//! typed [`NormalizedTable`]s out.

use serde::Serialize;

use crate::{data::Value, schema::SemanticType};

/// A raw cell; `None` is the explicit-null marker.
pub type Cell = Option<String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTable {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl SourceTable {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Builder used by tests and callers that already hold string rows.
    pub fn with_rows<I, R, S>(mut self, rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        self.rows.extend(
            rows.into_iter()
                .map(|row| row.into_iter().map(|cell| cell.map(Into::into)).collect()),
        );
        self
    }

    pub fn push_row(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .and_then(|cell| cell.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedColumn {
    pub name: String,
    pub storage_name: String,
    #[serde(serialize_with = "serialize_semantic_type")]
    pub semantic_type: SemanticType,
    pub nullable: bool,
}

fn serialize_semantic_type<S>(ty: &SemanticType, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(ty.as_str())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedTable {
    pub target: String,
    pub source: String,
    pub columns: Vec<NormalizedColumn>,
    pub rows: Vec<Vec<Option<Value>>>,
}

impl NormalizedTable {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|column| column.name.eq_ignore_ascii_case(name))
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)?.as_ref()
    }

    /// Checks that every cell matches its column's type and nullability.
    pub fn is_well_typed(&self) -> bool {
        self.rows.iter().all(|row| {
            row.len() == self.columns.len()
                && row.iter().zip(&self.columns).all(|(cell, column)| match cell {
                    Some(value) => value.conforms_to(&column.semantic_type),
                    None => column.nullable,
                })
        })
    }
}

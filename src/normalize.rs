//! Type normalization of raw source tables against a matched entity schema.
//!
//! Each source column whose mapped property exists in the schema becomes one
//! typed target column. Cells are coerced with [`parse_typed_value`]; null
//! markers (and blank text in non-text columns) become `None` on nullable
//! columns and the type's default value everywhere else.

use log::debug;

use crate::{
    data::{Value, parse_typed_value},
    error::{IngestError, Result},
    mapping::ColumnNameMapper,
    schema::{EntitySchema, SemanticType},
    table::{NormalizedColumn, NormalizedTable, SourceTable},
};

pub struct Normalizer<'m> {
    mapper: &'m ColumnNameMapper,
}

struct ColumnPlan {
    source_index: usize,
    column: NormalizedColumn,
}

impl<'m> Normalizer<'m> {
    pub fn new(mapper: &'m ColumnNameMapper) -> Self {
        Self { mapper }
    }

    pub fn normalize(
        &self,
        target: &str,
        schema: &EntitySchema,
        table: &SourceTable,
    ) -> Result<NormalizedTable> {
        let plan = self.plan_columns(schema, table)?;
        debug!(
            "Normalizing '{}' into '{target}' ({} of {} column(s), {} row(s))",
            table.name,
            plan.len(),
            table.columns.len(),
            table.row_count()
        );

        let mut rows = Vec::with_capacity(table.row_count());
        for (row_idx, row) in table.rows.iter().enumerate() {
            let typed = plan
                .iter()
                .map(|entry| {
                    let raw = row.get(entry.source_index).and_then(|cell| cell.as_deref());
                    convert_cell(raw, &entry.column).map_err(|failure| {
                        IngestError::TypeConversionFailure {
                            table: table.name.clone(),
                            column: entry.column.name.clone(),
                            row: row_idx + 1,
                            value: failure.to_string(),
                            target: entry.column.semantic_type.clone(),
                        }
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            rows.push(typed);
        }

        Ok(NormalizedTable {
            target: target.to_string(),
            source: table.name.clone(),
            columns: plan.into_iter().map(|entry| entry.column).collect(),
            rows,
        })
    }

    fn plan_columns(&self, schema: &EntitySchema, table: &SourceTable) -> Result<Vec<ColumnPlan>> {
        let mut plan: Vec<ColumnPlan> = Vec::with_capacity(table.columns.len());
        for (source_index, header) in table.columns.iter().enumerate() {
            let property = self.mapper.map(&table.name, header);
            let Some(spec) = schema.column_spec(&property) else {
                continue;
            };
            if plan.iter().any(|entry| entry.column.name == spec.property) {
                return Err(IngestError::DuplicateColumn {
                    table: table.name.clone(),
                    property: spec.property.clone(),
                });
            }
            plan.push(ColumnPlan {
                source_index,
                column: NormalizedColumn {
                    name: spec.property.clone(),
                    storage_name: spec.storage_name().to_string(),
                    semantic_type: spec.semantic_type().clone(),
                    nullable: spec.is_nullable(),
                },
            });
        }
        Ok(plan)
    }
}

/// Converts one raw cell; the error carries the offending raw text.
fn convert_cell<'a>(raw: Option<&'a str>, column: &NormalizedColumn) -> Result<Option<Value>, &'a str> {
    let Some(text) = raw else {
        return Ok(null_or_default(column));
    };
    if column.semantic_type != SemanticType::Text && text.trim().is_empty() {
        return Ok(null_or_default(column));
    }
    parse_typed_value(text, &column.semantic_type)
        .map(Some)
        .ok_or(text)
}

fn null_or_default(column: &NormalizedColumn) -> Option<Value> {
    if column.nullable {
        None
    } else {
        Some(column.semantic_type.default_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(ty: SemanticType, nullable: bool) -> NormalizedColumn {
        NormalizedColumn {
            name: "c".into(),
            storage_name: "c".into(),
            semantic_type: ty,
            nullable,
        }
    }

    #[test]
    fn blank_text_stays_text() {
        let text = column(SemanticType::Text, true);
        assert_eq!(convert_cell(Some(""), &text), Ok(Some(Value::Text(String::new()))));
        assert_eq!(convert_cell(None, &text), Ok(None));
    }

    #[test]
    fn blank_number_is_null_equivalent() {
        assert_eq!(convert_cell(Some("  "), &column(SemanticType::Int32, true)), Ok(None));
        assert_eq!(
            convert_cell(Some("  "), &column(SemanticType::Int32, false)),
            Ok(Some(Value::Int32(0)))
        );
    }

    #[test]
    fn failures_report_raw_text() {
        assert_eq!(
            convert_cell(Some("abc"), &column(SemanticType::Int64, false)),
            Err("abc")
        );
    }
}

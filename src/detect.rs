//! Strict header-set schema detection.

use std::collections::BTreeSet;

use log::debug;

use crate::{
    error::{IngestError, Result},
    mapping::ColumnNameMapper,
    registry::SchemaRegistry,
    schema::EntitySchema,
    table::SourceTable,
};

#[derive(Debug, Clone)]
pub struct DetectedSchema<'r> {
    pub qualified_name: String,
    pub schema: &'r EntitySchema,
}

pub struct SchemaDetector<'r> {
    registry: &'r SchemaRegistry,
    ignored: BTreeSet<String>,
}

fn header_key(name: &str) -> String {
    name.trim().to_lowercase()
}

impl<'r> SchemaDetector<'r> {
    pub fn new(registry: &'r SchemaRegistry) -> Self {
        let ignored = registry
            .ignored_columns()
            .iter()
            .map(|name| header_key(name))
            .collect();
        Self { registry, ignored }
    }

    pub fn mapper(&self) -> &'r ColumnNameMapper {
        self.registry.mapper()
    }

    /// Lower-cased, mapped header names of `table`.
    pub fn incoming_headers(&self, table: &SourceTable) -> BTreeSet<String> {
        let mapper = self.registry.mapper();
        table
            .columns
            .iter()
            .map(|column| header_key(&mapper.map(&table.name, column)))
            .collect()
    }

    /// Fails when two source headers resolve to the same property, which a
    /// header set would otherwise collapse into one entry.
    fn check_unique_headers(&self, table: &SourceTable) -> Result<()> {
        let mapper = self.registry.mapper();
        let mut seen = BTreeSet::new();
        for column in &table.columns {
            let property = mapper.map(&table.name, column);
            if !seen.insert(header_key(&property)) {
                return Err(IngestError::DuplicateColumn {
                    table: table.name.clone(),
                    property: property.into_owned(),
                });
            }
        }
        Ok(())
    }

    /// Declared properties of `schema` minus identity and ignored columns.
    pub fn expected_headers(&self, schema: &EntitySchema) -> BTreeSet<String> {
        schema
            .columns
            .iter()
            .filter(|column| !column.generated_identity)
            .map(|column| header_key(&column.property))
            .filter(|name| !self.ignored.contains(name))
            .collect()
    }

    pub fn detect(&self, table: &SourceTable) -> Result<DetectedSchema<'r>> {
        self.check_unique_headers(table)?;
        let incoming = self.incoming_headers(table);
        let matches = self
            .registry
            .candidates_for(&table.name)
            .into_iter()
            .filter(|candidate| {
                let expected = self.expected_headers(candidate);
                !expected.is_empty() && expected == incoming
            })
            .collect::<Vec<_>>();
        debug!(
            "Source table '{}' headers {:?} matched {} candidate(s)",
            table.name,
            incoming,
            matches.len()
        );

        match matches.as_slice() {
            [] => Err(IngestError::SchemaMismatch {
                table: table.name.clone(),
            }),
            [schema] => Ok(DetectedSchema {
                qualified_name: schema.qualified_name(),
                schema: *schema,
            }),
            several => Err(IngestError::AmbiguousSchemaMatch {
                table: table.name.clone(),
                candidates: several.iter().map(|s| s.qualified_name()).collect(),
            }),
        }
    }
}

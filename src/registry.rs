//! Static registry of target entities and the source sheets they may come from.
//!
//! The registry is built once (from a YAML document or programmatically through
//! [`RegistryBuilder`]) and is read-only afterwards, so it can be shared across
//! threads behind an `Arc`.
//!
//! ```yaml
//! entities:
//!   - schema: sales
//!     table: Orders
//!     sheets: [Orders, Bestellungen]
//!     columns:
//!       - { property: Id, type: int64, key: true, identity: true }
//!       - { property: OrderNumber, column: order_number, type: text, required: true }
//!       - { property: Quantity, type: int32? }
//! column_names:
//!   Bestellungen:
//!     Bestellnummer: OrderNumber
//! ```

use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::Path,
};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::{
    error::{IngestError, Result},
    mapping::ColumnNameMapper,
    schema::{ColumnSpec, EntitySchema, SemanticType},
};

/// Bookkeeping column linking loaded rows to their processing record.
pub const DEFAULT_RECORD_LINK_COLUMN: &str = "ProcessingRecordId";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryDocument {
    pub entities: Vec<EntitySchema>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub column_names: BTreeMap<String, BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignored_columns: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    entities: Vec<EntitySchema>,
    by_name: HashMap<String, usize>,
    by_sheet: HashMap<String, Vec<usize>>,
    mapper: ColumnNameMapper,
    ignored_columns: Vec<String>,
}

fn lookup_key(name: &str) -> String {
    name.trim().to_lowercase()
}

impl SchemaRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn from_document(document: RegistryDocument) -> Result<Self> {
        let mapper = ColumnNameMapper::from_aliases(&document.column_names);
        let ignored_columns = document
            .ignored_columns
            .unwrap_or_else(|| vec![DEFAULT_RECORD_LINK_COLUMN.to_string()]);

        let mut by_name = HashMap::new();
        let mut by_sheet: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, entity) in document.entities.iter().enumerate() {
            entity.validate()?;
            let name = entity.qualified_name();
            if by_name.insert(lookup_key(&name), idx).is_some() {
                return Err(IngestError::registry(format!(
                    "entity '{name}' is registered more than once"
                )));
            }
            let sheets = if entity.sheets.is_empty() {
                std::slice::from_ref(&entity.table)
            } else {
                entity.sheets.as_slice()
            };
            for sheet in sheets {
                let slot = by_sheet.entry(lookup_key(sheet)).or_default();
                if !slot.contains(&idx) {
                    slot.push(idx);
                }
            }
        }

        Ok(Self {
            entities: document.entities,
            by_name,
            by_sheet,
            mapper,
            ignored_columns,
        })
    }

    pub fn from_yaml_str(input: &str) -> Result<Self> {
        let document: RegistryDocument = serde_yaml::from_str(input)
            .map_err(|err| IngestError::registry(format!("parsing registry YAML: {err}")))?;
        Self::from_document(document)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Opening registry file {path:?}"))?;
        let registry = Self::from_yaml_str(&raw)
            .with_context(|| format!("Loading registry from {path:?}"))?;
        Ok(registry)
    }

    pub fn entities(&self) -> &[EntitySchema] {
        &self.entities
    }

    pub fn mapper(&self) -> &ColumnNameMapper {
        &self.mapper
    }

    /// Column names left out of every expected header set (besides identity columns).
    pub fn ignored_columns(&self) -> &[String] {
        &self.ignored_columns
    }

    pub fn has_entity(&self, name: &str) -> bool {
        self.by_name.contains_key(&lookup_key(name))
    }

    pub fn entity(&self, name: &str) -> Result<&EntitySchema> {
        self.by_name
            .get(&lookup_key(name))
            .map(|idx| &self.entities[*idx])
            .ok_or_else(|| IngestError::UnknownEntity {
                entity: name.to_string(),
            })
    }

    pub fn qualified_name(&self, name: &str) -> Result<String> {
        Ok(self.entity(name)?.qualified_name())
    }

    pub fn schema_namespace(&self, name: &str) -> Result<&str> {
        Ok(self.entity(name)?.namespace.as_str())
    }

    pub fn column_specs(&self, name: &str) -> Result<&[ColumnSpec]> {
        Ok(self.entity(name)?.columns.as_slice())
    }

    pub fn has_property(&self, name: &str, property: &str) -> bool {
        self.entity(name)
            .map(|entity| entity.column_spec(property).is_some())
            .unwrap_or(false)
    }

    pub fn column_spec(&self, name: &str, property: &str) -> Result<&ColumnSpec> {
        let entity = self.entity(name)?;
        entity
            .column_spec(property)
            .ok_or_else(|| IngestError::UnknownColumn {
                entity: entity.qualified_name(),
                property: property.to_string(),
                known: entity.properties(),
            })
    }

    pub fn property_type(&self, name: &str, property: &str) -> Result<&SemanticType> {
        Ok(self.column_spec(name, property)?.semantic_type())
    }

    /// Candidate entities for a source table, in registration order.
    pub fn candidates_for(&self, source_table: &str) -> Vec<&EntitySchema> {
        self.by_sheet
            .get(&lookup_key(source_table))
            .map(|indices| indices.iter().map(|idx| &self.entities[*idx]).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Default)]
pub struct RegistryBuilder {
    document: RegistryDocument,
}

impl RegistryBuilder {
    pub fn entity(mut self, entity: EntitySchema) -> Self {
        self.document.entities.push(entity);
        self
    }

    pub fn column_name(mut self, table: &str, source_column: &str, property: &str) -> Self {
        self.document
            .column_names
            .entry(table.to_string())
            .or_default()
            .insert(source_column.to_string(), property.to_string());
        self
    }

    pub fn ignored_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.document.ignored_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn build(self) -> Result<SchemaRegistry> {
        SchemaRegistry::from_document(self.document)
    }
}

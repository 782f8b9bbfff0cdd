use log::{debug, info, warn};

use crate::{
    detect::SchemaDetector,
    error::Result,
    normalize::Normalizer,
    registry::SchemaRegistry,
    table::{NormalizedTable, SourceTable},
};

/// Detects and normalizes every non-empty table of a source collection.
pub struct DatasetConverter<'r> {
    detector: SchemaDetector<'r>,
    normalizer: Normalizer<'r>,
}

impl<'r> DatasetConverter<'r> {
    pub fn new(registry: &'r SchemaRegistry) -> Self {
        Self {
            detector: SchemaDetector::new(registry),
            normalizer: Normalizer::new(registry.mapper()),
        }
    }

    /// Fails on the first table that cannot be detected or normalized; no partial
    /// collection is returned.
    pub fn convert(&self, tables: &[SourceTable]) -> Result<Vec<NormalizedTable>> {
        let mut converted = Vec::with_capacity(tables.len());
        for table in tables {
            if table.is_empty() {
                warn!("Skipping source table '{}' with no rows", table.name);
                continue;
            }
            let detected = self.detector.detect(table)?;
            debug!(
                "Source table '{}' detected as '{}'",
                table.name, detected.qualified_name
            );
            let normalized =
                self.normalizer
                    .normalize(&detected.qualified_name, detected.schema, table)?;
            converted.push(normalized);
        }
        info!(
            "Converted {} of {} source table(s)",
            converted.len(),
            tables.len()
        );
        Ok(converted)
    }
}

//! Source header → target property name mapping, scoped per source table.
//!
//! Spreadsheets arrive with human or localized headers ("Bestellnummer",
//! "Order No."). The mapper resolves each header to the property name declared
//! in the registry. Lookups are case-insensitive and ignore surrounding
//! whitespace. Aliases registered under [`ANY_TABLE`] apply to every table
//! after the table's own aliases. Unmapped headers pass through trimmed.

use std::{borrow::Cow, collections::BTreeMap, collections::HashMap};

/// Scope key whose aliases apply to every source table.
pub const ANY_TABLE: &str = "*";

#[derive(Debug, Clone, Default)]
pub struct ColumnNameMapper {
    scopes: HashMap<String, HashMap<String, String>>,
}

fn key(value: &str) -> String {
    value.trim().to_lowercase()
}

impl ColumnNameMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_aliases(aliases: &BTreeMap<String, BTreeMap<String, String>>) -> Self {
        let mut mapper = Self::new();
        for (table, columns) in aliases {
            for (source, property) in columns {
                mapper.insert(table, source, property);
            }
        }
        mapper
    }

    pub fn insert(&mut self, table: &str, source_column: &str, property: &str) {
        self.scopes
            .entry(key(table))
            .or_default()
            .insert(key(source_column), property.trim().to_string());
    }

    /// Resolves `column` of source table `table` to a property name.
    pub fn map<'a>(&'a self, table: &str, column: &'a str) -> Cow<'a, str> {
        let column_key = key(column);
        [key(table), ANY_TABLE.to_string()]
            .iter()
            .filter_map(|scope| self.scopes.get(scope))
            .find_map(|aliases| aliases.get(&column_key))
            .map(|property| Cow::Borrowed(property.as_str()))
            .unwrap_or_else(|| Cow::Borrowed(column.trim()))
    }

    pub fn alias_count(&self) -> usize {
        self.scopes.values().map(HashMap::len).sum()
    }
}

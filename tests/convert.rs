mod common;

use common::{sales_registry, source};
use sheet_ingest::{DatasetConverter, IngestError, SourceTable};

#[test]
fn zero_row_tables_are_skipped() {
    let registry = sales_registry();
    let tables = vec![
        source("Orders", &["Code", "Quantity"], &[&["A", "1"], &["B", ""]]),
        SourceTable::new("Notes", vec!["Body".to_string()]),
        source("Lines", &["Sku", "Amount"], &[&["X", "2.50"]]),
    ];
    let converted = DatasetConverter::new(&registry).convert(&tables).unwrap();
    let targets = converted
        .iter()
        .map(|table| table.target.as_str())
        .collect::<Vec<_>>();
    assert_eq!(targets, vec!["sales.Orders", "sales.Lines"]);
    assert_eq!(converted[0].row_count(), 2);
    assert!(converted.iter().all(|table| table.is_well_typed()));
}

#[test]
fn zero_row_tables_are_skipped_before_detection() {
    let registry = sales_registry();
    let tables = vec![SourceTable::new("Unregistered", vec!["Whatever".to_string()])];
    let converted = DatasetConverter::new(&registry).convert(&tables).unwrap();
    assert!(converted.is_empty());
}

#[test]
fn first_failure_aborts_the_whole_collection() {
    let registry = sales_registry();
    let tables = vec![
        source("Orders", &["Code", "Quantity"], &[&["A", "1"]]),
        source("Lines", &["Sku", "Amount"], &[&["X", "two"]]),
        source("Unregistered", &["Whatever"], &[&["1"]]),
    ];
    match DatasetConverter::new(&registry).convert(&tables) {
        Err(IngestError::TypeConversionFailure { table, column, .. }) => {
            assert_eq!(table, "Lines");
            assert_eq!(column, "Amount");
        }
        other => panic!("expected TypeConversionFailure, got {other:?}"),
    }
}

#[test]
fn undetectable_table_fails_the_collection() {
    let registry = sales_registry();
    let tables = vec![
        source("Orders", &["Code", "Quantity"], &[&["A", "1"]]),
        source("Orders", &["Code"], &[&["B"]]),
    ];
    assert!(matches!(
        DatasetConverter::new(&registry).convert(&tables),
        Err(IngestError::SchemaMismatch { .. })
    ));
}

mod common;

use chrono::{NaiveDate, NaiveTime};
use common::{sales_registry, source};
use proptest::prelude::*;
use sheet_ingest::{
    ColumnSpec, DeclaredType, EntitySchema, IngestError, Normalizer, SchemaRegistry,
    SemanticType, SourceTable, Value, mapping::ColumnNameMapper, schema::min_date,
};

fn typed_entity() -> EntitySchema {
    EntitySchema::new("ops", "Shipments")
        .column(ColumnSpec::new("Count", DeclaredType::required(SemanticType::Int32)))
        .column(ColumnSpec::new("Weight", DeclaredType::optional(SemanticType::Double)))
        .column(ColumnSpec::new("Price", DeclaredType::required(SemanticType::Decimal)))
        .column(ColumnSpec::new("Fragile", DeclaredType::required(SemanticType::Boolean)))
        .column(ColumnSpec::new("ShipDate", DeclaredType::required(SemanticType::Date)))
        .column(ColumnSpec::new("ShipTime", DeclaredType::required(SemanticType::Time)))
        .column(ColumnSpec::new("Note", DeclaredType::required(SemanticType::Text)))
}

const HEADERS: &[&str] = &[
    "Count", "Weight", "Price", "Fragile", "ShipDate", "ShipTime", "Note",
];

fn normalize(table: &SourceTable) -> Result<sheet_ingest::NormalizedTable, IngestError> {
    let mapper = ColumnNameMapper::new();
    Normalizer::new(&mapper).normalize("ops.Shipments", &typed_entity(), table)
}

#[test]
fn non_null_cells_take_their_parsed_value() {
    let table = source(
        "Shipments",
        HEADERS,
        &[&["42", "1.25", "19.99", "Yes", "2025-05-07", "14:30", "glass"]],
    );
    let normalized = normalize(&table).unwrap();
    assert_eq!(normalized.target, "ops.Shipments");
    assert_eq!(normalized.value(0, "Count"), Some(&Value::Int32(42)));
    assert_eq!(normalized.value(0, "Weight"), Some(&Value::Double(1.25)));
    assert_eq!(
        normalized.value(0, "Price"),
        Some(&Value::Decimal("19.99".parse().unwrap()))
    );
    assert_eq!(normalized.value(0, "Fragile"), Some(&Value::Boolean(true)));
    assert_eq!(
        normalized.value(0, "ShipTime"),
        Some(&Value::Time(NaiveTime::from_hms_opt(14, 30, 0).unwrap()))
    );
    assert_eq!(
        normalized.value(0, "Note"),
        Some(&Value::Text("glass".into()))
    );
    assert!(normalized.is_well_typed());
}

#[test]
fn nulls_become_none_or_type_default() {
    let table = source("Shipments", HEADERS, &[&["", "", "", "", "", "", ""]]);
    let normalized = normalize(&table).unwrap();
    assert_eq!(normalized.value(0, "Count"), Some(&Value::Int32(0)));
    assert_eq!(normalized.value(0, "Weight"), None);
    assert_eq!(
        normalized.value(0, "Price"),
        Some(&Value::Decimal(Default::default()))
    );
    assert_eq!(normalized.value(0, "Fragile"), Some(&Value::Boolean(false)));
    assert_eq!(normalized.value(0, "ShipDate"), Some(&Value::Date(min_date())));
    assert_eq!(
        normalized.value(0, "ShipTime"),
        Some(&Value::Time(NaiveTime::MIN))
    );
    assert_eq!(normalized.value(0, "Note"), None);
    assert!(normalized.is_well_typed());
}

#[test]
fn date_and_time_are_split_from_a_combined_value() {
    let mut row = ["1", "", "1", "no", "2025/05/07 9:10:04", "2025/05/07 9:10:04", "x"];
    let table = source("Shipments", HEADERS, &[&row]);
    let normalized = normalize(&table).unwrap();
    assert_eq!(
        normalized.value(0, "ShipDate"),
        Some(&Value::Date(NaiveDate::from_ymd_opt(2025, 5, 7).unwrap()))
    );
    assert_eq!(
        normalized.value(0, "ShipTime"),
        Some(&Value::Time(NaiveTime::from_hms_opt(9, 10, 4).unwrap()))
    );

    row[4] = "07.05.2025";
    let table = source("Shipments", HEADERS, &[&row]);
    assert_eq!(
        normalize(&table).unwrap().value(0, "ShipDate"),
        Some(&Value::Date(NaiveDate::from_ymd_opt(2025, 5, 7).unwrap()))
    );
}

#[test]
fn conversion_failure_names_table_column_row_and_value() {
    let table = source(
        "Shipments",
        HEADERS,
        &[
            &["1", "", "1", "yes", "2025-01-01", "10:00", "a"],
            &["2", "", "1", "maybe", "2025-01-01", "10:00", "b"],
        ],
    );
    match normalize(&table) {
        Err(IngestError::TypeConversionFailure {
            table,
            column,
            row,
            value,
            target,
        }) => {
            assert_eq!(table, "Shipments");
            assert_eq!(column, "Fragile");
            assert_eq!(row, 2);
            assert_eq!(value, "maybe");
            assert_eq!(target, SemanticType::Boolean);
        }
        other => panic!("expected TypeConversionFailure, got {other:?}"),
    }
}

#[test]
fn unknown_source_columns_are_dropped_and_short_rows_read_as_null() {
    let registry: SchemaRegistry = sales_registry();
    let entity = registry.entity("sales.Orders").unwrap();
    let table = source("Orders", &["Code", "Quantity", "Comment"], &[&["A"]]);
    let normalized = Normalizer::new(registry.mapper())
        .normalize("sales.Orders", entity, &table)
        .unwrap();
    assert_eq!(
        normalized
            .columns
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>(),
        vec!["Code", "Quantity"]
    );
    assert_eq!(normalized.value(0, "Quantity"), None);
}

#[test]
fn normalizing_twice_is_identical() {
    let table = source(
        "Shipments",
        HEADERS,
        &[&["7", "0.5", "1e2", "off", "2025-12-31T23:59:59", "", "n"]],
    );
    assert_eq!(normalize(&table).unwrap(), normalize(&table).unwrap());
}

fn boolean_token() -> impl Strategy<Value = (String, bool)> {
    prop_oneof![
        prop::sample::select(vec!["true", "1", "yes", "y", "on"]).prop_map(|t| (t, true)),
        prop::sample::select(vec!["false", "0", "no", "n", "off"]).prop_map(|t| (t, false)),
    ]
    .prop_flat_map(|(token, expected)| {
        proptest::collection::vec(any::<bool>(), token.len()).prop_map(move |upper| {
            let cased = token
                .chars()
                .zip(upper)
                .map(|(c, up)| if up { c.to_ascii_uppercase() } else { c })
                .collect::<String>();
            (cased, expected)
        })
    })
}

fn single_column(ty: DeclaredType, values: &[String]) -> Result<sheet_ingest::NormalizedTable, IngestError> {
    let entity = EntitySchema::new("t", "T").column(ColumnSpec::new("V", ty));
    let table = SourceTable::new("T", vec!["V".to_string()])
        .with_rows(values.iter().map(|v| [Some(v.clone())]));
    let mapper = ColumnNameMapper::new();
    Normalizer::new(&mapper).normalize("t.T", &entity, &table)
}

proptest! {
    #[test]
    fn boolean_tokens_coerce_in_any_case((token, expected) in boolean_token()) {
        let normalized = single_column(DeclaredType::required(SemanticType::Boolean), &[token]).unwrap();
        prop_assert_eq!(normalized.value(0, "V"), Some(&Value::Boolean(expected)));
    }

    #[test]
    fn non_boolean_text_fails(word in "[a-z]{2,8}") {
        prop_assume!(!["true", "yes", "on", "false", "no", "off"].contains(&word.as_str()));
        let result = single_column(DeclaredType::required(SemanticType::Boolean), &[word]);
        let is_conversion_failure = matches!(result, Err(IngestError::TypeConversionFailure { .. }));
        prop_assert!(is_conversion_failure);
    }

    #[test]
    fn integers_round_trip_and_normalization_is_stable(values in proptest::collection::vec(any::<i64>(), 1..20)) {
        let raw = values.iter().map(|v| v.to_string()).collect::<Vec<_>>();
        let first = single_column(DeclaredType::optional(SemanticType::Int64), &raw).unwrap();
        let second = single_column(DeclaredType::optional(SemanticType::Int64), &raw).unwrap();
        prop_assert_eq!(&first, &second);
        for (idx, value) in values.iter().enumerate() {
            prop_assert_eq!(first.rows[idx][0].as_ref(), Some(&Value::Int64(*value)));
        }
    }
}

#[test]
fn two_sources_for_one_property_fail_normalization() {
    let registry = sales_registry();
    let entity = registry.entity("sales.Orders").unwrap();
    let table = source("Orders", &["Code", "Quantity", "CODE"], &[&["A", "1", "B"]]);
    let result = Normalizer::new(registry.mapper()).normalize("sales.Orders", entity, &table);
    match result {
        Err(IngestError::DuplicateColumn { table, property }) => {
            assert_eq!(table, "Orders");
            assert_eq!(property, "Code");
        }
        other => panic!("expected DuplicateColumn, got {other:?}"),
    }
}

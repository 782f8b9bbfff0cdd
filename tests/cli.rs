mod common;

use assert_cmd::Command;
use common::{TestWorkspace, fixture_path};
use predicates::{prelude::*, str::contains};

fn bin() -> Command {
    Command::cargo_bin("sheet-ingest").expect("binary exists")
}

fn fixture(name: &str) -> String {
    fixture_path(name).to_str().unwrap().to_string()
}

#[test]
fn schemas_lists_registered_entities() {
    bin()
        .args(["schemas", "--registry", &fixture("registry.yml")])
        .assert()
        .success()
        .stdout(contains("sales.Orders"))
        .stdout(contains("Bestellungen"))
        .stdout(contains("Discount:decimal?"));
}

#[test]
fn schemas_renders_json() {
    let output = bin()
        .args(["schemas", "--registry", &fixture("registry.yml"), "--format", "json"])
        .output()
        .expect("run schemas");
    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(parsed[1]["entity"], "sales.Customers");
    assert_eq!(parsed[1]["columns"][0], "CustomerId:guid");
}

#[test]
fn detect_reports_matched_entity_per_input() {
    bin()
        .args([
            "detect",
            "--registry",
            &fixture("registry.yml"),
            "-i",
            &fixture("Bestellungen.csv"),
            "-i",
            &fixture("Customers.csv"),
        ])
        .assert()
        .success()
        .stdout(contains("Bestellungen"))
        .stdout(contains("sales.Orders"))
        .stdout(contains("sales.Customers"));
}

#[test]
fn detect_fails_for_unregistered_headers() {
    bin()
        .args([
            "detect",
            "--registry",
            &fixture("registry.yml"),
            "-i",
            &format!("Orders={}", fixture("Unknown.csv")),
        ])
        .assert()
        .failure()
        .stderr(contains("no registered schema matches"));
}

#[test]
fn convert_previews_typed_rows() {
    bin()
        .args([
            "convert",
            "--registry",
            &fixture("registry.yml"),
            "-i",
            &fixture("Orders.csv"),
            "--limit",
            "2",
        ])
        .assert()
        .success()
        .stdout(contains("sales.Orders (3 row(s))"))
        .stdout(contains("Quantity:int32"))
        .stdout(contains("2025-05-08"))
        .stdout(contains("NULL"))
        .stdout(contains("A-102").not());
}

#[test]
fn convert_reports_conversion_context() {
    bin()
        .args([
            "convert",
            "--registry",
            &fixture("registry.yml"),
            "-i",
            &format!("Orders={}", fixture("BadOrders.csv")),
        ])
        .assert()
        .failure()
        .stderr(contains("row 1 column 'Quantity'"))
        .stderr(contains("'many'"));
}

#[test]
fn load_writes_database_and_skips_repeats() {
    let workspace = TestWorkspace::new();
    let database = workspace.path().join("sales.db");
    let args = [
        "load".to_string(),
        "--registry".to_string(),
        fixture("registry.yml"),
        "-i".to_string(),
        fixture("Orders.csv"),
        "--database".to_string(),
        database.to_str().unwrap().to_string(),
        "--label".to_string(),
        "nightly".to_string(),
    ];

    bin()
        .args(&args)
        .assert()
        .success()
        .stdout(contains("Loaded 3 row(s)"));
    bin()
        .args(&args)
        .assert()
        .success()
        .stdout(contains("Skipped"));

    let conn = rusqlite::Connection::open(&database).expect("open database");
    let (count, label): (i64, String) = conn
        .query_row(
            "SELECT row_count, label FROM processing_records",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .expect("single record");
    assert_eq!(count, 3);
    assert_eq!(label, "nightly");
}

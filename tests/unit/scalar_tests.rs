//! Unit tests for cell values and record construction

use reconcyl::record::normalize_column;
use reconcyl::{ReconError, Record, Scalar, Table};

#[test]
fn test_integer_and_float_compare_numerically() {
    assert_eq!(Scalar::Integer(2), Scalar::Float(2.0));
    assert_ne!(Scalar::Integer(2), Scalar::Float(2.5));
    assert_ne!(Scalar::text("2"), Scalar::Integer(2));
    assert_ne!(Scalar::Null, Scalar::text(""));
}

#[test]
fn test_display_matches_report_cells() {
    assert_eq!(Scalar::Null.to_string(), "");
    assert_eq!(Scalar::Integer(7).to_string(), "7");
    assert_eq!(Scalar::Float(2.0).to_string(), "2.0");
    assert_eq!(Scalar::Float(10.25).to_string(), "10.25");
    assert_eq!(Scalar::text("Ada").to_string(), "Ada");
}

#[test]
fn test_scalar_json_is_untagged() {
    let record: Record = vec![
        ("id", Scalar::Integer(1)),
        ("name", Scalar::text("Ada")),
        ("note", Scalar::Null),
    ]
    .into_iter()
    .collect();

    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json, serde_json::json!({"id": 1, "name": "Ada", "note": null}));
}

#[test]
fn test_record_keeps_column_order() {
    let record: Record = vec![("b", Scalar::Integer(1)), ("a", Scalar::Integer(2))]
        .into_iter()
        .collect();
    let columns: Vec<&str> = record.columns().collect();
    assert_eq!(columns, vec!["b", "a"]);
}

#[test]
fn test_normalize_column() {
    assert_eq!(normalize_column("  Customer ID "), "customer id");
    assert_eq!(normalize_column("AMOUNT"), "amount");
}

#[test]
fn test_table_rejects_duplicate_normalized_columns() {
    let err = Table::new(vec!["Id".to_string(), " id".to_string()], Vec::new()).unwrap_err();
    assert!(matches!(err, ReconError::Schema { .. }));
}

#[test]
fn test_table_rejects_ragged_rows() {
    let err = Table::new(
        vec!["id".to_string(), "name".to_string()],
        vec![vec![Scalar::Integer(1)]],
    )
    .unwrap_err();
    assert!(matches!(err, ReconError::Parse { .. }));
}

//! Edge cases in raw input handling

use reconcyl::{LoaderOptions, Pipeline, ReconError, Scalar, TableLoader};
use reconcyl::EngineOptions;

#[test]
fn test_empty_and_blank_inputs_are_parse_errors() {
    let loader = TableLoader::default();
    for raw in ["", "   ", "\n\n", " \t\n"] {
        assert!(
            matches!(loader.load(raw), Err(ReconError::Parse { .. })),
            "expected parse error for {:?}",
            raw
        );
    }
}

#[test]
fn test_header_only_input_is_an_empty_table() {
    let table = TableLoader::default().load("id,name\n").unwrap();
    assert_eq!(table.columns(), &["id".to_string(), "name".to_string()]);
    assert!(table.is_empty());
}

#[test]
fn test_ragged_row_is_a_parse_error() {
    let err = TableLoader::default().load("id,name\n1,a\n2\n").unwrap_err();
    assert!(matches!(err, ReconError::Parse { .. }));
}

#[test]
fn test_trailing_whitespace_lines_do_not_break_uploads() {
    let source = "id,name\r\n1,a\r\n2,b\r\n   \r\n";
    let target = "id,name\n1,a\n2,b\n\t\n  ";
    let result = Pipeline::with_defaults().unwrap().reconcile(source, target).unwrap();
    assert_eq!(result.matched.len(), 2);
    assert!(result.is_reconciled());
}

#[test]
fn test_blank_header_is_a_parse_error() {
    let err = TableLoader::default().load("id,,name\n1,2,3\n").unwrap_err();
    assert!(matches!(err, ReconError::Parse { .. }));
}

#[test]
fn test_duplicate_header_after_normalization_is_a_schema_error() {
    let err = TableLoader::default().load("Name, name \na,b\n").unwrap_err();
    assert!(matches!(err, ReconError::Schema { .. }));
}

#[test]
fn test_quoted_cells_keep_delimiters_and_unicode() {
    let table = TableLoader::default()
        .load("id,name\n1,\"Okafor, Ada\"\n2,\"北京 ☕\"\n")
        .unwrap();
    assert_eq!(table.records()[0].get("name"), Some(&Scalar::text("Okafor, Ada")));
    assert_eq!(table.records()[1].get("name"), Some(&Scalar::text("北京 ☕")));
}

#[test]
fn test_null_markers_become_null() {
    let table = TableLoader::default().load("a,b,c,d\nNA,null,,N/A\n").unwrap();
    assert!(table.records()[0].values().all(Scalar::is_null));
}

#[test]
fn test_custom_delimiter_and_markers() {
    let options = LoaderOptions {
        delimiter: ';',
        null_markers: vec!["-".to_string()],
    };
    let table = TableLoader::new(options).unwrap().load("id;note\n1;-\n2;NA\n").unwrap();
    assert_eq!(table.records()[0].get("note"), Some(&Scalar::Null));
    assert_eq!(table.records()[1].get("note"), Some(&Scalar::text("NA")));
}

#[test]
fn test_non_ascii_delimiter_is_rejected() {
    let options = LoaderOptions {
        delimiter: '→',
        ..LoaderOptions::default()
    };
    assert!(matches!(TableLoader::new(options), Err(ReconError::Config { .. })));
}

#[test]
fn test_non_finite_numbers_stay_text() {
    let table = TableLoader::default().load("v\ninf\n1e400\n").unwrap();
    assert_eq!(table.records()[0].get("v"), Some(&Scalar::text("inf")));
    assert_eq!(table.records()[1].get("v"), Some(&Scalar::text("1e400")));
}

#[test]
fn test_duplicate_rows_collapse_in_every_section() {
    let pipeline = Pipeline::new(LoaderOptions::default(), EngineOptions::default()).unwrap();
    let result = pipeline
        .reconcile("id\n1\n1\n2\n2\n", "id\n1\n3\n3\n")
        .unwrap();

    assert_eq!(result.matched.len(), 1);
    assert_eq!(result.source_only.len(), 1);
    assert_eq!(result.target_only.len(), 1);
}

#[test]
fn test_both_inputs_empty_of_rows() {
    let result = Pipeline::with_defaults()
        .unwrap()
        .reconcile("id,name\n", "ID,NAME\n")
        .unwrap();
    assert!(result.matched.is_empty());
    assert!(result.is_reconciled());
    assert_eq!(result.columns, vec!["id", "name"]);
}

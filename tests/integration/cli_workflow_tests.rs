//! End-to-end command workflows against a file-backed store

use crate::common::{assertions, sample_data, CliTestRunner};
use reconcyl::report::parse_structured;
use reconcyl::{FileJobStore, JobState, JobStore, ReconError};
use std::fs;

fn write_inputs(runner: &CliTestRunner) -> (String, String) {
    let fixture = runner.fixture();
    let source = fixture.create_csv("source.csv", &sample_data::source_rows()).unwrap();
    let target = fixture.create_csv("target.csv", &sample_data::target_rows()).unwrap();
    (
        source.to_str().unwrap().to_string(),
        target.to_str().unwrap().to_string(),
    )
}

fn jobs(runner: &CliTestRunner) -> Vec<reconcyl::JobRecord> {
    FileJobStore::open(runner.fixture().store_root())
        .unwrap()
        .list()
        .unwrap()
}

#[test]
fn test_run_writes_report_file() {
    let runner = CliTestRunner::new().unwrap();
    let (source, target) = write_inputs(&runner);
    let output = runner.fixture().root().join("out").join("report.json");

    runner.expect_success(&["run", &source, &target, "--output", output.to_str().unwrap()]);

    assertions::assert_file_exists_and_not_empty(&output);
    let result = parse_structured(&fs::read(&output).unwrap()).unwrap();
    assert_eq!(result.matched.len(), 1);
    assert_eq!(result.source_only.len(), 2);
    assert_eq!(result.target_only.len(), 2);
}

#[test]
fn test_run_rejects_unknown_format_and_missing_file() {
    let runner = CliTestRunner::new().unwrap();
    let (source, target) = write_inputs(&runner);

    let err = runner.expect_failure(&["run", &source, &target, "--format", "xlsx"]);
    assert!(matches!(err, ReconError::UnsupportedFormat { .. }));

    let err = runner.expect_failure(&["run", &source, "/definitely/missing.csv"]);
    assert!(matches!(err, ReconError::InvalidInput { .. }));
}

#[test]
fn test_run_column_policy_flag() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();
    let source = fixture.create_csv_raw("s.csv", "id,name,region\n1,a,n\n").unwrap();
    let target = fixture.create_csv_raw("t.csv", "id,name\n1,a\n").unwrap();
    let output = fixture.root().join("report.csv");
    let (s, t, o) = (
        source.to_str().unwrap(),
        target.to_str().unwrap(),
        output.to_str().unwrap(),
    );

    let err = runner.expect_failure(&["run", s, t, "--output", o]);
    assert!(matches!(err, ReconError::SchemaMismatch { .. }));

    runner.expect_success(&["run", s, t, "--output", o, "--format", "csv", "--common-columns"]);
    let content = fs::read_to_string(&output).unwrap();
    assert!(content.contains("Matched\nid,name\n1,a\n"));
}

#[test]
fn test_run_uses_config_file() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();
    let source = fixture.create_csv_raw("s.csv", "id;name\n1;a\n").unwrap();
    let target = fixture.create_csv_raw("t.csv", "id;name\n1;a\n").unwrap();
    let config = fixture
        .create_csv_raw("reconcyl.json", r#"{ "loader": { "delimiter": ";" } }"#)
        .unwrap();
    let output = fixture.root().join("report.json");

    runner.expect_success(&[
        "run",
        source.to_str().unwrap(),
        target.to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
        "--output",
        output.to_str().unwrap(),
    ]);

    let result = parse_structured(&fs::read(&output).unwrap()).unwrap();
    assert_eq!(result.columns, vec!["id", "name"]);
    assert_eq!(result.matched.len(), 1);
}

#[test]
fn test_submit_then_status_fetch_and_list() {
    let runner = CliTestRunner::new().unwrap();
    let (source, target) = write_inputs(&runner);

    runner.expect_success(&["submit", &source, &target, "--format", "csv"]);

    let records = jobs(&runner);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].state, JobState::Succeeded);
    let id = records[0].id.to_string();

    runner.expect_success(&["status", &id]);
    runner.expect_success(&["status", &id, "--json"]);
    runner.expect_success(&["list"]);
    runner.expect_success(&["list", "--format", "json"]);

    let csv_path = runner.fixture().root().join("fetched.csv");
    let json_path = runner.fixture().root().join("fetched.json");
    runner.expect_success(&["fetch", &id, "--format", "csv", "--output", csv_path.to_str().unwrap()]);
    runner.expect_success(&["fetch", &id, "--output", json_path.to_str().unwrap()]);

    let csv = fs::read_to_string(&csv_path).unwrap();
    assert!(csv.starts_with("Missing in Target\nid,name,amount\n"));
    let result = parse_structured(&fs::read(&json_path).unwrap()).unwrap();
    assert_eq!(result.summary().matched, 1);
}

#[test]
fn test_submit_records_failed_job() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();
    let source = fixture.create_csv_raw("empty.csv", "").unwrap();
    let target = fixture.create_csv_raw("t.csv", "id\n1\n").unwrap();

    runner.expect_success(&["submit", source.to_str().unwrap(), target.to_str().unwrap()]);

    let records = jobs(&runner);
    assert_eq!(records[0].state, JobState::Failed);
    let id = records[0].id.to_string();

    let err = runner.expect_failure(&["fetch", &id]);
    assert!(matches!(err, ReconError::NotReady { .. }));

    // Finished jobs are not cancellable and stay in the store
    runner.expect_success(&["cancel", &id]);
    assert_eq!(jobs(&runner).len(), 1);
}

#[test]
fn test_submit_with_email_and_notification_config() {
    let runner = CliTestRunner::new().unwrap();
    let (source, target) = write_inputs(&runner);
    runner.expect_success(&["init"]);

    let config_path = runner.fixture().store_root().join("config.json");
    fs::write(&config_path, r#"{ "notification": { "endpoint": "https://mail.example.com" } }"#).unwrap();

    runner.expect_success(&["submit", &source, &target, "--email", "ops@example.com"]);
    let records = jobs(&runner);
    assert_eq!(records[0].state, JobState::Succeeded);
    assert_eq!(records[0].notify.as_deref(), Some("ops@example.com"));
}

#[test]
fn test_submit_rejects_bad_email_before_creating_job() {
    let runner = CliTestRunner::new().unwrap();
    let (source, target) = write_inputs(&runner);

    let err = runner.expect_failure(&["submit", &source, &target, "--email", "nobody"]);
    assert!(matches!(err, ReconError::InvalidInput { .. }));
    assert!(jobs(&runner).is_empty());
}

#[test]
fn test_commands_on_missing_store_or_job() {
    let runner = CliTestRunner::new().unwrap();
    let unknown = reconcyl::JobId::new().to_string();

    let err = runner.expect_failure(&["status", &unknown]);
    assert!(matches!(err, ReconError::Config { .. }));

    runner.expect_success(&["init"]);
    let err = runner.expect_failure(&["status", &unknown]);
    assert!(matches!(err, ReconError::NotFound { .. }));

    let err = runner.expect_failure(&["cancel", "not-a-job"]);
    assert!(matches!(err, ReconError::InvalidInput { .. }));

    let err = runner.expect_failure(&["list", "--format", "yaml"]);
    assert!(matches!(err, ReconError::InvalidInput { .. }));
}

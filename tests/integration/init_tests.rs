//! Integration tests for the init command

use crate::common::{assertions, CliTestRunner};
use reconcyl::ReconcylConfig;
use std::fs;

#[test]
fn test_init_command_success() {
    let runner = CliTestRunner::new().unwrap();
    runner.expect_success(&["init"]);

    let store = runner.fixture().store_root();
    assertions::assert_dir_exists(&store);
    assertions::assert_dir_exists(&store.join("jobs"));
    assertions::assert_file_exists_and_not_empty(&store.join("config.json"));
}

#[test]
fn test_init_writes_loadable_default_config() {
    let runner = CliTestRunner::new().unwrap();
    runner.expect_success(&["init"]);

    let config = ReconcylConfig::load(&runner.fixture().store_root().join("config.json")).unwrap();
    assert_eq!(config, ReconcylConfig::starter());
    assert_eq!(config.jobs, ReconcylConfig::default().jobs);

    let notification = config.notification.expect("init should configure notifications");
    assert_eq!(notification.sender, "reconciliation@reconcyl.ng");
}

#[test]
fn test_init_keeps_existing_config_without_force() {
    let runner = CliTestRunner::new().unwrap();
    runner.expect_success(&["init"]);

    let config_path = runner.fixture().store_root().join("config.json");
    fs::write(&config_path, r#"{ "jobs": { "workers": 5 } }"#).unwrap();

    runner.expect_success(&["init"]);
    assert_eq!(ReconcylConfig::load(&config_path).unwrap().jobs.workers, 5);

    runner.expect_success(&["init", "--force"]);
    assert_eq!(ReconcylConfig::load(&config_path).unwrap().jobs.workers, 2);
}

#[test]
fn test_init_with_custom_store() {
    let runner = CliTestRunner::new().unwrap();
    let custom = runner.fixture().root().join("elsewhere");
    let custom_arg = custom.to_str().unwrap();

    runner.expect_success(&["init", "--store", custom_arg]);
    assertions::assert_file_exists_and_not_empty(&custom.join("config.json"));
    assert!(!runner.fixture().store_root().exists());
}

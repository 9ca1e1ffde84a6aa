//! Integration tests for the `validate` command.
use gridcast::cli::handle_validate_command;
use gridcast::log::is_logger_initialised;
use gridcast::settings::Settings;
use std::path::PathBuf;

/// Get the path to the example scenario.
fn get_scenario_path() -> PathBuf {
    PathBuf::from("demos/two_region/baseline.toml")
}

/// An integration test for the `validate` command.
///
/// We also check that the logger is initialised after it is run.
#[test]
fn test_handle_validate_command() {
    unsafe { std::env::set_var("GRIDCAST_LOG_LEVEL", "off") };

    assert!(!is_logger_initialised());

    handle_validate_command(&get_scenario_path(), Some(Settings::default())).unwrap();

    assert!(is_logger_initialised());
}

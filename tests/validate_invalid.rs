//! Integration tests for the `validate` command with an invalid scenario.
use gridcast::cli::handle_validate_command;
use gridcast::settings::Settings;
use std::fs;
use tempfile::tempdir;

/// Invalid scenarios are rejected with the file path in the error
#[test]
fn test_handle_validate_command_invalid() {
    unsafe { std::env::set_var("GRIDCAST_LOG_LEVEL", "off") };

    let dir = tempdir().unwrap();
    let scenario_path = dir.path().join("bad.toml");
    let contents = fs::read_to_string("demos/two_region/baseline.toml")
        .unwrap()
        .replace("capacity_factor = 0.35", "capacity_factor = 0.0");
    fs::write(&scenario_path, contents).unwrap();

    let err = handle_validate_command(&scenario_path, Some(Settings::default())).unwrap_err();
    let messages: Vec<_> = err.chain().map(ToString::to_string).collect();
    assert_eq!(messages[0], "Failed to validate scenario.");
    assert!(messages[1].contains("bad.toml"));
}

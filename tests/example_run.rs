//! Integration tests for the `example run` command.
use gridcast::cli::RunOpts;
use gridcast::cli::example::handle_example_run_command;
use gridcast::comparison::Metric;
use gridcast::output::{read_comparison, read_comparison_json, read_scenario};
use gridcast::settings::Settings;
use std::path::Path;
use tempfile::tempdir;

fn run_example(name: &str, output_dir: &Path) {
    unsafe { std::env::set_var("GRIDCAST_LOG_LEVEL", "off") };

    let opts = RunOpts {
        output_dir: Some(output_dir.to_path_buf()),
        overwrite: false,
        json: true,
    };
    handle_example_run_command(name, &opts, Some(Settings::default())).unwrap();
}

/// The two region example runs both variants and compares them
#[test]
fn test_two_region_example() {
    let dir = tempdir().unwrap();
    run_example("two_region", dir.path());

    let baseline = read_scenario(&dir.path().join("baseline")).unwrap();
    let storage = read_scenario(&dir.path().join("alternative")).unwrap();
    assert_eq!(baseline.policy, "baseline");
    assert_eq!(storage.policy, "battery_storage");

    let comparison = read_comparison(dir.path()).unwrap();
    assert_eq!(read_comparison_json(dir.path()).unwrap(), comparison);
    assert_eq!(comparison.baseline, "baseline");
    assert_eq!(comparison.alternative, "battery_storage");
    assert_eq!(comparison.years.len(), baseline.years.len());

    // Storage never lowers the renewable share
    for year in &comparison.years {
        assert!(
            year.renewable_share.absolute_delta >= -1e-12,
            "Renewable share fell in {}",
            year.year
        );
    }
    assert!(comparison.metrics[&Metric::AverageRenewableShare].absolute_delta >= -1e-12);
    assert!(comparison.metrics[&Metric::CumulativeEmissions].absolute_delta <= 1e-6);

    // Both scenarios are recorded in the metadata with their seeds
    let metadata = std::fs::read_to_string(dir.path().join("metadata.toml")).unwrap();
    let metadata: toml::Table = toml::from_str(&metadata).unwrap();
    let scenarios = metadata["run"]["scenarios"].as_array().unwrap();
    assert_eq!(scenarios.len(), 2);
    for (scenario, result) in scenarios.iter().zip([&baseline, &storage]) {
        assert_eq!(
            scenario["seed"].as_integer(),
            Some(i64::try_from(result.seed).unwrap())
        );
    }
}

/// The annual example has a single variant
#[test]
fn test_annual_example() {
    let dir = tempdir().unwrap();
    run_example("annual", dir.path());

    let result = read_scenario(dir.path()).unwrap();
    assert!(result.is_complete());
    assert_eq!(
        result.iter_years().collect::<Vec<_>>(),
        vec![2025, 2030, 2035, 2040, 2045, 2050]
    );
    assert!(!dir.path().join("comparison_metrics.csv").exists());
}

//! Integration tests for the `run` command.
use float_cmp::assert_approx_eq;
use gridcast::cli::{RunOpts, handle_run_command};
use gridcast::output::{read_scenario, read_scenario_json};
use gridcast::settings::Settings;
use gridcast::units::{Dimensionless, Energy};
use std::path::{Path, PathBuf};
use tempfile::tempdir;

/// Get the path to the example scenario.
fn get_scenario_path() -> PathBuf {
    PathBuf::from("demos/two_region/baseline.toml")
}

fn run(output_dir: &Path, json: bool) {
    unsafe { std::env::set_var("GRIDCAST_LOG_LEVEL", "off") };

    let opts = RunOpts {
        output_dir: Some(output_dir.to_path_buf()),
        overwrite: true,
        json,
    };
    handle_run_command(&get_scenario_path(), &opts, Some(Settings::default())).unwrap();
}

/// Results can be read back from the CSV and JSON files, and agree with each other
#[test]
fn test_handle_run_command() {
    let dir = tempdir().unwrap();
    run(dir.path(), true);

    for file_name in [
        "summary.csv",
        "annual.csv",
        "regions.csv",
        "generation.csv",
        "costs.csv",
        "compliance.csv",
        "scenario.json",
        "metadata.toml",
    ] {
        assert!(dir.path().join(file_name).is_file(), "Missing {file_name}");
    }

    let result = read_scenario(dir.path()).unwrap();
    assert_eq!(read_scenario_json(dir.path()).unwrap(), result);

    assert!(result.is_complete());
    assert_eq!(result.name, "baseline");
    assert_eq!(result.years.len(), 26);
    let summary = result.summary.as_ref().unwrap();
    assert_eq!(
        summary.compliance.iter().map(|c| c.year).collect::<Vec<_>>(),
        vec![2030, 2040, 2050]
    );

    // Generation meets demand in every region and year
    for annual in &result.years {
        for region in annual.regions.values() {
            let generation: Energy = region.generation.values().map(|d| d.energy_mwh).sum();
            assert_approx_eq!(
                Energy,
                generation,
                region.demand.annual_energy_mwh,
                epsilon = 1e-3
            );
        }
        assert!(annual.renewable_share >= Dimensionless(0.0));
        assert!(annual.renewable_share <= Dimensionless(1.0));
    }
}

/// Running twice with the same seed gives identical output
#[test]
fn test_run_is_reproducible() {
    let dir1 = tempdir().unwrap();
    let dir2 = tempdir().unwrap();
    run(dir1.path(), false);
    run(dir2.path(), false);

    assert_eq!(
        read_scenario(dir1.path()).unwrap(),
        read_scenario(dir2.path()).unwrap()
    );
    assert!(!dir1.path().join("scenario.json").exists());
}

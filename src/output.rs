//! The module responsible for writing output data to disk.
use crate::comparison::ComparisonData;
use crate::input::{read_csv, read_csv_non_empty};
use crate::simulation::ScenarioResult;
use anyhow::{Context, Result, ensure};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

pub mod metadata;
mod tables;
use tables::{ComparisonTables, ScenarioTables};

/// The root folder in which scenario-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "gridcast_results";

/// The output file name for scenario-level results
const SUMMARY_FILE_NAME: &str = "summary.csv";

/// The output file name for system-wide annual results
const ANNUAL_FILE_NAME: &str = "annual.csv";

/// The output file name for regional results
const REGIONS_FILE_NAME: &str = "regions.csv";

/// The output file name for generation by region and technology
const GENERATION_FILE_NAME: &str = "generation.csv";

/// The output file name for technology costs
const COSTS_FILE_NAME: &str = "costs.csv";

/// The output file name for carbon target compliance
const COMPLIANCE_FILE_NAME: &str = "compliance.csv";

/// The output file name for the full scenario result as JSON
const SCENARIO_JSON_FILE_NAME: &str = "scenario.json";

/// The output file name for differences in scenario-level metrics
const COMPARISON_METRICS_FILE_NAME: &str = "comparison_metrics.csv";

/// The output file name for differences in each year
const COMPARISON_YEARS_FILE_NAME: &str = "comparison_years.csv";

/// The output file name for the full comparison as JSON
const COMPARISON_JSON_FILE_NAME: &str = "comparison.json";

/// Get the name of a scenario file, without its extension
fn get_scenario_name(scenario_path: &Path) -> Result<&str> {
    scenario_path
        .file_stem()
        .context("Scenario path has no file name")?
        .to_str()
        .context("Invalid chars in scenario file name")
}

/// Get the default output directory for outputs with the given name
pub fn get_named_output_dir(name: &str) -> PathBuf {
    [OUTPUT_DIRECTORY_ROOT, name].iter().collect()
}

/// Get the default output directory for the scenario file at the specified path
pub fn get_output_dir(scenario_path: &Path) -> Result<PathBuf> {
    Ok(get_named_output_dir(get_scenario_name(scenario_path)?))
}

/// Get the default output directory for a comparison of two scenario files
pub fn get_comparison_output_dir(baseline_path: &Path, alternative_path: &Path) -> Result<PathBuf> {
    let name = format!(
        "{}_vs_{}",
        get_scenario_name(baseline_path)?,
        get_scenario_name(alternative_path)?
    );
    Ok(get_named_output_dir(&name))
}

/// Create a new output directory.
///
/// If the directory already exists and is not empty, it is only replaced if `allow_overwrite` is
/// true.
///
/// # Returns
///
/// True if an existing directory was overwritten
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    let overwrite = if let Ok(mut it) = fs::read_dir(output_dir) {
        if it.next().is_none() {
            // Already exists and is empty
            return Ok(false);
        }

        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. Use --overwrite to replace it."
        );

        fs::remove_dir_all(output_dir)?;
        true
    } else {
        false
    };

    // Try to create the directory, with parents
    fs::create_dir_all(output_dir)?;

    Ok(overwrite)
}

/// Write a series of rows to a CSV file
fn write_csv<'a, T, I>(output_dir: &Path, file_name: &str, rows: I) -> Result<()>
where
    T: Serialize + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let file_path = output_dir.join(file_name);
    let mut writer = csv::Writer::from_path(&file_path)
        .with_context(|| format!("Could not create {}", file_path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(())
}

/// Write a value to a JSON file
fn write_json<T: Serialize>(output_dir: &Path, file_name: &str, value: &T) -> Result<()> {
    let file_path = output_dir.join(file_name);
    let file = File::create(&file_path)
        .with_context(|| format!("Could not create {}", file_path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;

    Ok(())
}

/// Read a value from a JSON file
fn read_json<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let file = File::open(file_path)
        .with_context(|| format!("Could not open {}", file_path.display()))?;
    let value = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Could not parse {}", file_path.display()))?;

    Ok(value)
}

/// Write the results of a scenario to CSV files and, optionally, a JSON file
pub fn write_scenario(output_dir: &Path, result: &ScenarioResult, save_json: bool) -> Result<()> {
    let tables = ScenarioTables::from(result);
    write_csv(output_dir, SUMMARY_FILE_NAME, [&tables.summary])?;
    write_csv(output_dir, ANNUAL_FILE_NAME, &tables.annual)?;
    write_csv(output_dir, REGIONS_FILE_NAME, &tables.regions)?;
    write_csv(output_dir, GENERATION_FILE_NAME, &tables.generation)?;
    write_csv(output_dir, COSTS_FILE_NAME, &tables.costs)?;
    write_csv(output_dir, COMPLIANCE_FILE_NAME, &tables.compliance)?;

    if save_json {
        write_json(output_dir, SCENARIO_JSON_FILE_NAME, result)?;
    }

    Ok(())
}

/// Read the results of a scenario back from the CSV files in `output_dir`
pub fn read_scenario(output_dir: &Path) -> Result<ScenarioResult> {
    let summary_path = output_dir.join(SUMMARY_FILE_NAME);
    let mut summary = read_csv_non_empty(&summary_path)?;
    ensure!(
        summary.len() == 1,
        "{} must contain exactly one row",
        summary_path.display()
    );

    let tables = ScenarioTables {
        summary: summary.remove(0),
        annual: read_csv(&output_dir.join(ANNUAL_FILE_NAME))?,
        regions: read_csv(&output_dir.join(REGIONS_FILE_NAME))?,
        generation: read_csv(&output_dir.join(GENERATION_FILE_NAME))?,
        costs: read_csv(&output_dir.join(COSTS_FILE_NAME))?,
        compliance: read_csv(&output_dir.join(COMPLIANCE_FILE_NAME))?,
    };

    tables
        .try_into()
        .with_context(|| format!("Invalid scenario results in {}", output_dir.display()))
}

/// Read the results of a scenario back from the JSON file in `output_dir`
pub fn read_scenario_json(output_dir: &Path) -> Result<ScenarioResult> {
    read_json(&output_dir.join(SCENARIO_JSON_FILE_NAME))
}

/// Write a comparison of two scenarios to CSV files and, optionally, a JSON file
pub fn write_comparison(output_dir: &Path, data: &ComparisonData, save_json: bool) -> Result<()> {
    let tables = ComparisonTables::from(data);
    write_csv(output_dir, COMPARISON_METRICS_FILE_NAME, &tables.metrics)?;
    write_csv(output_dir, COMPARISON_YEARS_FILE_NAME, &tables.years)?;

    if save_json {
        write_json(output_dir, COMPARISON_JSON_FILE_NAME, data)?;
    }

    Ok(())
}

/// Read a comparison back from the CSV files in `output_dir`
pub fn read_comparison(output_dir: &Path) -> Result<ComparisonData> {
    let tables = ComparisonTables {
        metrics: read_csv_non_empty(&output_dir.join(COMPARISON_METRICS_FILE_NAME))?,
        years: read_csv(&output_dir.join(COMPARISON_YEARS_FILE_NAME))?,
    };

    tables
        .try_into()
        .with_context(|| format!("Invalid comparison in {}", output_dir.display()))
}

/// Read a comparison back from the JSON file in `output_dir`
pub fn read_comparison_json(output_dir: &Path) -> Result<ComparisonData> {
    read_json(&output_dir.join(COMPARISON_JSON_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparison::compare;
    use crate::config::ScenarioConfig;
    use crate::fixture::{SCENARIO_TOML, scenario_config};
    use crate::simulation::{RunStatus, run_scenario};
    use crate::units::Dimensionless;
    use rstest::{fixture, rstest};
    use tempfile::tempdir;

    #[fixture]
    fn result(scenario_config: ScenarioConfig) -> ScenarioResult {
        run_scenario(&scenario_config).unwrap()
    }

    #[test]
    fn test_get_output_dir() {
        let dir = get_output_dir(Path::new("scenarios/two_region.toml")).unwrap();
        assert_eq!(dir, PathBuf::from("gridcast_results/two_region"));
    }

    #[test]
    fn test_get_comparison_output_dir() {
        let dir = get_comparison_output_dir(
            Path::new("scenarios/baseline.toml"),
            Path::new("scenarios/storage.toml"),
        )
        .unwrap();
        assert_eq!(dir, PathBuf::from("gridcast_results/baseline_vs_storage"));
    }

    #[test]
    fn test_create_output_directory_new() {
        let dir = tempdir().unwrap();
        let output_dir = dir.path().join("results");
        assert!(!create_output_directory(&output_dir, false).unwrap());
        assert!(output_dir.is_dir());

        // Empty directories can be reused
        assert!(!create_output_directory(&output_dir, false).unwrap());
    }

    #[test]
    fn test_create_output_directory_existing() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("annual.csv"), "year\n").unwrap();

        assert!(create_output_directory(dir.path(), false).is_err());
        assert!(create_output_directory(dir.path(), true).unwrap());
        assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[rstest]
    fn test_scenario_csv_round_trip(result: ScenarioResult) {
        let dir = tempdir().unwrap();
        write_scenario(dir.path(), &result, false).unwrap();
        assert!(!dir.path().join(SCENARIO_JSON_FILE_NAME).exists());
        assert_eq!(read_scenario(dir.path()).unwrap(), result);
    }

    #[rstest]
    fn test_scenario_json_round_trip(result: ScenarioResult) {
        let dir = tempdir().unwrap();
        write_scenario(dir.path(), &result, true).unwrap();
        assert_eq!(read_scenario_json(dir.path()).unwrap(), result);
    }

    #[test]
    fn test_failed_scenario_round_trip() {
        let toml = SCENARIO_TOML.replace("demand_growth_rate = 0.015", "demand_growth_rate = 0.5");
        let config = ScenarioConfig::from_toml_str(&toml).unwrap();
        let result = run_scenario(&config).unwrap();
        assert!(matches!(result.status, RunStatus::Failed { .. }));

        let dir = tempdir().unwrap();
        write_scenario(dir.path(), &result, false).unwrap();
        assert_eq!(read_scenario(dir.path()).unwrap(), result);
    }

    #[rstest]
    fn test_comparison_round_trip(result: ScenarioResult) {
        let mut alternative = result.clone();
        alternative.name = "alternative".into();
        for year in &mut alternative.years {
            year.emissions = year.emissions * Dimensionless(0.5);
        }
        let report = compare(&result, &alternative).unwrap();

        let dir = tempdir().unwrap();
        write_comparison(dir.path(), &report.data, true).unwrap();
        assert_eq!(read_comparison(dir.path()).unwrap(), report.data);
        assert_eq!(read_comparison_json(dir.path()).unwrap(), report.data);
    }
}

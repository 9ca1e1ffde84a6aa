//! Defines the [`ScenarioConfig`] struct, which represents the contents of a scenario file.
use crate::cost::TechnologyCostModel;
use crate::demand::{DemandModel, DemandResolution};
use crate::dispatch::DispatchPolicy;
use crate::emissions::CarbonTarget;
use crate::error::{EngineResult, ScenarioError, ensure_valid};
use crate::id::collect_unique_ids;
use crate::input::{input_err_msg, read_toml};
use crate::random::SeedSequence;
use crate::region::{Region, RegionMap};
use crate::renewable::RenewableProfileKind;
use crate::storage::StorageParameters;
use crate::technology::{InstalledCapacityEntry, InstalledCapacityMap, Technology, TechnologyMap};
use crate::units::Dimensionless;
use anyhow::{Context, Result};
use log::warn;
use serde::Deserialize;
use std::path::Path;
use std::rc::Rc;

macro_rules! define_unit_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            <$type>::new($value)
        }
    };
}

macro_rules! define_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            $value
        }
    };
}

define_param_default!(default_year_step, u32, 1);
define_param_default!(default_seed, u64, 42);
define_unit_param_default!(default_demand_growth_rate, Dimensionless, 0.023);
define_unit_param_default!(default_discount_rate, Dimensionless, 0.07);

/// The contents of a scenario file, before validation
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScenarioFile {
    name: String,
    #[serde(default)]
    description: String,
    start_year: u32,
    end_year: u32,
    #[serde(default = "default_year_step")]
    year_step: u32,
    #[serde(default = "default_seed")]
    seed: u64,
    #[serde(default = "default_demand_growth_rate")]
    demand_growth_rate: Dimensionless,
    #[serde(default = "default_discount_rate")]
    discount_rate: Dimensionless,
    #[serde(default)]
    cost_base_year: Option<u32>,
    #[serde(default)]
    demand_resolution: DemandResolution,
    #[serde(default)]
    renewable_profile: RenewableProfileKind,
    regions: Vec<Region>,
    technologies: Vec<Technology>,
    #[serde(default)]
    installed_capacity: Vec<InstalledCapacityEntry>,
    #[serde(default)]
    carbon_target: Option<CarbonTarget>,
    #[serde(default)]
    storage: Option<StorageParameters>,
}

/// A fully validated scenario, ready to be run
#[derive(Debug, Clone)]
pub struct ScenarioConfig {
    /// Name of the scenario
    pub name: String,
    /// A text description of the scenario
    pub description: String,
    /// The years to simulate, in order
    pub years: Vec<u32>,
    /// Base seed for all random variation
    pub seed: u64,
    /// Compound annual growth rate of demand
    pub demand_growth_rate: Dimensionless,
    /// Discount rate used to annualise capital costs
    pub discount_rate: Dimensionless,
    /// The year in which capital costs equal the technologies' base values
    pub cost_base_year: u32,
    /// Time resolution of demand and dispatch
    pub demand_resolution: DemandResolution,
    /// How the availability of renewables varies over the day
    pub renewable_profile: RenewableProfileKind,
    /// Regions, in the order they appear in the file
    pub regions: RegionMap,
    /// Technologies, in the order they appear in the file
    pub technologies: TechnologyMap,
    /// Installed capacity over time
    pub installed_capacity: InstalledCapacityMap,
    /// Emissions reduction target, if any
    pub carbon_target: Option<CarbonTarget>,
    /// How demand is allocated between technologies
    pub policy: DispatchPolicy,
}

impl ScenarioConfig {
    /// Read and validate a scenario file.
    ///
    /// # Arguments
    ///
    /// * `file_path` - Path to the scenario TOML file
    ///
    /// # Returns
    ///
    /// The validated scenario or an error if the file is invalid
    pub fn from_path<P: AsRef<Path>>(file_path: P) -> Result<ScenarioConfig> {
        let file_path = file_path.as_ref();
        let file: ScenarioFile = read_toml(file_path)?;
        Self::from_file(file).with_context(|| input_err_msg(file_path))
    }

    /// Parse and validate a scenario from a TOML string
    pub fn from_toml_str(toml_str: &str) -> Result<ScenarioConfig> {
        let file: ScenarioFile = toml::from_str(toml_str)?;
        Ok(Self::from_file(file)?)
    }

    /// Validate the contents of a scenario file
    fn from_file(file: ScenarioFile) -> EngineResult<ScenarioConfig> {
        ensure_valid!(
            !file.name.trim().is_empty(),
            "scenario",
            "name cannot be empty"
        );
        let years = check_years(file.start_year, file.end_year, file.year_step)?;

        let seeds = SeedSequence::new(file.seed);
        DemandModel::new(
            file.demand_growth_rate,
            file.start_year,
            file.demand_resolution,
            seeds,
        )?;
        let cost_base_year = file.cost_base_year.unwrap_or(file.start_year);
        TechnologyCostModel::new(cost_base_year, file.discount_rate)?;

        let regions = build_regions(file.regions)?;
        let technologies = build_technologies(file.technologies)?;
        let installed_capacity =
            InstalledCapacityMap::from_entries(&file.installed_capacity, &regions, &technologies)?;

        if let Some(target) = &file.carbon_target {
            check_carbon_target(target, &years)?;
        }

        let policy = match file.storage {
            None => DispatchPolicy::Baseline,
            Some(storage) => {
                storage.validate()?;
                if file.demand_resolution == DemandResolution::Annual {
                    warn!(
                        "Battery storage has no effect at annual demand resolution, as there is \
                        only one time slot per year"
                    );
                }
                DispatchPolicy::BatteryStorage(storage)
            }
        };

        Ok(ScenarioConfig {
            name: file.name,
            description: file.description,
            years,
            seed: file.seed,
            demand_growth_rate: file.demand_growth_rate,
            discount_rate: file.discount_rate,
            cost_base_year,
            demand_resolution: file.demand_resolution,
            renewable_profile: file.renewable_profile,
            regions,
            technologies,
            installed_capacity,
            carbon_target: file.carbon_target,
            policy,
        })
    }

    /// The first simulated year
    pub fn start_year(&self) -> u32 {
        self.years[0]
    }

    /// The source of randomness for this scenario
    pub fn seeds(&self) -> SeedSequence {
        SeedSequence::new(self.seed)
    }

    /// The demand model for this scenario
    pub fn demand_model(&self) -> EngineResult<DemandModel> {
        DemandModel::new(
            self.demand_growth_rate,
            self.start_year(),
            self.demand_resolution,
            self.seeds(),
        )
    }

    /// The technology cost model for this scenario
    pub fn cost_model(&self) -> EngineResult<TechnologyCostModel> {
        TechnologyCostModel::new(self.cost_base_year, self.discount_rate)
    }
}

/// Get the simulated years, checking that the range is valid
fn check_years(start_year: u32, end_year: u32, step: u32) -> EngineResult<Vec<u32>> {
    ensure_valid!(step > 0, "years", "year_step cannot be zero");
    ensure_valid!(
        end_year >= start_year,
        "years",
        "end_year ({end_year}) cannot be before start_year ({start_year})"
    );
    ensure_valid!(
        (end_year - start_year) % step == 0,
        "years",
        "the range {start_year}-{end_year} is not a whole number of {step}-year steps"
    );

    Ok((start_year..=end_year).step_by(step as usize).collect())
}

fn build_regions(regions: Vec<Region>) -> EngineResult<RegionMap> {
    ensure_valid!(!regions.is_empty(), "regions", "at least one region is required");
    collect_unique_ids(&regions).map_err(|err| ScenarioError::invalid("regions", err.to_string()))?;
    for region in &regions {
        region.validate()?;
    }

    Ok(regions
        .into_iter()
        .map(|region| (region.id.clone(), Rc::new(region)))
        .collect())
}

fn build_technologies(technologies: Vec<Technology>) -> EngineResult<TechnologyMap> {
    ensure_valid!(
        !technologies.is_empty(),
        "technologies",
        "at least one technology is required"
    );
    collect_unique_ids(&technologies)
        .map_err(|err| ScenarioError::invalid("technologies", err.to_string()))?;
    for technology in &technologies {
        technology.validate()?;
    }

    Ok(technologies
        .into_iter()
        .map(|technology| (technology.id.clone(), Rc::new(technology)))
        .collect())
}

/// Check that the carbon target refers to simulated years
fn check_carbon_target(target: &CarbonTarget, years: &[u32]) -> EngineResult<()> {
    for year in std::iter::once(&target.baseline_year()).chain(target.milestones().keys()) {
        ensure_valid!(
            years.contains(year),
            "carbon target",
            "year {year} is not a simulated year"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{SCENARIO_TOML, assert_error};
    use crate::units::{Capacity, Power};
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn with_line(extra: &str) -> String {
        // Top-level keys must come before any tables
        format!("{extra}\n{SCENARIO_TOML}")
    }

    #[test]
    fn test_from_toml_str() {
        let config = ScenarioConfig::from_toml_str(SCENARIO_TOML).unwrap();
        assert_eq!(config.name, "simple");
        assert_eq!(config.years, vec![2025, 2030, 2035]);
        assert_eq!(config.seed, 42);
        assert_eq!(config.cost_base_year, 2025);
        assert_eq!(config.demand_resolution, DemandResolution::Hourly);
        assert_eq!(config.policy, DispatchPolicy::Baseline);
        assert_eq!(config.regions.len(), 2);
        assert_eq!(config.technologies.len(), 3);
        assert_eq!(
            config.regions["Industrial"].baseline_demand_mw,
            Power(100.0)
        );
        assert_eq!(
            config
                .installed_capacity
                .get(&"Industrial".into(), &"gas".into(), 2030),
            Capacity(200.0)
        );
        assert!(config.carbon_target.is_some());
    }

    #[test]
    fn test_from_path() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("scenario.toml");
        {
            let mut file = File::create(&file_path).unwrap();
            write!(file, "{SCENARIO_TOML}").unwrap();
        }

        let config = ScenarioConfig::from_path(&file_path).unwrap();
        assert_eq!(config.name, "simple");
    }

    #[test]
    fn test_from_path_invalid() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("scenario.toml");
        {
            let mut file = File::create(&file_path).unwrap();
            write!(file, "{}", SCENARIO_TOML.replace("year_step = 5", "year_step = 0")).unwrap();
        }

        assert_error!(
            ScenarioConfig::from_path(&file_path),
            input_err_msg(&file_path)
        );
    }

    #[test]
    fn test_check_years() {
        assert_eq!(check_years(2025, 2025, 1).unwrap(), vec![2025]);
        assert_eq!(check_years(2025, 2035, 5).unwrap(), vec![2025, 2030, 2035]);
        assert!(check_years(2025, 2035, 0).is_err());
        assert!(check_years(2035, 2025, 1).is_err());
        assert!(check_years(2025, 2034, 5).is_err());
    }

    #[test]
    fn test_unknown_field() {
        assert!(ScenarioConfig::from_toml_str(&with_line("colour = \"blue\"")).is_err());
    }

    #[test]
    fn test_bad_discount_rate() {
        let toml = SCENARIO_TOML.replace("discount_rate = 0.07", "discount_rate = -0.5");
        assert!(ScenarioConfig::from_toml_str(&toml).is_err());
    }

    #[test]
    fn test_duplicate_region() {
        let toml = SCENARIO_TOML.replace("id = \"Residential\"", "id = \"Industrial\"");
        assert!(ScenarioConfig::from_toml_str(&toml).is_err());
    }

    #[test]
    fn test_carbon_target_outside_years() {
        let toml = SCENARIO_TOML.replace("{year = 2035, reduction = 0.5}", "{year = 2040, reduction = 0.5}");
        let err = ScenarioConfig::from_toml_str(&toml).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid configuration for carbon target: year 2040 is not a simulated year"
        );
    }

    #[test]
    fn test_storage_policy() {
        let toml = format!(
            "{SCENARIO_TOML}
[storage]
energy_capacity_mwh = 100.0
power_mw = 25.0
round_trip_efficiency = 0.85
capex_base = 300000.0
lifetime_years = 15
"
        );
        let config = ScenarioConfig::from_toml_str(&toml).unwrap();
        assert_eq!(config.policy.name(), "battery_storage");
    }

    #[test]
    fn test_unknown_installed_technology() {
        let toml = format!(
            "{SCENARIO_TOML}
[[installed_capacity]]
region = \"Industrial\"
technology = \"coal\"
year = 2025
capacity_mw = 10.0
"
        );
        assert!(ScenarioConfig::from_toml_str(&toml).is_err());
    }
}

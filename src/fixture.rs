//! Fixtures for tests
use crate::config::ScenarioConfig;
use crate::region::{LoadShape, Region};
use crate::storage::StorageParameters;
use crate::technology::{Technology, TechnologyKind, TechnologyMap};
use crate::units::{
    Dimensionless, EmissionFactor, Energy, MoneyPerCapacity, MoneyPerCapacityPerYear,
    MoneyPerEnergy, Power,
};
use rstest::fixture;
use std::rc::Rc;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// A small scenario with two regions and three technologies
pub const SCENARIO_TOML: &str = r#"name = "simple"
description = "Two regions with gas, wind and solar"
start_year = 2025
end_year = 2035
year_step = 5
seed = 42
demand_growth_rate = 0.015
discount_rate = 0.07

[[regions]]
id = "Industrial"
baseline_demand_mw = 100.0
load_shape = "industrial"
demand_variation = 0.05

[[regions]]
id = "Residential"
baseline_demand_mw = 80.0
load_shape = "residential"

[[technologies]]
id = "gas"
kind = "dispatchable"
capex_base = 800000.0
opex_fixed = 20000.0
opex_variable = 3.0
fuel_cost = 60.0
capacity_factor = 0.85
lifetime_years = 30
learning_rate = 0.005
emission_factor = 400.0

[[technologies]]
id = "wind"
kind = "wind"
capex_base = 1300000.0
opex_fixed = 40000.0
opex_variable = 0.0
capacity_factor = 0.3
lifetime_years = 25
learning_rate = 0.02

[[technologies]]
id = "solar"
kind = "solar"
capex_base = 900000.0
opex_fixed = 15000.0
opex_variable = 0.0
capacity_factor = 0.2
lifetime_years = 25
learning_rate = 0.04

[[installed_capacity]]
region = "Industrial"
technology = "gas"
year = 2025
capacity_mw = 200.0

[[installed_capacity]]
region = "Industrial"
technology = "wind"
year = 2025
capacity_mw = 60.0

[[installed_capacity]]
region = "Industrial"
technology = "wind"
year = 2030
capacity_mw = 100.0

[[installed_capacity]]
region = "Industrial"
technology = "solar"
year = 2025
capacity_mw = 40.0

[[installed_capacity]]
region = "Residential"
technology = "gas"
year = 2025
capacity_mw = 250.0

[[installed_capacity]]
region = "Residential"
technology = "wind"
year = 2025
capacity_mw = 50.0

[[installed_capacity]]
region = "Residential"
technology = "solar"
year = 2025
capacity_mw = 60.0

[[installed_capacity]]
region = "Residential"
technology = "solar"
year = 2030
capacity_mw = 100.0

[carbon_target]
baseline_year = 2025
milestones = [{year = 2030, reduction = 0.2}, {year = 2035, reduction = 0.5}]
"#;

#[fixture]
pub fn scenario_config() -> ScenarioConfig {
    ScenarioConfig::from_toml_str(SCENARIO_TOML).unwrap()
}

#[fixture]
pub fn industrial_region() -> Region {
    Region {
        id: "Industrial".into(),
        description: "Flat industrial load".into(),
        baseline_demand_mw: Power(100.0),
        load_shape: LoadShape::Industrial,
        demand_variation: Dimensionless(0.05),
    }
}

#[fixture]
pub fn residential_region() -> Region {
    Region {
        id: "Residential".into(),
        description: "Peaky residential load".into(),
        baseline_demand_mw: Power(80.0),
        load_shape: LoadShape::Residential,
        demand_variation: Dimensionless(0.05),
    }
}

#[fixture]
pub fn gas() -> Technology {
    Technology {
        id: "gas".into(),
        description: "Combined cycle gas turbine".into(),
        kind: TechnologyKind::Dispatchable,
        capex_base: MoneyPerCapacity(800_000.0),
        opex_fixed: MoneyPerCapacityPerYear(20_000.0),
        opex_variable: MoneyPerEnergy(3.0),
        fuel_cost: MoneyPerEnergy(60.0),
        capacity_factor: Dimensionless(0.85),
        lifetime_years: 30,
        learning_rate: Dimensionless(0.005),
        emission_factor: EmissionFactor(400.0),
    }
}

#[fixture]
pub fn wind() -> Technology {
    Technology {
        id: "wind".into(),
        description: "Onshore wind".into(),
        kind: TechnologyKind::Wind,
        capex_base: MoneyPerCapacity(1_300_000.0),
        opex_fixed: MoneyPerCapacityPerYear(40_000.0),
        opex_variable: MoneyPerEnergy(0.0),
        fuel_cost: MoneyPerEnergy(0.0),
        capacity_factor: Dimensionless(0.3),
        lifetime_years: 25,
        learning_rate: Dimensionless(0.02),
        emission_factor: EmissionFactor(0.0),
    }
}

#[fixture]
pub fn solar() -> Technology {
    Technology {
        id: "solar".into(),
        description: "Utility-scale solar".into(),
        kind: TechnologyKind::Solar,
        capex_base: MoneyPerCapacity(900_000.0),
        opex_fixed: MoneyPerCapacityPerYear(15_000.0),
        opex_variable: MoneyPerEnergy(0.0),
        fuel_cost: MoneyPerEnergy(0.0),
        capacity_factor: Dimensionless(0.2),
        lifetime_years: 25,
        learning_rate: Dimensionless(0.04),
        emission_factor: EmissionFactor(0.0),
    }
}

#[fixture]
pub fn technologies(gas: Technology, wind: Technology, solar: Technology) -> TechnologyMap {
    [gas, wind, solar]
        .into_iter()
        .map(|technology| (technology.id.clone(), Rc::new(technology)))
        .collect()
}

#[fixture]
pub fn battery() -> StorageParameters {
    StorageParameters {
        energy_capacity_mwh: Energy(200.0),
        power_mw: Power(50.0),
        round_trip_efficiency: Dimensionless(0.85),
        capex_base: MoneyPerEnergy(300_000.0),
        opex_fixed: MoneyPerEnergy(5000.0),
        lifetime_years: 15,
        learning_rate: Dimensionless(0.05),
    }
}

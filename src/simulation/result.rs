//! The results of running a scenario.
use crate::cost::{CostBreakdown, CostSnapshot};
use crate::demand::DemandStatistics;
use crate::dispatch::TechnologyDispatch;
use crate::emissions::{CarbonTarget, EmissionsAccount, TargetCompliance};
use crate::region::RegionID;
use crate::storage::StorageOperation;
use crate::technology::TechnologyID;
use crate::units::{
    Capacity, Dimensionless, EmissionFactor, Emissions, Energy, Money, Power,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Results for one region in one year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionalResult {
    /// Statistics of the region's demand
    pub demand: DemandStatistics,
    /// Dispatch of each technology in the region
    pub generation: IndexMap<TechnologyID, TechnologyDispatch>,
    /// Battery operation, if the scenario includes storage
    pub storage: Option<StorageOperation>,
    /// Annual cost of the region's battery
    pub storage_cost: Money,
    /// Emissions from the region's generation
    pub emissions: EmissionsAccount,
}

/// Results for one technology in one year, across all regions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnologyResult {
    /// The technology's costs in this year
    pub cost: CostSnapshot,
    /// Capacity installed across all regions
    pub capacity_mw: Capacity,
    /// Mean output across all regions
    pub generation_mw: Power,
    /// Energy generated across all regions
    pub energy_mwh: Energy,
    /// Renewable energy curtailed across all regions
    pub curtailed_mwh: Energy,
    /// Annual cost of the technology's capacity and generation
    pub annual_cost: CostBreakdown,
}

/// Results for a single simulated year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualResult {
    /// The simulated year
    pub year: u32,
    /// Mean demand summed across regions
    pub demand_mw: Power,
    /// Energy demanded across all regions
    pub demand_mwh: Energy,
    /// Results for each region
    pub regions: IndexMap<RegionID, RegionalResult>,
    /// Results for each technology
    pub technologies: IndexMap<TechnologyID, TechnologyResult>,
    /// Annual cost of storage across all regions
    pub storage_cost: Money,
    /// Total annual cost of the system, including storage
    pub total_cost: Money,
    /// Total emissions (tonnes CO2)
    pub emissions: Emissions,
    /// Emissions per unit of generation (kg CO2/MWh)
    pub carbon_intensity: EmissionFactor,
    /// Fraction of generation from renewables
    pub renewable_share: Dimensionless,
}

impl AnnualResult {
    /// Total mean output across all technologies
    pub fn generation_mw(&self) -> Power {
        self.technologies.values().map(|t| t.generation_mw).sum()
    }
}

/// Whether a scenario ran to completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunStatus {
    /// Every year was simulated
    Completed,
    /// Simulation stopped because of an error
    Failed {
        /// The year in which the error occurred
        year: u32,
        /// Description of the error
        message: String,
    },
    /// Simulation was cancelled before the given year
    Cancelled {
        /// The first year that was not simulated
        year: u32,
    },
}

/// Totals and averages over all simulated years
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSummary {
    /// Sum of annual emissions over the simulated years
    pub cumulative_emissions: Emissions,
    /// Mean of the annual renewable shares
    pub average_renewable_share: Dimensionless,
    /// Sum of annual system costs over the simulated years
    pub cumulative_cost: Money,
    /// Mean of the annual carbon intensities
    pub average_carbon_intensity: EmissionFactor,
    /// Whether each carbon target milestone was met
    pub compliance: Vec<TargetCompliance>,
}

impl ScenarioSummary {
    /// Summarise the results of a completed scenario
    pub fn new(years: &[AnnualResult], target: Option<&CarbonTarget>) -> Self {
        let count = Dimensionless(years.len().max(1) as f64);
        let emissions_by_year: IndexMap<u32, Emissions> =
            years.iter().map(|y| (y.year, y.emissions)).collect();

        Self {
            cumulative_emissions: years.iter().map(|y| y.emissions).sum(),
            average_renewable_share: years.iter().map(|y| y.renewable_share).sum::<Dimensionless>()
                / count,
            cumulative_cost: years.iter().map(|y| y.total_cost).sum(),
            average_carbon_intensity: years
                .iter()
                .map(|y| y.carbon_intensity)
                .sum::<EmissionFactor>()
                / count,
            compliance: target
                .map(|target| target.evaluate(&emissions_by_year))
                .unwrap_or_default(),
        }
    }

    /// Whether every carbon target milestone was met
    pub fn all_targets_met(&self) -> bool {
        self.compliance.iter().all(|c| c.met)
    }
}

/// The result of running a scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    /// Name of the scenario
    pub name: String,
    /// Name of the dispatch policy
    pub policy: String,
    /// Base seed used for random variation
    pub seed: u64,
    /// Whether the scenario ran to completion
    pub status: RunStatus,
    /// Results for each simulated year, in order
    pub years: Vec<AnnualResult>,
    /// Summary of the whole run, present only if it completed
    pub summary: Option<ScenarioSummary>,
}

impl ScenarioResult {
    /// Whether every year was simulated
    pub fn is_complete(&self) -> bool {
        self.status == RunStatus::Completed
    }

    /// The results for the given year, if it was simulated
    pub fn year(&self, year: u32) -> Option<&AnnualResult> {
        self.years.iter().find(|y| y.year == year)
    }

    /// The simulated years, in order
    pub fn iter_years(&self) -> impl Iterator<Item = u32> + '_ {
        self.years.iter().map(|y| y.year)
    }
}

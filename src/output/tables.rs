//! Flat, tabular forms of scenario results and comparisons, one struct per CSV row.
//!
//! Every field of a [`ScenarioResult`] or [`ComparisonData`] appears in exactly one table, so the
//! nested structure can be rebuilt from the tables.
use crate::comparison::{ComparisonData, Metric, MetricDelta, YearDelta};
use crate::cost::{CostBreakdown, CostSnapshot};
use crate::demand::DemandStatistics;
use crate::dispatch::TechnologyDispatch;
use crate::emissions::{EmissionsAccount, TargetCompliance};
use crate::region::RegionID;
use crate::simulation::{
    AnnualResult, RegionalResult, RunStatus, ScenarioResult, ScenarioSummary, TechnologyResult,
};
use crate::storage::StorageOperation;
use crate::technology::TechnologyID;
use crate::units::{
    Capacity, Dimensionless, EmissionFactor, Emissions, Energy, Money, MoneyPerCapacity,
    MoneyPerCapacityPerYear, MoneyPerEnergy, Power,
};
use anyhow::{Context, Result, bail, ensure};
use indexmap::IndexMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};

/// The state of a run, as written to file
#[derive(Debug, Clone, Copy, PartialEq, SerializeLabeledStringEnum, DeserializeLabeledStringEnum)]
pub enum StatusLabel {
    /// Every year was simulated
    #[string = "completed"]
    Completed,
    /// Simulation stopped because of an error
    #[string = "failed"]
    Failed,
    /// Simulation was cancelled
    #[string = "cancelled"]
    Cancelled,
}

/// The single row of `summary.csv`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub name: String,
    pub policy: String,
    pub seed: u64,
    pub state: StatusLabel,
    /// The year in which the run failed or was cancelled
    pub stopped_year: Option<u32>,
    /// The error, if the run failed
    pub message: Option<String>,
    pub cumulative_emissions: Option<Emissions>,
    pub average_renewable_share: Option<Dimensionless>,
    pub cumulative_cost: Option<Money>,
    pub average_carbon_intensity: Option<EmissionFactor>,
}

/// A row of `annual.csv`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualRow {
    pub year: u32,
    pub demand_mw: Power,
    pub demand_mwh: Energy,
    pub storage_cost: Money,
    pub total_cost: Money,
    pub emissions: Emissions,
    pub carbon_intensity: EmissionFactor,
    pub renewable_share: Dimensionless,
}

/// A row of `regions.csv`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionRow {
    pub year: u32,
    pub region_id: RegionID,
    pub mean_demand_mw: Power,
    pub peak_demand_mw: Power,
    pub min_demand_mw: Power,
    pub daily_energy_mwh: Energy,
    pub annual_energy_mwh: Energy,
    pub load_factor: Dimensionless,
    /// Storage fields are empty if the scenario has no battery
    pub storage_charged_mwh: Option<Energy>,
    pub storage_discharged_mwh: Option<Energy>,
    pub storage_losses_mwh: Option<Energy>,
    pub storage_unused_mwh: Option<Energy>,
    pub storage_cost: Money,
    pub generation_mwh: Energy,
    pub emissions: Emissions,
    pub carbon_intensity: EmissionFactor,
    pub renewable_share: Dimensionless,
}

/// A row of `generation.csv`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRow {
    pub year: u32,
    pub region_id: RegionID,
    pub technology_id: TechnologyID,
    pub generation_mw: Power,
    pub energy_mwh: Energy,
    pub available_mwh: Energy,
    pub curtailed_mwh: Energy,
    pub from_storage_mwh: Energy,
}

/// A row of `costs.csv`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostRow {
    pub year: u32,
    pub technology_id: TechnologyID,
    pub capex: MoneyPerCapacity,
    pub opex_fixed: MoneyPerCapacityPerYear,
    pub opex_variable: MoneyPerEnergy,
    pub fuel_cost: MoneyPerEnergy,
    pub capacity_factor: Dimensionless,
    pub annualised_capex: MoneyPerCapacityPerYear,
    pub lcoe: MoneyPerEnergy,
    pub capacity_mw: Capacity,
    pub generation_mw: Power,
    pub energy_mwh: Energy,
    pub curtailed_mwh: Energy,
    pub capital: Money,
    pub fixed_operating: Money,
    pub variable_operating: Money,
    pub fuel: Money,
}

/// A row of `compliance.csv`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceRow {
    pub year: u32,
    pub required_reduction: Dimensionless,
    pub achieved_reduction: Dimensionless,
    pub emissions: Emissions,
    pub met: bool,
}

/// All the tables describing a [`ScenarioResult`]
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioTables {
    pub summary: SummaryRow,
    pub annual: Vec<AnnualRow>,
    pub regions: Vec<RegionRow>,
    pub generation: Vec<GenerationRow>,
    pub costs: Vec<CostRow>,
    pub compliance: Vec<ComplianceRow>,
}

impl SummaryRow {
    fn new(result: &ScenarioResult) -> Self {
        let (state, stopped_year, message) = match &result.status {
            RunStatus::Completed => (StatusLabel::Completed, None, None),
            RunStatus::Failed { year, message } => {
                (StatusLabel::Failed, Some(*year), Some(message.clone()))
            }
            RunStatus::Cancelled { year } => (StatusLabel::Cancelled, Some(*year), None),
        };
        let summary = result.summary.as_ref();

        Self {
            name: result.name.clone(),
            policy: result.policy.clone(),
            seed: result.seed,
            state,
            stopped_year,
            message,
            cumulative_emissions: summary.map(|s| s.cumulative_emissions),
            average_renewable_share: summary.map(|s| s.average_renewable_share),
            cumulative_cost: summary.map(|s| s.cumulative_cost),
            average_carbon_intensity: summary.map(|s| s.average_carbon_intensity),
        }
    }

    fn status(&self) -> Result<RunStatus> {
        Ok(match self.state {
            StatusLabel::Completed => RunStatus::Completed,
            StatusLabel::Failed => RunStatus::Failed {
                year: self.stopped_year.context("Failed run is missing a year")?,
                message: self.message.clone().unwrap_or_default(),
            },
            StatusLabel::Cancelled => RunStatus::Cancelled {
                year: self.stopped_year.context("Cancelled run is missing a year")?,
            },
        })
    }

    fn summary(&self, compliance: Vec<TargetCompliance>) -> Result<Option<ScenarioSummary>> {
        match (
            self.cumulative_emissions,
            self.average_renewable_share,
            self.cumulative_cost,
            self.average_carbon_intensity,
        ) {
            (Some(emissions), Some(share), Some(cost), Some(intensity)) => {
                Ok(Some(ScenarioSummary {
                    cumulative_emissions: emissions,
                    average_renewable_share: share,
                    cumulative_cost: cost,
                    average_carbon_intensity: intensity,
                    compliance,
                }))
            }
            (None, None, None, None) => {
                ensure!(
                    compliance.is_empty(),
                    "Compliance rows given for a scenario without a summary"
                );
                Ok(None)
            }
            _ => bail!("Summary metrics must be all present or all absent"),
        }
    }
}

impl RegionRow {
    fn new(year: u32, region_id: &RegionID, region: &RegionalResult) -> Self {
        let storage = region.storage.as_ref();
        Self {
            year,
            region_id: region_id.clone(),
            mean_demand_mw: region.demand.mean_mw,
            peak_demand_mw: region.demand.peak_mw,
            min_demand_mw: region.demand.min_mw,
            daily_energy_mwh: region.demand.daily_energy_mwh,
            annual_energy_mwh: region.demand.annual_energy_mwh,
            load_factor: region.demand.load_factor,
            storage_charged_mwh: storage.map(|s| s.charged_mwh),
            storage_discharged_mwh: storage.map(|s| s.discharged_mwh),
            storage_losses_mwh: storage.map(|s| s.losses_mwh),
            storage_unused_mwh: storage.map(|s| s.unused_mwh),
            storage_cost: region.storage_cost,
            generation_mwh: region.emissions.energy_mwh,
            emissions: region.emissions.emissions,
            carbon_intensity: region.emissions.carbon_intensity,
            renewable_share: region.emissions.renewable_share,
        }
    }

    fn storage(&self) -> Result<Option<StorageOperation>> {
        match (
            self.storage_charged_mwh,
            self.storage_discharged_mwh,
            self.storage_losses_mwh,
            self.storage_unused_mwh,
        ) {
            (Some(charged_mwh), Some(discharged_mwh), Some(losses_mwh), Some(unused_mwh)) => {
                Ok(Some(StorageOperation {
                    charged_mwh,
                    discharged_mwh,
                    losses_mwh,
                    unused_mwh,
                }))
            }
            (None, None, None, None) => Ok(None),
            _ => bail!(
                "Storage fields for region {} in {} must be all present or all absent",
                self.region_id,
                self.year
            ),
        }
    }

    fn into_result(self) -> Result<RegionalResult> {
        Ok(RegionalResult {
            storage: self.storage()?,
            demand: DemandStatistics {
                mean_mw: self.mean_demand_mw,
                peak_mw: self.peak_demand_mw,
                min_mw: self.min_demand_mw,
                daily_energy_mwh: self.daily_energy_mwh,
                annual_energy_mwh: self.annual_energy_mwh,
                load_factor: self.load_factor,
            },
            generation: IndexMap::new(),
            storage_cost: self.storage_cost,
            emissions: EmissionsAccount {
                energy_mwh: self.generation_mwh,
                emissions: self.emissions,
                carbon_intensity: self.carbon_intensity,
                renewable_share: self.renewable_share,
            },
        })
    }
}

impl CostRow {
    fn new(year: u32, technology_id: &TechnologyID, technology: &TechnologyResult) -> Self {
        let cost = &technology.cost;
        let annual = &technology.annual_cost;
        Self {
            year,
            technology_id: technology_id.clone(),
            capex: cost.capex,
            opex_fixed: cost.opex_fixed,
            opex_variable: cost.opex_variable,
            fuel_cost: cost.fuel_cost,
            capacity_factor: cost.capacity_factor,
            annualised_capex: cost.annualised_capex,
            lcoe: cost.lcoe,
            capacity_mw: technology.capacity_mw,
            generation_mw: technology.generation_mw,
            energy_mwh: technology.energy_mwh,
            curtailed_mwh: technology.curtailed_mwh,
            capital: annual.capital,
            fixed_operating: annual.fixed_operating,
            variable_operating: annual.variable_operating,
            fuel: annual.fuel,
        }
    }
}

impl From<CostRow> for TechnologyResult {
    fn from(row: CostRow) -> Self {
        Self {
            cost: CostSnapshot {
                capex: row.capex,
                opex_fixed: row.opex_fixed,
                opex_variable: row.opex_variable,
                fuel_cost: row.fuel_cost,
                capacity_factor: row.capacity_factor,
                annualised_capex: row.annualised_capex,
                lcoe: row.lcoe,
            },
            capacity_mw: row.capacity_mw,
            generation_mw: row.generation_mw,
            energy_mwh: row.energy_mwh,
            curtailed_mwh: row.curtailed_mwh,
            annual_cost: CostBreakdown {
                capital: row.capital,
                fixed_operating: row.fixed_operating,
                variable_operating: row.variable_operating,
                fuel: row.fuel,
            },
        }
    }
}

impl From<&TargetCompliance> for ComplianceRow {
    fn from(c: &TargetCompliance) -> Self {
        Self {
            year: c.year,
            required_reduction: c.required_reduction,
            achieved_reduction: c.achieved_reduction,
            emissions: c.emissions,
            met: c.met,
        }
    }
}

impl From<ComplianceRow> for TargetCompliance {
    fn from(row: ComplianceRow) -> Self {
        Self {
            year: row.year,
            required_reduction: row.required_reduction,
            achieved_reduction: row.achieved_reduction,
            emissions: row.emissions,
            met: row.met,
        }
    }
}

impl From<&ScenarioResult> for ScenarioTables {
    fn from(result: &ScenarioResult) -> Self {
        let mut annual = Vec::new();
        let mut regions = Vec::new();
        let mut generation = Vec::new();
        let mut costs = Vec::new();

        for year in &result.years {
            annual.push(AnnualRow {
                year: year.year,
                demand_mw: year.demand_mw,
                demand_mwh: year.demand_mwh,
                storage_cost: year.storage_cost,
                total_cost: year.total_cost,
                emissions: year.emissions,
                carbon_intensity: year.carbon_intensity,
                renewable_share: year.renewable_share,
            });

            for (region_id, region) in &year.regions {
                regions.push(RegionRow::new(year.year, region_id, region));
                for (technology_id, dispatch) in &region.generation {
                    generation.push(GenerationRow {
                        year: year.year,
                        region_id: region_id.clone(),
                        technology_id: technology_id.clone(),
                        generation_mw: dispatch.generation_mw,
                        energy_mwh: dispatch.energy_mwh,
                        available_mwh: dispatch.available_mwh,
                        curtailed_mwh: dispatch.curtailed_mwh,
                        from_storage_mwh: dispatch.from_storage_mwh,
                    });
                }
            }

            for (technology_id, technology) in &year.technologies {
                costs.push(CostRow::new(year.year, technology_id, technology));
            }
        }

        let compliance = result
            .summary
            .iter()
            .flat_map(|s| &s.compliance)
            .map(ComplianceRow::from)
            .collect();

        Self {
            summary: SummaryRow::new(result),
            annual,
            regions,
            generation,
            costs,
            compliance,
        }
    }
}

impl TryFrom<ScenarioTables> for ScenarioResult {
    type Error = anyhow::Error;

    fn try_from(tables: ScenarioTables) -> Result<Self> {
        let mut years: IndexMap<u32, AnnualResult> = IndexMap::new();
        for row in tables.annual {
            let year = AnnualResult {
                year: row.year,
                demand_mw: row.demand_mw,
                demand_mwh: row.demand_mwh,
                regions: IndexMap::new(),
                technologies: IndexMap::new(),
                storage_cost: row.storage_cost,
                total_cost: row.total_cost,
                emissions: row.emissions,
                carbon_intensity: row.carbon_intensity,
                renewable_share: row.renewable_share,
            };
            ensure!(
                years.insert(row.year, year).is_none(),
                "Duplicate annual results for {}",
                row.year
            );
        }

        for row in tables.regions {
            let (year, region_id) = (row.year, row.region_id.clone());
            let annual = years
                .get_mut(&year)
                .with_context(|| format!("Region results given for unknown year {year}"))?;
            ensure!(
                annual.regions.insert(region_id.clone(), row.into_result()?).is_none(),
                "Duplicate results for region {region_id} in {year}"
            );
        }

        for row in tables.generation {
            let region = years
                .get_mut(&row.year)
                .and_then(|annual| annual.regions.get_mut(&row.region_id))
                .with_context(|| {
                    format!(
                        "Generation given for unknown region {} in {}",
                        row.region_id, row.year
                    )
                })?;
            let dispatch = TechnologyDispatch {
                generation_mw: row.generation_mw,
                energy_mwh: row.energy_mwh,
                available_mwh: row.available_mwh,
                curtailed_mwh: row.curtailed_mwh,
                from_storage_mwh: row.from_storage_mwh,
            };
            ensure!(
                region
                    .generation
                    .insert(row.technology_id.clone(), dispatch)
                    .is_none(),
                "Duplicate generation for technology {} in region {}, {}",
                row.technology_id,
                row.region_id,
                row.year
            );
        }

        for row in tables.costs {
            let (year, technology_id) = (row.year, row.technology_id.clone());
            let annual = years
                .get_mut(&year)
                .with_context(|| format!("Costs given for unknown year {year}"))?;
            ensure!(
                annual
                    .technologies
                    .insert(technology_id.clone(), row.into())
                    .is_none(),
                "Duplicate costs for technology {technology_id} in {year}"
            );
        }

        let compliance = tables.compliance.into_iter().map_into().collect();
        Ok(ScenarioResult {
            name: tables.summary.name.clone(),
            policy: tables.summary.policy.clone(),
            seed: tables.summary.seed,
            status: tables.summary.status()?,
            years: years.into_values().collect(),
            summary: tables.summary.summary(compliance)?,
        })
    }
}

/// Which per-year quantity a row of `comparison_years.csv` refers to
#[derive(Debug, Clone, Copy, PartialEq, SerializeLabeledStringEnum, DeserializeLabeledStringEnum)]
pub enum Quantity {
    #[string = "demand_mw"]
    DemandMw,
    #[string = "total_cost"]
    TotalCost,
    #[string = "emissions"]
    Emissions,
    #[string = "carbon_intensity"]
    CarbonIntensity,
    #[string = "renewable_share"]
    RenewableShare,
    /// Mean output of a single technology
    #[string = "generation_mw"]
    GenerationMw,
}

/// A row of `comparison_metrics.csv`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRow {
    pub baseline: String,
    pub alternative: String,
    pub metric: Metric,
    pub baseline_value: f64,
    pub alternative_value: f64,
    pub absolute_delta: f64,
    pub percent_delta: Option<f64>,
}

/// A row of `comparison_years.csv`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearDeltaRow {
    pub year: u32,
    pub quantity: Quantity,
    /// Only present for [`Quantity::GenerationMw`]
    pub technology_id: Option<TechnologyID>,
    pub baseline_value: f64,
    pub alternative_value: f64,
    pub absolute_delta: f64,
    pub percent_delta: Option<f64>,
}

impl YearDeltaRow {
    fn new(
        year: u32,
        quantity: Quantity,
        technology_id: Option<&TechnologyID>,
        delta: &MetricDelta,
    ) -> Self {
        Self {
            year,
            quantity,
            technology_id: technology_id.cloned(),
            baseline_value: delta.baseline_value,
            alternative_value: delta.alternative_value,
            absolute_delta: delta.absolute_delta,
            percent_delta: delta.percent_delta,
        }
    }

    fn delta(&self) -> MetricDelta {
        MetricDelta {
            baseline_value: self.baseline_value,
            alternative_value: self.alternative_value,
            absolute_delta: self.absolute_delta,
            percent_delta: self.percent_delta,
        }
    }
}

/// All the tables describing a [`ComparisonData`]
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonTables {
    pub metrics: Vec<MetricRow>,
    pub years: Vec<YearDeltaRow>,
}

impl From<&ComparisonData> for ComparisonTables {
    fn from(data: &ComparisonData) -> Self {
        let metrics = data
            .metrics
            .iter()
            .map(|(metric, delta)| MetricRow {
                baseline: data.baseline.clone(),
                alternative: data.alternative.clone(),
                metric: *metric,
                baseline_value: delta.baseline_value,
                alternative_value: delta.alternative_value,
                absolute_delta: delta.absolute_delta,
                percent_delta: delta.percent_delta,
            })
            .collect();

        let mut years = Vec::new();
        for year in &data.years {
            let y = year.year;
            years.extend([
                YearDeltaRow::new(y, Quantity::DemandMw, None, &year.demand_mw),
                YearDeltaRow::new(y, Quantity::TotalCost, None, &year.total_cost),
                YearDeltaRow::new(y, Quantity::Emissions, None, &year.emissions),
                YearDeltaRow::new(y, Quantity::CarbonIntensity, None, &year.carbon_intensity),
                YearDeltaRow::new(y, Quantity::RenewableShare, None, &year.renewable_share),
            ]);
            years.extend(year.generation_mw.iter().map(|(id, delta)| {
                YearDeltaRow::new(y, Quantity::GenerationMw, Some(id), delta)
            }));
        }

        Self { metrics, years }
    }
}

/// A [`YearDelta`] being rebuilt from rows
#[derive(Default)]
struct PartialYearDelta {
    demand_mw: Option<MetricDelta>,
    total_cost: Option<MetricDelta>,
    emissions: Option<MetricDelta>,
    carbon_intensity: Option<MetricDelta>,
    renewable_share: Option<MetricDelta>,
    generation_mw: IndexMap<TechnologyID, MetricDelta>,
}

impl PartialYearDelta {
    fn finish(self, year: u32) -> Result<YearDelta> {
        let missing = |quantity: &str| format!("Missing {quantity} delta for {year}");
        Ok(YearDelta {
            year,
            demand_mw: self.demand_mw.with_context(|| missing("demand_mw"))?,
            total_cost: self.total_cost.with_context(|| missing("total_cost"))?,
            emissions: self.emissions.with_context(|| missing("emissions"))?,
            carbon_intensity: self
                .carbon_intensity
                .with_context(|| missing("carbon_intensity"))?,
            renewable_share: self
                .renewable_share
                .with_context(|| missing("renewable_share"))?,
            generation_mw: self.generation_mw,
        })
    }
}

impl TryFrom<ComparisonTables> for ComparisonData {
    type Error = anyhow::Error;

    fn try_from(tables: ComparisonTables) -> Result<Self> {
        let first = tables
            .metrics
            .first()
            .context("Comparison must include at least one metric")?;
        let (baseline, alternative) = (first.baseline.clone(), first.alternative.clone());

        let mut metrics = IndexMap::new();
        for row in tables.metrics {
            ensure!(
                row.baseline == baseline && row.alternative == alternative,
                "All metrics must compare the same scenarios"
            );
            let delta = MetricDelta {
                baseline_value: row.baseline_value,
                alternative_value: row.alternative_value,
                absolute_delta: row.absolute_delta,
                percent_delta: row.percent_delta,
            };
            ensure!(
                metrics.insert(row.metric, delta).is_none(),
                "Duplicate metric {}",
                row.metric
            );
        }

        let mut years: IndexMap<u32, PartialYearDelta> = IndexMap::new();
        for row in tables.years {
            let delta = row.delta();
            let partial = years.entry(row.year).or_default();
            let slot = match (row.quantity, row.technology_id) {
                (Quantity::GenerationMw, Some(id)) => {
                    ensure!(
                        partial.generation_mw.insert(id.clone(), delta).is_none(),
                        "Duplicate generation delta for {id} in {}",
                        row.year
                    );
                    continue;
                }
                (Quantity::GenerationMw, None) => {
                    bail!("Generation delta for {} has no technology", row.year)
                }
                (_, Some(id)) => bail!("Unexpected technology {id} in {}", row.year),
                (Quantity::DemandMw, None) => &mut partial.demand_mw,
                (Quantity::TotalCost, None) => &mut partial.total_cost,
                (Quantity::Emissions, None) => &mut partial.emissions,
                (Quantity::CarbonIntensity, None) => &mut partial.carbon_intensity,
                (Quantity::RenewableShare, None) => &mut partial.renewable_share,
            };
            ensure!(
                slot.replace(delta).is_none(),
                "Duplicate {:?} delta for {}",
                row.quantity,
                row.year
            );
        }

        Ok(ComparisonData {
            baseline,
            alternative,
            metrics,
            years: years
                .into_iter()
                .map(|(year, partial)| partial.finish(year))
                .collect::<Result<_>>()?,
        })
    }
}

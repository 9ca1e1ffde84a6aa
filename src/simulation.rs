//! Functionality for running a scenario year by year.
use crate::config::ScenarioConfig;
use crate::cost::{CostSnapshot, TechnologyCostModel};
use crate::demand::DemandModel;
use crate::dispatch::{DispatchUnit, allocate};
use crate::emissions::account;
use crate::error::{EngineResult, ScenarioError};
use crate::region::{Region, RegionID};
use crate::renewable::{RenewableProfile, availability, mean_availability};
use crate::technology::TechnologyID;
use crate::units::{Dimensionless, Energy, Money, Power};
use indexmap::IndexMap;
use log::{debug, error, info, warn};
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub mod result;
pub use result::{
    AnnualResult, RegionalResult, RunStatus, ScenarioResult, ScenarioSummary, TechnologyResult,
};

/// A flag used to stop a running scenario between years.
///
/// Clones share the same flag, so one can be handed to another thread (e.g. a signal handler).
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Create a new token which has not been cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The state of a [`ScenarioRunner`]
#[derive(Debug, Clone, PartialEq)]
pub enum RunState {
    /// Ready to run
    Initialised,
    /// Currently simulating the given year
    Running {
        /// The year being simulated
        year: u32,
    },
    /// Every year was simulated
    Completed,
    /// Simulation stopped because of an error
    Failed {
        /// The year in which the error occurred
        year: u32,
        /// The error
        error: ScenarioError,
    },
    /// Simulation was cancelled before the given year
    Cancelled {
        /// The first year that was not simulated
        year: u32,
    },
}

/// Runs a scenario, one year at a time
pub struct ScenarioRunner<'a> {
    config: &'a ScenarioConfig,
    demand: DemandModel,
    costs: TechnologyCostModel,
    profile: Box<dyn RenewableProfile + 'a>,
    state: RunState,
}

impl<'a> ScenarioRunner<'a> {
    /// Create a new runner for the given scenario.
    ///
    /// The renewable profile is chosen by the scenario; use [`Self::with_renewable_profile`] to
    /// supply a different one.
    pub fn new(config: &'a ScenarioConfig) -> EngineResult<Self> {
        Ok(Self {
            config,
            demand: config.demand_model()?,
            costs: config.cost_model()?,
            profile: config.renewable_profile.build(config.seeds()),
            state: RunState::Initialised,
        })
    }

    /// Use the given source for the hourly availability of renewables
    pub fn with_renewable_profile(mut self, profile: Box<dyn RenewableProfile + 'a>) -> Self {
        self.profile = profile;
        self
    }

    /// The current state of the runner
    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Run every year of the scenario
    pub fn run(&mut self) -> ScenarioResult {
        self.run_with_cancellation(&CancellationToken::new())
    }

    /// Run every year of the scenario, stopping early if `token` is cancelled.
    ///
    /// If a year fails, results for the years before it are kept but the scenario is marked as
    /// incomplete and has no summary.
    pub fn run_with_cancellation(&mut self, token: &CancellationToken) -> ScenarioResult {
        let config = self.config;
        info!(
            "Running scenario {} ({} policy)",
            config.name,
            config.policy.name()
        );

        let mut years = Vec::with_capacity(config.years.len());
        let mut status = RunStatus::Completed;
        for &year in &config.years {
            if token.is_cancelled() {
                warn!("Scenario {} cancelled before year {year}", config.name);
                self.state = RunState::Cancelled { year };
                status = RunStatus::Cancelled { year };
                break;
            }

            self.state = RunState::Running { year };
            info!("Simulating year {year}");
            match self.simulate_year(year) {
                Ok(result) => years.push(result),
                Err(err) => {
                    error!("Scenario {} failed in year {year}: {err}", config.name);
                    status = RunStatus::Failed {
                        year,
                        message: err.to_string(),
                    };
                    self.state = RunState::Failed { year, error: err };
                    break;
                }
            }
        }

        let summary = if status == RunStatus::Completed {
            self.state = RunState::Completed;
            let summary = ScenarioSummary::new(&years, config.carbon_target.as_ref());
            info!(
                "Scenario {} complete: cumulative emissions {:.1} t, cumulative cost {:.0}",
                config.name, summary.cumulative_emissions.0, summary.cumulative_cost.0
            );
            Some(summary)
        } else {
            None
        };

        ScenarioResult {
            name: config.name.clone(),
            policy: config.policy.name().to_string(),
            seed: config.seed,
            status,
            years,
            summary,
        }
    }

    /// Simulate a single year
    pub fn simulate_year(&self, year: u32) -> EngineResult<AnnualResult> {
        let config = self.config;
        let mut availabilities = self.availabilities(year);
        let snapshots = config
            .technologies
            .values()
            .enumerate()
            .map(|(i, technology)| {
                let snapshot = if technology.kind.is_renewable() {
                    // Price renewables at the capacity factor their profiles actually achieve
                    let realised = availabilities
                        .values()
                        .map(|by_technology| mean_availability(&by_technology[i]))
                        .sum::<Dimensionless>()
                        / Dimensionless(availabilities.len().max(1) as f64);
                    if realised > Dimensionless(0.0) {
                        self.costs
                            .snapshot_with_capacity_factor(technology, year, realised)?
                    } else {
                        self.costs.snapshot(technology, year)?
                    }
                } else {
                    self.costs.snapshot(technology, year)?
                };
                Ok((technology.id.clone(), snapshot))
            })
            .collect::<EngineResult<IndexMap<_, _>>>()?;

        let mut regions = IndexMap::new();
        for (region_id, region) in &config.regions {
            let availability = availabilities.swap_remove(region_id).unwrap_or_default();
            let result = self.simulate_region(region, year, &snapshots, availability)?;
            regions.insert(region_id.clone(), result);
        }

        let technologies = self.aggregate_technologies(year, &regions, &snapshots);
        let storage_cost: Money = regions.values().map(|r| r.storage_cost).sum();
        let total_cost = technologies
            .values()
            .map(|t| t.annual_cost.total())
            .sum::<Money>()
            + storage_cost;
        let emissions = account(
            technologies.iter().map(|(id, t)| (id, t.energy_mwh)),
            &config.technologies,
        )?;

        Ok(AnnualResult {
            year,
            demand_mw: regions.values().map(|r| r.demand.mean_mw).sum(),
            demand_mwh: regions.values().map(|r| r.demand.annual_energy_mwh).sum(),
            regions,
            technologies,
            storage_cost,
            total_cost,
            emissions: emissions.emissions,
            carbon_intensity: emissions.carbon_intensity,
            renewable_share: emissions.renewable_share,
        })
    }

    /// Availability in each time slot of every technology in every region, in technology order
    fn availabilities(&self, year: u32) -> IndexMap<RegionID, Vec<Vec<Dimensionless>>> {
        let config = self.config;
        let slots = self.demand.resolution().num_slots();
        config
            .regions
            .iter()
            .map(|(region_id, region)| {
                let by_technology = config
                    .technologies
                    .values()
                    .map(|technology| {
                        availability(self.profile.as_ref(), region, technology, year, slots)
                    })
                    .collect();
                (region_id.clone(), by_technology)
            })
            .collect()
    }

    /// Project demand and dispatch generation for a single region
    fn simulate_region(
        &self,
        region: &Region,
        year: u32,
        snapshots: &IndexMap<TechnologyID, CostSnapshot>,
        availability: Vec<Vec<Dimensionless>>,
    ) -> EngineResult<RegionalResult> {
        let config = self.config;
        let demand = self.demand.profile(region, year)?;
        let units: Vec<_> = config
            .technologies
            .values()
            .zip(availability)
            .map(|(technology, availability)| DispatchUnit {
                technology: Rc::clone(technology),
                lcoe: snapshots[&technology.id].lcoe,
                capacity: config
                    .installed_capacity
                    .get(&region.id, &technology.id, year),
                availability,
            })
            .collect();

        let dispatch = allocate(year, &region.id, &demand, &units, &config.policy)?;
        let emissions = account(
            dispatch
                .technologies
                .iter()
                .map(|(id, d)| (id, d.energy_mwh)),
            &config.technologies,
        )?;
        let storage_cost = config
            .policy
            .storage()
            .map_or(Money(0.0), |storage| storage.annual_cost(&self.costs, year));
        let demand = demand.statistics();
        debug!(
            "{year} {}: mean demand {:.2} MW, generation {:.2} MW, renewable share {:.3}",
            region.id,
            demand.mean_mw.0,
            dispatch.total_generation().0,
            emissions.renewable_share.0
        );

        Ok(RegionalResult {
            demand,
            generation: dispatch.technologies,
            storage: dispatch.storage,
            storage_cost,
            emissions,
        })
    }

    /// Sum generation for each technology across regions and calculate its costs
    fn aggregate_technologies(
        &self,
        year: u32,
        regions: &IndexMap<RegionID, RegionalResult>,
        snapshots: &IndexMap<TechnologyID, CostSnapshot>,
    ) -> IndexMap<TechnologyID, TechnologyResult> {
        let installed = &self.config.installed_capacity;
        snapshots
            .iter()
            .map(|(id, snapshot)| {
                let dispatches: Vec<_> = regions
                    .values()
                    .filter_map(|region| region.generation.get(id))
                    .collect();
                let capacity = installed.total_for_technology(id, year);
                let energy: Energy = dispatches.iter().map(|d| d.energy_mwh).sum();
                let result = TechnologyResult {
                    cost: *snapshot,
                    capacity_mw: capacity,
                    generation_mw: dispatches.iter().map(|d| d.generation_mw).sum::<Power>(),
                    energy_mwh: energy,
                    curtailed_mwh: dispatches.iter().map(|d| d.curtailed_mwh).sum(),
                    annual_cost: snapshot.annual_cost(capacity, energy),
                };
                (id.clone(), result)
            })
            .collect()
    }
}

/// Run a scenario to completion.
///
/// Returns an error if the scenario is invalid. A scenario which fails part way through still
/// returns a [`ScenarioResult`], marked as failed.
pub fn run_scenario(config: &ScenarioConfig) -> EngineResult<ScenarioResult> {
    Ok(ScenarioRunner::new(config)?.run())
}

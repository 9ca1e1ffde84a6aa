//! Allocation of demand to generation technologies.
//!
//! In every time slot, demand is met by technologies in merit order (cheapest LCOE first) until
//! it is fully served. With battery storage, surplus renewable output is stored and discharged in
//! later hours in place of non-renewable generation that costs more than the stored energy.
use crate::demand::DemandProfile;
use crate::error::{EngineResult, ScenarioError};
use crate::region::RegionID;
use crate::storage::{StorageOperation, StorageParameters};
use crate::technology::{Technology, TechnologyID};
use crate::units::{
    Capacity, Dimensionless, Energy, HOURS_PER_YEAR, Hours, MoneyPerEnergy, Power,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::rc::Rc;

/// Unserved demand below this level (in MW) is treated as rounding error
const BALANCE_TOLERANCE: Power = Power(1e-6);

/// The length of a time slot on the representative day
const ONE_HOUR: Hours = Hours(1.0);

/// How demand is allocated between technologies
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchPolicy {
    /// Merit order dispatch. Surplus renewable output is curtailed.
    Baseline,
    /// Merit order dispatch with a battery in each region storing surplus renewable output
    BatteryStorage(StorageParameters),
}

impl DispatchPolicy {
    /// A short name for the policy
    pub fn name(&self) -> &'static str {
        match self {
            Self::Baseline => "baseline",
            Self::BatteryStorage(_) => "battery_storage",
        }
    }

    /// The battery parameters, if the policy includes storage
    pub fn storage(&self) -> Option<&StorageParameters> {
        match self {
            Self::Baseline => None,
            Self::BatteryStorage(params) => Some(params),
        }
    }
}

/// A technology available for dispatch in a region
#[derive(Debug, Clone)]
pub struct DispatchUnit {
    /// The technology
    pub technology: Rc<Technology>,
    /// Levelised cost used to rank the technology in the merit order
    pub lcoe: MoneyPerEnergy,
    /// Installed capacity in the region
    pub capacity: Capacity,
    /// Fraction of capacity available in each time slot
    pub availability: Vec<Dimensionless>,
}

impl DispatchUnit {
    /// Maximum output in the given time slot
    fn available(&self, slot: usize) -> Power {
        self.capacity.available_power(self.availability[slot])
    }

    fn is_renewable(&self) -> bool {
        self.technology.kind.is_renewable()
    }
}

/// The outcome of dispatch for a single technology over a year
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TechnologyDispatch {
    /// Mean output over the year
    pub generation_mw: Power,
    /// Energy generated over the year, including any delivered via storage
    pub energy_mwh: Energy,
    /// Energy that could have been generated given availability
    pub available_mwh: Energy,
    /// Renewable energy that was neither used directly nor delivered via storage
    pub curtailed_mwh: Energy,
    /// The part of `energy_mwh` that was delivered via storage
    pub from_storage_mwh: Energy,
}

/// The outcome of dispatch for a region over a year
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    /// Dispatch of each technology
    pub technologies: IndexMap<TechnologyID, TechnologyDispatch>,
    /// Battery operation, if the policy includes storage
    pub storage: Option<StorageOperation>,
}

impl Dispatch {
    /// Total energy generated across all technologies
    pub fn total_energy(&self) -> Energy {
        self.technologies.values().map(|d| d.energy_mwh).sum()
    }

    /// Total mean output across all technologies
    pub fn total_generation(&self) -> Power {
        self.technologies.values().map(|d| d.generation_mw).sum()
    }
}

/// Order in which units are dispatched: by LCOE, then by emission factor, then by ID.
///
/// Returns indices into `units`.
pub fn merit_order(units: &[DispatchUnit]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..units.len()).collect();
    order.sort_by(|&a, &b| compare_units(&units[a], &units[b]));
    order
}

fn compare_units(a: &DispatchUnit, b: &DispatchUnit) -> Ordering {
    a.lcoe
        .total_cmp(&b.lcoe)
        .then_with(|| {
            a.technology
                .emission_factor
                .total_cmp(&b.technology.emission_factor)
        })
        .then_with(|| a.technology.id.cmp(&b.technology.id))
}

/// Allocate demand for a region and year between the available units.
///
/// # Arguments
///
/// * `year` - The year being simulated (used for error reporting)
/// * `region_id` - The region being simulated (used for error reporting)
/// * `demand` - Demand in each time slot
/// * `units` - Technologies with installed capacity in the region
/// * `policy` - How demand is allocated
///
/// # Returns
///
/// The dispatch of every unit, or [`ScenarioError::InfeasibleDemand`] if available capacity is
/// insufficient in any time slot.
pub fn allocate(
    year: u32,
    region_id: &RegionID,
    demand: &DemandProfile,
    units: &[DispatchUnit],
    policy: &DispatchPolicy,
) -> EngineResult<Dispatch> {
    for unit in units {
        if unit.availability.len() != demand.len() {
            return Err(ScenarioError::invalid(
                &unit.technology.id,
                format!(
                    "availability has {} time slots but demand has {}",
                    unit.availability.len(),
                    demand.len()
                ),
            ));
        }
    }

    let order = merit_order(units);
    let mut generation = vec![vec![Power(0.0); demand.len()]; units.len()];

    // Storage only makes sense when there is more than one time slot to shift energy between
    let mut battery = policy
        .storage()
        .filter(|_| demand.len() > 1)
        .map(|params| Battery::new(params, units.len()));

    for (slot, &load) in demand.slots().iter().enumerate() {
        let mut remaining = load;
        for &i in &order {
            if remaining <= Power(0.0) {
                break;
            }
            let output = units[i].available(slot).min(remaining);
            generation[i][slot] = output;
            remaining = remaining - output;
        }

        if remaining > BALANCE_TOLERANCE {
            let available: Power = units.iter().map(|unit| unit.available(slot)).sum();
            return Err(ScenarioError::InfeasibleDemand {
                year,
                region: region_id.to_string(),
                hour: slot,
                demand_mw: load.value(),
                available_mw: available.value(),
            });
        }

        if let Some(battery) = battery.as_mut() {
            battery.operate(slot, units, &order, &mut generation);
        }
    }

    // Each time slot stands for this many hours over the year
    let slot_hours = demand.slot_hours();
    let days = slot_hours / ONE_HOUR;
    let technologies = units
        .iter()
        .enumerate()
        .map(|(i, unit)| {
            let energy: Energy = generation[i].iter().map(|&p| p * slot_hours).sum();
            let available: Energy = (0..demand.len())
                .map(|slot| unit.available(slot) * slot_hours)
                .sum();
            let curtailed = if unit.is_renewable() {
                (available - energy).max(Energy(0.0))
            } else {
                Energy(0.0)
            };
            let from_storage = battery
                .as_ref()
                .map_or(Energy(0.0), |b| b.delivered[i] * days);

            let dispatch = TechnologyDispatch {
                generation_mw: energy / HOURS_PER_YEAR,
                energy_mwh: energy,
                available_mwh: available,
                curtailed_mwh: curtailed,
                from_storage_mwh: from_storage,
            };
            (unit.technology.id.clone(), dispatch)
        })
        .collect();

    Ok(Dispatch {
        technologies,
        storage: battery.map(|b| b.operation(days)),
    })
}

/// State of a battery over the representative day.
///
/// Stored energy is tracked separately for each unit that charged it, so that energy delivered
/// via storage is credited to the technology that generated it.
struct Battery<'a> {
    params: &'a StorageParameters,
    stored: Vec<Energy>,
    delivered: Vec<Energy>,
    charged: Energy,
    discharged: Energy,
}

impl<'a> Battery<'a> {
    fn new(params: &'a StorageParameters, num_units: usize) -> Self {
        Self {
            params,
            stored: vec![Energy(0.0); num_units],
            delivered: vec![Energy(0.0); num_units],
            charged: Energy(0.0),
            discharged: Energy(0.0),
        }
    }

    fn total_stored(&self) -> Energy {
        self.stored.iter().copied().sum()
    }

    /// Discharge energy stored in earlier slots in place of costlier non-renewable generation,
    /// then charge from whatever renewable output is left over.
    ///
    /// Only output that could later displace a costlier non-renewable unit is stored.
    fn operate(
        &mut self,
        slot: usize,
        units: &[DispatchUnit],
        order: &[usize],
        generation: &mut [Vec<Power>],
    ) {
        let costliest = units
            .iter()
            .filter(|unit| !unit.is_renewable() && unit.capacity > Capacity(0.0))
            .map(|unit| unit.lcoe)
            .max_by(MoneyPerEnergy::total_cmp);

        // Surplus is measured before discharging, which adds to renewable generation
        let surplus: Vec<(usize, Power)> = units
            .iter()
            .enumerate()
            .filter(|(_, unit)| unit.is_renewable() && costliest.is_some_and(|c| unit.lcoe < c))
            .map(|(i, unit)| (i, unit.available(slot) - generation[i][slot]))
            .filter(|(_, surplus)| *surplus > Power(0.0))
            .collect();
        self.discharge(slot, units, order, generation);
        self.charge(&surplus);
    }

    fn charge(&mut self, surplus: &[(usize, Power)]) {
        let total_surplus: Power = surplus.iter().map(|(_, s)| *s).sum();
        let room = self.params.energy_capacity_mwh - self.total_stored();
        let charge = (total_surplus * ONE_HOUR)
            .min(self.params.power_mw * ONE_HOUR)
            .min(room);
        if charge <= Energy(0.0) {
            return;
        }

        for &(i, unit_surplus) in surplus {
            self.stored[i] += charge * (unit_surplus / total_surplus);
        }
        self.charged += charge;
    }

    /// Displace non-renewable output, most expensive first, with stored energy from cheaper
    /// technologies, cheapest first
    fn discharge(
        &mut self,
        slot: usize,
        units: &[DispatchUnit],
        order: &[usize],
        generation: &mut [Vec<Power>],
    ) {
        let efficiency = self.params.round_trip_efficiency;
        let mut headroom = self.params.power_mw * ONE_HOUR;
        for &j in order.iter().rev().filter(|&&j| !units[j].is_renewable()) {
            for &i in order {
                if headroom <= Energy(0.0) {
                    return;
                }
                if self.stored[i] <= Energy(0.0) || units[i].lcoe >= units[j].lcoe {
                    continue;
                }

                let delivered = (self.stored[i] * efficiency)
                    .min(generation[j][slot] * ONE_HOUR)
                    .min(headroom);
                if delivered <= Energy(0.0) {
                    continue;
                }

                generation[j][slot] = generation[j][slot] - delivered / ONE_HOUR;
                generation[i][slot] += delivered / ONE_HOUR;
                self.stored[i] = (self.stored[i] - delivered / efficiency).max(Energy(0.0));
                self.delivered[i] += delivered;
                self.discharged += delivered;
                headroom = headroom - delivered;
            }
        }
    }

    /// Annual totals, given the number of days the representative day stands for
    fn operation(&self, days: Dimensionless) -> StorageOperation {
        let unused = self.total_stored();
        StorageOperation {
            charged_mwh: self.charged * days,
            discharged_mwh: self.discharged * days,
            losses_mwh: (self.charged - self.discharged - unused) * days,
            unused_mwh: unused * days,
        }
    }
}

//! Projection of electricity demand for each region and year.
//!
//! Demand follows a compound growth trend from the region's baseline, shaped over a representative
//! day by the region's [`LoadShape`] and perturbed by seeded random variation.
use crate::error::{EngineResult, ScenarioError, ensure_valid};
use crate::random::SeedSequence;
use crate::region::{LoadShape, Region};
use crate::units::{Dimensionless, Energy, HOURS_PER_YEAR, Hours, Power};
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};

/// The number of hours in the representative day
pub const HOURS_PER_DAY: usize = 24;

/// The number of days each representative day stands for
const DAYS_PER_YEAR: f64 = 365.0;

/// Random variation is clipped to this many standard deviations
const MAX_DEVIATIONS: f64 = 3.0;

/// The time resolution at which demand is projected and dispatched
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    DeserializeLabeledStringEnum,
    SerializeLabeledStringEnum,
)]
pub enum DemandResolution {
    /// Each hour of a representative day, repeated for every day of the year
    #[default]
    #[string = "hourly"]
    Hourly,
    /// A single value for the whole year
    #[string = "annual"]
    Annual,
}

impl DemandResolution {
    /// The number of time slots in a year's demand profile
    pub fn num_slots(self) -> usize {
        match self {
            Self::Hourly => HOURS_PER_DAY,
            Self::Annual => 1,
        }
    }
}

/// Demand for a single region and year, as a series of time slots of equal length
#[derive(Debug, Clone, PartialEq)]
pub struct DemandProfile {
    slots: Vec<Power>,
    slot_hours: Hours,
}

impl DemandProfile {
    /// Create a profile for the 24 hours of a representative day
    pub fn hourly(slots: Vec<Power>) -> Self {
        assert_eq!(slots.len(), HOURS_PER_DAY, "Hourly profile must have 24 slots");
        Self {
            slots,
            slot_hours: Hours(DAYS_PER_YEAR),
        }
    }

    /// Create a profile with a single value for the whole year
    pub fn annual(demand: Power) -> Self {
        Self {
            slots: vec![demand],
            slot_hours: HOURS_PER_YEAR,
        }
    }

    /// Demand in each time slot
    pub fn slots(&self) -> &[Power] {
        &self.slots
    }

    /// The number of time slots
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether there are no time slots (never true for a valid profile)
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The number of hours in the year each time slot represents
    pub fn slot_hours(&self) -> Hours {
        self.slot_hours
    }

    /// Mean demand over the year
    pub fn mean(&self) -> Power {
        self.slots.iter().copied().sum::<Power>() / Dimensionless(self.slots.len() as f64)
    }

    /// Total energy demanded over the year
    pub fn annual_energy(&self) -> Energy {
        self.slots.iter().map(|demand| *demand * self.slot_hours).sum()
    }

    /// Summary statistics for this profile
    pub fn statistics(&self) -> DemandStatistics {
        let mean = self.mean();
        let peak = self
            .slots
            .iter()
            .copied()
            .fold(Power(f64::NEG_INFINITY), Power::max);
        let min = self
            .slots
            .iter()
            .copied()
            .fold(Power(f64::INFINITY), Power::min);
        let annual_energy = self.annual_energy();

        DemandStatistics {
            mean_mw: mean,
            peak_mw: peak,
            min_mw: min,
            daily_energy_mwh: annual_energy / Dimensionless(DAYS_PER_YEAR),
            annual_energy_mwh: annual_energy,
            load_factor: mean / peak,
        }
    }
}

/// Summary statistics of a region's demand in one year
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DemandStatistics {
    /// Mean demand
    pub mean_mw: Power,
    /// Highest demand in any time slot
    pub peak_mw: Power,
    /// Lowest demand in any time slot
    pub min_mw: Power,
    /// Energy demanded on an average day
    pub daily_energy_mwh: Energy,
    /// Energy demanded over the year
    pub annual_energy_mwh: Energy,
    /// Ratio of mean to peak demand
    pub load_factor: Dimensionless,
}

impl DemandStatistics {
    /// Ratio of peak to mean demand
    pub fn peak_to_average(&self) -> Dimensionless {
        self.peak_mw / self.mean_mw
    }
}

/// Projects demand for regions over time
#[derive(Debug, Clone)]
pub struct DemandModel {
    growth_rate: Dimensionless,
    start_year: u32,
    resolution: DemandResolution,
    seeds: SeedSequence,
}

impl DemandModel {
    /// Create a new [`DemandModel`].
    ///
    /// # Arguments
    ///
    /// * `growth_rate` - Compound annual growth rate of demand (must be greater than -1)
    /// * `start_year` - The year in which demand equals the regions' baselines
    /// * `resolution` - Time resolution of projected profiles
    /// * `seeds` - Source of randomness for demand variation
    pub fn new(
        growth_rate: Dimensionless,
        start_year: u32,
        resolution: DemandResolution,
        seeds: SeedSequence,
    ) -> EngineResult<Self> {
        ensure_valid!(
            growth_rate.is_finite() && growth_rate > Dimensionless(-1.0),
            "demand growth rate",
            "must be greater than -1, got {growth_rate}"
        );

        Ok(Self {
            growth_rate,
            start_year,
            resolution,
            seeds,
        })
    }

    /// The time resolution of projected profiles
    pub fn resolution(&self) -> DemandResolution {
        self.resolution
    }

    /// Mean demand for the region in the given year before any shaping or variation
    pub fn trend(&self, region: &Region, year: u32) -> Power {
        let years = i64::from(year) - i64::from(self.start_year);
        let years = i32::try_from(years).unwrap_or(if years < 0 { i32::MIN } else { i32::MAX });
        region.baseline_demand_mw * (Dimensionless(1.0) + self.growth_rate).powi(years)
    }

    /// Demand in each hour of the representative day for the given region and year
    pub fn hourly_demand(&self, region: &Region, year: u32) -> EngineResult<Vec<Power>> {
        region.validate()?;
        let trend = self.trend(region, year);
        let multipliers = self.multipliers(region, year);

        Ok(multipliers.into_iter().map(|m| trend * m).collect())
    }

    /// Project the region's demand profile for the given year at the model's resolution.
    ///
    /// At annual resolution the profile contains the mean of the hourly demand.
    pub fn profile(&self, region: &Region, year: u32) -> EngineResult<DemandProfile> {
        let hourly = DemandProfile::hourly(self.hourly_demand(region, year)?);
        Ok(match self.resolution {
            DemandResolution::Hourly => hourly,
            DemandResolution::Annual => DemandProfile::annual(hourly.mean()),
        })
    }

    /// Projected demand for the region in the given year.
    ///
    /// If `hour` is given, returns demand in that hour of the representative day; otherwise
    /// returns mean demand over the year.
    pub fn project(&self, region: &Region, year: u32, hour: Option<usize>) -> EngineResult<Power> {
        let hourly = self.hourly_demand(region, year)?;
        match hour {
            None => Ok(DemandProfile::hourly(hourly).mean()),
            Some(hour) => hourly.get(hour).copied().ok_or_else(|| {
                ScenarioError::invalid(
                    &region.id,
                    format!("hour must be less than {HOURS_PER_DAY}, got {hour}"),
                )
            }),
        }
    }

    /// Shape multipliers for each hour of the day, including random variation
    fn multipliers(&self, region: &Region, year: u32) -> Vec<Dimensionless> {
        let shape = region.load_shape;
        let sd = region.demand_variation.value();
        let base = (0..HOURS_PER_DAY).map(|hour| shape.multiplier(hour));

        // No variation means no random draws
        if sd == 0.0 {
            return base.collect();
        }

        let mut rng = self.seeds.rng(year, &["demand", &region.id.0]);
        base
            .enumerate()
            .map(|(hour, multiplier)| {
                let scale = shape.variation_scale(hour);
                let limit = MAX_DEVIATIONS * sd * scale;
                let z: f64 = StandardNormal.sample(&mut rng);
                let noise = (z * sd * scale).clamp(-limit, limit);
                apply_floor(shape, multiplier + Dimensionless(noise))
            })
            .collect()
    }
}

/// Don't let random variation push demand below the load shape's floor
fn apply_floor(shape: LoadShape, multiplier: Dimensionless) -> Dimensionless {
    let floor = shape.min_multiplier();
    if multiplier < floor { floor } else { multiplier }
}

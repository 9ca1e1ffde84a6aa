//! Accounting for emissions from generation and checking them against carbon targets.
use crate::error::{EngineResult, ScenarioError, ensure_valid};
use crate::technology::{TechnologyID, TechnologyMap};
use crate::units::{Dimensionless, EmissionFactor, Emissions, Energy};
use indexmap::IndexMap;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Emissions and related metrics for a quantity of generation
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EmissionsAccount {
    /// Total energy generated
    pub energy_mwh: Energy,
    /// Total emissions (tonnes CO2)
    pub emissions: Emissions,
    /// Emissions per unit of generation (kg CO2/MWh)
    pub carbon_intensity: EmissionFactor,
    /// Fraction of generation from renewable technologies
    pub renewable_share: Dimensionless,
}

/// Calculate emissions for the given energy generated by each technology.
///
/// If no energy is generated, carbon intensity and renewable share are both zero.
pub fn account<'a, I>(generation: I, technologies: &TechnologyMap) -> EngineResult<EmissionsAccount>
where
    I: IntoIterator<Item = (&'a TechnologyID, Energy)>,
{
    let mut energy = Energy(0.0);
    let mut renewable = Energy(0.0);
    let mut emissions = Emissions(0.0);
    for (id, output) in generation {
        let technology = technologies
            .get(id)
            .ok_or_else(|| ScenarioError::invalid(id, "unknown technology"))?;
        energy += output;
        emissions += technology.emission_factor.emissions_for(output);
        if technology.kind.is_renewable() {
            renewable += output;
        }
    }

    if energy <= Energy(0.0) {
        return Ok(EmissionsAccount {
            emissions,
            ..Default::default()
        });
    }

    Ok(EmissionsAccount {
        energy_mwh: energy,
        emissions,
        carbon_intensity: EmissionFactor::from_totals(emissions, energy),
        renewable_share: renewable / energy,
    })
}

/// A required reduction in emissions by a given year
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Milestone {
    /// The year by which the reduction applies
    pub year: u32,
    /// Fractional reduction relative to the baseline year (between 0 and 1)
    pub reduction: Dimensionless,
}

/// Emissions reduction targets relative to a baseline year.
///
/// Targets are advisory: they are reported on but do not constrain dispatch.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "CarbonTargetRaw")]
pub struct CarbonTarget {
    baseline_year: u32,
    milestones: BTreeMap<u32, Dimensionless>,
}

/// Carbon target as it appears in a scenario file
#[derive(Deserialize)]
struct CarbonTargetRaw {
    baseline_year: u32,
    milestones: Vec<Milestone>,
}

impl TryFrom<CarbonTargetRaw> for CarbonTarget {
    type Error = ScenarioError;

    fn try_from(raw: CarbonTargetRaw) -> EngineResult<Self> {
        Self::new(raw.baseline_year, raw.milestones)
    }
}

impl CarbonTarget {
    /// Create a new [`CarbonTarget`], checking that milestones are valid
    pub fn new(baseline_year: u32, milestones: Vec<Milestone>) -> EngineResult<Self> {
        let mut map = BTreeMap::new();
        for milestone in milestones {
            ensure_valid!(
                milestone.year > baseline_year,
                "carbon target",
                "milestone year {} must be after the baseline year {baseline_year}",
                milestone.year
            );
            ensure_valid!(
                milestone.reduction.is_finite()
                    && (0.0..=1.0).contains(&milestone.reduction.value()),
                "carbon target",
                "reduction for {} must be between 0 and 1, got {}",
                milestone.year,
                milestone.reduction
            );
            ensure_valid!(
                map.insert(milestone.year, milestone.reduction).is_none(),
                "carbon target",
                "more than one milestone for year {}",
                milestone.year
            );
        }

        Ok(Self {
            baseline_year,
            milestones: map,
        })
    }

    /// The year emissions reductions are measured against
    pub fn baseline_year(&self) -> u32 {
        self.baseline_year
    }

    /// Required reduction for each milestone year
    pub fn milestones(&self) -> &BTreeMap<u32, Dimensionless> {
        &self.milestones
    }

    /// Compare emissions with each milestone.
    ///
    /// Milestones for years without emissions data are skipped. If baseline emissions are zero or
    /// negative, the achieved reduction is reported as zero and the milestone is met only if
    /// emissions have not increased.
    pub fn evaluate(&self, emissions_by_year: &IndexMap<u32, Emissions>) -> Vec<TargetCompliance> {
        let Some(&baseline) = emissions_by_year.get(&self.baseline_year) else {
            warn!(
                "No emissions for carbon target baseline year {}",
                self.baseline_year
            );
            return Vec::new();
        };

        self.milestones
            .iter()
            .filter_map(|(&year, &required)| {
                let Some(&emissions) = emissions_by_year.get(&year) else {
                    warn!("No emissions for carbon target milestone year {year}");
                    return None;
                };
                Some(compliance(year, required, baseline, emissions))
            })
            .collect()
    }
}

/// Check a single milestone
fn compliance(
    year: u32,
    required: Dimensionless,
    baseline: Emissions,
    emissions: Emissions,
) -> TargetCompliance {
    let (achieved, met) = if baseline > Emissions(0.0) {
        let achieved = Dimensionless(1.0) - emissions / baseline;
        (achieved, achieved >= required)
    } else {
        (Dimensionless(0.0), emissions <= baseline)
    };

    TargetCompliance {
        year,
        required_reduction: required,
        achieved_reduction: achieved,
        emissions,
        met,
    }
}

/// Whether a carbon target milestone was met
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetCompliance {
    /// The milestone year
    pub year: u32,
    /// Required reduction relative to the baseline year
    pub required_reduction: Dimensionless,
    /// Achieved reduction relative to the baseline year
    pub achieved_reduction: Dimensionless,
    /// Emissions in the milestone year
    pub emissions: Emissions,
    /// Whether the achieved reduction meets the requirement
    pub met: bool,
}

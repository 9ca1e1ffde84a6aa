//! Regions represent the areas whose electricity demand is projected and served.
use crate::error::{EngineResult, ensure_valid};
use crate::id::{define_id_getter, define_id_type};
use crate::units::{Dimensionless, Power};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};
use std::rc::Rc;

define_id_type! {RegionID}

/// A map of [`Region`]s, keyed by region ID
pub type RegionMap = IndexMap<RegionID, Rc<Region>>;

/// The default standard deviation of the random variation applied to hourly demand
fn default_demand_variation() -> Dimensionless {
    Dimensionless(0.05)
}

/// The characteristic shape of a region's daily load
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, DeserializeLabeledStringEnum, SerializeLabeledStringEnum,
)]
pub enum LoadShape {
    /// Flat load with small random variation around the mean
    #[string = "industrial"]
    Industrial,
    /// Morning and evening peaks with a pronounced overnight trough
    #[string = "residential"]
    Residential,
}

impl LoadShape {
    /// The deterministic multiplier applied to the trend demand in the given hour of the day
    pub fn multiplier(self, hour: usize) -> Dimensionless {
        match self {
            Self::Industrial => Dimensionless(1.0),
            Self::Residential => match hour % 24 {
                6..=9 => Dimensionless(1.4),
                17..=21 => Dimensionless(1.6),
                0..=5 | 22..=23 => Dimensionless(0.6),
                _ => Dimensionless(1.0),
            },
        }
    }

    /// Scale applied to the random variation in the given hour.
    ///
    /// Residential demand is less volatile overnight.
    pub fn variation_scale(self, hour: usize) -> f64 {
        match (self, hour % 24) {
            (Self::Residential, 0..=5 | 22..=23) => 0.5,
            _ => 1.0,
        }
    }

    /// The smallest multiplier allowed after random variation is applied
    pub fn min_multiplier(self) -> Dimensionless {
        match self {
            Self::Industrial => Dimensionless(0.8),
            Self::Residential => Dimensionless(0.4),
        }
    }
}

/// A region with a baseline demand and load shape
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Region {
    /// A unique identifier for the region (e.g. "Industrial")
    pub id: RegionID,
    /// A text description of the region
    #[serde(default)]
    pub description: String,
    /// Mean demand in the start year
    pub baseline_demand_mw: Power,
    /// Shape of the daily load
    pub load_shape: LoadShape,
    /// Standard deviation of random variation in hourly demand, as a fraction of the mean
    #[serde(default = "default_demand_variation")]
    pub demand_variation: Dimensionless,
}
define_id_getter! {Region, RegionID}

impl Region {
    /// Check that the region's parameters are valid
    pub fn validate(&self) -> EngineResult<()> {
        ensure_valid!(
            self.baseline_demand_mw.is_finite() && self.baseline_demand_mw > Power(0.0),
            &self.id,
            "baseline demand must be positive, got {}",
            self.baseline_demand_mw
        );
        ensure_valid!(
            self.demand_variation.is_finite()
                && (0.0..1.0).contains(&self.demand_variation.value()),
            &self.id,
            "demand variation must be in the range [0, 1), got {}",
            self.demand_variation
        );

        Ok(())
    }
}

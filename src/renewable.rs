//! Hourly availability of generation technologies.
//!
//! Dispatchable plant is available at its capacity factor in every hour. The availability of wind
//! and solar varies over the day according to a [`RenewableProfile`].
use crate::random::SeedSequence;
use crate::region::Region;
use crate::technology::{Technology, TechnologyKind};
use crate::units::Dimensionless;
use rand_distr::{Distribution, StandardNormal};
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};

/// Relative noise applied to synthetic wind output
const WIND_NOISE: f64 = 0.3;

/// Relative noise applied to synthetic solar output
const SOLAR_NOISE: f64 = 0.2;

/// Provides the availability of renewable technologies over the representative day.
///
/// Implementations may use measured data or synthetic generators. Values are fractions of installed
/// capacity and must lie between 0 and 1.
pub trait RenewableProfile {
    /// Availability of `technology` in each of `hours` time slots for the given region and year
    fn availability(
        &self,
        region: &Region,
        technology: &Technology,
        year: u32,
        hours: usize,
    ) -> Vec<Dimensionless>;
}

/// Renewables are available at their capacity factor in every hour
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatProfile;

impl RenewableProfile for FlatProfile {
    fn availability(
        &self,
        _region: &Region,
        technology: &Technology,
        _year: u32,
        hours: usize,
    ) -> Vec<Dimensionless> {
        vec![technology.capacity_factor; hours]
    }
}

/// Synthetic diurnal profiles with seeded noise.
///
/// Wind blows harder at night and solar output peaks at noon. Each profile is rescaled so that its
/// mean matches the technology's capacity factor where possible. Hours cannot exceed full output,
/// so a capacity factor above the fraction of hours with any output cannot be reached; the mean
/// then falls short.
#[derive(Debug, Clone, Copy)]
pub struct DiurnalProfile {
    seeds: SeedSequence,
}

impl DiurnalProfile {
    /// Create a new [`DiurnalProfile`]
    pub fn new(seeds: SeedSequence) -> Self {
        Self { seeds }
    }

    /// The unscaled shape of the profile for each hour of the day
    fn shape(&self, region: &Region, technology: &Technology, year: u32) -> Vec<f64> {
        let stream = ["renewable", &*region.id.0, &*technology.id.0];
        let mut rng = self.seeds.rng(year, &stream);
        let (noise, clamp_max) = match technology.kind {
            TechnologyKind::Wind => (WIND_NOISE, 0.8),
            TechnologyKind::Solar => (SOLAR_NOISE, 0.9),
            TechnologyKind::Dispatchable => return vec![1.0; 24],
        };

        (0..24)
            .map(|hour| {
                let base = match technology.kind {
                    TechnologyKind::Wind => {
                        if (6..18).contains(&hour) {
                            0.25
                        } else {
                            0.4
                        }
                    }
                    _ => solar_base(hour),
                };
                let z: f64 = StandardNormal.sample(&mut rng);
                let value = base * (1.0 + noise * z);
                let clamp_min = if technology.kind == TechnologyKind::Wind {
                    0.05
                } else {
                    0.0
                };
                value.clamp(clamp_min, clamp_max)
            })
            .collect()
    }
}

/// Clear-sky solar output, peaking at noon
fn solar_base(hour: usize) -> f64 {
    if !(6..=18).contains(&hour) {
        return 0.0;
    }
    let angle = 1.0 - (hour as f64 - 12.0).abs() / 6.0;
    0.8 * angle * angle
}

impl RenewableProfile for DiurnalProfile {
    fn availability(
        &self,
        region: &Region,
        technology: &Technology,
        year: u32,
        hours: usize,
    ) -> Vec<Dimensionless> {
        let cf = technology.capacity_factor;
        let shape = self.shape(region, technology, year);
        let mean = shape.iter().sum::<f64>() / shape.len() as f64;

        // The profile only applies to a representative day
        if hours != shape.len() || mean <= 0.0 || !technology.kind.is_renewable() {
            return vec![cf; hours];
        }

        scale_to_mean(&shape, cf.value())
            .into_iter()
            .map(Dimensionless)
            .collect()
    }
}

/// Scale non-negative `shape` so that its mean is `target`, with no value above 1.
///
/// Energy clipped from hours that would exceed 1 is spread over the remaining hours in proportion
/// to their shape.
fn scale_to_mean(shape: &[f64], target: f64) -> Vec<f64> {
    let mut values = vec![0.0; shape.len()];
    let mut full = vec![false; shape.len()];
    let total = target * shape.len() as f64;

    // Each pass fixes at least one more hour at full output, or finishes
    loop {
        let num_full = full.iter().filter(|&&is_full| is_full).count();
        let free_shape: f64 = shape
            .iter()
            .zip(&full)
            .filter(|(_, is_full)| !**is_full)
            .map(|(value, _)| value)
            .sum();
        if free_shape <= 0.0 {
            break;
        }

        let scale = (total - num_full as f64) / free_shape;
        let mut clipped = false;
        for ((value, &base), is_full) in values.iter_mut().zip(shape).zip(full.iter_mut()) {
            if *is_full {
                continue;
            }
            *value = base * scale;
            if *value >= 1.0 {
                *value = 1.0;
                *is_full = true;
                clipped = true;
            }
        }
        if !clipped {
            break;
        }
    }

    values
}

/// The mean of a series of availabilities, i.e. the capacity factor they achieve
pub fn mean_availability(values: &[Dimensionless]) -> Dimensionless {
    if values.is_empty() {
        return Dimensionless(0.0);
    }
    Dimensionless(values.iter().map(|v| v.value()).sum::<f64>() / values.len() as f64)
}

/// The available kinds of renewable profile
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
pub enum RenewableProfileKind {
    /// See [`FlatProfile`]
    #[string = "flat"]
    Flat,
    /// See [`DiurnalProfile`]
    #[default]
    #[string = "diurnal"]
    Diurnal,
}

impl RenewableProfileKind {
    /// Create a profile of this kind
    pub fn build(self, seeds: SeedSequence) -> Box<dyn RenewableProfile> {
        match self {
            Self::Flat => Box::new(FlatProfile),
            Self::Diurnal => Box::new(DiurnalProfile::new(seeds)),
        }
    }
}

/// Availability of a technology in each time slot.
///
/// Renewables take their availability from `profile`. Dispatchable plant is available at its
/// capacity factor throughout.
pub fn availability(
    profile: &dyn RenewableProfile,
    region: &Region,
    technology: &Technology,
    year: u32,
    hours: usize,
) -> Vec<Dimensionless> {
    if technology.kind.is_renewable() {
        profile.availability(region, technology, year, hours)
    } else {
        vec![technology.capacity_factor; hours]
    }
}

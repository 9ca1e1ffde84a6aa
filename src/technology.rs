//! Generation technologies and the capacity of each installed in every region.
use crate::error::{EngineResult, ScenarioError, ensure_valid};
use crate::id::{define_id_getter, define_id_type};
use crate::region::RegionID;
use crate::units::{
    Capacity, Dimensionless, EmissionFactor, MoneyPerCapacity, MoneyPerCapacityPerYear,
    MoneyPerEnergy,
};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};
use std::collections::BTreeMap;
use std::rc::Rc;

define_id_type! {TechnologyID}

/// A map of [`Technology`]s, keyed by technology ID
pub type TechnologyMap = IndexMap<TechnologyID, Rc<Technology>>;

/// The broad category of a technology, which determines how its availability is modelled
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, DeserializeLabeledStringEnum, SerializeLabeledStringEnum,
)]
pub enum TechnologyKind {
    /// Fuel-burning plant whose availability is constant through the day
    #[string = "dispatchable"]
    Dispatchable,
    /// Wind turbines
    #[string = "wind"]
    Wind,
    /// Solar photovoltaics
    #[string = "solar"]
    Solar,
}

impl TechnologyKind {
    /// Whether output from this kind of technology counts as renewable
    pub fn is_renewable(self) -> bool {
        matches!(self, Self::Wind | Self::Solar)
    }
}

/// A generation technology with static cost and performance parameters
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Technology {
    /// A unique identifier for the technology (e.g. "gas")
    pub id: TechnologyID,
    /// A human-readable description
    #[serde(default)]
    pub description: String,
    /// The category of technology
    pub kind: TechnologyKind,
    /// Capital cost per MW in the cost base year
    pub capex_base: MoneyPerCapacity,
    /// Fixed operation and maintenance cost per MW per year
    pub opex_fixed: MoneyPerCapacityPerYear,
    /// Variable operation and maintenance cost per MWh
    pub opex_variable: MoneyPerEnergy,
    /// Fuel cost per MWh generated
    #[serde(default)]
    pub fuel_cost: MoneyPerEnergy,
    /// Average fraction of installed capacity available over a year
    pub capacity_factor: Dimensionless,
    /// Economic lifetime used to annualise capital costs
    pub lifetime_years: u32,
    /// Fractional reduction in capital cost per year
    #[serde(default)]
    pub learning_rate: Dimensionless,
    /// Emissions per MWh generated (kg CO2/MWh)
    #[serde(default)]
    pub emission_factor: EmissionFactor,
}
define_id_getter! {Technology, TechnologyID}

impl Technology {
    /// Check that the technology's parameters are valid
    pub fn validate(&self) -> EngineResult<()> {
        let id = &self.id;
        for (name, value) in [
            ("capital cost", self.capex_base.value()),
            ("fixed operating cost", self.opex_fixed.value()),
            ("variable operating cost", self.opex_variable.value()),
            ("fuel cost", self.fuel_cost.value()),
            ("emission factor", self.emission_factor.value()),
        ] {
            ensure_valid!(
                value.is_finite() && value >= 0.0,
                id,
                "{name} must be a non-negative number, got {value}"
            );
        }
        ensure_valid!(
            self.capacity_factor.is_finite()
                && self.capacity_factor > Dimensionless(0.0)
                && self.capacity_factor <= Dimensionless(1.0),
            id,
            "capacity factor must be in the range (0, 1], got {}",
            self.capacity_factor
        );
        ensure_valid!(
            self.lifetime_years > 0,
            id,
            "lifetime must be at least one year"
        );
        ensure_valid!(
            self.learning_rate.is_finite()
                && (0.0..1.0).contains(&self.learning_rate.value()),
            id,
            "learning rate must be in the range [0, 1), got {}",
            self.learning_rate
        );

        Ok(())
    }
}

/// A single entry in the installed capacity table of a scenario file
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct InstalledCapacityEntry {
    /// The region the capacity is installed in
    pub region: RegionID,
    /// The technology installed
    pub technology: TechnologyID,
    /// The first year in which this amount of capacity is installed
    pub year: u32,
    /// Total installed capacity from this year onwards
    pub capacity_mw: Capacity,
}

/// Installed capacity for every region and technology, which changes step-wise over time.
///
/// An entry for a given year applies until the year of the next entry for the same region and
/// technology. Before the first entry, no capacity is installed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstalledCapacityMap(IndexMap<(RegionID, TechnologyID), BTreeMap<u32, Capacity>>);

impl InstalledCapacityMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the map from scenario file entries, checking them against known regions and
    /// technologies
    pub fn from_entries<'a, I, R>(
        entries: I,
        regions: &IndexMap<RegionID, R>,
        technologies: &TechnologyMap,
    ) -> EngineResult<Self>
    where
        I: IntoIterator<Item = &'a InstalledCapacityEntry>,
    {
        let mut map = Self::new();
        for entry in entries {
            ensure_valid!(
                regions.contains_key(&entry.region),
                "installed capacity",
                "unknown region {}",
                entry.region
            );
            ensure_valid!(
                technologies.contains_key(&entry.technology),
                "installed capacity",
                "unknown technology {}",
                entry.technology
            );
            map.insert(
                entry.region.clone(),
                entry.technology.clone(),
                entry.year,
                entry.capacity_mw,
            )?;
        }

        Ok(map)
    }

    /// Add the capacity installed from `year` onwards
    pub fn insert(
        &mut self,
        region: RegionID,
        technology: TechnologyID,
        year: u32,
        capacity: Capacity,
    ) -> EngineResult<()> {
        let context = format!("installed capacity of {technology} in {region}");
        ensure_valid!(
            capacity.is_finite() && capacity >= Capacity(0.0),
            &context,
            "capacity must be a non-negative number, got {capacity}"
        );

        let steps = self.0.entry((region, technology)).or_default();
        if steps.insert(year, capacity).is_some() {
            return Err(ScenarioError::invalid(
                context,
                format!("more than one entry for year {year}"),
            ));
        }

        Ok(())
    }

    /// The capacity installed in the given year
    pub fn get(&self, region: &RegionID, technology: &TechnologyID, year: u32) -> Capacity {
        self.0
            .get(&(region.clone(), technology.clone()))
            .and_then(|steps| steps.range(..=year).next_back())
            .map_or(Capacity(0.0), |(_, capacity)| *capacity)
    }

    /// Total capacity installed across all regions for the given technology and year
    pub fn total_for_technology(&self, technology: &TechnologyID, year: u32) -> Capacity {
        self.0
            .keys()
            .filter(|(_, id)| id == technology)
            .map(|(region, id)| self.get(region, id, year))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{gas, wind};
    use rstest::rstest;

    #[rstest]
    fn test_validate_ok(gas: Technology, wind: Technology) {
        assert!(gas.validate().is_ok());
        assert!(wind.validate().is_ok());
    }

    #[rstest]
    fn test_validate_negative_cost(mut gas: Technology) {
        gas.opex_variable = MoneyPerEnergy(-1.0);
        assert_eq!(
            gas.validate().unwrap_err().to_string(),
            "Invalid configuration for gas: variable operating cost must be a non-negative \
            number, got -1"
        );
    }

    #[rstest]
    #[case(0.0)]
    #[case(-0.5)]
    #[case(1.5)]
    #[case(f64::NAN)]
    fn test_validate_bad_capacity_factor(mut gas: Technology, #[case] capacity_factor: f64) {
        gas.capacity_factor = Dimensionless(capacity_factor);
        assert!(gas.validate().is_err());
    }

    #[rstest]
    fn test_validate_zero_lifetime(mut wind: Technology) {
        wind.lifetime_years = 0;
        assert!(wind.validate().is_err());
    }

    #[rstest]
    fn test_validate_bad_learning_rate(mut wind: Technology) {
        wind.learning_rate = Dimensionless(1.0);
        assert!(wind.validate().is_err());
    }

    #[derive(Debug, Deserialize)]
    struct KindRow {
        kind: TechnologyKind,
    }

    #[rstest]
    #[case("dispatchable", TechnologyKind::Dispatchable)]
    #[case("wind", TechnologyKind::Wind)]
    #[case("solar", TechnologyKind::Solar)]
    fn test_kind_from_label(#[case] label: &str, #[case] expected: TechnologyKind) {
        let row: KindRow = toml::from_str(&format!("kind = \"{label}\"")).unwrap();
        assert_eq!(row.kind, expected);
    }

    #[test]
    fn test_kind_unknown_label() {
        assert!(toml::from_str::<KindRow>("kind = \"tidal\"").is_err());
    }

    #[test]
    fn test_is_renewable() {
        assert!(!TechnologyKind::Dispatchable.is_renewable());
        assert!(TechnologyKind::Wind.is_renewable());
        assert!(TechnologyKind::Solar.is_renewable());
    }

    #[test]
    fn test_installed_capacity_step_wise() {
        let region: RegionID = "Industrial".into();
        let tech: TechnologyID = "wind".into();
        let mut map = InstalledCapacityMap::new();
        map.insert(region.clone(), tech.clone(), 2025, Capacity(50.0))
            .unwrap();
        map.insert(region.clone(), tech.clone(), 2030, Capacity(80.0))
            .unwrap();

        assert_eq!(map.get(&region, &tech, 2020), Capacity(0.0));
        assert_eq!(map.get(&region, &tech, 2025), Capacity(50.0));
        assert_eq!(map.get(&region, &tech, 2029), Capacity(50.0));
        assert_eq!(map.get(&region, &tech, 2030), Capacity(80.0));
        assert_eq!(map.get(&region, &tech, 2050), Capacity(80.0));
        assert_eq!(map.get(&region, &"solar".into(), 2030), Capacity(0.0));
    }

    #[test]
    fn test_installed_capacity_duplicate_year() {
        let mut map = InstalledCapacityMap::new();
        map.insert("A".into(), "gas".into(), 2025, Capacity(1.0))
            .unwrap();
        assert!(
            map.insert("A".into(), "gas".into(), 2025, Capacity(2.0))
                .is_err()
        );
    }

    #[test]
    fn test_installed_capacity_negative() {
        let mut map = InstalledCapacityMap::new();
        assert!(
            map.insert("A".into(), "gas".into(), 2025, Capacity(-1.0))
                .is_err()
        );
    }

    #[test]
    fn test_total_for_technology() {
        let mut map = InstalledCapacityMap::new();
        map.insert("A".into(), "gas".into(), 2025, Capacity(10.0))
            .unwrap();
        map.insert("B".into(), "gas".into(), 2025, Capacity(15.0))
            .unwrap();
        map.insert("B".into(), "wind".into(), 2025, Capacity(5.0))
            .unwrap();
        assert_eq!(
            map.total_for_technology(&"gas".into(), 2030),
            Capacity(25.0)
        );
    }
}

//! Year-dependent costs of generation technologies.
use crate::error::{EngineResult, ensure_valid};
use crate::finance::{annual_capital_cost, learning_factor, levelised_cost};
use crate::technology::Technology;
use crate::units::{
    Capacity, Dimensionless, Energy, HOURS_PER_YEAR, Money, MoneyPerCapacity,
    MoneyPerCapacityPerYear, MoneyPerEnergy,
};
use serde::{Deserialize, Serialize};

/// The costs of a technology in a particular year
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostSnapshot {
    /// Capital cost per MW after learning
    pub capex: MoneyPerCapacity,
    /// Fixed operation and maintenance cost per MW per year
    pub opex_fixed: MoneyPerCapacityPerYear,
    /// Variable operation and maintenance cost per MWh
    pub opex_variable: MoneyPerEnergy,
    /// Fuel cost per MWh
    pub fuel_cost: MoneyPerEnergy,
    /// The capacity factor used to calculate the LCOE
    pub capacity_factor: Dimensionless,
    /// Capital cost annualised over the technology's lifetime
    pub annualised_capex: MoneyPerCapacityPerYear,
    /// Levelised cost of electricity
    pub lcoe: MoneyPerEnergy,
}

impl CostSnapshot {
    /// Break down the annual cost of operating `capacity` to generate `energy`
    pub fn annual_cost(&self, capacity: Capacity, energy: Energy) -> CostBreakdown {
        CostBreakdown {
            capital: self.annualised_capex * capacity,
            fixed_operating: self.opex_fixed * capacity,
            variable_operating: self.opex_variable * energy,
            fuel: self.fuel_cost * energy,
        }
    }
}

/// Annual costs split by category
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Serialize,
    Deserialize,
    derive_more::Add,
    derive_more::AddAssign,
    derive_more::Sum,
)]
pub struct CostBreakdown {
    /// Annualised capital cost
    pub capital: Money,
    /// Fixed operation and maintenance cost
    pub fixed_operating: Money,
    /// Variable operation and maintenance cost
    pub variable_operating: Money,
    /// Fuel cost
    pub fuel: Money,
}

impl CostBreakdown {
    /// The sum of all categories
    pub fn total(&self) -> Money {
        self.capital + self.fixed_operating + self.variable_operating + self.fuel
    }
}

/// Calculates year-dependent technology costs with learning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TechnologyCostModel {
    base_year: u32,
    discount_rate: Dimensionless,
}

impl TechnologyCostModel {
    /// Create a new [`TechnologyCostModel`].
    ///
    /// # Arguments
    ///
    /// * `base_year` - The year in which capital costs equal the technologies' base values
    /// * `discount_rate` - Used to annualise capital costs
    pub fn new(base_year: u32, discount_rate: Dimensionless) -> EngineResult<Self> {
        ensure_valid!(
            discount_rate.is_finite() && (0.0..1.0).contains(&discount_rate.value()),
            "discount rate",
            "must be in the range [0, 1), got {discount_rate}"
        );

        Ok(Self {
            base_year,
            discount_rate,
        })
    }

    /// The year from which learning is applied
    pub fn base_year(&self) -> u32 {
        self.base_year
    }

    /// Discount rate used to annualise capital costs
    pub fn discount_rate(&self) -> Dimensionless {
        self.discount_rate
    }

    /// Capital cost of the technology in the given year.
    ///
    /// Capital costs fall by the technology's learning rate each year after the base year.
    pub fn capex(&self, technology: &Technology, year: u32) -> MoneyPerCapacity {
        let elapsed = i64::from(year) - i64::from(self.base_year);
        technology.capex_base * learning_factor(technology.learning_rate, elapsed)
    }

    /// Costs of the technology in the given year, using its own capacity factor
    pub fn snapshot(&self, technology: &Technology, year: u32) -> EngineResult<CostSnapshot> {
        self.snapshot_with_capacity_factor(technology, year, technology.capacity_factor)
    }

    /// Costs of the technology in the given year, using the given capacity factor.
    ///
    /// Useful where the capacity factor varies over time, as it may for wind and solar.
    pub fn snapshot_with_capacity_factor(
        &self,
        technology: &Technology,
        year: u32,
        capacity_factor: Dimensionless,
    ) -> EngineResult<CostSnapshot> {
        technology.validate()?;
        ensure_valid!(
            capacity_factor.is_finite()
                && capacity_factor > Dimensionless(0.0)
                && capacity_factor <= Dimensionless(1.0),
            &technology.id,
            "capacity factor must be in the range (0, 1], got {capacity_factor}"
        );

        let capex = self.capex(technology, year);
        let annualised_capex =
            annual_capital_cost(capex, technology.lifetime_years, self.discount_rate);
        let full_load_hours = HOURS_PER_YEAR * capacity_factor;
        let lcoe = levelised_cost(
            annualised_capex + technology.opex_fixed,
            full_load_hours,
            technology.opex_variable + technology.fuel_cost,
        );

        Ok(CostSnapshot {
            capex,
            opex_fixed: technology.opex_fixed,
            opex_variable: technology.opex_variable,
            fuel_cost: technology.fuel_cost,
            capacity_factor,
            annualised_capex,
            lcoe,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScenarioError;
    use crate::fixture::{gas, solar, wind};
    use float_cmp::assert_approx_eq;
    use rstest::{fixture, rstest};

    #[fixture]
    fn model() -> TechnologyCostModel {
        TechnologyCostModel::new(2025, Dimensionless(0.07)).unwrap()
    }

    #[rstest]
    fn test_capex_declines_with_learning(model: TechnologyCostModel, mut solar: Technology) {
        solar.capex_base = MoneyPerCapacity(1_320_000.0);
        solar.learning_rate = Dimensionless(0.08);
        assert_eq!(model.capex(&solar, 2025), MoneyPerCapacity(1_320_000.0));
        assert_approx_eq!(
            MoneyPerCapacity,
            model.capex(&solar, 2050),
            MoneyPerCapacity(1_320_000.0 * 0.124_364_286_802_295),
            epsilon = 1e-6
        );
    }

    #[rstest]
    fn test_no_learning_before_base_year(model: TechnologyCostModel, solar: Technology) {
        assert_eq!(model.capex(&solar, 2020), solar.capex_base);
    }

    #[rstest]
    fn test_capex_strictly_decreasing(
        model: TechnologyCostModel,
        mut solar: Technology,
        #[values(0.005, 0.04, 0.3)] learning_rate: f64,
    ) {
        solar.learning_rate = Dimensionless(learning_rate);
        let costs: Vec<_> = (2025..=2050).map(|year| model.capex(&solar, year)).collect();
        assert!(costs.windows(2).all(|pair| pair[1] < pair[0]));
        assert!(costs.iter().all(|&capex| capex > MoneyPerCapacity(0.0)));
    }

    #[rstest]
    fn test_capex_constant_without_learning(model: TechnologyCostModel, mut wind: Technology) {
        wind.learning_rate = Dimensionless(0.0);
        for year in 2025..=2050 {
            assert_eq!(model.capex(&wind, year), wind.capex_base);
        }
    }

    #[rstest]
    fn test_lcoe_positive(
        model: TechnologyCostModel,
        #[values(gas(), wind(), solar())] technology: Technology,
        #[values(0.01, 0.2, 0.5, 1.0)] capacity_factor: f64,
        #[values(2025, 2040, 2050)] year: u32,
    ) {
        let snapshot = model
            .snapshot_with_capacity_factor(&technology, year, Dimensionless(capacity_factor))
            .unwrap();
        assert!(snapshot.lcoe > MoneyPerEnergy(0.0));
        assert!(snapshot.lcoe.is_finite());
    }

    #[rstest]
    fn test_snapshot_lcoe(model: TechnologyCostModel, gas: Technology) {
        let snapshot = model.snapshot(&gas, 2025).unwrap();
        let annualised = annual_capital_cost(gas.capex_base, gas.lifetime_years, Dimensionless(0.07));
        let expected = (annualised.value() + gas.opex_fixed.value())
            / (8760.0 * gas.capacity_factor.value())
            + gas.opex_variable.value()
            + gas.fuel_cost.value();
        assert_approx_eq!(MoneyPerEnergy, snapshot.lcoe, MoneyPerEnergy(expected));
        assert_eq!(snapshot.capacity_factor, gas.capacity_factor);
    }

    #[rstest]
    fn test_snapshot_lower_capacity_factor_raises_lcoe(model: TechnologyCostModel, solar: Technology) {
        let high = model
            .snapshot_with_capacity_factor(&solar, 2030, Dimensionless(0.3))
            .unwrap();
        let low = model
            .snapshot_with_capacity_factor(&solar, 2030, Dimensionless(0.1))
            .unwrap();
        assert!(low.lcoe > high.lcoe);
    }

    #[rstest]
    fn test_snapshot_invalid_technology(model: TechnologyCostModel, mut gas: Technology) {
        gas.capacity_factor = Dimensionless(0.0);
        assert!(matches!(
            model.snapshot(&gas, 2025),
            Err(ScenarioError::InvalidConfiguration { .. })
        ));
    }

    #[rstest]
    fn test_annual_cost(model: TechnologyCostModel, gas: Technology) {
        let snapshot = model.snapshot(&gas, 2025).unwrap();
        let breakdown = snapshot.annual_cost(Capacity(10.0), Energy(1000.0));
        assert_approx_eq!(
            Money,
            breakdown.variable_operating,
            Money(gas.opex_variable.value() * 1000.0)
        );
        assert_approx_eq!(Money, breakdown.fuel, Money(gas.fuel_cost.value() * 1000.0));
        assert_approx_eq!(
            Money,
            breakdown.total(),
            breakdown.capital + breakdown.fixed_operating + breakdown.variable_operating + breakdown.fuel
        );
    }

    #[test]
    fn test_bad_discount_rate() {
        assert!(TechnologyCostModel::new(2025, Dimensionless(-0.1)).is_err());
        assert!(TechnologyCostModel::new(2025, Dimensionless(f64::NAN)).is_err());
    }
}

//! Battery storage used to shift surplus renewable output to other hours of the day.
use crate::cost::TechnologyCostModel;
use crate::error::{EngineResult, ensure_valid};
use crate::finance::{capital_recovery_factor, learning_factor};
use crate::units::{Dimensionless, Energy, Money, MoneyPerEnergy, Power};
use serde::{Deserialize, Serialize};

/// Parameters of the battery installed in each region
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct StorageParameters {
    /// Usable energy capacity
    pub energy_capacity_mwh: Energy,
    /// Maximum rate of charge and discharge
    pub power_mw: Power,
    /// Fraction of stored energy that is returned on discharge
    pub round_trip_efficiency: Dimensionless,
    /// Capital cost per MWh of energy capacity in the cost base year
    pub capex_base: MoneyPerEnergy,
    /// Fixed operation and maintenance cost per MWh of energy capacity per year
    #[serde(default)]
    pub opex_fixed: MoneyPerEnergy,
    /// Economic lifetime used to annualise capital costs
    pub lifetime_years: u32,
    /// Fractional reduction in capital cost per year
    #[serde(default)]
    pub learning_rate: Dimensionless,
}

impl StorageParameters {
    /// Check that the parameters are valid
    pub fn validate(&self) -> EngineResult<()> {
        ensure_valid!(
            self.energy_capacity_mwh.is_finite() && self.energy_capacity_mwh > Energy(0.0),
            "storage",
            "energy capacity must be positive, got {}",
            self.energy_capacity_mwh
        );
        ensure_valid!(
            self.power_mw.is_finite() && self.power_mw > Power(0.0),
            "storage",
            "power must be positive, got {}",
            self.power_mw
        );
        ensure_valid!(
            self.round_trip_efficiency.is_finite()
                && self.round_trip_efficiency > Dimensionless(0.0)
                && self.round_trip_efficiency <= Dimensionless(1.0),
            "storage",
            "round-trip efficiency must be in the range (0, 1], got {}",
            self.round_trip_efficiency
        );
        ensure_valid!(
            self.capex_base.is_finite()
                && self.capex_base >= MoneyPerEnergy(0.0)
                && self.opex_fixed.is_finite()
                && self.opex_fixed >= MoneyPerEnergy(0.0),
            "storage",
            "costs must be non-negative numbers"
        );
        ensure_valid!(
            self.lifetime_years > 0,
            "storage",
            "lifetime must be at least one year"
        );
        ensure_valid!(
            self.learning_rate.is_finite() && (0.0..1.0).contains(&self.learning_rate.value()),
            "storage",
            "learning rate must be in the range [0, 1), got {}",
            self.learning_rate
        );

        Ok(())
    }

    /// Annual cost of one battery in the given year, including annualised capital cost
    pub fn annual_cost(&self, cost_model: &TechnologyCostModel, year: u32) -> Money {
        let elapsed = i64::from(year) - i64::from(cost_model.base_year());
        let capex = self.capex_base * learning_factor(self.learning_rate, elapsed);
        let crf = capital_recovery_factor(self.lifetime_years, cost_model.discount_rate());

        (capex * crf + self.opex_fixed) * self.energy_capacity_mwh
    }
}

/// How a battery was operated over a year
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageOperation {
    /// Energy taken from surplus renewable output
    pub charged_mwh: Energy,
    /// Energy delivered to meet demand
    pub discharged_mwh: Energy,
    /// Energy lost in conversion
    pub losses_mwh: Energy,
    /// Energy still stored at the end of the day, which is not carried over
    pub unused_mwh: Energy,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::battery;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    fn test_validate_ok(battery: StorageParameters) {
        assert!(battery.validate().is_ok());
    }

    #[rstest]
    fn test_validate_bad_efficiency(mut battery: StorageParameters) {
        battery.round_trip_efficiency = Dimensionless(1.2);
        assert!(battery.validate().is_err());
    }

    #[rstest]
    fn test_validate_zero_power(mut battery: StorageParameters) {
        battery.power_mw = Power(0.0);
        assert!(battery.validate().is_err());
    }

    #[rstest]
    fn test_annual_cost(mut battery: StorageParameters) {
        battery.capex_base = MoneyPerEnergy(100_000.0);
        battery.opex_fixed = MoneyPerEnergy(1000.0);
        battery.lifetime_years = 10;
        battery.learning_rate = Dimensionless(0.0);
        battery.energy_capacity_mwh = Energy(10.0);
        let cost_model = TechnologyCostModel::new(2025, Dimensionless(0.0)).unwrap();

        // 100,000 / 10 years + 1000, for 10 MWh
        assert_approx_eq!(
            Money,
            battery.annual_cost(&cost_model, 2030),
            Money(110_000.0)
        );
    }
}

//! General functions related to finance.
use crate::units::{
    Dimensionless, Hours, MoneyPerCapacity, MoneyPerCapacityPerYear, MoneyPerEnergy,
};

/// Calculates the capital recovery factor (CRF) for a given lifetime and discount rate.
///
/// The CRF is used to annualise capital costs over the lifetime of an asset.
pub fn capital_recovery_factor(lifetime: u32, discount_rate: Dimensionless) -> Dimensionless {
    if lifetime == 0 {
        return Dimensionless(0.0);
    }
    if discount_rate == Dimensionless(0.0) {
        return Dimensionless(1.0) / Dimensionless(lifetime as f64);
    }
    let exponent = i32::try_from(lifetime).unwrap_or(i32::MAX);
    let factor = (Dimensionless(1.0) + discount_rate).powi(exponent);
    (discount_rate * factor) / (factor - Dimensionless(1.0))
}

/// Calculates the annual capital cost for a technology per unit of capacity
pub fn annual_capital_cost(
    capital_cost: MoneyPerCapacity,
    lifetime: u32,
    discount_rate: Dimensionless,
) -> MoneyPerCapacityPerYear {
    let crf = capital_recovery_factor(lifetime, discount_rate);
    let annual_capital_cost = capital_cost * crf;
    MoneyPerCapacityPerYear(annual_capital_cost.0) // annualised quantity, so we return it as such
}

/// Calculates the levelised cost of energy.
///
/// Annual fixed costs are spread over the full-load hours of the year (capacity factor x hours
/// per year), then per-unit costs are added.
pub fn levelised_cost(
    annual_fixed_cost: MoneyPerCapacityPerYear,
    full_load_hours: Hours,
    per_unit_cost: MoneyPerEnergy,
) -> MoneyPerEnergy {
    annual_fixed_cost / full_load_hours + per_unit_cost
}

/// The fraction of the reference cost remaining after the given number of years of learning.
///
/// This is a time-based simplification of Wright's Law: costs decline by a fixed fraction each
/// year rather than per doubling of cumulative installed capacity. No learning takes place before
/// the reference year.
pub fn learning_factor(learning_rate: Dimensionless, years_elapsed: i64) -> Dimensionless {
    if years_elapsed <= 0 {
        return Dimensionless(1.0);
    }

    // Exponents beyond i32::MAX would underflow to zero anyway
    let years = i32::try_from(years_elapsed).unwrap_or(i32::MAX);
    (Dimensionless(1.0) - learning_rate).powi(years)
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    #[case(0, 0.05, 0.0)] // Edge case: lifetime==0
    #[case(10, 0.0, 0.1)] // Other edge case: discount_rate==0
    #[case(10, 0.05, 0.129_504_574_965_456_7)]
    #[case(5, 0.03, 0.218_354_571_400_576_2)]
    #[case(25, 0.07, 0.085_810_517_220_665_6)]
    fn test_capital_recovery_factor(
        #[case] lifetime: u32,
        #[case] discount_rate: f64,
        #[case] expected: f64,
    ) {
        let result = capital_recovery_factor(lifetime, Dimensionless(discount_rate));
        assert_approx_eq!(f64, result.0, expected, epsilon = 1e-10);
    }

    #[rstest]
    #[case(1000.0, 10, 0.05, 129.504_574_965_456_7)]
    #[case(500.0, 5, 0.03, 109.177_285_700_287_98)]
    #[case(1000.0, 0, 0.05, 0.0)] // Zero lifetime
    #[case(2000.0, 20, 0.0, 100.0)] // Zero discount rate
    fn test_annual_capital_cost(
        #[case] capital_cost: f64,
        #[case] lifetime: u32,
        #[case] discount_rate: f64,
        #[case] expected: f64,
    ) {
        let expected = MoneyPerCapacityPerYear(expected);
        let result = annual_capital_cost(
            MoneyPerCapacity(capital_cost),
            lifetime,
            Dimensionless(discount_rate),
        );
        assert_approx_eq!(MoneyPerCapacityPerYear, result, expected, epsilon = 1e-8);
    }

    #[test]
    fn test_levelised_cost() {
        // 87,600 $/MW/year over 876 full-load hours is 100 $/MWh, plus 5 $/MWh
        let result = levelised_cost(
            MoneyPerCapacityPerYear(87_600.0),
            Hours(876.0),
            MoneyPerEnergy(5.0),
        );
        assert_approx_eq!(MoneyPerEnergy, result, MoneyPerEnergy(105.0));
    }

    #[rstest]
    #[case(0.08, 0, 1.0)]
    #[case(0.08, -3, 1.0)] // before the reference year
    #[case(0.0, 25, 1.0)]
    #[case(0.08, 1, 0.92)]
    #[case(0.08, 25, 0.124_364_286_802_295)]
    fn test_learning_factor(
        #[case] learning_rate: f64,
        #[case] years_elapsed: i64,
        #[case] expected: f64,
    ) {
        let result = learning_factor(Dimensionless(learning_rate), years_elapsed);
        assert_approx_eq!(f64, result.0, expected, epsilon = 1e-9);
    }
}

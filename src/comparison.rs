//! Comparing the results of two scenarios.
//!
//! The first scenario is treated as the baseline, so every delta is `alternative - baseline`.
use crate::error::{EngineResult, ScenarioError};
use crate::simulation::{AnnualResult, ScenarioResult, ScenarioSummary};
use crate::technology::TechnologyID;
use indexmap::IndexMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoEnumIterator};

/// A scenario-level metric which can be compared
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Metric {
    /// Sum of annual emissions
    CumulativeEmissions,
    /// Mean of annual renewable shares
    AverageRenewableShare,
    /// Sum of annual system costs
    CumulativeCost,
    /// Mean of annual carbon intensities
    AverageCarbonIntensity,
}

impl Metric {
    /// The value of this metric for a scenario
    pub fn value(self, summary: &ScenarioSummary) -> f64 {
        match self {
            Self::CumulativeEmissions => summary.cumulative_emissions.value(),
            Self::AverageRenewableShare => summary.average_renewable_share.value(),
            Self::CumulativeCost => summary.cumulative_cost.value(),
            Self::AverageCarbonIntensity => summary.average_carbon_intensity.value(),
        }
    }
}

/// The difference in a quantity between two scenarios
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricDelta {
    /// Value in the baseline scenario
    pub baseline_value: f64,
    /// Value in the alternative scenario
    pub alternative_value: f64,
    /// `alternative_value - baseline_value`
    pub absolute_delta: f64,
    /// The absolute delta as a percentage of the baseline value.
    ///
    /// Absent if the baseline value is zero.
    pub percent_delta: Option<f64>,
}

impl MetricDelta {
    /// Compare two values
    pub fn new(baseline_value: f64, alternative_value: f64) -> Self {
        let absolute_delta = alternative_value - baseline_value;
        let percent_delta =
            (baseline_value != 0.0).then(|| 100.0 * absolute_delta / baseline_value);

        Self {
            baseline_value,
            alternative_value,
            absolute_delta,
            percent_delta,
        }
    }
}

/// Differences between two scenarios in a single year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearDelta {
    /// The simulated year
    pub year: u32,
    /// Total mean demand (MW)
    pub demand_mw: MetricDelta,
    /// Total system cost
    pub total_cost: MetricDelta,
    /// Total emissions (tonnes CO2)
    pub emissions: MetricDelta,
    /// Carbon intensity (kg CO2/MWh)
    pub carbon_intensity: MetricDelta,
    /// Fraction of generation from renewables
    pub renewable_share: MetricDelta,
    /// Mean output of each technology (MW).
    ///
    /// A technology present in only one scenario is treated as generating nothing in the other.
    pub generation_mw: IndexMap<TechnologyID, MetricDelta>,
}

impl YearDelta {
    fn new(baseline: &AnnualResult, alternative: &AnnualResult) -> Self {
        let generation = |result: &AnnualResult, id: &TechnologyID| {
            result
                .technologies
                .get(id)
                .map_or(0.0, |t| t.generation_mw.value())
        };
        let generation_mw = baseline
            .technologies
            .keys()
            .chain(alternative.technologies.keys())
            .unique()
            .map(|id| {
                let delta = MetricDelta::new(generation(baseline, id), generation(alternative, id));
                (id.clone(), delta)
            })
            .collect();

        Self {
            year: baseline.year,
            demand_mw: MetricDelta::new(baseline.demand_mw.value(), alternative.demand_mw.value()),
            total_cost: MetricDelta::new(
                baseline.total_cost.value(),
                alternative.total_cost.value(),
            ),
            emissions: MetricDelta::new(baseline.emissions.value(), alternative.emissions.value()),
            carbon_intensity: MetricDelta::new(
                baseline.carbon_intensity.value(),
                alternative.carbon_intensity.value(),
            ),
            renewable_share: MetricDelta::new(
                baseline.renewable_share.value(),
                alternative.renewable_share.value(),
            ),
            generation_mw,
        }
    }
}

/// The computed differences between two scenarios, independent of the results themselves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonData {
    /// Name of the baseline scenario
    pub baseline: String,
    /// Name of the alternative scenario
    pub alternative: String,
    /// Differences in each scenario-level metric
    pub metrics: IndexMap<Metric, MetricDelta>,
    /// Differences in each simulated year
    pub years: Vec<YearDelta>,
}

/// A comparison of two scenario results
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonReport<'a> {
    /// The baseline scenario
    pub baseline: &'a ScenarioResult,
    /// The alternative scenario
    pub alternative: &'a ScenarioResult,
    /// The differences between them
    pub data: ComparisonData,
}

impl ComparisonReport<'_> {
    /// The difference in the given metric
    pub fn metric(&self, metric: Metric) -> &MetricDelta {
        &self.data.metrics[&metric]
    }

    /// The differences in each simulated year
    pub fn years(&self) -> &[YearDelta] {
        &self.data.years
    }
}

/// Compare two scenario results.
///
/// Both scenarios must have run to completion over the same years.
pub fn compare<'a>(
    baseline: &'a ScenarioResult,
    alternative: &'a ScenarioResult,
) -> EngineResult<ComparisonReport<'a>> {
    let incomparable = |reason: String| ScenarioError::IncomparableScenarios {
        baseline: baseline.name.clone(),
        alternative: alternative.name.clone(),
        reason,
    };

    // Only a completed run has a usable summary
    let summary = |result: &'a ScenarioResult| {
        result
            .summary
            .as_ref()
            .filter(|_| result.is_complete())
            .ok_or_else(|| incomparable(format!("scenario {} did not complete", result.name)))
    };
    let baseline_summary = summary(baseline)?;
    let alternative_summary = summary(alternative)?;

    if !baseline.iter_years().eq(alternative.iter_years()) {
        return Err(incomparable(format!(
            "simulated years differ ({} vs {})",
            baseline.iter_years().join(", "),
            alternative.iter_years().join(", ")
        )));
    }

    let metrics = Metric::iter()
        .map(|metric| {
            let delta = MetricDelta::new(
                metric.value(baseline_summary),
                metric.value(alternative_summary),
            );
            (metric, delta)
        })
        .collect();
    let years = baseline
        .years
        .iter()
        .zip(&alternative.years)
        .map(|(a, b)| YearDelta::new(a, b))
        .collect();

    Ok(ComparisonReport {
        baseline,
        alternative,
        data: ComparisonData {
            baseline: baseline.name.clone(),
            alternative: alternative.name.clone(),
            metrics,
            years,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScenarioConfig;
    use crate::fixture::{SCENARIO_TOML, scenario_config};
    use crate::simulation::{RunStatus, run_scenario};
    use float_cmp::assert_approx_eq;
    use rstest::{fixture, rstest};

    const STORAGE_TOML: &str = "
[storage]
energy_capacity_mwh = 200.0
power_mw = 50.0
round_trip_efficiency = 0.85
capex_base = 300000.0
lifetime_years = 15
";

    #[fixture]
    fn baseline(scenario_config: ScenarioConfig) -> ScenarioResult {
        run_scenario(&scenario_config).unwrap()
    }

    #[fixture]
    fn alternative() -> ScenarioResult {
        let toml = format!("{SCENARIO_TOML}{STORAGE_TOML}").replace("\"simple\"", "\"storage\"");
        let config = ScenarioConfig::from_toml_str(&toml).unwrap();
        run_scenario(&config).unwrap()
    }

    #[rstest]
    #[case(100.0, 150.0, 50.0, Some(50.0))]
    #[case(100.0, 75.0, -25.0, Some(-25.0))]
    #[case(0.0, 10.0, 10.0, None)]
    fn test_metric_delta(
        #[case] baseline: f64,
        #[case] alternative: f64,
        #[case] absolute: f64,
        #[case] percent: Option<f64>,
    ) {
        let delta = MetricDelta::new(baseline, alternative);
        assert_approx_eq!(f64, delta.absolute_delta, absolute);
        match (delta.percent_delta, percent) {
            (Some(actual), Some(expected)) => assert_approx_eq!(f64, actual, expected),
            (actual, expected) => assert_eq!(actual, expected),
        }
    }

    #[rstest]
    fn test_compare_with_itself(baseline: ScenarioResult) {
        let report = compare(&baseline, &baseline).unwrap();
        for metric in Metric::iter() {
            assert_eq!(report.metric(metric).absolute_delta, 0.0);
        }
        assert_eq!(report.years().len(), baseline.years.len());
    }

    #[rstest]
    fn test_compare_is_antisymmetric(baseline: ScenarioResult, alternative: ScenarioResult) {
        let forward = compare(&baseline, &alternative).unwrap();
        let backward = compare(&alternative, &baseline).unwrap();
        for metric in Metric::iter() {
            assert_approx_eq!(
                f64,
                forward.metric(metric).absolute_delta,
                -backward.metric(metric).absolute_delta
            );
        }
        for (f, b) in forward.years().iter().zip(backward.years()) {
            assert_approx_eq!(
                f64,
                f.total_cost.absolute_delta,
                -b.total_cost.absolute_delta
            );
            for (id, delta) in &f.generation_mw {
                assert_approx_eq!(
                    f64,
                    delta.absolute_delta,
                    -b.generation_mw[id].absolute_delta
                );
            }
        }
    }

    #[rstest]
    fn test_storage_does_not_lower_renewable_share(
        baseline: ScenarioResult,
        alternative: ScenarioResult,
    ) {
        let report = compare(&baseline, &alternative).unwrap();
        assert_eq!(report.data.baseline, "simple");
        assert_eq!(report.data.alternative, "storage");
        for year in report.years() {
            assert!(year.renewable_share.absolute_delta >= -1e-12);
        }

        // Battery costs are added to the system cost
        assert!(report.metric(Metric::CumulativeCost).absolute_delta > 0.0);
    }

    #[rstest]
    fn test_compare_incomplete(baseline: ScenarioResult) {
        let mut failed = baseline.clone();
        failed.name = "failed".into();
        failed.status = RunStatus::Failed {
            year: 2030,
            message: "oops".into(),
        };
        failed.years.truncate(1);
        failed.summary = None;

        let err = compare(&baseline, &failed).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Scenarios simple and failed cannot be compared: scenario failed did not complete"
        );
    }

    #[rstest]
    fn test_compare_requires_completed_status(baseline: ScenarioResult) {
        // The summary is kept but the run is marked as cancelled
        let mut cancelled = baseline.clone();
        cancelled.name = "cancelled".into();
        cancelled.status = RunStatus::Cancelled { year: 2035 };
        assert!(cancelled.summary.is_some());

        let err = compare(&cancelled, &baseline).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Scenarios cancelled and simple cannot be compared: scenario cancelled did not complete"
        );
    }

    #[rstest]
    fn test_compare_different_years(baseline: ScenarioResult) {
        let mut shorter = baseline.clone();
        shorter.years.pop();
        assert!(matches!(
            compare(&baseline, &shorter),
            Err(ScenarioError::IncomparableScenarios { .. })
        ));
    }
}

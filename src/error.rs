//! Errors raised by the scenario engine.
use thiserror::Error;

/// Error type for failures in the scenario engine.
///
/// None of these are retried: every input is deterministic given a seed, so running again with the
/// same configuration reproduces the same failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScenarioError {
    /// Static parameters are invalid (e.g. negative costs or non-positive capacity factor)
    #[error("Invalid configuration for {context}: {message}")]
    InvalidConfiguration {
        /// What the bad parameter belongs to (e.g. a technology or region ID)
        context: String,
        /// Description of the problem
        message: String,
    },
    /// Available capacity cannot meet demand in a given year
    #[error(
        "Demand of {demand_mw:.3} MW cannot be met in region {region}, year {year}, hour {hour}: \
        only {available_mw:.3} MW available"
    )]
    InfeasibleDemand {
        /// The simulated year
        year: u32,
        /// The region whose demand could not be met
        region: String,
        /// The hour of the representative day (0 if demand is annual)
        hour: usize,
        /// The demand to be served
        demand_mw: f64,
        /// The total output available across all technologies
        available_mw: f64,
    },
    /// Two scenario results cannot be compared
    #[error("Scenarios {baseline} and {alternative} cannot be compared: {reason}")]
    IncomparableScenarios {
        /// Name of the baseline scenario
        baseline: String,
        /// Name of the alternative scenario
        alternative: String,
        /// Why they cannot be compared
        reason: String,
    },
}

impl ScenarioError {
    /// Create a new [`ScenarioError::InvalidConfiguration`]
    pub fn invalid(context: impl std::fmt::Display, message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            context: context.to_string(),
            message: message.into(),
        }
    }
}

/// Convenience type for `Result<T, ScenarioError>`.
pub type EngineResult<T> = Result<T, ScenarioError>;

/// Check a condition, returning an [`ScenarioError::InvalidConfiguration`] if it doesn't hold
macro_rules! ensure_valid {
    ($cond:expr, $context:expr, $($arg:tt)+) => {
        if !$cond {
            return Err($crate::error::ScenarioError::invalid($context, format!($($arg)+)));
        }
    };
}
pub(crate) use ensure_valid;

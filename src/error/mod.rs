//! Error types for model construction, dosing, integration and comparison

use diffsol::error::DiffsolError;
use thiserror::Error;

/// Invalid model, protocol, grid or solver parameters.
///
/// Raised when a value is constructed or appended, never deferred to
/// integration time.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    /// A parameter that must be strictly positive was not
    #[error("Invalid parameter: {param} = {value} (must be > 0)")]
    NonPositive { param: String, value: f64 },

    /// A parameter that must be non-negative was negative
    #[error("Invalid parameter: {param} = {value} (must be >= 0)")]
    Negative { param: String, value: f64 },

    /// A parameter was NaN or infinite
    #[error("Invalid parameter: {param} = {value} (must be finite)")]
    NonFinite { param: String, value: f64 },

    /// The route of administration is not one of the supported values
    #[error("Unknown route of administration '{0}', expected 'iv' or 'subcutaneous'")]
    UnknownRoute(String),

    /// The requested time grid cannot be integrated
    #[error("Invalid time grid: {0}")]
    InvalidTimeGrid(String),

    /// The layout selector is not one of the supported values
    #[error("Unknown layout '{0}', expected 'overlay' or 'side_by_side'")]
    UnknownLayout(String),
}

/// A dosing function evaluated outside of its domain.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Dose rates are only defined for `t >= 0`
    #[error("Dose rate requested at t = {time}, dosing is only defined for t >= 0")]
    NegativeTime { time: f64 },

    /// Dose rates are not defined at a NaN or infinite time
    #[error("Dose rate requested at non-finite time t = {time}")]
    NonFiniteTime { time: f64 },

    /// The user supplied dose function returned a value that is not a valid rate
    #[error("Dose function returned an invalid rate {rate} at t = {time}")]
    InvalidRate { time: f64, rate: f64 },
}

/// The numerical solver could not produce a trustworthy trajectory.
#[derive(Error, Debug)]
pub enum IntegrationError {
    /// The adaptive step collapsed
    #[error("The step size of the ODE solver went to zero at t = {time}, check for parameters close to 0.0 or infinite")]
    StepSizeTooSmall { time: f64 },

    /// More internal steps than allowed by the solver settings
    #[error("Exceeded the budget of {max_steps} internal steps at t = {time}")]
    StepBudgetExceeded { max_steps: usize, time: f64 },

    /// Integration ran longer than allowed by the solver settings
    #[error("Exceeded the time budget of {budget:.3}s at t = {time}")]
    TimeBudgetExceeded { budget: f64, time: f64 },

    /// A state entry became NaN or infinite
    #[error("Non-finite amount in state entry {index} at t = {time}")]
    NonFiniteState { index: usize, time: f64 },

    /// Any other failure reported by the solver
    #[error(transparent)]
    Solver(#[from] DiffsolError),
}

/// Runs cannot be reconciled for joint comparison.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComparisonError {
    /// There is nothing to compare
    #[error("The solution does not contain any runs")]
    Empty,

    /// The requested time lies outside of the simulated range of a run
    #[error("Run {run} covers [{start}, {end}], cannot evaluate it at t = {time}")]
    OutOfRange {
        run: usize,
        time: f64,
        start: f64,
        end: f64,
    },
}

#[derive(Error, Debug)]
pub enum PkError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Integration(#[from] IntegrationError),

    #[error(transparent)]
    Comparison(#[from] ComparisonError),

    /// Failure while reading settings
    #[error("Error in the settings: {0}")]
    Settings(#[from] config::ConfigError),

    /// A run of a batch failed, `index` is its submission position
    #[error("Run {index} ({label}) failed: {source}")]
    Run {
        index: usize,
        label: String,
        #[source]
        source: Box<PkError>,
    },
}

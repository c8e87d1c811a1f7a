//! Solver, grid and logging configuration
//!
//! Settings can be built in code or read from a TOML file. Every field has a
//! default, so a file only needs the values it changes. Environment variables
//! prefixed with `PKMODEL` override the file, using `__` to separate nesting
//! levels, e.g. `PKMODEL_SOLVER__RTOL=1e-8`.
//!
//! ```toml
//! [solver]
//! rtol = 1e-8
//! max_steps = 50000
//!
//! [grid]
//! uniform = { horizon = 24.0, samples = 241 }
//!
//! [log]
//! level = "debug"
//! ```
use config::Config as eConfig;
use serde::{Deserialize, Serialize};

use crate::data::check_positive;
use crate::error::{ConfigurationError, PkError};
use crate::simulator::TimeGrid;

#[derive(Debug, Deserialize, Clone, Serialize, PartialEq, Default)]
#[serde(default)]
pub struct Settings {
    pub solver: SolverSettings,
    pub grid: TimeGrid,
    pub log: LogSettings,
}

/// Tolerances and budgets of the integrator
#[derive(Debug, Deserialize, Clone, Serialize, PartialEq)]
#[serde(default)]
pub struct SolverSettings {
    /// Relative error tolerance
    pub rtol: f64,
    /// Absolute error tolerance, applied to every state entry
    pub atol: f64,
    /// Initial step size
    pub h0: f64,
    /// Maximum number of internal solver steps per run
    pub max_steps: usize,
    /// Maximum wall-clock duration of a run in seconds
    pub max_duration: Option<f64>,
}

impl Default for SolverSettings {
    fn default() -> Self {
        SolverSettings {
            rtol: 1e-6,
            atol: 1e-9,
            h0: 1e-3,
            max_steps: 100_000,
            max_duration: None,
        }
    }
}

impl SolverSettings {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        check_positive("solver.rtol", self.rtol)?;
        check_positive("solver.atol", self.atol)?;
        check_positive("solver.h0", self.h0)?;
        if self.max_steps == 0 {
            return Err(ConfigurationError::NonPositive {
                param: "solver.max_steps".to_string(),
                value: 0.0,
            });
        }
        if let Some(duration) = self.max_duration {
            check_positive("solver.max_duration", duration)?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone, Serialize, PartialEq)]
#[serde(default)]
pub struct LogSettings {
    /// Any `EnvFilter` directive, e.g. `info` or `pkmodel=debug`
    pub level: String,
    /// Optional log file, truncated on setup
    pub file: Option<String>,
    /// Also log to stdout
    pub stdout: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        LogSettings {
            level: "info".to_string(),
            file: None,
            stdout: true,
        }
    }
}

impl Settings {
    /// Read settings from a TOML file, applying `PKMODEL_` environment overrides
    pub fn from_file(path: &str) -> Result<Settings, PkError> {
        let parsed = eConfig::builder()
            .add_source(config::File::with_name(path).format(config::FileFormat::Toml))
            .add_source(
                config::Environment::with_prefix("PKMODEL")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Settings::from_config(parsed)
    }

    /// Read settings from TOML text, without environment overrides
    pub fn from_toml(text: &str) -> Result<Settings, PkError> {
        let parsed = eConfig::builder()
            .add_source(config::File::from_str(text, config::FileFormat::Toml))
            .build()?;
        Settings::from_config(parsed)
    }

    fn from_config(parsed: eConfig) -> Result<Settings, PkError> {
        let settings: Settings = parsed.try_deserialize()?;
        settings.solver.validate()?;
        settings.grid.points()?;
        Ok(settings)
    }
}

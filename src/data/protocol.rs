use std::fmt;
use std::sync::Arc;

use crate::data::check_non_negative;
use crate::error::{ConfigurationError, DomainError};

/// A user supplied dose rate function, `t -> ng/h`.
///
/// The function must be pure: the solver evaluates it out of order when an
/// adaptive step is rejected and retried.
pub type DoseFn = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

/// How drug enters the system after the initial bolus
#[derive(Clone)]
pub enum Dosing {
    /// No input besides the initial bolus
    Bolus,
    /// Zero-order infusion at a constant `rate` over `[start, start + duration)`
    Infusion {
        rate: f64,
        start: f64,
        duration: f64,
    },
    /// Arbitrary time dependent dose rate
    Continuous(DoseFn),
}

impl fmt::Debug for Dosing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dosing::Bolus => write!(f, "Bolus"),
            Dosing::Infusion {
                rate,
                start,
                duration,
            } => f
                .debug_struct("Infusion")
                .field("rate", rate)
                .field("start", start)
                .field("duration", duration)
                .finish(),
            Dosing::Continuous(_) => write!(f, "Continuous(<fn>)"),
        }
    }
}

/// Represents a dosing protocol
///
/// A [Protocol] is an initial bolus `D0` (ng) delivered at `t = 0` plus a
/// [Dosing] variant describing any further input. The bolus is never part of
/// [Protocol::dose_rate]; it enters the model as an initial condition.
#[derive(Clone, Debug)]
pub struct Protocol {
    initial_dose: f64,
    dosing: Dosing,
}

impl Protocol {
    /// A pure bolus protocol
    ///
    /// # Arguments
    ///
    /// * `initial_dose` - Amount delivered at `t = 0`, must be finite and `>= 0`
    pub fn bolus(initial_dose: f64) -> Result<Self, ConfigurationError> {
        Ok(Protocol {
            initial_dose: check_non_negative("initial_dose", initial_dose)?,
            dosing: Dosing::Bolus,
        })
    }

    /// A bolus followed by a zero-order infusion
    ///
    /// # Arguments
    ///
    /// * `initial_dose` - Amount delivered at `t = 0`
    /// * `rate` - Infusion rate while the infusion is running
    /// * `start` - Start time of the infusion
    /// * `duration` - Length of the infusion, may be `f64::INFINITY`
    pub fn infusion(
        initial_dose: f64,
        rate: f64,
        start: f64,
        duration: f64,
    ) -> Result<Self, ConfigurationError> {
        let initial_dose = check_non_negative("initial_dose", initial_dose)?;
        let rate = check_non_negative("infusion.rate", rate)?;
        let start = check_non_negative("infusion.start", start)?;
        if duration.is_nan() || duration <= 0.0 {
            return Err(ConfigurationError::NonPositive {
                param: "infusion.duration".to_string(),
                value: duration,
            });
        }
        Ok(Protocol {
            initial_dose,
            dosing: Dosing::Infusion {
                rate,
                start,
                duration,
            },
        })
    }

    /// A bolus followed by an arbitrary dose rate function
    pub fn continuous<F>(initial_dose: f64, dose_fn: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        Ok(Protocol {
            initial_dose: check_non_negative("initial_dose", initial_dose)?,
            dosing: Dosing::Continuous(Arc::new(dose_fn)),
        })
    }

    /// Get the amount delivered at `t = 0`
    pub fn initial_dose(&self) -> f64 {
        self.initial_dose
    }

    /// Get the dosing variant
    pub fn dosing(&self) -> &Dosing {
        &self.dosing
    }

    /// Instantaneous dose rate at time `t`
    ///
    /// Times must be finite and `>= 0` ([DomainError::NonFiniteTime],
    /// [DomainError::NegativeTime]). A user function returning a negative or
    /// non-finite value fails with [DomainError::InvalidRate].
    pub fn dose_rate(&self, t: f64) -> Result<f64, DomainError> {
        if !t.is_finite() {
            return Err(DomainError::NonFiniteTime { time: t });
        }
        if t < 0.0 {
            return Err(DomainError::NegativeTime { time: t });
        }
        match &self.dosing {
            Dosing::Bolus => Ok(0.0),
            Dosing::Infusion {
                rate,
                start,
                duration,
            } => {
                if t >= *start && t < start + duration {
                    Ok(*rate)
                } else {
                    Ok(0.0)
                }
            }
            Dosing::Continuous(dose_fn) => {
                let rate = dose_fn(t);
                if rate.is_finite() && rate >= 0.0 {
                    Ok(rate)
                } else {
                    Err(DomainError::InvalidRate { time: t, rate })
                }
            }
        }
    }

    /// Rate held from `t` up to the next breakpoint
    ///
    /// `None` if the rate varies continuously and has to be evaluated at every
    /// time point.
    pub fn rate_until_next_breakpoint(&self, t: f64) -> Result<Option<f64>, DomainError> {
        match &self.dosing {
            Dosing::Bolus | Dosing::Infusion { .. } => self.dose_rate(t).map(Some),
            Dosing::Continuous(_) => Ok(None),
        }
    }

    /// Times at which the dose rate is discontinuous
    ///
    /// The driver restarts the solver at these points so that no step
    /// straddles a jump in the input.
    pub fn breakpoints(&self) -> Vec<f64> {
        match &self.dosing {
            Dosing::Infusion {
                start, duration, ..
            } => {
                let end = start + duration;
                if end.is_finite() {
                    vec![*start, end]
                } else {
                    vec![*start]
                }
            }
            _ => Vec::new(),
        }
    }
}

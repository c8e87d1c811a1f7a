//! Compartment models and dosing protocols
pub mod compartment;
pub mod protocol;

pub use compartment::*;
pub use protocol::*;

use crate::error::ConfigurationError;

pub(crate) fn check_finite(param: &str, value: f64) -> Result<f64, ConfigurationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ConfigurationError::NonFinite {
            param: param.to_string(),
            value,
        })
    }
}

pub(crate) fn check_positive(param: &str, value: f64) -> Result<f64, ConfigurationError> {
    if check_finite(param, value)? > 0.0 {
        Ok(value)
    } else {
        Err(ConfigurationError::NonPositive {
            param: param.to_string(),
            value,
        })
    }
}

pub(crate) fn check_non_negative(param: &str, value: f64) -> Result<f64, ConfigurationError> {
    if check_finite(param, value)? >= 0.0 {
        Ok(value)
    } else {
        Err(ConfigurationError::Negative {
            param: param.to_string(),
            value,
        })
    }
}

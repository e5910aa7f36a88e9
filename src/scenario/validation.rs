//! Scenario validation helpers — reusable range and uniqueness checks.
//!
//! Purpose
//! -------
//! Centralize the small checks every scenario constructor runs so that
//! configuration errors fail fast with a structured [`ForecastError`] that
//! names the offending field.
//!
//! Conventions
//! -----------
//! - `field` arguments are dotted paths such as `"Basic.churn"` or
//!   `"Sales.sales.monthly_quota"`; they only appear in error messages.
//! - Helpers return the validated value so constructors can chain them.
//! - This module contains no logging.
use std::collections::HashSet;

use crate::errors::{ForecastError, ForecastResult};

/// Tolerance for the lead-fraction sum.
pub const LEAD_FRACTION_TOLERANCE: f64 = 1e-9;

/// Validate a probability-like value in `[0, 1]`.
///
/// Errors
/// ------
/// - [`ForecastError::InvalidParameter`] if `value` is NaN or outside `[0, 1]`.
pub fn validate_fraction(field: &str, value: f64) -> ForecastResult<f64> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ForecastError::InvalidParameter {
            field: field.to_string(),
            value,
            reason: "must be within [0, 1]",
        });
    }
    Ok(value)
}

/// Validate a finite, non-negative value.
///
/// Errors
/// ------
/// - [`ForecastError::InvalidParameter`] for NaN, ±∞, or negative input.
pub fn validate_non_negative(field: &str, value: f64) -> ForecastResult<f64> {
    if !value.is_finite() {
        return Err(ForecastError::InvalidParameter {
            field: field.to_string(),
            value,
            reason: "must be finite",
        });
    }
    if value < 0.0 {
        return Err(ForecastError::InvalidParameter {
            field: field.to_string(),
            value,
            reason: "must be >= 0",
        });
    }
    Ok(value)
}

/// Validate a finite, strictly positive value.
///
/// Errors
/// ------
/// - [`ForecastError::InvalidParameter`] for NaN, ±∞, zero, or negative input.
pub fn validate_positive(field: &str, value: f64) -> ForecastResult<f64> {
    validate_non_negative(field, value)?;
    if value == 0.0 {
        return Err(ForecastError::InvalidParameter {
            field: field.to_string(),
            value,
            reason: "must be > 0",
        });
    }
    Ok(value)
}

/// Validate that every name yielded by `names` is distinct.
///
/// Errors
/// ------
/// - [`ForecastError::DuplicateName`] naming the first repeated entry.
pub fn validate_unique_names<'a>(
    kind: &'static str, names: impl IntoIterator<Item = &'a str>,
) -> ForecastResult<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(ForecastError::DuplicateName { kind, name: name.to_string() });
        }
    }
    Ok(())
}

/// Validate that lead fractions sum to one.
///
/// Errors
/// ------
/// - [`ForecastError::LeadFractionSum`] if `|Σ fractions − 1| > 1e-9`.
pub fn validate_lead_fractions(fractions: impl IntoIterator<Item = f64>) -> ForecastResult<()> {
    let sum: f64 = fractions.into_iter().sum();
    if (sum - 1.0).abs() > LEAD_FRACTION_TOLERANCE {
        return Err(ForecastError::LeadFractionSum { sum });
    }
    Ok(())
}

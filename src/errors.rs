//! Errors for the forecasting stack (configuration validation, predictor
//! dispatch, actuals lookups, and recursion guards).
//!
//! This module defines the crate-wide error type, [`ForecastError`], and the
//! [`ForecastResult`] alias used by every layer from calendar arithmetic up to
//! the forecast driver. It implements `Display`/`Error` and converts to
//! `PyErr` when the `python-bindings` feature is enabled.
//!
//! ## Conventions
//! - Configuration errors are raised at construction time (`Scenario::new`,
//!   `Actuals::new`, `Month::new`, `UFloat::new`) and never silently clamped.
//! - Predictor dispatch errors (`UnknownPredictor`, `MissingState`,
//!   `MissingStartDate`) indicate programming errors in the caller; they are
//!   deterministic and never retried.
//! - `CircularDependency` is returned when a memoized query re-enters itself,
//!   which only happens when a state-dependent predictor feeds back into the
//!   quantity it depends on.
#[cfg(feature = "python-bindings")]
use pyo3::{PyErr, exceptions::PyValueError};

use crate::predicting::registry::PredictorCategory;

/// Crate-wide result alias for operations that may produce [`ForecastError`].
pub type ForecastResult<T> = Result<T, ForecastError>;

/// Unified error type for forecasting.
///
/// Covers calendar and quantity construction, scenario/actuals validation,
/// predictor registry failures, and recursion guards.
#[derive(Debug, Clone, PartialEq)]
pub enum ForecastError {
    // ---- Calendar / quantities ----
    /// Month number outside 1..=12.
    InvalidMonth { year: i32, month: u32 },

    /// A date computation left chrono's representable range.
    DateOutOfRange { year: i32, month: u32 },

    /// Uncertain quantity with a negative or non-finite component, or an
    /// unparseable textual form.
    InvalidUncertainty { input: String, reason: &'static str },

    // ---- Scenario / actuals validation ----
    /// A numeric configuration field is out of range.
    InvalidParameter { field: String, value: f64, reason: &'static str },

    /// Customer-type lead fractions must sum to exactly 1.
    LeadFractionSum { sum: f64 },

    /// Two customer types, roles, or funnel stages share a name.
    DuplicateName { kind: &'static str, name: String },

    /// A scenario needs at least one customer type.
    EmptyScenario,

    /// An `OtherSpend` entry carries neither an annual nor a monthly amount,
    /// or two amounts that disagree.
    InvalidOtherSpend { name: String },

    /// A JSON document failed to parse into the expected shape.
    Document { message: String },

    // ---- Predictor registry ----
    /// No predictor registered under `(category, name)`.
    UnknownPredictor { category: PredictorCategory, name: String },

    /// A predictor was registered twice under the same key.
    DuplicatePredictor { category: PredictorCategory, name: String },

    /// A state-dependent predictor was called without a company state.
    MissingState { name: String },

    /// A usage predictor was called without a cohort start date.
    MissingStartDate { name: String },

    /// The parameter set handed to a predictor belongs to another predictor.
    PredictorParamsMismatch { category: PredictorCategory, name: String },

    // ---- Engine lookups / recursion ----
    /// Customer type is absent from the scenario or from the actuals.
    UnknownCustomerType { name: String },

    /// Role is absent from the scenario.
    UnknownRole { name: String },

    /// Funnel stage is absent from the customer type's lead configuration.
    UnknownFunnelStage { customer_type: String, stage: String },

    /// A memoized query re-entered itself while being computed.
    CircularDependency { query: String },
}

impl std::error::Error for ForecastError {}

impl std::fmt::Display for ForecastError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Calendar / quantities ----
            ForecastError::InvalidMonth { year, month } => {
                write!(f, "Month must be within 1..=12; got {month} (year {year}).")
            }
            ForecastError::DateOutOfRange { year, month } => {
                write!(f, "Date for {year}-{month:02} is outside the representable range.")
            }
            ForecastError::InvalidUncertainty { input, reason } => {
                write!(f, "Invalid uncertain quantity '{input}': {reason}")
            }
            // ---- Scenario / actuals validation ----
            ForecastError::InvalidParameter { field, value, reason } => {
                write!(f, "Invalid value for {field}: {value}. {reason}")
            }
            ForecastError::LeadFractionSum { sum } => {
                write!(f, "Customer type lead fractions must add to 1, not {sum}")
            }
            ForecastError::DuplicateName { kind, name } => {
                write!(f, "Duplicate {kind} name: '{name}'")
            }
            ForecastError::EmptyScenario => {
                write!(f, "Scenario must define at least one customer type.")
            }
            ForecastError::InvalidOtherSpend { name } => {
                write!(
                    f,
                    "Spend '{name}' must provide 'annual' or 'monthly' \
                     (and both must agree if both are given)."
                )
            }
            ForecastError::Document { message } => {
                write!(f, "Failed to read document: {message}")
            }
            // ---- Predictor registry ----
            ForecastError::UnknownPredictor { category, name } => {
                write!(f, "No matching predictor: {category} | {name}")
            }
            ForecastError::DuplicatePredictor { category, name } => {
                write!(f, "Predictor already registered: {category} | {name}")
            }
            ForecastError::MissingState { name } => {
                write!(f, "State not passed for state dependent prediction '{name}'")
            }
            ForecastError::MissingStartDate { name } => {
                write!(f, "Start date not passed for usage predictor '{name}'")
            }
            ForecastError::PredictorParamsMismatch { category, name } => {
                write!(f, "Parameters do not match predictor {category} | {name}")
            }
            // ---- Engine lookups / recursion ----
            ForecastError::UnknownCustomerType { name } => {
                write!(f, "Unknown customer type: '{name}'")
            }
            ForecastError::UnknownRole { name } => {
                write!(f, "Unknown role: '{name}'")
            }
            ForecastError::UnknownFunnelStage { customer_type, stage } => {
                write!(f, "Unknown funnel stage '{stage}' for customer type '{customer_type}'")
            }
            ForecastError::CircularDependency { query } => {
                write!(f, "Circular dependency while computing {query}")
            }
        }
    }
}

impl From<serde_json::Error> for ForecastError {
    fn from(err: serde_json::Error) -> ForecastError {
        ForecastError::Document { message: err.to_string() }
    }
}

/// Convert a [`ForecastError`] into a Python `ValueError` with the error message.
#[cfg(feature = "python-bindings")]
impl std::convert::From<ForecastError> for PyErr {
    fn from(err: ForecastError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

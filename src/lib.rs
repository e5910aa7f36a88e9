//! saas_forecast — recursive SaaS financial forecasting with propagated uncertainty.
//!
//! Purpose
//! -------
//! Serve as the crate root for Rust callers and as the PyO3 bridge that exposes
//! the forecasting engine to Python via the `_saas_forecast` extension module.
//! A validated business model ([`scenario::Scenario`]) plus a snapshot of known
//! facts ([`scenario::Actuals`]) is turned into a month-by-month projection of
//! revenue, expenses, and cash-on-hand.
//!
//! Key behaviors
//! -------------
//! - Re-export the core modules: `calendar`, `uncertainty`, `predicting`,
//!   `scenario`, `engine`, and `errors`.
//! - Define the `ForecastTable` `#[pyclass]` and the `#[pymodule]` initializer
//!   for `_saas_forecast` when the `python-bindings` feature is enabled.
//!
//! Invariants & assumptions
//! ------------------------
//! - All forecasting work is implemented in the inner Rust modules; this file
//!   performs only FFI glue and error mapping.
//! - Every quantity that carries money or usage is a
//!   [`uncertainty::UFloat`], so correlated inputs stay correlated through the
//!   whole forecast.
//!
//! Conventions
//! -----------
//! - Months are calendar months ([`calendar::Month`]); dates passed to
//!   predictors are end-of-month dates.
//! - Errors from core Rust code are propagated as [`errors::ForecastError`]
//!   and converted to `PyErr` values at the PyO3 boundary.
//!
//! Downstream usage
//! ----------------
//! - Native Rust code builds an [`engine::Forecaster`] over borrowed inputs and
//!   calls [`engine::Forecaster::forecast`].
//! - Python callers use `_saas_forecast.forecast(scenario_json, actuals_json,
//!   months_ahead)` and read NumPy columns from the returned `ForecastTable`.
//!
//! Testing notes
//! -------------
//! - Core behavior is covered by unit tests in the inner modules and by
//!   `tests/integration_forecast_pipeline.rs`.

pub mod calendar;
pub mod engine;
pub mod errors;
pub mod predicting;
pub mod scenario;
pub mod uncertainty;
pub mod utils;

#[cfg(feature = "python-bindings")]
use numpy::PyArray1;

#[cfg(feature = "python-bindings")]
use pyo3::prelude::*;

#[cfg(feature = "python-bindings")]
use crate::{
    engine::Forecast,
    utils::{column_to_pyarray, forecast_from_json, parse_field},
};

/// ForecastTable — Python-facing view of a finished forecast.
///
/// Purpose
/// -------
/// Hold the rows produced by [`engine::Forecaster::forecast`] and expose them
/// as NumPy columns for dataframes and charts.
///
/// Fields
/// ------
/// - `inner`: [`Forecast`]
///   The forecast rows, month 0 first.
///
/// Notes
/// -----
/// - Column names are `revenue`, `expenses`, `acquisition_expenses`,
///   `cashflow`, and `cash_on_hand`.
#[cfg(feature = "python-bindings")]
#[pyclass(module = "saas_forecast")]
pub struct ForecastTable {
    inner: Forecast,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl ForecastTable {
    fn __len__(&self) -> usize {
        self.inner.len()
    }

    /// Months as `YYYY-MM` strings.
    #[getter]
    pub fn months(&self) -> Vec<String> {
        self.inner.months().iter().map(ToString::to_string).collect()
    }

    /// End-of-month dates as ISO strings.
    #[getter]
    pub fn eom_dates(&self) -> Vec<String> {
        self.inner.rows().iter().map(|row| row.eom_date.to_string()).collect()
    }

    /// Nominal values of one column.
    pub fn column<'py>(&self, py: Python<'py>, name: &str) -> PyResult<Bound<'py, PyArray1<f64>>> {
        let field = parse_field(name)?;
        Ok(column_to_pyarray(py, self.inner.column(field)))
    }

    /// Standard deviations of one column.
    pub fn stddev<'py>(&self, py: Python<'py>, name: &str) -> PyResult<Bound<'py, PyArray1<f64>>> {
        let field = parse_field(name)?;
        Ok(column_to_pyarray(py, self.inner.stddev_column(field)))
    }

    /// Lower and upper interval bounds of one column.
    pub fn interval(&self, name: &str, confidence: f64) -> PyResult<Vec<(f64, f64)>> {
        let field = parse_field(name)?;
        let bounds = self
            .inner
            .rows()
            .iter()
            .map(|row| row.get(field).interval(confidence))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(bounds)
    }

    /// Per-customer-type nominal revenue, one list per type.
    #[getter]
    pub fn revenue_by_customer_type(&self) -> std::collections::BTreeMap<String, Vec<f64>> {
        let mut out = std::collections::BTreeMap::<String, Vec<f64>>::new();
        for row in self.inner.rows() {
            for (name, estimate) in &row.revenue_by_customer_type {
                out.entry(name.clone()).or_default().push(estimate.nominal);
            }
        }
        out
    }

    /// Rows serialized as a JSON array.
    pub fn to_json(&self) -> PyResult<String> {
        let text = serde_json::to_string(self.inner.rows()).map_err(errors::ForecastError::from)?;
        Ok(text)
    }
}

/// Forecast `months_ahead` months from a scenario and an actuals document.
///
/// Errors
/// ------
/// - `ValueError` for malformed documents, validation failures, or engine
///   errors.
#[cfg(feature = "python-bindings")]
#[pyfunction]
#[pyo3(signature = (scenario_json, actuals_json, months_ahead = 24))]
fn forecast(scenario_json: &str, actuals_json: &str, months_ahead: u32) -> PyResult<ForecastTable> {
    let inner = forecast_from_json(scenario_json, actuals_json, months_ahead)?;
    Ok(ForecastTable { inner })
}

/// _saas_forecast — PyO3 module initializer for the Python extension.
///
/// Notes
/// -----
/// - Invoked by Python when importing the compiled extension; not called
///   directly by user code.
#[cfg(feature = "python-bindings")]
#[pymodule]
fn _saas_forecast<'py>(_py: Python<'py>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    m.add_class::<ForecastTable>()?;
    m.add_function(wrap_pyfunction!(forecast, m)?)?;
    Ok(())
}

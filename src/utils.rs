//! utils — glue between JSON documents, the engine, and the Python bindings.
//!
//! Purpose
//! -------
//! Hold the small conversion helpers used by the `_saas_forecast` extension
//! module so that `lib.rs` stays a thin list of Python-facing types.
//!
//! Key behaviors
//! -------------
//! - [`forecast_from_json`] parses a scenario and an actuals document and runs
//!   a full forecast with a fresh engine.
//! - [`parse_field`] maps Python column names onto [`ForecastField`].
//! - With `python-bindings`, [`column_to_pyarray`] converts an exported column
//!   into a NumPy array owned by Python.
use crate::{
    engine::{Forecast, ForecastField, Forecaster},
    errors::{ForecastError, ForecastResult},
    scenario::{Actuals, Scenario},
};

#[cfg(feature = "python-bindings")]
use ndarray::Array1;

#[cfg(feature = "python-bindings")]
use numpy::{IntoPyArray, PyArray1};

#[cfg(feature = "python-bindings")]
use pyo3::prelude::*;

/// Parse both documents and forecast `months_ahead` months.
///
/// Errors
/// ------
/// - [`ForecastError::Document`] for malformed JSON.
/// - Any validation or engine error from the parsed inputs.
pub fn forecast_from_json(
    scenario_json: &str, actuals_json: &str, months_ahead: u32,
) -> ForecastResult<Forecast> {
    let scenario = Scenario::from_json(scenario_json)?;
    let actuals = Actuals::from_json(actuals_json)?;
    Forecaster::new(&scenario, &actuals).forecast(months_ahead)
}

/// Column name → [`ForecastField`].
pub fn parse_field(name: &str) -> ForecastResult<ForecastField> {
    ForecastField::ALL
        .into_iter()
        .find(|field| field.name() == name)
        .ok_or_else(|| ForecastError::Document {
            message: format!("unknown forecast column '{name}'"),
        })
}

#[cfg(feature = "python-bindings")]
#[inline]
pub fn column_to_pyarray<'py>(py: Python<'py>, column: Array1<f64>) -> Bound<'py, PyArray1<f64>> {
    column.into_pyarray(py)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_names_round_trip() {
        for field in ForecastField::ALL {
            assert_eq!(parse_field(field.name()).unwrap(), field);
        }
        assert!(matches!(parse_field("profit"), Err(ForecastError::Document { .. })));
    }

    #[test]
    fn malformed_documents_are_reported() {
        let err = forecast_from_json("{", "{}", 3).unwrap_err();
        assert!(matches!(err, ForecastError::Document { .. }));
    }
}

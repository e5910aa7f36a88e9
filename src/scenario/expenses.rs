//! Miscellaneous recurring spend (legal, accounting, conferences, ...).
use serde::{Deserialize, Serialize};

use crate::{
    errors::{ForecastError, ForecastResult},
    scenario::validation::validate_non_negative,
};

const PERIOD_TOLERANCE: f64 = 1e-6;

/// A flat recurring expense, known per month and per year.
///
/// Documents give `annual`, `monthly`, or both; a missing period is derived
/// (`monthly = annual / 12`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "OtherSpendDocument")]
pub struct OtherSpend {
    pub name: String,
    annual: f64,
    monthly: f64,
}

impl OtherSpend {
    /// Build from whichever periods are known.
    ///
    /// Errors
    /// ------
    /// - [`ForecastError::InvalidOtherSpend`] if neither period is given, or
    ///   both are given and `annual != 12 · monthly`.
    /// - [`ForecastError::InvalidParameter`] for negative or non-finite amounts.
    pub fn new(name: &str, annual: Option<f64>, monthly: Option<f64>) -> ForecastResult<Self> {
        let (annual, monthly) = match (annual, monthly) {
            (Some(annual), Some(monthly)) => {
                if (annual - 12.0 * monthly).abs() > PERIOD_TOLERANCE * annual.abs().max(1.0) {
                    return Err(ForecastError::InvalidOtherSpend { name: name.to_string() });
                }
                (annual, monthly)
            }
            (Some(annual), None) => (annual, annual / 12.0),
            (None, Some(monthly)) => (monthly * 12.0, monthly),
            (None, None) => return Err(ForecastError::InvalidOtherSpend { name: name.to_string() }),
        };
        validate_non_negative(&format!("{name}.annual"), annual)?;
        validate_non_negative(&format!("{name}.monthly"), monthly)?;
        Ok(OtherSpend { name: name.to_string(), annual, monthly })
    }

    pub fn annual(name: &str, annual: f64) -> ForecastResult<Self> {
        Self::new(name, Some(annual), None)
    }

    pub fn monthly(name: &str, monthly: f64) -> ForecastResult<Self> {
        Self::new(name, None, Some(monthly))
    }

    pub fn annual_amount(&self) -> f64 {
        self.annual
    }

    pub fn monthly_amount(&self) -> f64 {
        self.monthly
    }
}

#[derive(Deserialize)]
struct OtherSpendDocument {
    name: String,
    annual: Option<f64>,
    monthly: Option<f64>,
}

impl TryFrom<OtherSpendDocument> for OtherSpend {
    type Error = ForecastError;

    fn try_from(doc: OtherSpendDocument) -> ForecastResult<OtherSpend> {
        OtherSpend::new(&doc.name, doc.annual, doc.monthly)
    }
}

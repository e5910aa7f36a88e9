//! Headcount predictors — cumulative hires for a role at a date.
//!
//! Built-ins
//! ---------
//! - `constant { count }` → `count`.
//! - `linear_with_max { initial_count, hires_per_year, first_hire_date, max_hires }`
//!   → 0 before `first_hire_date`; otherwise
//!   `min(floor(initial_count · (1 + hires_per_year · days / 360)), max_hires)`.
//!   The rate scales the initial team, so `initial_count = 0` never hires.
//! - `scale_with_customers { customers_per_person }` (state-dependent)
//!   → `ceil(predicted_customers / customers_per_person)`.
//!
//! Years are 360 days long throughout, matching the usage predictors.
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    errors::{ForecastError, ForecastResult},
    predicting::registry::{
        Prediction, PredictorCall, PredictorCategory, PredictorParams, PredictorRegistry,
    },
};

/// Days per year used by the linear predictors.
pub const DAYS_PER_YEAR: f64 = 360.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConstantHeadcount {
    pub count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearWithMax {
    pub initial_count: u32,
    pub hires_per_year: f64,
    pub first_hire_date: NaiveDate,
    pub max_hires: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleWithCustomers {
    pub customers_per_person: u32,
}

/// Configured hire predictor for a role; the tag is the registry name.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum HeadcountPredictor {
    Constant(ConstantHeadcount),
    LinearWithMax(LinearWithMax),
    ScaleWithCustomers(ScaleWithCustomers),
}

impl HeadcountPredictor {
    /// Registry name of this predictor.
    pub fn name(&self) -> &'static str {
        match self {
            HeadcountPredictor::Constant(_) => "constant",
            HeadcountPredictor::LinearWithMax(_) => "linear_with_max",
            HeadcountPredictor::ScaleWithCustomers(_) => "scale_with_customers",
        }
    }

    /// Check parameter ranges.
    ///
    /// Errors
    /// ------
    /// - [`ForecastError::InvalidParameter`] for a non-finite or negative
    ///   hiring rate, or `customers_per_person == 0`.
    pub fn validate(&self, role: &str) -> ForecastResult<()> {
        match self {
            HeadcountPredictor::Constant(_) => Ok(()),
            HeadcountPredictor::LinearWithMax(p) => {
                if !p.hires_per_year.is_finite() || p.hires_per_year < 0.0 {
                    return Err(ForecastError::InvalidParameter {
                        field: format!("{role}.hire_predictor.hires_per_year"),
                        value: p.hires_per_year,
                        reason: "must be finite and >= 0",
                    });
                }
                Ok(())
            }
            HeadcountPredictor::ScaleWithCustomers(p) => {
                if p.customers_per_person == 0 {
                    return Err(ForecastError::InvalidParameter {
                        field: format!("{role}.hire_predictor.customers_per_person"),
                        value: 0.0,
                        reason: "must be > 0",
                    });
                }
                Ok(())
            }
        }
    }
}

pub(crate) fn register_builtins(registry: &mut PredictorRegistry) {
    registry.insert_builtin(PredictorCategory::Headcount, "constant", constant, false);
    registry.insert_builtin(
        PredictorCategory::Headcount,
        "linear_with_max",
        linear_with_max,
        false,
    );
    registry.insert_builtin(
        PredictorCategory::Headcount,
        "scale_with_customers",
        scale_with_customers,
        true,
    );
}

fn constant(call: &PredictorCall<'_>) -> ForecastResult<Prediction> {
    match call.params {
        PredictorParams::Headcount(HeadcountPredictor::Constant(p)) => {
            Ok(Prediction::Count(i64::from(p.count)))
        }
        _ => Err(call.params_mismatch(PredictorCategory::Headcount)),
    }
}

fn linear_with_max(call: &PredictorCall<'_>) -> ForecastResult<Prediction> {
    let PredictorParams::Headcount(HeadcountPredictor::LinearWithMax(p)) = call.params else {
        return Err(call.params_mismatch(PredictorCategory::Headcount));
    };
    if call.effective_date < p.first_hire_date {
        return Ok(Prediction::Count(0));
    }
    let days = (call.effective_date - p.first_hire_date).num_days() as f64;
    let initial = f64::from(p.initial_count);
    let hires = (initial * (1.0 + p.hires_per_year * days / DAYS_PER_YEAR)).floor();
    Ok(Prediction::Count((hires as i64).min(i64::from(p.max_hires))))
}

fn scale_with_customers(call: &PredictorCall<'_>) -> ForecastResult<Prediction> {
    let PredictorParams::Headcount(HeadcountPredictor::ScaleWithCustomers(p)) = call.params else {
        return Err(call.params_mismatch(PredictorCategory::Headcount));
    };
    let state =
        call.state.ok_or_else(|| ForecastError::MissingState { name: call.name.to_string() })?;
    let per_person = u64::from(p.customers_per_person);
    Ok(Prediction::Count(state.predicted_customer_count.div_ceil(per_person) as i64))
}

//! Usage predictors — per-customer usage at a date, given the cohort start.
//!
//! Both built-ins return zero before the cohort started. The linear predictor
//! grows `initial_usage` by `increase_per_year` (a fraction) per 360-day year
//! of customer age; both parameters are uncertain, so the returned quantity
//! stays correlated with every other value derived from them.
use serde::{Deserialize, Serialize};

use crate::{
    errors::{ForecastError, ForecastResult},
    predicting::{
        headcount::DAYS_PER_YEAR,
        registry::{
            Prediction, PredictorCall, PredictorCategory, PredictorParams, PredictorRegistry,
        },
    },
    uncertainty::UFloat,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearUsage {
    pub initial_usage: UFloat,
    pub increase_per_year: UFloat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstantUsage {
    pub initial_usage: UFloat,
}

/// Configured usage predictor for a customer type; the tag is the registry name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum UsagePredictor {
    Linear(LinearUsage),
    Constant(ConstantUsage),
}

impl UsagePredictor {
    pub fn name(&self) -> &'static str {
        match self {
            UsagePredictor::Linear(_) => "linear",
            UsagePredictor::Constant(_) => "constant",
        }
    }

    /// Reject negative initial usage.
    pub fn validate(&self, customer_type: &str) -> ForecastResult<()> {
        let initial = match self {
            UsagePredictor::Linear(p) => &p.initial_usage,
            UsagePredictor::Constant(p) => &p.initial_usage,
        };
        if initial.nominal() < 0.0 {
            return Err(ForecastError::InvalidParameter {
                field: format!("{customer_type}.usage_predictor.initial_usage"),
                value: initial.nominal(),
                reason: "must be >= 0",
            });
        }
        Ok(())
    }
}

pub(crate) fn register_builtins(registry: &mut PredictorRegistry) {
    registry.insert_builtin(PredictorCategory::Usage, "linear", linear, false);
    registry.insert_builtin(PredictorCategory::Usage, "constant", constant, false);
}

fn linear(call: &PredictorCall<'_>) -> ForecastResult<Prediction> {
    let PredictorParams::Usage(UsagePredictor::Linear(p)) = call.params else {
        return Err(call.params_mismatch(PredictorCategory::Usage));
    };
    let start = call
        .start
        .ok_or_else(|| ForecastError::MissingStartDate { name: call.name.to_string() })?;
    if call.effective_date < start {
        return Ok(Prediction::Quantity(UFloat::zero()));
    }
    let years = (call.effective_date - start).num_days() as f64 / DAYS_PER_YEAR;
    let growth = &p.increase_per_year * years + 1.0;
    Ok(Prediction::Quantity(&p.initial_usage * growth))
}

fn constant(call: &PredictorCall<'_>) -> ForecastResult<Prediction> {
    let PredictorParams::Usage(UsagePredictor::Constant(p)) = call.params else {
        return Err(call.params_mismatch(PredictorCategory::Usage));
    };
    let start = call
        .start
        .ok_or_else(|| ForecastError::MissingStartDate { name: call.name.to_string() })?;
    if call.effective_date < start {
        return Ok(Prediction::Quantity(UFloat::zero()));
    }
    Ok(Prediction::Quantity(p.initial_usage.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn usage_on(predictor: &UsagePredictor, start: NaiveDate, on: NaiveDate) -> UFloat {
        PredictorRegistry::with_builtins()
            .predict(
                PredictorCategory::Usage,
                predictor.name(),
                on,
                PredictorParams::Usage(predictor),
                Some(start),
                None,
            )
            .expect("usage prediction should succeed")
            .into_quantity()
    }

    #[test]
    // Purpose
    // -------
    // Linear usage grows proportionally to customer age in 360-day years.
    //
    // Given
    // -----
    // - initial_usage = 100 ± 10, increase_per_year = 0.5 (exact).
    //
    // Expect
    // ------
    // - 0 before start, 100 at start, 150 ± 15 after 360 days.
    fn linear_usage_grows_with_age() {
        let p = UsagePredictor::Linear(LinearUsage {
            initial_usage: UFloat::new(100.0, 10.0).unwrap(),
            increase_per_year: UFloat::exact(0.5),
        });
        let start = date(2025, 1, 31);

        let before = usage_on(&p, start, date(2024, 12, 31));
        assert_relative_eq!(before.nominal(), 0.0);
        assert!(before.is_exact());

        assert_relative_eq!(usage_on(&p, start, start).nominal(), 100.0);

        let later = usage_on(&p, start, start + chrono::Days::new(360));
        assert_relative_eq!(later.nominal(), 150.0, epsilon = 1e-9);
        assert_relative_eq!(later.std_dev(), 15.0, epsilon = 1e-9);
    }

    #[test]
    // Purpose
    // -------
    // Usage at two ages is fully correlated through `initial_usage`.
    fn usage_at_different_ages_shares_its_input() {
        let initial = UFloat::new(10.0, 1.0).unwrap();
        let p = UsagePredictor::Constant(ConstantUsage { initial_usage: initial.clone() });
        let start = date(2025, 1, 31);
        let a = usage_on(&p, start, date(2025, 2, 28));
        let b = usage_on(&p, start, date(2025, 9, 30));
        assert_relative_eq!((a + b).std_dev(), 2.0);
    }

    #[test]
    fn validate_rejects_negative_usage() {
        let p = UsagePredictor::Constant(ConstantUsage { initial_usage: UFloat::exact(-1.0) });
        assert!(p.validate("Basic").is_err());
    }

    #[test]
    fn deserializes_from_tagged_document() {
        let p: UsagePredictor = serde_json::from_str(
            r#"{"name": "linear", "initial_usage": "1000+/-100", "increase_per_year": 0.2}"#,
        )
        .unwrap();
        let UsagePredictor::Linear(linear) = p else { panic!("expected linear") };
        assert_relative_eq!(linear.initial_usage.std_dev(), 100.0);
        assert!(linear.increase_per_year.is_exact());
    }
}

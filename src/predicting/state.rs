//! PredictedCompanyState — projected company facts handed to state-dependent predictors.
//!
//! The state is built on demand by the engine for a single prediction and is
//! never cached or stored. The effective date is normalized to the end of its
//! month; a coercion is logged.
use chrono::NaiveDate;
use tracing::warn;

use crate::{
    calendar::{Month, end_of_month, is_end_of_month},
    errors::ForecastResult,
    scenario::Actuals,
};

/// Projected state of the company at an end-of-month date.
///
/// Fields
/// ------
/// - `effective_date`: end-of-month date the projection is for.
/// - `predicted_customer_count`: total predicted customers (all types).
/// - `actuals`: the ground-truth snapshot the projection started from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictedCompanyState<'a> {
    pub effective_date: NaiveDate,
    pub predicted_customer_count: u64,
    pub actuals: &'a Actuals,
}

impl<'a> PredictedCompanyState<'a> {
    /// Build a state, coercing `effective_date` to the end of its month.
    ///
    /// Errors
    /// ------
    /// - [`ForecastError::DateOutOfRange`](crate::errors::ForecastError::DateOutOfRange)
    ///   if the month end is not representable.
    pub fn new(
        effective_date: NaiveDate, predicted_customer_count: u64, actuals: &'a Actuals,
    ) -> ForecastResult<Self> {
        let effective_date = if is_end_of_month(effective_date) {
            effective_date
        } else {
            let coerced = end_of_month(effective_date)?;
            warn!(%effective_date, %coerced, "predicted state date coerced to end of month");
            coerced
        };
        Ok(Self { effective_date, predicted_customer_count, actuals })
    }

    pub fn effective_month(&self) -> Month {
        Month::from_date(self.effective_date)
    }

    /// Same state re-dated to the end of `month`.
    pub fn with_effective_month(&self, month: Month) -> ForecastResult<Self> {
        Ok(Self { effective_date: month.end_of_month()?, ..*self })
    }

    /// Same state re-dated `delta` months away.
    pub fn with_shifted_month(&self, delta: i32) -> ForecastResult<Self> {
        self.with_effective_month(self.effective_month().shift(delta))
    }
}

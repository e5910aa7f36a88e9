//! Sales capacity and the funnel-transition recursion.
//!
//! Purpose
//! -------
//! Compute how many leads enter each funnel stage, and how many customers are
//! created, in any month.
//!
//! Key behaviors
//! -------------
//! - Sales capacity: `Σ_roles monthly_quota × effective_reps`, where reps hired
//!   at least `ramp_up_months` before the month are fully effective and a rep
//!   hired `k` months ago (`0 <= k < ramp_up_months`) contributes
//!   `(k + 1) / ramp_up_months`.
//! - Entry stage (first stage, or customer creation for a funnel without
//!   stages): `round(capacity)`.
//! - Later stages and customer creation: with `D = floor(Σ durations of the
//!   previous stages)` days, `D = 30·months + days`, and `χ` the product of
//!   their conversion rates,
//!   `round(χ · (days · E(m − months − 1) + (30 − days) · E(m − months)) / 30)`
//!   where `E` is the entry-stage count.
//!
//! Invariants & assumptions
//! ------------------------
//! - Months are treated as 30 days long for stage durations.
//! - `round` is round-half-to-even for entries, transitions and hires.
//! - Every entry-stage count is memoized, so deep funnels revisit earlier
//!   months in O(1).
//! - Headcount predictions are rounded to whole hires before use.
use chrono::NaiveDate;
use tracing::debug;

use crate::{
    calendar::Month,
    engine::Forecaster,
    errors::{ForecastError, ForecastResult},
    predicting::{PredictedCompanyState, PredictorCategory, PredictorParams},
    scenario::CustomerType,
};

/// Days per month used when converting stage durations into lookbacks.
pub const DAYS_PER_FUNNEL_MONTH: i64 = 30;

/// Funnel position a transition count refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FunnelTarget {
    /// Entries into the stage at this index of the customer type's funnel.
    Stage(usize),
    /// Customer creation, after the last stage.
    Customer,
}

impl FunnelTarget {
    /// Where leads enter: the first stage, or customer creation when the
    /// funnel has no stages.
    pub fn entry(customer_type: &CustomerType) -> FunnelTarget {
        if customer_type.lead_config.stages.is_empty() {
            FunnelTarget::Customer
        } else {
            FunnelTarget::Stage(0)
        }
    }

    /// Target for a stage given by name.
    ///
    /// Errors
    /// ------
    /// - [`ForecastError::UnknownFunnelStage`] if the stage does not exist.
    pub fn stage(customer_type: &CustomerType, name: &str) -> ForecastResult<FunnelTarget> {
        Ok(FunnelTarget::Stage(customer_type.stage_index(name)?))
    }
}

impl Forecaster<'_> {
    /// Total entry-stage capacity of all sales roles in `month`.
    ///
    /// Errors
    /// ------
    /// - Propagates predictor and date errors from [`Forecaster::hires_through`].
    pub fn total_sales_quota(&self, month: Month) -> ForecastResult<f64> {
        self.caches.quota.get_or_try_insert_with(month, || {
            let mut quota = 0.0;
            for (role_idx, role) in self.scenario.roles().iter().enumerate() {
                let Some(profile) = role.sales else { continue };
                let ramp = profile.ramp_up_months;
                let ramp_months = i32::try_from(ramp).unwrap_or(i32::MAX);

                let ramped = month.shift(-ramp_months).end_of_month()?;
                let mut effective_reps = self.hires_through_idx(ramped, role_idx)? as f64;
                for months_ago in 0..ramp_months {
                    let hires = self.hires_in_month_idx(month.shift(-months_ago), role_idx)?;
                    effective_reps += hires as f64 * f64::from(months_ago + 1) / f64::from(ramp);
                }
                quota += profile.monthly_quota * effective_reps;
            }
            Ok(quota)
        })
    }

    /// Whole hires made for `role` up to and including `date`.
    ///
    /// For a state-dependent hire predictor, the state carries the predicted
    /// total customers (all types) at the month of `date`.
    ///
    /// Errors
    /// ------
    /// - [`ForecastError::UnknownRole`] for an unknown role name.
    /// - [`ForecastError::CircularDependency`] if the predicted customers
    ///   themselves depend on this role's hires at the same date.
    pub fn hires_through(&self, date: NaiveDate, role: &str) -> ForecastResult<i64> {
        self.hires_through_idx(date, self.role_index(role)?)
    }

    /// Hires made for `role` during `month`.
    pub fn hires_in_month(&self, month: Month, role: &str) -> ForecastResult<i64> {
        self.hires_in_month_idx(month, self.role_index(role)?)
    }

    pub(crate) fn hires_through_idx(
        &self, date: NaiveDate, role_idx: usize,
    ) -> ForecastResult<i64> {
        self.caches.hires.get_or_try_insert_with((date, role_idx), || {
            let role = &self.scenario.roles()[role_idx];
            let name = role.hire_predictor.name();
            let params = PredictorParams::Headcount(&role.hire_predictor);
            let category = PredictorCategory::Headcount;

            let prediction = if self.registry.is_state_dependent(category, name)? {
                let customers = self.total_customers_all(Month::from_date(date))?;
                let state = PredictedCompanyState::new(date, customers, self.actuals)?;
                self.registry.predict(category, name, date, params, None, Some(&state))?
            } else {
                self.registry.predict(category, name, date, params, None, None)?
            };
            Ok(prediction.nominal().round_ties_even() as i64)
        })
    }

    fn hires_in_month_idx(&self, month: Month, role_idx: usize) -> ForecastResult<i64> {
        let end_hires = self.hires_through_idx(month.end_of_month()?, role_idx)?;
        let start_hires = self.hires_through_idx(month.shift(-1).end_of_month()?, role_idx)?;
        let role = &self.scenario.roles()[role_idx].name;
        debug!(%month, %role, start_hires, end_hires, "hires in month");
        Ok(end_hires - start_hires)
    }

    /// Number of leads entering `target` of `customer_type`'s funnel in `month`.
    ///
    /// Parameters
    /// ----------
    /// - `month`: month of the transitions.
    /// - `target`: a stage index or [`FunnelTarget::Customer`].
    /// - `customer_type`: name of the customer type.
    ///
    /// Errors
    /// ------
    /// - [`ForecastError::UnknownCustomerType`] for an unknown type.
    /// - [`ForecastError::UnknownFunnelStage`] for a stage index past the end
    ///   of the funnel.
    pub fn new_transitions(
        &self, month: Month, target: FunnelTarget, customer_type: &str,
    ) -> ForecastResult<u64> {
        self.transitions_idx(month, target, self.scenario.customer_type_index(customer_type)?)
    }

    /// Customers created in `month`, for one type or summed over all types.
    pub fn new_customers(&self, month: Month, customer_type: Option<&str>) -> ForecastResult<u64> {
        let mut total = 0;
        for ct_idx in self.customer_type_indices(customer_type)? {
            total += self.new_customers_idx(month, ct_idx)?;
        }
        Ok(total)
    }

    pub(crate) fn new_customers_idx(&self, month: Month, ct_idx: usize) -> ForecastResult<u64> {
        self.transitions_idx(month, FunnelTarget::Customer, ct_idx)
    }

    pub(crate) fn transitions_idx(
        &self, month: Month, target: FunnelTarget, ct_idx: usize,
    ) -> ForecastResult<u64> {
        self.caches.transitions.get_or_try_insert_with((month, target, ct_idx), || {
            let customer_type = &self.scenario.customer_types()[ct_idx];
            let stages = &customer_type.lead_config.stages;

            if target == FunnelTarget::entry(customer_type) {
                return Ok(self.total_sales_quota(month)?.round_ties_even() as u64);
            }

            let previous = match target {
                FunnelTarget::Customer => &stages[..],
                FunnelTarget::Stage(idx) if idx < stages.len() => &stages[..idx],
                FunnelTarget::Stage(idx) => {
                    return Err(ForecastError::UnknownFunnelStage {
                        customer_type: customer_type.name.clone(),
                        stage: format!("#{idx}"),
                    });
                }
            };

            let total_days = previous.iter().map(|s| s.duration_days).sum::<f64>().floor() as i64;
            let months = total_days / DAYS_PER_FUNNEL_MONTH;
            let days = total_days % DAYS_PER_FUNNEL_MONTH;
            let net_conversion: f64 = previous.iter().map(|s| s.conversion_rate).product();
            let lookback = i32::try_from(months).unwrap_or(i32::MAX);

            let entry = FunnelTarget::Stage(0);
            let month_days = DAYS_PER_FUNNEL_MONTH as f64;
            let recent = self.transitions_idx(month.shift(-lookback), entry, ct_idx)?;
            let older_month = month.shift(-lookback.saturating_add(1));
            let older = self.transitions_idx(older_month, entry, ct_idx)?;
            let per_day_recent = recent as f64 / month_days;
            let per_day_older = older as f64 / month_days;

            let blended = days as f64 * per_day_older
                + (DAYS_PER_FUNNEL_MONTH - days) as f64 * per_day_recent;
            Ok((net_conversion * blended).round_ties_even() as u64)
        })
    }
}

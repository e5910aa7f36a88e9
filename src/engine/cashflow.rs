//! Monthly revenue and expenses.
//!
//! Purpose
//! -------
//! Aggregate fees, usage billing, payroll, COGS, marketing and flat spend into
//! monthly totals with propagated uncertainty.
//!
//! Key behaviors
//! -------------
//! - Revenue for a customer type in month `m` is what was billed in
//!   `m − payment_months_behind`: setup fees for that month's new customers,
//!   monthly fees for all active customers, and usage fees for every cohort at
//!   its own age.
//! - Expenses are split into marketing, payroll, COGS and misc; marketing,
//!   payroll of acquisition roles, and business-development spend also count
//!   toward the customer-acquisition subtotal.
//!
//! Conventions
//! -----------
//! - Marketing spend = `cost_per_ad_click × entry transitions /
//!   qualified_lead_to_click_ratio`.
//! - Payroll per hire = `salary / 12 × (1 + annual_percent) + annual_fixed / 12`.
//! - COGS = `cogs.monthly + cogs.per_usage × total usage` per customer type,
//!   where total usage sums per-customer usage over all active customers.
use chrono::NaiveDate;
use serde::Serialize;

use crate::{
    calendar::Month,
    engine::{Forecaster, sales::FunnelTarget},
    errors::ForecastResult,
    predicting::{PredictorCategory, PredictorParams},
    uncertainty::UFloat,
};

/// Expenses of one month.
///
/// Fields
/// ------
/// - `marketing`, `payroll`, `cogs`, `misc`: components of `total`.
/// - `customer_acquisition`: the part of `total` spent acquiring customers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpenseBreakdown {
    pub total: UFloat,
    pub customer_acquisition: UFloat,
    pub marketing: UFloat,
    pub payroll: UFloat,
    pub cogs: UFloat,
    pub misc: UFloat,
}

impl Forecaster<'_> {
    /// Revenue collected in `month`, for one customer type or all of them.
    ///
    /// Errors
    /// ------
    /// - [`ForecastError::UnknownCustomerType`](crate::errors::ForecastError::UnknownCustomerType)
    ///   for an unknown type or missing actuals.
    /// - Propagates funnel and predictor errors.
    pub fn monthly_revenue(
        &self, month: Month, customer_type: Option<&str>,
    ) -> ForecastResult<UFloat> {
        let mut revenue = UFloat::zero();
        for ct_idx in self.customer_type_indices(customer_type)? {
            revenue += self.revenue_idx(month, ct_idx)?;
        }
        Ok(revenue)
    }

    pub(crate) fn revenue_idx(&self, month: Month, ct_idx: usize) -> ForecastResult<UFloat> {
        self.caches.revenue.get_or_try_insert_with((month, ct_idx), || {
            let customer_type = &self.scenario.customer_types()[ct_idx];
            let lag = i32::try_from(customer_type.payment_months_behind).unwrap_or(i32::MAX);
            let billed = month.shift(-lag);

            let new_customers = self.new_customers_idx(billed, ct_idx)? as f64;
            let active = self.total_customers_idx(billed, ct_idx)? as f64;
            let mut revenue =
                &customer_type.setup_fee * new_customers + &customer_type.monthly_fee * active;

            for (&start, &count) in &self.cohort_step_idx(billed, ct_idx)?.cohorts {
                let usage = self.estimate_usage_idx(ct_idx, start, billed)?;
                revenue += usage * &customer_type.usage_fee * count as f64;
            }
            Ok(revenue)
        })
    }

    /// Per-customer usage in `month` for customers who joined in `start`.
    ///
    /// The usage predictor is evaluated at the end of `month` with the end of
    /// `start` as the cohort start date.
    pub fn estimate_usage(
        &self, customer_type: &str, start: Month, month: Month,
    ) -> ForecastResult<UFloat> {
        self.estimate_usage_idx(self.scenario.customer_type_index(customer_type)?, start, month)
    }

    /// Usage of all active customers of a type in `month`.
    pub fn estimate_total_usage(
        &self, month: Month, customer_type: &str,
    ) -> ForecastResult<UFloat> {
        self.total_usage_idx(month, self.scenario.customer_type_index(customer_type)?)
    }

    fn estimate_usage_idx(
        &self, ct_idx: usize, start: Month, month: Month,
    ) -> ForecastResult<UFloat> {
        let predictor = &self.scenario.customer_types()[ct_idx].usage_predictor;
        let start: NaiveDate = start.end_of_month()?;
        let prediction = self.registry.predict(
            PredictorCategory::Usage,
            predictor.name(),
            month.end_of_month()?,
            PredictorParams::Usage(predictor),
            Some(start),
            None,
        )?;
        Ok(prediction.into_quantity())
    }

    fn total_usage_idx(&self, month: Month, ct_idx: usize) -> ForecastResult<UFloat> {
        let mut usage = UFloat::zero();
        for (&start, &count) in &self.cohort_step_idx(month, ct_idx)?.cohorts {
            usage += self.estimate_usage_idx(ct_idx, start, month)? * count as f64;
        }
        Ok(usage)
    }

    /// All expenses of `month`, with the acquisition subtotal.
    ///
    /// Errors
    /// ------
    /// - Propagates funnel, headcount, and usage errors.
    pub fn monthly_expenses(&self, month: Month) -> ForecastResult<ExpenseBreakdown> {
        let scenario = self.scenario;

        let mut marketing = UFloat::zero();
        for (ct_idx, customer_type) in scenario.customer_types().iter().enumerate() {
            let entry = FunnelTarget::entry(customer_type);
            let entries = self.transitions_idx(month, entry, ct_idx)? as f64;
            let lead_config = &customer_type.lead_config;
            let clicks = entries / lead_config.qualified_lead_to_click_ratio;
            marketing += UFloat::exact(lead_config.cost_per_ad_click * clicks);
        }

        let month_end = month.end_of_month()?;
        let mut payroll = UFloat::zero();
        let mut acquisition_payroll = UFloat::zero();
        for (role_idx, role) in scenario.roles().iter().enumerate() {
            let hires = self.hires_through_idx(month_end, role_idx)? as f64;
            let cost = UFloat::exact(scenario.employee_costs().monthly_cost(role) * hires);
            if role.is_customer_acquisition() {
                acquisition_payroll += &cost;
            }
            payroll += cost;
        }

        let mut cogs = UFloat::zero();
        for (ct_idx, customer_type) in scenario.customer_types().iter().enumerate() {
            let usage = self.total_usage_idx(month, ct_idx)?;
            cogs += &customer_type.cogs.monthly + &customer_type.cogs.per_usage * usage;
        }

        let general: f64 = scenario.misc_expenses().iter().map(|e| e.monthly_amount()).sum();
        let bizdev: f64 = scenario.misc_bizdev_expenses().iter().map(|e| e.monthly_amount()).sum();
        let misc = UFloat::exact(general + bizdev);

        let total = &marketing + &payroll + &cogs + &misc;
        let customer_acquisition = &marketing + acquisition_payroll + bizdev;
        Ok(ExpenseBreakdown { total, customer_acquisition, marketing, payroll, cogs, misc })
    }
}

//! Forecast driver — walk months forward and accumulate cash.
//!
//! Purpose
//! -------
//! Produce the tabular time series handed to presentation layers: one row
//! per month with revenue, expenses, acquisition expenses, cashflow and
//! cash-on-hand, each as a nominal value with a standard deviation.
//!
//! Key behaviors
//! -------------
//! - Month 0 is `actuals.reference_month()`; each row adds that month's
//!   cashflow (revenue − expenses) to the running cash-on-hand.
//! - The running cash is kept as a [`UFloat`] across rows, so correlated
//!   inputs (a shared fee, a shared usage estimate) accumulate linearly in
//!   standard deviation instead of in quadrature.
//! - [`Forecast::column`] and [`Forecast::stddev_column`] export one field
//!   as an `ndarray::Array1<f64>`.
//!
//! Conventions
//! -----------
//! - [`Estimate::interval`] uses normal quantiles; it is a summary of the
//!   first-order uncertainty, not a distributional claim.
use std::collections::BTreeMap;

use chrono::NaiveDate;
use ndarray::Array1;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};
use tracing::debug;

use crate::{
    calendar::Month,
    engine::Forecaster,
    errors::{ForecastError, ForecastResult},
    uncertainty::UFloat,
};

/// Nominal value and standard deviation of one forecast figure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Estimate {
    pub nominal: f64,
    pub stddev: f64,
}

impl From<&UFloat> for Estimate {
    fn from(value: &UFloat) -> Self {
        Estimate { nominal: value.nominal(), stddev: value.std_dev() }
    }
}

impl Estimate {
    /// Symmetric normal interval holding `confidence` of the mass.
    ///
    /// Parameters
    /// ----------
    /// - `confidence`: `f64`
    ///   Coverage in the open interval `(0, 1)`, e.g. `0.9`.
    ///
    /// Returns
    /// -------
    /// `(lower, upper)`; both equal `nominal` when `stddev` is 0.
    ///
    /// Errors
    /// ------
    /// - [`ForecastError::InvalidParameter`] if `confidence` is outside `(0, 1)`.
    pub fn interval(&self, confidence: f64) -> ForecastResult<(f64, f64)> {
        if !(confidence > 0.0 && confidence < 1.0) {
            return Err(ForecastError::InvalidParameter {
                field: "confidence".to_string(),
                value: confidence,
                reason: "must be within (0, 1)",
            });
        }
        let standard = Normal::new(0.0, 1.0).map_err(|_| ForecastError::InvalidParameter {
            field: "confidence".to_string(),
            value: confidence,
            reason: "standard normal unavailable",
        })?;
        let z = standard.inverse_cdf(0.5 + confidence / 2.0);
        Ok((self.nominal - z * self.stddev, self.nominal + z * self.stddev))
    }
}

/// One month of the forecast.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastRow {
    pub month: Month,
    pub eom_date: NaiveDate,
    pub revenue: Estimate,
    pub expenses: Estimate,
    pub acquisition_expenses: Estimate,
    pub cashflow: Estimate,
    pub cash_on_hand: Estimate,
    pub revenue_by_customer_type: BTreeMap<String, Estimate>,
}

impl ForecastRow {
    pub fn get(&self, field: ForecastField) -> Estimate {
        match field {
            ForecastField::Revenue => self.revenue,
            ForecastField::Expenses => self.expenses,
            ForecastField::AcquisitionExpenses => self.acquisition_expenses,
            ForecastField::Cashflow => self.cashflow,
            ForecastField::CashOnHand => self.cash_on_hand,
        }
    }
}

/// Column selector for [`Forecast::column`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForecastField {
    Revenue,
    Expenses,
    AcquisitionExpenses,
    Cashflow,
    CashOnHand,
}

impl ForecastField {
    pub const ALL: [ForecastField; 5] = [
        ForecastField::Revenue,
        ForecastField::Expenses,
        ForecastField::AcquisitionExpenses,
        ForecastField::Cashflow,
        ForecastField::CashOnHand,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ForecastField::Revenue => "revenue",
            ForecastField::Expenses => "expenses",
            ForecastField::AcquisitionExpenses => "acquisition_expenses",
            ForecastField::Cashflow => "cashflow",
            ForecastField::CashOnHand => "cash_on_hand",
        }
    }
}

/// Ordered forecast rows, month 0 first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    rows: Vec<ForecastRow>,
}

impl Forecast {
    pub fn rows(&self) -> &[ForecastRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Nominal values of `field`, one entry per month.
    pub fn column(&self, field: ForecastField) -> Array1<f64> {
        self.rows.iter().map(|row| row.get(field).nominal).collect()
    }

    /// Standard deviations of `field`, one entry per month.
    pub fn stddev_column(&self, field: ForecastField) -> Array1<f64> {
        self.rows.iter().map(|row| row.get(field).stddev).collect()
    }

    pub fn months(&self) -> Vec<Month> {
        self.rows.iter().map(|row| row.month).collect()
    }
}

/// Dashboard figures for one month.
///
/// Fields
/// ------
/// - `monthly_revenue`: revenue across all customer types.
/// - `acquisition_cost_per_customer`: acquisition spend divided by new
///   customers; `None` when no customers joined.
/// - `new_customers`: customers created in the month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeadlineMetrics {
    pub month: Month,
    pub monthly_revenue: UFloat,
    pub acquisition_cost_per_customer: Option<UFloat>,
    pub new_customers: u64,
}

impl Forecaster<'_> {
    /// Forecast `months_ahead` months starting from the known cash-on-hand.
    ///
    /// Errors
    /// ------
    /// - Propagates any error raised by the revenue or expense queries.
    pub fn forecast(&self, months_ahead: u32) -> ForecastResult<Forecast> {
        self.forecast_with_cash(UFloat::exact(self.actuals.cash_on_hand()), months_ahead)
    }

    /// Forecast `months_ahead` months starting from `cash`.
    ///
    /// Parameters
    /// ----------
    /// - `cash`: `UFloat`
    ///   Cash-on-hand before month 0's cashflow; may itself be uncertain.
    /// - `months_ahead`: `u32`
    ///   Number of rows to produce; 0 yields an empty forecast.
    pub fn forecast_with_cash(&self, cash: UFloat, months_ahead: u32) -> ForecastResult<Forecast> {
        let start = self.actuals.reference_month();
        let mut cash_on_hand = cash;
        let mut rows = Vec::with_capacity(months_ahead as usize);

        for offset in 0..months_ahead {
            let month = start.shift(i32::try_from(offset).unwrap_or(i32::MAX));

            let mut revenue = UFloat::zero();
            let mut revenue_by_customer_type = BTreeMap::new();
            for (ct_idx, customer_type) in self.scenario.customer_types().iter().enumerate() {
                let ct_revenue = self.revenue_idx(month, ct_idx)?;
                let estimate = Estimate::from(&ct_revenue);
                revenue_by_customer_type.insert(customer_type.name.clone(), estimate);
                revenue += ct_revenue;
            }

            let expenses = self.monthly_expenses(month)?;
            let cashflow = &revenue - &expenses.total;
            cash_on_hand += &cashflow;

            let row = ForecastRow {
                month,
                eom_date: month.end_of_month()?,
                revenue: Estimate::from(&revenue),
                expenses: Estimate::from(&expenses.total),
                acquisition_expenses: Estimate::from(&expenses.customer_acquisition),
                cashflow: Estimate::from(&cashflow),
                cash_on_hand: Estimate::from(&cash_on_hand),
                revenue_by_customer_type,
            };
            debug!(
                %month,
                revenue = row.revenue.nominal,
                expenses = row.expenses.nominal,
                cash_on_hand = row.cash_on_hand.nominal,
                "forecast row"
            );
            rows.push(row);
        }
        Ok(Forecast { rows })
    }

    /// MRR, acquisition cost per new customer, and new customers for `month`.
    pub fn headline_metrics(&self, month: Month) -> ForecastResult<HeadlineMetrics> {
        let monthly_revenue = self.monthly_revenue(month, None)?;
        let new_customers = self.new_customers(month, None)?;
        let acquisition_cost_per_customer = if new_customers > 0 {
            Some(self.monthly_expenses(month)?.customer_acquisition / new_customers as f64)
        } else {
            None
        };
        Ok(HeadlineMetrics { month, monthly_revenue, acquisition_cost_per_customer, new_customers })
    }
}

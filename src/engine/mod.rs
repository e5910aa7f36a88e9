//! engine — the recursive forecasting engine.
//!
//! Purpose
//! -------
//! Turn a validated [`Scenario`] and an [`Actuals`] snapshot into
//! month-by-month revenue, expenses, and cash-on-hand, each carrying a
//! correlation-aware uncertainty.
//!
//! Key behaviors
//! -------------
//! - [`sales`]: sales capacity from ramping reps, and the funnel recursion
//!   that turns capacity into stage transitions and new customers.
//! - [`customers`]: forward cohort simulation with uniform churn from the
//!   first unknown month, seeded with the known customer count.
//! - [`cashflow`]: revenue (setup, recurring, usage billing) and expenses
//!   (marketing, payroll, COGS, misc), with the acquisition-cost subtotal.
//! - [`forecast`]: the driver that walks months forward and accumulates cash.
//! - [`cache`]: memo tables that make the recursion polynomial and turn
//!   dependency cycles into errors.
//!
//! Invariants & assumptions
//! ------------------------
//! - A [`Forecaster`] borrows its scenario and actuals immutably for its whole
//!   lifetime, so memoized results keyed only by month/target/index are
//!   equivalent to results keyed by the full `(scenario, actuals, ...)` tuple.
//! - Months before `actuals.first_unknown_month()` use known customer counts;
//!   months at or after it are simulated.
//! - Counts (hires, transitions, customers) are integers, rounded half to
//!   even; money and usage are [`UFloat`](crate::uncertainty::UFloat).
//!
//! Conventions
//! -----------
//! - Public queries take customer-type and role names; internal helpers use
//!   indices into the scenario's lists, which also serve as cache keys.
//! - `Option<&str>` customer-type arguments mean "all customer types".
//!
//! Downstream usage
//! ----------------
//! - Build one `Forecaster` per forecast run (or per thread) and call
//!   [`Forecaster::forecast`]; individual queries are public for dashboards
//!   and tests.
//!
//! Testing notes
//! -------------
//! - Each submodule tests its own queries on small hand-checkable scenarios.
//! - `tests/integration_forecast_pipeline.rs` exercises the whole pipeline
//!   from JSON documents.

pub mod cache;
pub mod cashflow;
pub mod customers;
pub mod forecast;
pub mod sales;

pub use self::{
    cache::{CacheStats, MemoTable},
    cashflow::ExpenseBreakdown,
    customers::CohortDistribution,
    forecast::{Estimate, Forecast, ForecastField, ForecastRow, HeadlineMetrics},
    sales::FunnelTarget,
};

use chrono::NaiveDate;
use std::rc::Rc;

use crate::{
    calendar::Month,
    engine::customers::CohortStep,
    errors::{ForecastError, ForecastResult},
    predicting::{PredictorCategory, PredictorRegistry},
    scenario::{Actuals, Scenario},
    uncertainty::UFloat,
};

#[derive(Debug)]
struct EngineCaches {
    quota: MemoTable<Month, f64>,
    hires: MemoTable<(NaiveDate, usize), i64>,
    transitions: MemoTable<(Month, FunnelTarget, usize), u64>,
    cohorts: MemoTable<(Month, usize), Rc<CohortStep>>,
    revenue: MemoTable<(Month, usize), UFloat>,
}

impl EngineCaches {
    fn new() -> Self {
        EngineCaches {
            quota: MemoTable::new("total_sales_quota"),
            hires: MemoTable::new("hires_through"),
            transitions: MemoTable::new("new_transitions"),
            cohorts: MemoTable::new("cohort_distribution"),
            revenue: MemoTable::new("monthly_revenue"),
        }
    }
}

/// Forecaster — forecasting engine bound to one scenario and one snapshot.
///
/// Fields
/// ------
/// - `scenario`, `actuals`: borrowed, immutable inputs.
/// - `registry`: predictor dispatch table.
/// - `caches`: memo tables for every recursive query.
///
/// Notes
/// -----
/// - Not `Sync`: caches use interior mutability.
#[derive(Debug)]
pub struct Forecaster<'a> {
    scenario: &'a Scenario,
    actuals: &'a Actuals,
    registry: PredictorRegistry,
    caches: EngineCaches,
}

impl<'a> Forecaster<'a> {
    /// Engine using the built-in predictors.
    pub fn new(scenario: &'a Scenario, actuals: &'a Actuals) -> Self {
        Forecaster {
            scenario,
            actuals,
            registry: PredictorRegistry::with_builtins(),
            caches: EngineCaches::new(),
        }
    }

    /// Engine using a custom registry.
    ///
    /// Errors
    /// ------
    /// - [`ForecastError::UnknownPredictor`] if a predictor named by the
    ///   scenario is missing from `registry`.
    pub fn with_registry(
        scenario: &'a Scenario, actuals: &'a Actuals, registry: PredictorRegistry,
    ) -> ForecastResult<Self> {
        for role in scenario.roles() {
            registry.get(PredictorCategory::Headcount, role.hire_predictor.name())?;
        }
        for customer_type in scenario.customer_types() {
            registry.get(PredictorCategory::Usage, customer_type.usage_predictor.name())?;
        }
        Ok(Forecaster { scenario, actuals, registry, caches: EngineCaches::new() })
    }

    pub fn scenario(&self) -> &'a Scenario {
        self.scenario
    }

    pub fn actuals(&self) -> &'a Actuals {
        self.actuals
    }

    pub fn registry(&self) -> &PredictorRegistry {
        &self.registry
    }

    /// Hit/miss counters of every memo table.
    pub fn cache_stats(&self) -> Vec<CacheStats> {
        vec![
            self.caches.quota.stats(),
            self.caches.hires.stats(),
            self.caches.transitions.stats(),
            self.caches.cohorts.stats(),
            self.caches.revenue.stats(),
        ]
    }

    pub fn clear_caches(&self) {
        self.caches.quota.clear();
        self.caches.hires.clear();
        self.caches.transitions.clear();
        self.caches.cohorts.clear();
        self.caches.revenue.clear();
    }

    fn customer_type_indices(&self, customer_type: Option<&str>) -> ForecastResult<Vec<usize>> {
        match customer_type {
            Some(name) => Ok(vec![self.scenario.customer_type_index(name)?]),
            None => Ok((0..self.scenario.customer_types().len()).collect()),
        }
    }

    fn role_index(&self, role: &str) -> ForecastResult<usize> {
        self.scenario
            .roles()
            .iter()
            .position(|r| r.name == role)
            .ok_or_else(|| ForecastError::UnknownRole { name: role.to_string() })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        predicting::{
            headcount::{ConstantHeadcount, HeadcountPredictor, LinearWithMax},
            registry::{Prediction, PredictorCall},
        },
        scenario::{
            EmployeeCosts, Role, SalesProfile, customer::tests::customer_type,
        },
    };
    use std::collections::BTreeMap;

    pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub(crate) fn month(y: i32, m: u32) -> Month {
        Month::new(y, m).unwrap()
    }

    /// Sales role hiring `count` reps from the start of time, fully ramped
    /// after `ramp` months, each with `quota` entries per month.
    pub(crate) fn sales_role(count: u32, ramp: u32, quota: f64) -> Role {
        Role::sales(
            "AE",
            120_000.0,
            HeadcountPredictor::Constant(ConstantHeadcount { count }),
            SalesProfile { commission_percent: 0.0, ramp_up_months: ramp, monthly_quota: quota },
        )
    }

    /// Sales role whose first `initial` reps join on `first_hire`.
    pub(crate) fn sales_role_from(
        first_hire: NaiveDate, initial: u32, ramp: u32, quota: f64,
    ) -> Role {
        Role::sales(
            "AE",
            120_000.0,
            HeadcountPredictor::LinearWithMax(LinearWithMax {
                initial_count: initial,
                hires_per_year: 0.0,
                first_hire_date: first_hire,
                max_hires: initial,
            }),
            SalesProfile { commission_percent: 0.0, ramp_up_months: ramp, monthly_quota: quota },
        )
    }

    pub(crate) fn scenario_with(roles: Vec<Role>) -> Scenario {
        let types = vec![customer_type("Basic", 1.0)];
        Scenario::new(types, roles, EmployeeCosts::default(), Vec::new(), Vec::new()).unwrap()
    }

    pub(crate) fn actuals_with(known: u64) -> Actuals {
        let known = BTreeMap::from([("Basic".to_string(), known)]);
        Actuals::new(date(2025, 1, 31), 100_000.0, known).unwrap()
    }

    #[test]
    // Purpose
    // -------
    // A custom registry must provide every predictor the scenario names.
    fn with_registry_checks_predictor_names() {
        let scenario = scenario_with(vec![sales_role(1, 1, 10.0)]);
        let actuals = actuals_with(0);
        let err =
            Forecaster::with_registry(&scenario, &actuals, PredictorRegistry::empty()).unwrap_err();
        assert!(matches!(err, ForecastError::UnknownPredictor { .. }));

        fn nobody(_: &PredictorCall<'_>) -> ForecastResult<Prediction> {
            Ok(Prediction::Count(0))
        }
        fn no_usage(_: &PredictorCall<'_>) -> ForecastResult<Prediction> {
            Ok(Prediction::Quantity(UFloat::zero()))
        }
        let mut registry = PredictorRegistry::empty();
        registry.register(PredictorCategory::Headcount, "constant", nobody, false).unwrap();
        registry.register(PredictorCategory::Usage, "constant", no_usage, false).unwrap();
        let engine = Forecaster::with_registry(&scenario, &actuals, registry).unwrap();
        assert_eq!(engine.hires_through(date(2025, 6, 30), "AE").unwrap(), 0);
    }

    #[test]
    fn unknown_names_are_errors() {
        let scenario = scenario_with(vec![sales_role(1, 1, 10.0)]);
        let actuals = actuals_with(0);
        let engine = Forecaster::new(&scenario, &actuals);
        assert!(matches!(
            engine.hires_through(date(2025, 6, 30), "CTO"),
            Err(ForecastError::UnknownRole { .. })
        ));
        assert!(matches!(
            engine.total_customers(month(2025, 3), Some("Pro")),
            Err(ForecastError::UnknownCustomerType { .. })
        ));
    }
}

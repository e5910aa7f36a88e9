//! Customer cohorts and churn.
//!
//! Purpose
//! -------
//! Track how many customers are active in any month, split by the month they
//! joined, so usage billing can depend on customer age.
//!
//! Key behaviors
//! -------------
//! - Before `actuals.first_unknown_month()`, totals come straight from the
//!   actuals and no cohorts are simulated.
//! - From the first unknown month on, each month starts from the previous
//!   month's cohorts (the first month starts from the known count, filed under
//!   the reference month), adds a cohort of that month's new customers, then
//!   removes `round(count × churn)` from every cohort, rounding half to even.
//!
//! Invariants & assumptions
//! ------------------------
//! - Churn is uniform across cohort ages.
//! - Cohorts that reach zero are dropped from the distribution.
//! - A cohort with `count × churn <= 0.5` loses nobody, so a positive churn
//!   rate does not always empty a cohort without inflow.
//! - The simulated total in the first unknown month equals the known count
//!   plus new customers minus churn; nothing is lost at the boundary.
use std::{collections::BTreeMap, rc::Rc};

use tracing::trace;

use crate::{calendar::Month, engine::Forecaster, errors::ForecastResult};

/// Active customers by cohort-start month.
pub type CohortDistribution = BTreeMap<Month, u64>;

/// One simulated month: the surviving cohorts and how many customers churned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CohortStep {
    pub cohorts: CohortDistribution,
    pub churned: u64,
}

impl CohortStep {
    pub fn total(&self) -> u64 {
        self.cohorts.values().sum()
    }
}

impl Forecaster<'_> {
    /// Active customers at the end of `month`, for one type or all types.
    ///
    /// Errors
    /// ------
    /// - [`ForecastError::UnknownCustomerType`](crate::errors::ForecastError::UnknownCustomerType)
    ///   if the type is not in the scenario, or its count is missing from the
    ///   actuals.
    pub fn total_customers(
        &self, month: Month, customer_type: Option<&str>,
    ) -> ForecastResult<u64> {
        let mut total = 0;
        for ct_idx in self.customer_type_indices(customer_type)? {
            total += self.total_customers_idx(month, ct_idx)?;
        }
        Ok(total)
    }

    /// Customers still active in `month`, keyed by the month they joined.
    ///
    /// Empty for months before the first unknown month.
    pub fn cohort_distribution(
        &self, month: Month, customer_type: &str,
    ) -> ForecastResult<CohortDistribution> {
        let ct_idx = self.scenario.customer_type_index(customer_type)?;
        Ok(self.cohort_step_idx(month, ct_idx)?.cohorts.clone())
    }

    /// Customers lost to churn during `month` (0 for known months).
    pub fn churned_customers(&self, month: Month, customer_type: &str) -> ForecastResult<u64> {
        let ct_idx = self.scenario.customer_type_index(customer_type)?;
        Ok(self.cohort_step_idx(month, ct_idx)?.churned)
    }

    pub(crate) fn total_customers_all(&self, month: Month) -> ForecastResult<u64> {
        self.total_customers(month, None)
    }

    pub(crate) fn total_customers_idx(&self, month: Month, ct_idx: usize) -> ForecastResult<u64> {
        if month < self.actuals.first_unknown_month() {
            let name = &self.scenario.customer_types()[ct_idx].name;
            return self.actuals.active_count(name);
        }
        Ok(self.cohort_step_idx(month, ct_idx)?.total())
    }

    pub(crate) fn cohort_step_idx(
        &self, month: Month, ct_idx: usize,
    ) -> ForecastResult<Rc<CohortStep>> {
        let first_unknown = self.actuals.first_unknown_month();
        let mut previous: Option<Rc<CohortStep>> = None;
        for step in Month::range(first_unknown, month, true) {
            let before = previous.take();
            let current = self.caches.cohorts.get_or_try_insert_with((step, ct_idx), || {
                self.simulate_month(step, ct_idx, before.as_deref())
            })?;
            previous = Some(current);
        }
        Ok(previous.unwrap_or_default())
    }

    fn simulate_month(
        &self, month: Month, ct_idx: usize, previous: Option<&CohortStep>,
    ) -> ForecastResult<Rc<CohortStep>> {
        let customer_type = &self.scenario.customer_types()[ct_idx];
        let mut cohorts = match previous {
            Some(step) => step.cohorts.clone(),
            None => {
                let known = self.actuals.active_count(&customer_type.name)?;
                BTreeMap::from([(self.actuals.reference_month(), known)])
            }
        };

        let joined = self.new_customers_idx(month, ct_idx)?;
        *cohorts.entry(month).or_insert(0) += joined;

        let mut churned = 0;
        for count in cohorts.values_mut() {
            let lost = ((*count as f64) * customer_type.churn).round_ties_even() as u64;
            let lost = lost.min(*count);
            *count -= lost;
            churned += lost;
        }
        cohorts.retain(|_, count| *count > 0);

        let step = CohortStep { cohorts, churned };
        trace!(
            %month,
            customer_type = %customer_type.name,
            joined,
            churned,
            total = step.total(),
            "simulated month"
        );
        Ok(Rc::new(step))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        engine::tests::{actuals_with, month, sales_role},
        errors::ForecastError,
        scenario::{EmployeeCosts, Role, Scenario, customer::tests::customer_type},
    };

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover the actuals boundary, churn without inflow, cohort
    // bookkeeping with inflow, and missing actuals.
    // -------------------------------------------------------------------------

    fn scenario(churn: f64, roles: Vec<Role>) -> Scenario {
        let mut ct = customer_type("Basic", 1.0);
        ct.churn = churn;
        Scenario::new(vec![ct], roles, EmployeeCosts::default(), Vec::new(), Vec::new()).unwrap()
    }

    #[test]
    // Purpose
    // -------
    // Known months read the actuals; the first simulated month carries the
    // known customers over.
    //
    // Given
    // -----
    // - 17 known customers at 2025-01-31, no sales, churn 0.
    //
    // Expect
    // ------
    // - 17 in 2025-01 (and any earlier month), 17 in 2025-02 filed under 2025-01.
    fn boundary_matches_actuals() {
        let scenario = scenario(0.0, Vec::new());
        let actuals = actuals_with(17);
        let engine = Forecaster::new(&scenario, &actuals);

        assert_eq!(engine.total_customers(month(2025, 1), Some("Basic")).unwrap(), 17);
        assert_eq!(engine.total_customers(month(2024, 3), None).unwrap(), 17);
        assert!(engine.cohort_distribution(month(2025, 1), "Basic").unwrap().is_empty());

        assert_eq!(engine.total_customers(month(2025, 2), None).unwrap(), 17);
        let cohorts = engine.cohort_distribution(month(2025, 2), "Basic").unwrap();
        assert_eq!(cohorts, BTreeMap::from([(month(2025, 1), 17)]));
    }

    #[test]
    // Purpose
    // -------
    // Without new customers the count never increases and churn empties it.
    //
    // Given
    // -----
    // - 100 known customers, churn 0.6, no sales roles.
    //
    // Expect
    // ------
    // - 100 → 40 → 16 → 6 → 2 → 1 → 0: monotone, empty by 2025-07, and the
    //   churned counts add up to 100.
    fn churn_without_inflow_reaches_zero() {
        let scenario = scenario(0.6, Vec::new());
        let actuals = actuals_with(100);
        let engine = Forecaster::new(&scenario, &actuals);

        let mut last = 100;
        let mut churned = 0;
        for m in Month::range(month(2025, 2), month(2027, 1), true) {
            let total = engine.total_customers(m, Some("Basic")).unwrap();
            assert!(total <= last, "{m}: {total} > {last}");
            churned += engine.churned_customers(m, "Basic").unwrap();
            last = total;
        }
        assert_eq!(last, 0);
        assert_eq!(churned, 100);
        assert_eq!(engine.total_customers(month(2025, 2), None).unwrap(), 40);
        assert_eq!(engine.total_customers(month(2025, 7), None).unwrap(), 0);
    }

    #[test]
    // Purpose
    // -------
    // Churn of exactly half a customer rounds to the even count.
    //
    // Given
    // -----
    // - Churn 0.5 with 1, 3, and 5 known customers.
    //
    // Expect
    // ------
    // - 1: 0.5 → 0 lost, 1 stays. 3: 1.5 → 2 lost, 1 stays.
    //   5: 2.5 → 2 lost, 3 stay.
    fn half_customer_churn_rounds_to_even() {
        let scenario = scenario(0.5, Vec::new());
        for (known, remaining) in [(1, 1), (3, 1), (5, 3)] {
            let actuals = actuals_with(known);
            let engine = Forecaster::new(&scenario, &actuals);
            let feb = month(2025, 2);
            assert_eq!(engine.total_customers(feb, None).unwrap(), remaining, "{known} known");
            assert_eq!(engine.churned_customers(feb, "Basic").unwrap(), known - remaining);
        }
    }

    #[test]
    // Purpose
    // -------
    // A small cohort whose expected churn rounds to zero never shrinks.
    //
    // Given
    // -----
    // - 4 known customers, churn 0.1 (0.4 per month), no sales.
    //
    // Expect
    // ------
    // - Still 4 customers ten years later, with no churn recorded.
    fn small_cohorts_can_stop_churning() {
        let scenario = scenario(0.1, Vec::new());
        let actuals = actuals_with(4);
        let engine = Forecaster::new(&scenario, &actuals);

        let later = month(2035, 1);
        assert_eq!(engine.total_customers(later, None).unwrap(), 4);
        assert_eq!(engine.churned_customers(later, "Basic").unwrap(), 0);
        let cohorts = engine.cohort_distribution(later, "Basic").unwrap();
        assert_eq!(cohorts, BTreeMap::from([(month(2025, 1), 4)]));
    }

    #[test]
    // Purpose
    // -------
    // New customers form one cohort per month.
    //
    // Given
    // -----
    // - 3 known customers, churn 0, one rep with quota 20 (entry 20/month,
    //   30-day funnel with 25% conversion → 5 customers/month).
    //
    // Expect
    // ------
    // - In 2025-04: cohorts {2025-01: 3, 2025-02: 5, 2025-03: 5, 2025-04: 5}.
    fn inflow_creates_monthly_cohorts() {
        let scenario = scenario(0.0, vec![sales_role(1, 1, 20.0)]);
        let actuals = actuals_with(3);
        let engine = Forecaster::new(&scenario, &actuals);

        let cohorts = engine.cohort_distribution(month(2025, 4), "Basic").unwrap();
        let expected = BTreeMap::from([
            (month(2025, 1), 3),
            (month(2025, 2), 5),
            (month(2025, 3), 5),
            (month(2025, 4), 5),
        ]);
        assert_eq!(cohorts, expected);
        assert_eq!(engine.total_customers(month(2025, 4), None).unwrap(), 18);
        assert_eq!(engine.churned_customers(month(2025, 4), "Basic").unwrap(), 0);
    }

    #[test]
    fn missing_actuals_is_an_error() {
        let scenario = scenario(0.1, Vec::new());
        let actuals = crate::scenario::Actuals::new(
            crate::engine::tests::date(2025, 1, 31),
            0.0,
            BTreeMap::new(),
        )
        .unwrap();
        let engine = Forecaster::new(&scenario, &actuals);
        for m in [month(2024, 12), month(2025, 6)] {
            assert!(matches!(
                engine.total_customers(m, Some("Basic")),
                Err(ForecastError::UnknownCustomerType { .. })
            ));
        }
    }
}

//! scenario — validated business-model configuration and the actuals snapshot.
//!
//! Purpose
//! -------
//! Describe everything the engine forecasts from: the customer types being
//! sold (fees, usage, churn, funnel), the roles being hired (salaries, hire
//! predictors, sales quotas), employer overhead, and flat recurring spend.
//! [`Actuals`] records what is known at the reference date.
//!
//! Key behaviors
//! -------------
//! - [`Scenario::new`] validates every field and the cross-field rules
//!   (unique names, lead fractions summing to one) and fails fast.
//! - [`Scenario::from_json`] and [`Actuals::from_json`] read JSON documents
//!   and run exactly the same validation.
//!
//! Invariants & assumptions
//! ------------------------
//! - A constructed `Scenario` is immutable; the engine borrows it for the
//!   whole forecast, which is what makes its memoized results safe to reuse.
//! - At least one customer type exists and `Σ fraction_of_leads = 1`
//!   (within `1e-9`).
//! - Customer-type and role names are unique.
//!
//! Conventions
//! -----------
//! - In documents the role list may be called `roles` or `headcount`;
//!   `employee_costs` and the misc spend lists are optional.
//! - Uncertain fields accept `"100+/-5"`-style strings or plain numbers.

pub mod actuals;
pub mod customer;
pub mod expenses;
pub mod roles;
pub mod validation;

pub use self::{
    actuals::Actuals,
    customer::{Cogs, CustomerType, FunnelStage, LeadConfig},
    expenses::OtherSpend,
    roles::{EmployeeCosts, Role, SalesProfile},
};

use serde::{Deserialize, Serialize};

use crate::{
    errors::{ForecastError, ForecastResult},
    scenario::validation::{validate_lead_fractions, validate_unique_names},
};

/// Scenario — the static business model being forecast.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scenario {
    customer_types: Vec<CustomerType>,
    roles: Vec<Role>,
    employee_costs: EmployeeCosts,
    misc_expenses: Vec<OtherSpend>,
    misc_bizdev_expenses: Vec<OtherSpend>,
}

#[derive(Deserialize)]
struct ScenarioDocument {
    customer_types: Vec<CustomerType>,
    #[serde(default, alias = "headcount")]
    roles: Vec<Role>,
    #[serde(default)]
    employee_costs: EmployeeCosts,
    #[serde(default)]
    misc_expenses: Vec<OtherSpend>,
    #[serde(default)]
    misc_bizdev_expenses: Vec<OtherSpend>,
}

impl Scenario {
    /// Build and validate a scenario.
    ///
    /// Errors
    /// ------
    /// - [`ForecastError::EmptyScenario`] without customer types.
    /// - [`ForecastError::InvalidParameter`] for any out-of-range field.
    /// - [`ForecastError::DuplicateName`] for repeated customer-type, role, or
    ///   funnel-stage names.
    /// - [`ForecastError::LeadFractionSum`] unless lead fractions sum to 1.
    pub fn new(
        customer_types: Vec<CustomerType>, roles: Vec<Role>, employee_costs: EmployeeCosts,
        misc_expenses: Vec<OtherSpend>, misc_bizdev_expenses: Vec<OtherSpend>,
    ) -> ForecastResult<Self> {
        if customer_types.is_empty() {
            return Err(ForecastError::EmptyScenario);
        }
        for customer_type in &customer_types {
            customer_type.validate()?;
        }
        validate_unique_names("customer type", customer_types.iter().map(|ct| ct.name.as_str()))?;
        validate_lead_fractions(customer_types.iter().map(|ct| ct.fraction_of_leads))?;

        for role in &roles {
            role.validate()?;
        }
        validate_unique_names("role", roles.iter().map(|r| r.name.as_str()))?;
        employee_costs.validate()?;

        Ok(Scenario { customer_types, roles, employee_costs, misc_expenses, misc_bizdev_expenses })
    }

    /// Parse and validate a JSON scenario document.
    ///
    /// Errors
    /// ------
    /// - [`ForecastError::Document`] for malformed JSON or shapes.
    /// - Any error from [`Scenario::new`].
    pub fn from_json(text: &str) -> ForecastResult<Self> {
        let doc: ScenarioDocument = serde_json::from_str(text)?;
        Scenario::new(
            doc.customer_types,
            doc.roles,
            doc.employee_costs,
            doc.misc_expenses,
            doc.misc_bizdev_expenses,
        )
    }

    pub fn customer_types(&self) -> &[CustomerType] {
        &self.customer_types
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    /// Roles carrying a sales profile, with that profile.
    pub fn sales_roles(&self) -> impl Iterator<Item = (&Role, &SalesProfile)> {
        self.roles.iter().filter_map(|role| role.sales.as_ref().map(|profile| (role, profile)))
    }

    pub fn employee_costs(&self) -> &EmployeeCosts {
        &self.employee_costs
    }

    pub fn misc_expenses(&self) -> &[OtherSpend] {
        &self.misc_expenses
    }

    pub fn misc_bizdev_expenses(&self) -> &[OtherSpend] {
        &self.misc_bizdev_expenses
    }

    /// Position of the named customer type.
    ///
    /// Errors
    /// ------
    /// - [`ForecastError::UnknownCustomerType`] if no type has that name.
    pub fn customer_type_index(&self, name: &str) -> ForecastResult<usize> {
        self.customer_types
            .iter()
            .position(|ct| ct.name == name)
            .ok_or_else(|| ForecastError::UnknownCustomerType { name: name.to_string() })
    }

    pub fn customer_type(&self, name: &str) -> ForecastResult<&CustomerType> {
        Ok(&self.customer_types[self.customer_type_index(name)?])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::customer::tests::customer_type;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover the cross-field rules enforced by `Scenario::new` and
    // the JSON loader. Per-field range checks live next to each type.
    // -------------------------------------------------------------------------

    fn build(types: Vec<CustomerType>) -> ForecastResult<Scenario> {
        Scenario::new(types, Vec::new(), EmployeeCosts::default(), Vec::new(), Vec::new())
    }

    #[test]
    // Purpose
    // -------
    // Lead fractions summing to 0.9 fail; summing to 1.0 succeed.
    fn lead_fractions_must_sum_to_one() {
        let err = build(vec![customer_type("A", 0.5), customer_type("B", 0.4)]).unwrap_err();
        assert!(matches!(err, ForecastError::LeadFractionSum { .. }));
        assert!(build(vec![customer_type("A", 0.5), customer_type("B", 0.5)]).is_ok());
    }

    #[test]
    fn empty_and_duplicate_types_fail() {
        assert!(matches!(build(Vec::new()), Err(ForecastError::EmptyScenario)));
        assert!(matches!(
            build(vec![customer_type("A", 0.5), customer_type("A", 0.5)]),
            Err(ForecastError::DuplicateName { kind: "customer type", .. })
        ));
    }

    #[test]
    fn customer_type_lookup() {
        let scenario = build(vec![customer_type("A", 0.25), customer_type("B", 0.75)]).unwrap();
        assert_eq!(scenario.customer_type_index("B").unwrap(), 1);
        assert!(scenario.customer_type("C").is_err());
    }

    #[test]
    // Purpose
    // -------
    // A complete document loads, with `headcount` accepted for the role list
    // and employee costs defaulted.
    fn loads_json_document() {
        let scenario = Scenario::from_json(
            r#"{
              "customer_types": [{
                "name": "Small",
                "monthly_fee": "100+/-10",
                "setup_fee": 1000,
                "usage_fee": 0.01,
                "usage_predictor": {"name": "linear", "initial_usage": "1000+/-100",
                                    "increase_per_year": 0.2},
                "fraction_of_leads": 1.0,
                "cogs": {"monthly": 5, "per_usage": 0.001},
                "lead_config": {
                  "stages": [{"name": "Lead", "duration": 14, "conversion_rate": 0.3}],
                  "cost_per_ad_click": 3.5,
                  "qualified_lead_to_click_ratio": 0.05
                },
                "churn": 0.02,
                "payment_months_behind": 1
              }],
              "headcount": [
                {"name": "AE", "salary": 90000,
                 "hire_predictor": {"name": "linear_with_max", "initial_count": 1,
                                    "hires_per_year": 4, "first_hire_date": "2025-01-01",
                                    "max_hires": 5},
                 "commission_percent": 0.1, "ramp_up_months": 3, "monthly_quota": 40},
                {"name": "Support", "salary": 50000,
                 "hire_predictor": {"name": "scale_with_customers", "customers_per_person": 50}}
              ],
              "misc_expenses": [{"name": "Legal", "annual": 12000}],
              "misc_bizdev_expenses": [{"name": "Conferences", "monthly": 500}]
            }"#,
        )
        .unwrap();
        assert_eq!(scenario.roles().len(), 2);
        assert_eq!(scenario.sales_roles().count(), 1);
        assert_eq!(*scenario.employee_costs(), EmployeeCosts::default());
        assert_eq!(scenario.customer_types()[0].payment_months_behind, 1);
    }

    #[test]
    fn json_validation_errors_keep_their_kind() {
        let err = Scenario::from_json(r#"{"customer_types": []}"#).unwrap_err();
        assert!(matches!(err, ForecastError::EmptyScenario));
        let err = Scenario::from_json("{").unwrap_err();
        assert!(matches!(err, ForecastError::Document { .. }));
    }
}

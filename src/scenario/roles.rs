//! Roles, sales profiles, and employee overhead.
//!
//! A role is a group of equivalent hires with one average salary and a hire
//! predictor. Roles carrying a [`SalesProfile`] are sales roles: they provide
//! the funnel's entry capacity through their monthly quota and are always
//! counted as customer-acquisition cost.
//!
//! In documents a sales role is written flat, with `commission_percent`,
//! `ramp_up_months` and `monthly_quota` next to the common role fields; the
//! three must appear together.
use serde::{Deserialize, Serialize};

use crate::{
    errors::{ForecastError, ForecastResult},
    predicting::headcount::HeadcountPredictor,
    scenario::validation::{validate_fraction, validate_non_negative},
};

/// Longest accepted ramp-up, in months.
pub const MAX_RAMP_UP_MONTHS: u32 = 600;

/// Sales-specific parameters of a role.
///
/// Fields
/// ------
/// - `commission_percent`: fraction in `[0, 1]`.
/// - `ramp_up_months`: months until a new hire reaches full quota; a hire in
///   their `k`-th month (0-based) works at `(k + 1) / ramp_up_months`.
/// - `monthly_quota`: funnel entries a fully ramped rep generates per month.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SalesProfile {
    pub commission_percent: f64,
    pub ramp_up_months: u32,
    pub monthly_quota: f64,
}

/// A hiring line in the scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RoleDocument")]
pub struct Role {
    pub name: String,
    /// Annual salary.
    pub salary: f64,
    pub hire_predictor: HeadcountPredictor,
    pub customer_acquisition: bool,
    #[serde(flatten)]
    pub sales: Option<SalesProfile>,
}

impl Role {
    /// A role without a sales profile.
    pub fn new(
        name: &str, salary: f64, hire_predictor: HeadcountPredictor, customer_acquisition: bool,
    ) -> Self {
        Role { name: name.to_string(), salary, hire_predictor, customer_acquisition, sales: None }
    }

    /// A sales role; always counted as customer acquisition.
    pub fn sales(
        name: &str, salary: f64, hire_predictor: HeadcountPredictor, profile: SalesProfile,
    ) -> Self {
        Role {
            name: name.to_string(),
            salary,
            hire_predictor,
            customer_acquisition: true,
            sales: Some(profile),
        }
    }

    pub fn monthly_salary(&self) -> f64 {
        self.salary / 12.0
    }

    /// Whether payroll for this role counts toward acquisition cost.
    pub fn is_customer_acquisition(&self) -> bool {
        self.customer_acquisition || self.sales.is_some()
    }

    /// Errors
    /// ------
    /// - [`ForecastError::InvalidParameter`] for a negative salary, a
    ///   commission outside `[0, 1]`, a ramp-up outside `1..=600`, a negative
    ///   quota, or invalid hire predictor parameters.
    pub fn validate(&self) -> ForecastResult<()> {
        validate_non_negative(&format!("{}.salary", self.name), self.salary)?;
        self.hire_predictor.validate(&self.name)?;
        if let Some(profile) = &self.sales {
            let commission = format!("{}.commission_percent", self.name);
            validate_fraction(&commission, profile.commission_percent)?;
            validate_non_negative(&format!("{}.monthly_quota", self.name), profile.monthly_quota)?;
            if !(1..=MAX_RAMP_UP_MONTHS).contains(&profile.ramp_up_months) {
                return Err(ForecastError::InvalidParameter {
                    field: format!("{}.ramp_up_months", self.name),
                    value: f64::from(profile.ramp_up_months),
                    reason: "must be within 1..=600",
                });
            }
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct RoleDocument {
    name: String,
    salary: f64,
    hire_predictor: HeadcountPredictor,
    #[serde(default)]
    customer_acquisition: bool,
    commission_percent: Option<f64>,
    ramp_up_months: Option<u32>,
    monthly_quota: Option<f64>,
}

impl TryFrom<RoleDocument> for Role {
    type Error = ForecastError;

    fn try_from(doc: RoleDocument) -> ForecastResult<Role> {
        let sales = match (doc.commission_percent, doc.ramp_up_months, doc.monthly_quota) {
            (None, None, None) => None,
            (Some(commission_percent), Some(ramp_up_months), Some(monthly_quota)) => {
                Some(SalesProfile { commission_percent, ramp_up_months, monthly_quota })
            }
            _ => {
                return Err(ForecastError::Document {
                    message: format!(
                        "role '{}' must give commission_percent, ramp_up_months \
                         and monthly_quota together",
                        doc.name
                    ),
                });
            }
        };
        Ok(Role {
            name: doc.name,
            salary: doc.salary,
            hire_predictor: doc.hire_predictor,
            customer_acquisition: doc.customer_acquisition || sales.is_some(),
            sales,
        })
    }
}

/// Employer overhead on top of salaries.
///
/// Fields
/// ------
/// - `annual_fixed`: per-head yearly cost (insurance, subscriptions, ...).
/// - `annual_percent`: payroll taxes and benefits as a fraction of salary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmployeeCosts {
    pub annual_fixed: f64,
    pub annual_percent: f64,
}

impl Default for EmployeeCosts {
    fn default() -> Self {
        EmployeeCosts { annual_fixed: 13_000.0, annual_percent: 0.116 }
    }
}

impl EmployeeCosts {
    /// Fully loaded monthly cost of one hire in `role`.
    pub fn monthly_cost(&self, role: &Role) -> f64 {
        role.monthly_salary() * (1.0 + self.annual_percent) + self.annual_fixed / 12.0
    }

    pub fn validate(&self) -> ForecastResult<()> {
        validate_non_negative("employee_costs.annual_fixed", self.annual_fixed)?;
        validate_non_negative("employee_costs.annual_percent", self.annual_percent)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicting::headcount::ConstantHeadcount;
    use approx::assert_relative_eq;

    fn one_hire() -> HeadcountPredictor {
        HeadcountPredictor::Constant(ConstantHeadcount { count: 1 })
    }

    #[test]
    // Purpose
    // -------
    // Loaded cost = monthly salary × (1 + percent) + fixed / 12.
    fn monthly_cost_adds_overhead() {
        let role = Role::new("Engineer", 120_000.0, one_hire(), false);
        let cost = EmployeeCosts::default().monthly_cost(&role);
        assert_relative_eq!(cost, 10_000.0 * 1.116 + 13_000.0 / 12.0, epsilon = 1e-9);
    }

    #[test]
    // Purpose
    // -------
    // Flat sales fields become a profile and force the acquisition flag;
    // partial profiles are rejected.
    fn sales_roles_from_documents() {
        let role: Role = serde_json::from_str(
            r#"{"name": "AE", "salary": 90000, "hire_predictor": {"name": "constant", "count": 2},
                "commission_percent": 0.1, "ramp_up_months": 3, "monthly_quota": 20}"#,
        )
        .unwrap();
        assert!(role.customer_acquisition);
        assert_eq!(role.sales.map(|s| s.ramp_up_months), Some(3));

        let plain: Role = serde_json::from_str(
            r#"{"name": "Eng", "salary": 1, "hire_predictor": {"name": "constant", "count": 1}}"#,
        )
        .unwrap();
        assert!(!plain.is_customer_acquisition());
        assert!(plain.sales.is_none());

        let partial = serde_json::from_str::<Role>(
            r#"{"name": "AE", "salary": 1, "hire_predictor": {"name": "constant", "count": 1},
                "monthly_quota": 20}"#,
        );
        assert!(partial.is_err());
    }

    #[test]
    fn ramp_up_is_bounded() {
        let profile =
            SalesProfile { commission_percent: 0.1, ramp_up_months: 0, monthly_quota: 10.0 };
        assert!(Role::sales("AE", 1.0, one_hire(), profile).validate().is_err());
        let profile = SalesProfile { ramp_up_months: 601, ..profile };
        assert!(Role::sales("AE", 1.0, one_hire(), profile).validate().is_err());
        let profile = SalesProfile { ramp_up_months: 600, ..profile };
        assert!(Role::sales("AE", 1.0, one_hire(), profile).validate().is_ok());
    }
}

//! Predictor registry — `(category, name)` dispatch for pluggable predictors.
//!
//! Purpose
//! -------
//! Hold the closed set of hand-specified predictor functions the engine calls
//! to turn configuration parameters into headcount and usage figures, and
//! resolve them by category and name at prediction time.
//!
//! Key behaviors
//! -------------
//! - [`PredictorRegistry::with_builtins`] performs the explicit registration
//!   of every built-in predictor; there is no hidden global state.
//! - [`PredictorRegistry::predict`] validates the call against the entry's
//!   contract (state dependence, usage start date) before dispatching.
//! - Custom predictors can be added with [`PredictorRegistry::register`];
//!   they receive the same [`PredictorCall`] as built-ins.
//!
//! Invariants & assumptions
//! ------------------------
//! - Each `(category, name)` key is registered at most once.
//! - A state-dependent predictor is never invoked without a
//!   [`PredictedCompanyState`]; a usage predictor is never invoked without a
//!   cohort start date.
//!
//! Conventions
//! -----------
//! - Headcount predictors return [`Prediction::Count`]; usage predictors
//!   return [`Prediction::Quantity`].
//! - Parameters are passed as a borrowed [`PredictorParams`] view of the
//!   scenario's tagged predictor configuration.
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt};

use crate::{
    errors::{ForecastError, ForecastResult},
    predicting::{
        headcount::{self, HeadcountPredictor},
        state::PredictedCompanyState,
        usage::{self, UsagePredictor},
    },
    uncertainty::UFloat,
};

/// Category a predictor belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictorCategory {
    /// Per-customer usage over the customer's lifetime.
    Usage,
    /// Cumulative hires for a role.
    Headcount,
}

impl fmt::Display for PredictorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredictorCategory::Usage => write!(f, "usage"),
            PredictorCategory::Headcount => write!(f, "headcount"),
        }
    }
}

/// Result of a predictor call.
#[derive(Debug, Clone, PartialEq)]
pub enum Prediction {
    Count(i64),
    Quantity(UFloat),
}

impl Prediction {
    /// View the prediction as an uncertain quantity (counts are exact).
    pub fn into_quantity(self) -> UFloat {
        match self {
            Prediction::Count(count) => UFloat::exact(count as f64),
            Prediction::Quantity(value) => value,
        }
    }

    /// Nominal value as `f64`.
    pub fn nominal(&self) -> f64 {
        match self {
            Prediction::Count(count) => *count as f64,
            Prediction::Quantity(value) => value.nominal(),
        }
    }
}

/// Borrowed view of a predictor's configured parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PredictorParams<'a> {
    Usage(&'a UsagePredictor),
    Headcount(&'a HeadcountPredictor),
}

/// Everything a predictor function receives.
///
/// Fields
/// ------
/// - `effective_date`: date the prediction is for (end of month in the engine).
/// - `params`: the configured parameter set.
/// - `start`: cohort start date (always `Some` for usage predictors).
/// - `state`: projected company state (always `Some` for state-dependent
///   predictors).
#[derive(Debug, Clone, Copy)]
pub struct PredictorCall<'a> {
    pub name: &'a str,
    pub effective_date: NaiveDate,
    pub params: PredictorParams<'a>,
    pub start: Option<NaiveDate>,
    pub state: Option<&'a PredictedCompanyState<'a>>,
}

impl PredictorCall<'_> {
    /// Shorthand for the mismatch error a predictor returns when handed
    /// parameters that belong to a different predictor.
    pub fn params_mismatch(&self, category: PredictorCategory) -> ForecastError {
        ForecastError::PredictorParamsMismatch { category, name: self.name.to_string() }
    }
}

/// Signature shared by every registered predictor.
pub type PredictorFn = fn(&PredictorCall<'_>) -> ForecastResult<Prediction>;

/// Registry entry.
#[derive(Debug, Clone, Copy)]
pub struct RegisteredPredictor {
    pub function: PredictorFn,
    pub state_dependent: bool,
}

/// PredictorRegistry — explicit `(category, name) → predictor` table.
#[derive(Debug, Clone)]
pub struct PredictorRegistry {
    entries: HashMap<(PredictorCategory, String), RegisteredPredictor>,
}

impl Default for PredictorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl PredictorRegistry {
    /// Registry with no entries.
    pub fn empty() -> Self {
        Self { entries: HashMap::new() }
    }

    /// Registry populated with the built-in headcount and usage predictors.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        headcount::register_builtins(&mut registry);
        usage::register_builtins(&mut registry);
        registry
    }

    /// Register a predictor.
    ///
    /// Errors
    /// ------
    /// - [`ForecastError::DuplicatePredictor`] if the key is already taken.
    pub fn register(
        &mut self, category: PredictorCategory, name: &str, function: PredictorFn,
        state_dependent: bool,
    ) -> ForecastResult<()> {
        let key = (category, name.to_string());
        if self.entries.contains_key(&key) {
            return Err(ForecastError::DuplicatePredictor { category, name: name.to_string() });
        }
        self.entries.insert(key, RegisteredPredictor { function, state_dependent });
        Ok(())
    }

    // Built-in names are fixed and distinct.
    pub(crate) fn insert_builtin(
        &mut self, category: PredictorCategory, name: &str, function: PredictorFn,
        state_dependent: bool,
    ) {
        let entry = RegisteredPredictor { function, state_dependent };
        self.entries.insert((category, name.to_string()), entry);
    }

    /// Look up an entry.
    ///
    /// Errors
    /// ------
    /// - [`ForecastError::UnknownPredictor`] if `(category, name)` is not registered.
    pub fn get(
        &self, category: PredictorCategory, name: &str,
    ) -> ForecastResult<RegisteredPredictor> {
        self.entries
            .get(&(category, name.to_string()))
            .copied()
            .ok_or_else(|| ForecastError::UnknownPredictor { category, name: name.to_string() })
    }

    /// Whether the named predictor needs a projected company state.
    pub fn is_state_dependent(
        &self, category: PredictorCategory, name: &str,
    ) -> ForecastResult<bool> {
        Ok(self.get(category, name)?.state_dependent)
    }

    /// Sorted names registered under `category`.
    pub fn names(&self, category: PredictorCategory) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .entries
            .keys()
            .filter(|(c, _)| *c == category)
            .map(|(_, name)| name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    /// Resolve and invoke a predictor.
    ///
    /// Parameters
    /// ----------
    /// - `category`, `name`: registry key.
    /// - `effective_date`: date being predicted.
    /// - `params`: the predictor's configured parameters.
    /// - `start`: cohort start date; required for [`PredictorCategory::Usage`].
    /// - `state`: projected company state; required for state-dependent entries.
    ///
    /// Errors
    /// ------
    /// - [`ForecastError::UnknownPredictor`] for an unregistered key.
    /// - [`ForecastError::MissingState`] for a state-dependent entry without `state`.
    /// - [`ForecastError::MissingStartDate`] for a usage predictor without `start`.
    /// - Any error returned by the predictor itself (e.g.
    ///   [`ForecastError::PredictorParamsMismatch`]).
    pub fn predict(
        &self, category: PredictorCategory, name: &str, effective_date: NaiveDate,
        params: PredictorParams<'_>, start: Option<NaiveDate>,
        state: Option<&PredictedCompanyState<'_>>,
    ) -> ForecastResult<Prediction> {
        let entry = self.get(category, name)?;
        if entry.state_dependent && state.is_none() {
            return Err(ForecastError::MissingState { name: name.to_string() });
        }
        if category == PredictorCategory::Usage && start.is_none() {
            return Err(ForecastError::MissingStartDate { name: name.to_string() });
        }
        let call = PredictorCall { name, effective_date, params, start, state };
        (entry.function)(&call)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        predicting::{
            headcount::{ConstantHeadcount, ScaleWithCustomers},
            usage::ConstantUsage,
        },
        scenario::Actuals,
    };
    use std::collections::BTreeMap;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    // Purpose
    // -------
    // The built-in set is registered under the documented names.
    fn builtins_are_registered() {
        let registry = PredictorRegistry::with_builtins();
        assert_eq!(
            registry.names(PredictorCategory::Headcount),
            vec!["constant", "linear_with_max", "scale_with_customers"]
        );
        assert_eq!(registry.names(PredictorCategory::Usage), vec!["constant", "linear"]);
        assert!(registry
            .is_state_dependent(PredictorCategory::Headcount, "scale_with_customers")
            .unwrap());
        assert!(!registry.is_state_dependent(PredictorCategory::Usage, "linear").unwrap());
    }

    #[test]
    // Purpose
    // -------
    // Lookup and contract failures surface as the documented errors.
    //
    // Expect
    // ------
    // - Unknown name → `UnknownPredictor`.
    // - State-dependent predictor without state → `MissingState`.
    // - Usage predictor without start → `MissingStartDate`.
    fn predict_contract_errors() {
        let registry = PredictorRegistry::with_builtins();
        let hc = HeadcountPredictor::Constant(ConstantHeadcount { count: 2 });
        let scale =
            HeadcountPredictor::ScaleWithCustomers(ScaleWithCustomers { customers_per_person: 5 });
        let usage = UsagePredictor::Constant(ConstantUsage { initial_usage: UFloat::exact(1.0) });
        let on = date(2025, 1, 31);

        let hc_params = PredictorParams::Headcount(&hc);
        let err = registry
            .predict(PredictorCategory::Headcount, "nope", on, hc_params, None, None)
            .unwrap_err();
        assert!(matches!(err, ForecastError::UnknownPredictor { .. }));

        let err = registry
            .predict(
                PredictorCategory::Headcount,
                "scale_with_customers",
                on,
                PredictorParams::Headcount(&scale),
                None,
                None,
            )
            .unwrap_err();
        assert!(matches!(err, ForecastError::MissingState { .. }));

        let usage_params = PredictorParams::Usage(&usage);
        let err = registry
            .predict(PredictorCategory::Usage, "constant", on, usage_params, None, None)
            .unwrap_err();
        assert!(matches!(err, ForecastError::MissingStartDate { .. }));

        let err = registry
            .predict(PredictorCategory::Headcount, "constant", on, usage_params, None, None)
            .unwrap_err();
        assert!(matches!(err, ForecastError::PredictorParamsMismatch { .. }));
    }

    #[test]
    // Purpose
    // -------
    // A state-dependent predictor receives the state it was given.
    fn state_dependent_predictor_uses_state() {
        let registry = PredictorRegistry::with_builtins();
        let actuals = Actuals::new(date(2025, 1, 31), 0.0, BTreeMap::new()).unwrap();
        let state = PredictedCompanyState::new(date(2025, 3, 31), 11, &actuals).unwrap();
        let scale =
            HeadcountPredictor::ScaleWithCustomers(ScaleWithCustomers { customers_per_person: 5 });
        let out = registry
            .predict(
                PredictorCategory::Headcount,
                "scale_with_customers",
                date(2025, 3, 31),
                PredictorParams::Headcount(&scale),
                None,
                Some(&state),
            )
            .unwrap();
        assert_eq!(out, Prediction::Count(3));
    }

    #[test]
    // Purpose
    // -------
    // Custom registration works once per key and is dispatched like a built-in.
    fn custom_registration() {
        fn always_seven(_: &PredictorCall<'_>) -> ForecastResult<Prediction> {
            Ok(Prediction::Count(7))
        }
        let mut registry = PredictorRegistry::with_builtins();
        registry.register(PredictorCategory::Headcount, "seven", always_seven, false).unwrap();
        let err = registry.register(PredictorCategory::Headcount, "seven", always_seven, false);
        assert!(matches!(err, Err(ForecastError::DuplicatePredictor { .. })));

        let hc = HeadcountPredictor::Constant(ConstantHeadcount { count: 2 });
        let out = registry
            .predict(
                PredictorCategory::Headcount,
                "seven",
                date(2025, 1, 31),
                PredictorParams::Headcount(&hc),
                None,
                None,
            )
            .unwrap();
        assert_eq!(out.nominal(), 7.0);
    }
}

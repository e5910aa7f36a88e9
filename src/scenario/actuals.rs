//! Actuals — the known ground-truth snapshot a forecast starts from.
//!
//! Purpose
//! -------
//! Record what is known at a reference date: cash on hand and the number of
//! active customers per customer type. Every month up to and including the
//! reference month reads customer counts from here; every later month is
//! simulated.
//!
//! Invariants & assumptions
//! ------------------------
//! - `accurate_as_of` is always an end-of-month date; other dates are coerced
//!   (logged at `debug`).
//! - A future `accurate_as_of` is accepted but logged at `warn`.
//! - Customer types absent from `active_customers` are an error on lookup,
//!   never an implicit zero.
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::{
    calendar::{Month, end_of_month, is_end_of_month},
    errors::{ForecastError, ForecastResult},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ActualsDocument")]
pub struct Actuals {
    accurate_as_of: NaiveDate,
    cash_on_hand: f64,
    active_customers: BTreeMap<String, u64>,
}

impl Actuals {
    /// Build a validated snapshot.
    ///
    /// Parameters
    /// ----------
    /// - `accurate_as_of`: reference date; coerced to the end of its month.
    /// - `cash_on_hand`: cash at the reference date.
    /// - `active_customers`: active customer count per customer-type name.
    ///
    /// Errors
    /// ------
    /// - [`ForecastError::InvalidParameter`] if `cash_on_hand` is not finite.
    /// - [`ForecastError::DateOutOfRange`] if the month end is not representable.
    pub fn new(
        accurate_as_of: NaiveDate, cash_on_hand: f64, active_customers: BTreeMap<String, u64>,
    ) -> ForecastResult<Self> {
        if !cash_on_hand.is_finite() {
            return Err(ForecastError::InvalidParameter {
                field: "actuals.cash_on_hand".to_string(),
                value: cash_on_hand,
                reason: "must be finite",
            });
        }
        let accurate_as_of = if is_end_of_month(accurate_as_of) {
            accurate_as_of
        } else {
            let coerced = end_of_month(accurate_as_of)?;
            debug!(%accurate_as_of, %coerced, "accurate_as_of coerced to end of month");
            coerced
        };
        if accurate_as_of > Local::now().date_naive() {
            warn!(%accurate_as_of, "accurate_as_of is in the future");
        }
        Ok(Actuals { accurate_as_of, cash_on_hand, active_customers })
    }

    /// Parse and validate a JSON document.
    ///
    /// Errors
    /// ------
    /// - [`ForecastError::Document`] if the JSON does not have the expected shape.
    /// - Any error from [`Actuals::new`].
    pub fn from_json(text: &str) -> ForecastResult<Self> {
        let doc: ActualsDocument = serde_json::from_str(text)?;
        Actuals::try_from(doc)
    }

    pub fn accurate_as_of(&self) -> NaiveDate {
        self.accurate_as_of
    }

    pub fn cash_on_hand(&self) -> f64 {
        self.cash_on_hand
    }

    pub fn active_customers(&self) -> &BTreeMap<String, u64> {
        &self.active_customers
    }

    /// Month containing `accurate_as_of`; the last month with known counts.
    pub fn reference_month(&self) -> Month {
        Month::from_date(self.accurate_as_of)
    }

    /// First month whose customer counts must be simulated.
    pub fn first_unknown_month(&self) -> Month {
        self.reference_month().shift(1)
    }

    /// Known active customers of one type.
    ///
    /// Errors
    /// ------
    /// - [`ForecastError::UnknownCustomerType`] if the type is not recorded.
    pub fn active_count(&self, customer_type: &str) -> ForecastResult<u64> {
        self.active_customers
            .get(customer_type)
            .copied()
            .ok_or_else(|| ForecastError::UnknownCustomerType { name: customer_type.to_string() })
    }
}

#[derive(Deserialize)]
struct ActualsDocument {
    accurate_as_of: NaiveDate,
    cash_on_hand: f64,
    #[serde(default)]
    active_customers: BTreeMap<String, u64>,
}

impl TryFrom<ActualsDocument> for Actuals {
    type Error = ForecastError;

    fn try_from(doc: ActualsDocument) -> ForecastResult<Actuals> {
        Actuals::new(doc.accurate_as_of, doc.cash_on_hand, doc.active_customers)
    }
}

//! calendar — month-level time axis for forecasts.
//!
//! The engine steps through calendar months; everything finer than a month
//! (hire dates, cohort starts) is expressed as `chrono::NaiveDate` and
//! normalized to end-of-month before it reaches a predictor.

pub mod month;

pub use self::month::{Month, MonthRange, end_of_month, is_end_of_month};

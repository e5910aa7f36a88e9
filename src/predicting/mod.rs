//! predicting — pluggable headcount and usage predictors.
//!
//! Purpose
//! -------
//! Turn the hand-specified predictor configuration of a scenario (how many
//! people a role has hired by a date, how much a customer uses the product at
//! a given age) into numbers the engine can aggregate.
//!
//! Key behaviors
//! -------------
//! - [`registry`] holds the `(category, name)` dispatch table and the call
//!   contract (state dependence, usage start dates).
//! - [`headcount`] and [`usage`] define the tagged parameter enums that
//!   appear in scenario documents and the built-in predictor functions.
//! - [`state`] defines [`PredictedCompanyState`], the projection passed to
//!   state-dependent predictors.
//!
//! Invariants & assumptions
//! ------------------------
//! - Predictors are pure: the same call yields the same result, which the
//!   engine's memoization relies on.
//! - Predictors that depend on projected state can create cycles with the
//!   sales funnel (headcount → quota → customers → headcount); the engine
//!   reports those as `CircularDependency` instead of recursing forever.

pub mod headcount;
pub mod registry;
pub mod state;
pub mod usage;

pub use self::{
    headcount::HeadcountPredictor,
    registry::{
        Prediction, PredictorCall, PredictorCategory, PredictorFn, PredictorParams,
        PredictorRegistry, RegisteredPredictor,
    },
    state::PredictedCompanyState,
    usage::UsagePredictor,
};

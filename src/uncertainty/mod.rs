//! uncertainty — scalar quantities with propagated standard deviations.
//!
//! Purpose
//! -------
//! Provide [`UFloat`], the number type every monetary and usage figure in the
//! forecast is expressed in. Fees, COGS, and usage parameters are configured
//! as uncertain inputs; the engine combines them across months and cohorts,
//! and the resulting standard deviations must account for the same input
//! being reused many times.
//!
//! Key behaviors
//! -------------
//! - Represent each value as a nominal number plus a sparse gradient with
//!   respect to independent input variables (forward-mode differentiation of
//!   the computation graph), giving first-order, correlation-correct σ.
//! - Support `+ - * /` between quantities and with plain `f64` scalars, plus
//!   `Sum`, `Neg`, and the assign variants.
//! - Parse and serialize the textual forms used in scenario documents
//!   (`"100+/-5"`, `"100±5"`, `"1.25(3)"`).
//!
//! Invariants & assumptions
//! ------------------------
//! - Standard deviations are never negative.
//! - Independent variables are identified process-wide; two separately
//!   parsed inputs are always uncorrelated, a cloned input is the same
//!   variable.
//!
//! Testing notes
//! -------------
//! - `ufloat` tests cover propagation rules and correlation tracking.
//! - `parse` tests cover textual forms and serde behavior.

pub mod parse;
pub mod ufloat;

pub use self::ufloat::{UFloat, VarId};

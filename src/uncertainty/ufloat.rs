//! UFloat — nominal value plus first-order uncertainty with exact correlation tracking.
//!
//! Purpose
//! -------
//! Carry a scalar estimate together with its standard deviation through the
//! whole forecasting stack, so that revenue, expense and cash figures report
//! an uncertainty that reflects every configured input.
//!
//! Key behaviors
//! -------------
//! - Each [`UFloat::new`] call with a non-zero standard deviation creates a
//!   fresh independent variable identified by a process-unique [`VarId`].
//! - Every derived value stores the linear sensitivity to each upstream
//!   variable (scaled by that variable's σ). Arithmetic propagates those
//!   sensitivities by forward-mode differentiation.
//! - Quantities that share an upstream variable combine linearly in that
//!   variable, so `x + x` has σ = 2σₓ and `x − x` has σ = 0. Summing many
//!   months' worth of values derived from the same `initial_usage` therefore
//!   neither double-counts nor under-counts its contribution.
//!
//! Invariants & assumptions
//! ------------------------
//! - `terms` is sorted by `VarId` with no duplicate ids; zero coefficients
//!   are dropped.
//! - `std_dev() = sqrt(Σ cᵢ²) >= 0` always holds.
//! - Propagation is first order (linear error propagation); products and
//!   quotients are linearized at the nominal values.
//!
//! Conventions
//! -----------
//! - Division by a quantity with a zero nominal value follows IEEE-754 and
//!   yields non-finite components; callers validate divisors upstream.
//! - Equality is structural (same nominal, same sensitivities). Ordering is
//!   by nominal value only and is exposed as [`UFloat::nominal_cmp`] rather
//!   than through `PartialOrd`.
use std::{
    cmp::Ordering,
    iter::Sum,
    ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign},
    sync::atomic::{AtomicU64, Ordering as AtomicOrdering},
};

use crate::errors::{ForecastError, ForecastResult};

static NEXT_VAR_ID: AtomicU64 = AtomicU64::new(0);

/// Identifier of an independent random variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(u64);

impl VarId {
    fn fresh() -> Self {
        VarId(NEXT_VAR_ID.fetch_add(1, AtomicOrdering::Relaxed))
    }
}

/// UFloat — a number with propagated, correlation-aware uncertainty.
///
/// Fields
/// ------
/// - `nominal`: `f64`
///   Best estimate of the quantity.
/// - `terms`: `Vec<(VarId, f64)>`
///   Sparse gradient w.r.t. independent variables, each entry already
///   multiplied by that variable's standard deviation, sorted by id.
///
/// Performance
/// -----------
/// - Binary operations merge two sorted term lists in O(n + m).
/// - Cloning copies the term list; values derived from a handful of
///   configured inputs stay small.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UFloat {
    nominal: f64,
    terms: Vec<(VarId, f64)>,
}

impl UFloat {
    /// Create a new independent uncertain quantity.
    ///
    /// Errors
    /// ------
    /// - [`ForecastError::InvalidUncertainty`] if either component is
    ///   non-finite or `stddev < 0`.
    pub fn new(nominal: f64, stddev: f64) -> ForecastResult<Self> {
        if !nominal.is_finite() || !stddev.is_finite() {
            return Err(ForecastError::InvalidUncertainty {
                input: format!("{nominal}+/-{stddev}"),
                reason: "nominal value and standard deviation must be finite",
            });
        }
        if stddev < 0.0 {
            return Err(ForecastError::InvalidUncertainty {
                input: format!("{nominal}+/-{stddev}"),
                reason: "standard deviation must be non-negative",
            });
        }
        let terms = if stddev > 0.0 { vec![(VarId::fresh(), stddev)] } else { Vec::new() };
        Ok(UFloat { nominal, terms })
    }

    /// A value with no uncertainty.
    pub fn exact(nominal: f64) -> Self {
        UFloat { nominal, terms: Vec::new() }
    }

    pub fn zero() -> Self {
        UFloat::exact(0.0)
    }

    pub fn nominal(&self) -> f64 {
        self.nominal
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn variance(&self) -> f64 {
        // Folding from +0.0 keeps exact values at a positive-zero spread.
        self.terms.iter().fold(0.0, |acc, (_, c)| acc + c * c)
    }

    /// Whether the value carries no uncertainty at all.
    pub fn is_exact(&self) -> bool {
        self.terms.is_empty()
    }

    /// First-order covariance with `other`, from the shared upstream variables.
    pub fn covariance(&self, other: &UFloat) -> f64 {
        let (mut i, mut j, mut acc) = (0, 0, 0.0);
        while i < self.terms.len() && j < other.terms.len() {
            let (a_id, a) = self.terms[i];
            let (b_id, b) = other.terms[j];
            match a_id.cmp(&b_id) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => {
                    acc += a * b;
                    i += 1;
                    j += 1;
                }
            }
        }
        acc
    }

    /// First-order derivative of `self` with respect to the independent input `var`.
    ///
    /// Returns
    /// -------
    /// - `Some(∂self/∂var)` when `var` is a single independent variable (as
    ///   created by [`UFloat::new`] with a non-zero σ).
    /// - `None` when `var` is exact or itself derived from several inputs.
    pub fn derivative_wrt(&self, var: &UFloat) -> Option<f64> {
        let [(id, sigma)] = var.terms.as_slice() else {
            return None;
        };
        let coefficient = self
            .terms
            .binary_search_by(|(other, _)| other.cmp(id))
            .map_or(0.0, |idx| self.terms[idx].1);
        Some(coefficient / sigma)
    }

    /// Correlation coefficient with `other`; `0.0` when either side is exact.
    pub fn correlation(&self, other: &UFloat) -> f64 {
        let denom = self.std_dev() * other.std_dev();
        if denom == 0.0 { 0.0 } else { self.covariance(other) / denom }
    }

    /// Compare by nominal value only.
    pub fn nominal_cmp(&self, other: &UFloat) -> Ordering {
        self.nominal.total_cmp(&other.nominal)
    }

    /// Number of independent variables this value depends on.
    pub fn dependency_count(&self) -> usize {
        self.terms.len()
    }

    fn scaled(&self, nominal: f64, factor: f64) -> UFloat {
        let terms = if factor == 0.0 {
            Vec::new()
        } else {
            self.terms.iter().map(|&(id, c)| (id, c * factor)).collect()
        };
        UFloat { nominal, terms }
    }

    // nominal plus the linear combination a·self + b·other of the sensitivities
    fn combine(&self, other: &UFloat, nominal: f64, a: f64, b: f64) -> UFloat {
        let mut terms = Vec::with_capacity(self.terms.len() + other.terms.len());
        let (mut i, mut j) = (0, 0);
        let mut push = |id: VarId, c: f64| {
            if c != 0.0 {
                terms.push((id, c));
            }
        };
        while i < self.terms.len() || j < other.terms.len() {
            match (self.terms.get(i), other.terms.get(j)) {
                (Some(&(x_id, x)), Some(&(y_id, y))) => match x_id.cmp(&y_id) {
                    Ordering::Less => {
                        push(x_id, a * x);
                        i += 1;
                    }
                    Ordering::Greater => {
                        push(y_id, b * y);
                        j += 1;
                    }
                    Ordering::Equal => {
                        push(x_id, a * x + b * y);
                        i += 1;
                        j += 1;
                    }
                },
                (Some(&(x_id, x)), None) => {
                    push(x_id, a * x);
                    i += 1;
                }
                (None, Some(&(y_id, y))) => {
                    push(y_id, b * y);
                    j += 1;
                }
                (None, None) => break,
            }
        }
        UFloat { nominal, terms }
    }

    fn add_impl(&self, rhs: &UFloat) -> UFloat {
        self.combine(rhs, self.nominal + rhs.nominal, 1.0, 1.0)
    }

    fn sub_impl(&self, rhs: &UFloat) -> UFloat {
        self.combine(rhs, self.nominal - rhs.nominal, 1.0, -1.0)
    }

    fn mul_impl(&self, rhs: &UFloat) -> UFloat {
        self.combine(rhs, self.nominal * rhs.nominal, rhs.nominal, self.nominal)
    }

    fn div_impl(&self, rhs: &UFloat) -> UFloat {
        let nominal = self.nominal / rhs.nominal;
        self.combine(rhs, nominal, 1.0 / rhs.nominal, -nominal / rhs.nominal)
    }
}

impl From<f64> for UFloat {
    fn from(value: f64) -> Self {
        UFloat::exact(value)
    }
}

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $imp:ident) => {
        impl $trait<UFloat> for UFloat {
            type Output = UFloat;
            fn $method(self, rhs: UFloat) -> UFloat {
                self.$imp(&rhs)
            }
        }
        impl $trait<&UFloat> for UFloat {
            type Output = UFloat;
            fn $method(self, rhs: &UFloat) -> UFloat {
                self.$imp(rhs)
            }
        }
        impl $trait<UFloat> for &UFloat {
            type Output = UFloat;
            fn $method(self, rhs: UFloat) -> UFloat {
                self.$imp(&rhs)
            }
        }
        impl $trait<&UFloat> for &UFloat {
            type Output = UFloat;
            fn $method(self, rhs: &UFloat) -> UFloat {
                self.$imp(rhs)
            }
        }
    };
}

impl_binary_op!(Add, add, add_impl);
impl_binary_op!(Sub, sub, sub_impl);
impl_binary_op!(Mul, mul, mul_impl);
impl_binary_op!(Div, div, div_impl);

macro_rules! impl_scalar_ops {
    ($lhs:ty) => {
        impl Add<f64> for $lhs {
            type Output = UFloat;
            fn add(self, rhs: f64) -> UFloat {
                self.scaled(self.nominal + rhs, 1.0)
            }
        }
        impl Sub<f64> for $lhs {
            type Output = UFloat;
            fn sub(self, rhs: f64) -> UFloat {
                self.scaled(self.nominal - rhs, 1.0)
            }
        }
        impl Mul<f64> for $lhs {
            type Output = UFloat;
            fn mul(self, rhs: f64) -> UFloat {
                self.scaled(self.nominal * rhs, rhs)
            }
        }
        impl Div<f64> for $lhs {
            type Output = UFloat;
            fn div(self, rhs: f64) -> UFloat {
                self.scaled(self.nominal / rhs, 1.0 / rhs)
            }
        }
        impl Add<$lhs> for f64 {
            type Output = UFloat;
            fn add(self, rhs: $lhs) -> UFloat {
                rhs.scaled(self + rhs.nominal, 1.0)
            }
        }
        impl Sub<$lhs> for f64 {
            type Output = UFloat;
            fn sub(self, rhs: $lhs) -> UFloat {
                rhs.scaled(self - rhs.nominal, -1.0)
            }
        }
        impl Mul<$lhs> for f64 {
            type Output = UFloat;
            fn mul(self, rhs: $lhs) -> UFloat {
                rhs.scaled(self * rhs.nominal, self)
            }
        }
        impl Div<$lhs> for f64 {
            type Output = UFloat;
            fn div(self, rhs: $lhs) -> UFloat {
                let nominal = self / rhs.nominal;
                rhs.scaled(nominal, -nominal / rhs.nominal)
            }
        }
    };
}

impl_scalar_ops!(UFloat);
impl_scalar_ops!(&UFloat);

impl Neg for UFloat {
    type Output = UFloat;
    fn neg(self) -> UFloat {
        self.scaled(-self.nominal, -1.0)
    }
}

impl Neg for &UFloat {
    type Output = UFloat;
    fn neg(self) -> UFloat {
        self.scaled(-self.nominal, -1.0)
    }
}

impl AddAssign<UFloat> for UFloat {
    fn add_assign(&mut self, rhs: UFloat) {
        *self = self.add_impl(&rhs);
    }
}

impl AddAssign<&UFloat> for UFloat {
    fn add_assign(&mut self, rhs: &UFloat) {
        *self = self.add_impl(rhs);
    }
}

impl SubAssign<UFloat> for UFloat {
    fn sub_assign(&mut self, rhs: UFloat) {
        *self = self.sub_impl(&rhs);
    }
}

impl SubAssign<&UFloat> for UFloat {
    fn sub_assign(&mut self, rhs: &UFloat) {
        *self = self.sub_impl(rhs);
    }
}

impl Sum for UFloat {
    fn sum<I: Iterator<Item = UFloat>>(iter: I) -> UFloat {
        iter.fold(UFloat::zero(), |acc, x| acc.add_impl(&x))
    }
}

impl<'a> Sum<&'a UFloat> for UFloat {
    fn sum<I: Iterator<Item = &'a UFloat>>(iter: I) -> UFloat {
        iter.fold(UFloat::zero(), |acc, x| acc.add_impl(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Construction validation.
    // - Correlation-correct propagation for sums/differences of shared inputs.
    // - Linearized products and quotients against closed-form σ.
    // - Scalar operations on both sides.
    //
    // They intentionally DO NOT cover string parsing; see `parse.rs`.
    // -------------------------------------------------------------------------

    fn uf(n: f64, s: f64) -> UFloat {
        UFloat::new(n, s).expect("valid ufloat")
    }

    #[test]
    // Purpose
    // -------
    // Negative or non-finite σ is rejected; σ = 0 yields an exact value.
    fn new_validates_components() {
        assert!(UFloat::new(1.0, -0.1).is_err());
        assert!(UFloat::new(f64::NAN, 0.1).is_err());
        assert!(UFloat::new(1.0, f64::INFINITY).is_err());
        assert!(uf(3.0, 0.0).is_exact());
    }

    #[test]
    // Purpose
    // -------
    // Shared variables add linearly rather than in quadrature.
    //
    // Given
    // -----
    // - x = 10 ± 2, y = 5 ± 1 independent.
    //
    // Expect
    // ------
    // - σ(x + x) = 4, σ(x − x) = 0, σ(x + y) = √5.
    fn sums_track_correlation() {
        let x = uf(10.0, 2.0);
        let y = uf(5.0, 1.0);

        assert_relative_eq!((&x + &x).std_dev(), 4.0);
        assert_relative_eq!((&x - &x).std_dev(), 0.0);
        assert_relative_eq!((&x + &y).std_dev(), 5f64.sqrt());
        assert_relative_eq!((&x * 3.0 - &x * 2.0).std_dev(), 2.0);

        let total: UFloat = (0..12).map(|_| x.clone()).sum();
        assert_relative_eq!(total.nominal(), 120.0);
        assert_relative_eq!(total.std_dev(), 24.0);
    }

    #[test]
    // Purpose
    // -------
    // Products and quotients follow first-order propagation.
    //
    // Expect
    // ------
    // - σ(x·y) = sqrt((y σx)² + (x σy)²).
    // - σ(x / y) = |x/y| · sqrt((σx/x)² + (σy/y)²).
    // - x / x is exactly 1 with zero σ.
    fn products_and_quotients_linearize() {
        let x = uf(10.0, 2.0);
        let y = uf(5.0, 1.0);

        let prod = &x * &y;
        assert_relative_eq!(prod.nominal(), 50.0);
        assert_relative_eq!(prod.std_dev(), (100.0f64 + 100.0).sqrt());

        let quot = &x / &y;
        assert_relative_eq!(quot.nominal(), 2.0);
        assert_relative_eq!(quot.std_dev(), 2.0 * (0.04f64 + 0.04).sqrt(), epsilon = 1e-12);

        let unit = &x / &x;
        assert_relative_eq!(unit.nominal(), 1.0);
        assert_relative_eq!(unit.std_dev(), 0.0, epsilon = 1e-15);
    }

    #[test]
    // Purpose
    // -------
    // Scalar operations on either side scale or shift the sensitivities.
    fn scalar_operations() {
        let x = uf(4.0, 1.0);
        assert_relative_eq!((&x * 2.5).std_dev(), 2.5);
        assert_relative_eq!((2.5 * &x).std_dev(), 2.5);
        assert_relative_eq!((&x + 100.0).std_dev(), 1.0);
        assert_relative_eq!((100.0 - &x).nominal(), 96.0);
        assert_relative_eq!((&x / 2.0).std_dev(), 0.5);
        assert_relative_eq!((8.0 / &x).nominal(), 2.0);
        assert_relative_eq!((8.0 / &x).std_dev(), 0.5);
        assert_relative_eq!((-&x).nominal(), -4.0);
        assert_relative_eq!((&x * 0.0).std_dev(), 0.0);
    }

    #[test]
    // Purpose
    // -------
    // Covariance/correlation reflect shared derivation.
    fn covariance_and_correlation() {
        let x = uf(1.0, 2.0);
        let y = uf(1.0, 3.0);
        let a = &x * 2.0 + &y;
        assert_relative_eq!(a.covariance(&x), 8.0);
        assert_relative_eq!(x.correlation(&(&x * 5.0)), 1.0);
        assert_relative_eq!(x.correlation(&y), 0.0);
        assert_relative_eq!(x.correlation(&UFloat::exact(1.0)), 0.0);
    }

    #[test]
    // Purpose
    // -------
    // Derivatives are recovered from the σ-scaled sensitivities.
    fn derivative_wrt_independent_input() {
        let x = uf(3.0, 0.5);
        let y = uf(2.0, 4.0);
        let f = &x * &x * 2.0 + &y;
        assert_relative_eq!(f.derivative_wrt(&x).unwrap(), 12.0, epsilon = 1e-12);
        assert_relative_eq!(f.derivative_wrt(&y).unwrap(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(x.derivative_wrt(&y).unwrap(), 0.0);
        assert!(f.derivative_wrt(&UFloat::exact(1.0)).is_none());
        assert!(f.derivative_wrt(&(&x + &y)).is_none());
    }

    #[test]
    fn nominal_cmp_ignores_uncertainty() {
        let small = uf(1.0, 100.0);
        let big = uf(2.0, 0.0);
        assert_eq!(small.nominal_cmp(&big), Ordering::Less);
        assert_eq!(big.nominal_cmp(&small), Ordering::Greater);
    }

    #[test]
    fn accumulating_assign_ops() {
        let x = uf(1.0, 1.0);
        let mut acc = UFloat::zero();
        acc += &x;
        acc += x.clone();
        acc -= &x;
        assert_relative_eq!(acc.nominal(), 1.0);
        assert_relative_eq!(acc.std_dev(), 1.0);
        assert_eq!(acc.dependency_count(), 1);
    }

    #[test]
    // Purpose
    // -------
    // Exact values report a positive-zero spread, so they print and
    // serialize as `n+/-0`.
    fn exact_values_have_positive_zero_stddev() {
        for x in [UFloat::exact(3.0), UFloat::zero(), UFloat::exact(-2.5) * 4.0] {
            assert_eq!(x.variance(), 0.0);
            assert!(!x.variance().is_sign_negative());
            assert!(!x.std_dev().is_sign_negative());
        }
        let x = uf(1.0, 1.0);
        assert!(!(&x - &x).std_dev().is_sign_negative());
        assert_eq!(UFloat::exact(3.0).to_string(), "3+/-0");
    }

    proptest! {
        #[test]
        // Purpose
        // -------
        // Independent inputs add in quadrature, a value cancels against itself,
        // and scaling multiplies σ by |k|.
        fn propagation_properties(
            a in -1e3f64..1e3, sa in 0.0f64..1e2,
            b in -1e3f64..1e3, sb in 0.0f64..1e2,
            k in -10.0f64..10.0,
        ) {
            let x = UFloat::new(a, sa).unwrap();
            let y = UFloat::new(b, sb).unwrap();

            let sum = &x + &y;
            let expected = sa * sa + sb * sb;
            prop_assert!((sum.variance() - expected).abs() <= 1e-9 * (1.0 + sum.variance()));
            prop_assert_eq!((&x - &x).std_dev(), 0.0);
            prop_assert!(((&x * k).std_dev() - k.abs() * sa).abs() <= 1e-9 * (1.0 + sa));
        }
    }
}

//! Textual and serde representations of [`UFloat`].
//!
//! Accepted forms
//! --------------
//! - `"1000+/-100"` or `"1000±100"`: explicit standard deviation.
//! - `"1000(5)"` / `"1.25(3)"`: uncertainty on the last digits
//!   (`1.25(3)` means `1.25 ± 0.03`).
//! - `"1000"` / `"0.5"`: ±1 on the last digit (`1000 ± 1`, `0.5 ± 0.1`).
//!   Exponents scale that digit: `"1e3"` is `1000 ± 1000`, `"2.5e-2"` is
//!   `0.025 ± 0.001`.
//! - JSON numbers deserialize as exact values.
//!
//! Serialization always emits the `nominal+/-stddev` string form.
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};

use crate::{
    errors::{ForecastError, ForecastResult},
    uncertainty::ufloat::UFloat,
};

fn invalid(input: &str, reason: &'static str) -> ForecastError {
    ForecastError::InvalidUncertainty { input: input.to_string(), reason }
}

fn parse_number(raw: &str, input: &str) -> ForecastResult<f64> {
    raw.trim().parse::<f64>().map_err(|_| invalid(input, "expected a decimal number"))
}

// Unit of the last written digit: "1000" -> 1, "1.25" -> 0.01, "1e3" -> 1000.
fn last_digit_unit(raw: &str, input: &str) -> ForecastResult<f64> {
    let raw = raw.trim();
    let (mantissa, exponent) = match raw.split_once(['e', 'E']) {
        Some((mantissa, exp)) => {
            let exp =
                exp.parse::<i32>().map_err(|_| invalid(input, "expected an integer exponent"))?;
            (mantissa, exp)
        }
        None => (raw, 0),
    };
    let decimals = mantissa.split_once('.').map_or(0, |(_, frac)| frac.len());
    let decimals = i32::try_from(decimals).map_err(|_| invalid(input, "too many decimal places"))?;
    Ok(10f64.powi(exponent.saturating_sub(decimals)))
}

impl FromStr for UFloat {
    type Err = ForecastError;

    fn from_str(input: &str) -> ForecastResult<Self> {
        let s = input.trim();
        if s.is_empty() {
            return Err(invalid(input, "empty string"));
        }

        if let Some((nominal, stddev)) = s.split_once("+/-").or_else(|| s.split_once('±')) {
            return UFloat::new(parse_number(nominal, input)?, parse_number(stddev, input)?);
        }

        if let Some((nominal, rest)) = s.split_once('(') {
            let digits = rest
                .strip_suffix(')')
                .ok_or_else(|| invalid(input, "unterminated parenthesized uncertainty"))?;
            let value = parse_number(nominal, input)?;
            let last_digits = parse_number(digits, input)?;
            return UFloat::new(value, last_digits * last_digit_unit(nominal, input)?);
        }

        let value = parse_number(s, input)?;
        UFloat::new(value, last_digit_unit(s, input)?)
    }
}

impl fmt::Display for UFloat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+/-{}", self.nominal(), self.std_dev())
    }
}

impl Serialize for UFloat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawUFloat {
    Number(f64),
    Text(String),
}

impl<'de> Deserialize<'de> for UFloat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawUFloat::deserialize(deserializer)? {
            RawUFloat::Number(value) => {
                UFloat::new(value, 0.0).map_err(serde::de::Error::custom)
            }
            RawUFloat::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}

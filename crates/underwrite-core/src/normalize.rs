//! Coercion of loosely-typed deal fields into decimals.
//!
//! Form entry and document extraction both deliver numbers as either JSON
//! numbers or text such as `"$1,250,000"`, `"92%"` or `"1.8x"`. Nothing here
//! fails: unparseable or out-of-range input falls back to the caller's default.

use std::str::FromStr;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::Rate;

/// A field value as supplied upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(Decimal),
    Text(String),
}

impl From<Decimal> for RawValue {
    fn from(v: Decimal) -> Self {
        RawValue::Number(v)
    }
}

impl From<f64> for RawValue {
    /// Non-finite floats are kept as text so they normalize to the default.
    fn from(v: f64) -> Self {
        match Decimal::from_f64(v) {
            Some(d) => RawValue::Number(d),
            None => RawValue::Text(v.to_string()),
        }
    }
}

impl From<i64> for RawValue {
    fn from(v: i64) -> Self {
        RawValue::Number(Decimal::from(v))
    }
}

impl From<u32> for RawValue {
    fn from(v: u32) -> Self {
        RawValue::Number(Decimal::from(v))
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        RawValue::Text(v.to_string())
    }
}

impl From<String> for RawValue {
    fn from(v: String) -> Self {
        RawValue::Text(v)
    }
}

const STRIPPED: [char; 7] = [',', '$', '€', '£', '¥', '%', '_'];

/// Largest accepted magnitude for any single field ($1 trillion). Keeps every
/// product and sum in the pro forma inside `Decimal` range.
pub const MAX_MAGNITUDE: Decimal = dec!(1000000000000);

/// Rates are accepted within `[-MAX_RATE, MAX_RATE]` after percent scaling.
pub const MAX_RATE: Rate = Decimal::ONE;

/// Parse a raw value, returning None when absent, empty, unparseable or
/// larger in magnitude than [`MAX_MAGNITUDE`].
pub fn parse(raw: Option<&RawValue>) -> Option<Decimal> {
    let value = match raw? {
        RawValue::Number(n) => Some(*n),
        RawValue::Text(s) => parse_text(s),
    }?;
    (value.abs() <= MAX_MAGNITUDE).then_some(value)
}

fn parse_text(text: &str) -> Option<Decimal> {
    let mut cleaned: String = text
        .chars()
        .filter(|c| !STRIPPED.contains(c) && !c.is_whitespace())
        .collect();
    if cleaned.ends_with(['x', 'X']) {
        cleaned.pop();
    }
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .ok()
}

/// Numeric value with a default for missing or malformed input.
pub fn num(raw: Option<&RawValue>, default: Decimal) -> Decimal {
    parse(raw).unwrap_or(default)
}

/// Interpret a parsed value as a rate: magnitudes above one are percentages.
pub fn as_rate(value: Decimal) -> Rate {
    if value > Decimal::ONE || value < -Decimal::ONE {
        value / dec!(100)
    } else {
        value
    }
}

/// Rate value with a default. `"75"`, `"75%"` and `0.75` all give `0.75`;
/// the default is already a fraction and is returned unchanged.
///
/// Rates beyond 100% either way are treated as malformed.
pub fn rate(raw: Option<&RawValue>, default: Rate) -> Rate {
    opt_rate(raw).unwrap_or(default)
}

/// Like [`rate`] but None when the field is absent or malformed.
pub fn opt_rate(raw: Option<&RawValue>) -> Option<Rate> {
    parse(raw)
        .map(as_rate)
        .filter(|r| r.abs() <= MAX_RATE)
}

/// Strictly positive value, used to decide whether an explicit figure is
/// present in a fallback chain.
pub fn positive(raw: Option<&RawValue>) -> Option<Decimal> {
    parse(raw).filter(|v| *v > Decimal::ZERO)
}

/// Strictly positive rate.
pub fn positive_rate(raw: Option<&RawValue>) -> Option<Rate> {
    opt_rate(raw).filter(|v| *v > Decimal::ZERO)
}

/// Non-blank text.
pub fn has_text(value: Option<&String>) -> bool {
    value.is_some_and(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> RawValue {
        RawValue::from(s)
    }

    #[test]
    fn test_missing_and_empty_use_default() {
        assert_eq!(num(None, dec!(7)), dec!(7));
        assert_eq!(num(Some(&text("")), dec!(7)), dec!(7));
        assert_eq!(num(Some(&text("   ")), dec!(7)), dec!(7));
    }

    #[test]
    fn test_numeric_passes_through() {
        assert_eq!(num(Some(&RawValue::from(dec!(1250000))), dec!(0)), dec!(1250000));
        assert_eq!(num(Some(&RawValue::from(0.0)), dec!(5)), dec!(0));
    }

    #[test]
    fn test_currency_text() {
        assert_eq!(num(Some(&text("$1,250,000")), dec!(0)), dec!(1250000));
        assert_eq!(num(Some(&text("€ 45,000.50")), dec!(0)), dec!(45000.50));
    }

    #[test]
    fn test_percent_and_multiple_suffixes() {
        assert_eq!(num(Some(&text("92%")), dec!(0)), dec!(92));
        assert_eq!(num(Some(&text("1.8x")), dec!(0)), dec!(1.8));
        assert_eq!(num(Some(&text("2.0X")), dec!(0)), dec!(2.0));
    }

    #[test]
    fn test_garbage_falls_back() {
        assert_eq!(num(Some(&text("call broker")), dec!(3)), dec!(3));
        assert_eq!(num(Some(&text("x")), dec!(3)), dec!(3));
    }

    #[test]
    fn test_non_finite_float_falls_back() {
        assert_eq!(num(Some(&RawValue::from(f64::NAN)), dec!(9)), dec!(9));
        assert_eq!(num(Some(&RawValue::from(f64::INFINITY)), dec!(9)), dec!(9));
    }

    #[test]
    fn test_rate_percentage_and_fraction_agree() {
        let from_text = rate(Some(&text("75")), dec!(0));
        let from_number = rate(Some(&RawValue::from(dec!(0.75))), dec!(0));
        assert_eq!(from_text, from_number);
        assert_eq!(from_text, dec!(0.75));
    }

    #[test]
    fn test_rate_negative_growth() {
        assert_eq!(rate(Some(&text("-3")), dec!(0)), dec!(-0.03));
        assert_eq!(rate(Some(&RawValue::from(dec!(-0.03))), dec!(0)), dec!(-0.03));
    }

    #[test]
    fn test_rate_boundary_one_is_fractional() {
        assert_eq!(rate(Some(&RawValue::from(dec!(1))), dec!(0)), dec!(1));
        assert_eq!(rate(Some(&text("7.25%")), dec!(0)), dec!(0.0725));
    }

    #[test]
    fn test_rate_default_is_not_rescaled() {
        assert_eq!(rate(None, dec!(0.06)), dec!(0.06));
    }

    #[test]
    fn test_out_of_range_values_fall_back() {
        assert_eq!(num(Some(&text("1e26")), dec!(4)), dec!(4));
        assert_eq!(num(Some(&text("1,000,000,000,000")), dec!(0)), MAX_MAGNITUDE);
        assert_eq!(num(Some(&text("-2000000000000")), dec!(4)), dec!(4));
        assert_eq!(rate(Some(&text("1e26")), dec!(0.07)), dec!(0.07));
        assert_eq!(rate(Some(&text("250%")), dec!(0.07)), dec!(0.07));
        assert_eq!(rate(Some(&text("-100")), dec!(0.07)), dec!(-1));
        assert_eq!(opt_rate(Some(&text("-101"))), None);
    }

    #[test]
    fn test_positive_filters_zero() {
        assert_eq!(positive(Some(&text("0"))), None);
        assert_eq!(positive(Some(&text("-5"))), None);
        assert_eq!(positive(Some(&text("12"))), Some(dec!(12)));
    }

    #[test]
    fn test_deserialize_number_and_text() {
        let values: Vec<RawValue> = serde_json::from_str(r#"[92, "92%", 0.5]"#).unwrap();
        assert_eq!(parse(Some(&values[0])), Some(dec!(92)));
        assert_eq!(values[1], text("92%"));
        assert_eq!(parse(Some(&values[2])), Some(dec!(0.5)));
    }
}

//! Display rounding shared by the digest, the CLI and export collaborators.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::types::{Money, Multiple, Rate};

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// `$1,234,567`; whole dollars, half away from zero, `-$1,234` for negatives.
pub fn money(value: Money) -> String {
    let rounded = value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let grouped = group_thousands(&rounded.abs().trunc().to_string());
    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}

/// Fraction as a percentage with two decimals: `0.0725` → `7.25%`.
/// Saturates at the `Decimal` bounds.
pub fn percent(rate: Rate) -> String {
    let scaled = rate.checked_mul(dec!(100)).unwrap_or(if rate.is_sign_negative() {
        Decimal::MIN
    } else {
        Decimal::MAX
    });
    let pct = scaled.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.2}%", normalize_zero(pct))
}

/// `1.65x`
pub fn multiple(value: Multiple) -> String {
    let m = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.2}x", normalize_zero(m))
}

/// Ratio such as DSCR with two decimals.
pub fn ratio(value: Decimal) -> String {
    let r = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.2}", normalize_zero(r))
}

/// Avoid printing `-0.00`.
fn normalize_zero(value: Decimal) -> Decimal {
    if value.is_zero() {
        Decimal::ZERO
    } else {
        value
    }
}
